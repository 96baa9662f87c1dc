use std::sync::{Arc, Mutex};

use common::clock::SystemClock;
use common::config::Config;
use common::database::sqlite::SqliteDatabase;
use common::endpoints::{create_http_router, error_response};
use common::errors::Result;
use common::http::HttpServer;
use common::notify::{Disabled, Notifier, SlackNotifier};
use common::session;
use common::state::AppState;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Config::load()?;

    let mut db = SqliteDatabase::open(&config.database_path)?;
    session::ensure_admin(&mut db, &config.admin_username)?;

    let notifier: Box<dyn Notifier> = match &config.slack {
        Some(slack) => {
            log::info!("Announcements go to Slack channel {}", slack.channel);
            Box::new(SlackNotifier::new(
                &slack.token,
                &slack.channel,
                config.notify_timeout,
            )?)
        }
        None => {
            log::info!("No messaging credentials, announcements are disabled");
            Box::new(Disabled)
        }
    };

    let address = config.address.clone();
    let state = Arc::new(Mutex::new(AppState::new(
        Box::new(db),
        notifier,
        Box::new(SystemClock),
        config,
    )));
    let router = Arc::new(create_http_router()?);

    let server = HttpServer::new(&address)?;
    log::info!("Serving the cafeteria on {}", address);
    server.serve(move |request| {
        // A handler that panicked must not wedge every later request.
        let mut state = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        router
            .route(request, &mut state)
            .unwrap_or_else(error_response)
    });

    Ok(())
}
