use chrono::NaiveDate;
use common::api;
use common::cli::*;
use common::http::{code_to_string, HttpClient, Request, Response};
use common::models::Role;
use common::routes;
use common::session::USER_HEADER;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const USAGE: &str = "\
Usage: client [<host>:<port>] <action> [args]

The server learns who you are from the CAFETERIA_USER environment variable.

Actions:
  menu                                   Show today's menu
  publish <date> <detail> <dish_id>...   Publish the menu for a date (admin)
  edit-menu <token> <detail> <dish_id>...
                                         Replace a menu's detail and dishes (admin)
  notify                                 Announce today's menu (admin)
  order <token> <dish_id> [customizations]...
                                         Order, or change, your dish for today
  my-order <token>                       Show the menu and your order
  orders                                 Today's orders for the kitchen (admin)
  dishes                                 List the dish catalogue (admin)
  add-dish <name>...                     Add a dish to the catalogue (admin)
  rename-dish <dish_id> <name>...        Rename a dish (admin)
  add-user <username> <role> [display name]...
                                         Register a user (admin)";

#[derive(Debug)]
enum Action {
    Menu,
    Publish,
    EditMenu,
    Notify,
    Order,
    MyOrder,
    Orders,
    Dishes,
    AddDish,
    RenameDish,
    AddUser,
}

#[derive(Debug)]
struct CLIOptions {
    target: String,
    action: Action,
    rest: Vec<String>,
}

fn parse_action(action: String) -> std::result::Result<Action, CLIError> {
    match action.to_ascii_lowercase().as_str() {
        "menu" => Ok(Action::Menu),
        "publish" => Ok(Action::Publish),
        "edit-menu" => Ok(Action::EditMenu),
        "notify" => Ok(Action::Notify),
        "order" => Ok(Action::Order),
        "my-order" => Ok(Action::MyOrder),
        "orders" => Ok(Action::Orders),
        "dishes" => Ok(Action::Dishes),
        "add-dish" => Ok(Action::AddDish),
        "rename-dish" => Ok(Action::RenameDish),
        "add-user" => Ok(Action::AddUser),
        _ => Err(CLIError::UnknownAction(action)),
    }
}

fn parse_cli_args<I>(mut args: I) -> std::result::Result<CLIOptions, CLIError>
where
    I: Iterator<Item = String>,
{
    assert!(args.next().is_some()); // Skip the program name
    let maybe_target = args
        .next()
        .ok_or(CLIError::MissingParameter("target or action"))?;

    // The first argument is an address if it looks like one, otherwise the
    // action itself and the default address applies.
    let (target, action) = match validate_address(maybe_target.as_str()) {
        Ok(target) => (
            target.to_string(),
            args.next()
                .ok_or(CLIError::MissingParameter("action"))
                .and_then(parse_action)?,
        ),
        Err(_) => (DEFAULT_ADDRESS.to_string(), parse_action(maybe_target)?),
    };

    Ok(CLIOptions {
        target,
        action,
        rest: args.collect(),
    })
}

fn required<'a>(
    rest: &'a [String],
    index: usize,
    name: &'static str,
) -> std::result::Result<&'a str, CLIError> {
    rest.get(index)
        .map(String::as_str)
        .ok_or(CLIError::MissingParameter(name))
}

fn required_i64(
    rest: &[String],
    index: usize,
    name: &'static str,
) -> std::result::Result<i64, CLIError> {
    required(rest, index, name)?
        .parse::<i64>()
        .map_err(|_| CLIError::InvalidParameter(name))
}

fn id_list(rest: &[String]) -> std::result::Result<Vec<i64>, CLIError> {
    rest.iter()
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| CLIError::InvalidParameter("dish id"))
        })
        .collect()
}

/// Attach the caller's identity, when one is configured.
fn with_user(request: Request) -> Request {
    match std::env::var("CAFETERIA_USER") {
        Ok(username) if !username.trim().is_empty() => {
            request.with_header(USER_HEADER, username.trim())
        }
        _ => request,
    }
}

fn print_response<'a, Body>(response: &'a Response)
where
    Body: serde::Deserialize<'a> + std::fmt::Debug,
{
    match response.status {
        Some(code) => println!("Response Status: {} - {}", code, code_to_string(code)),
        None => println!("No status in response"),
    }
    if !response.body.is_empty() {
        let json = serde_json::from_str::<Body>(&response.body);
        match json {
            Ok(json) => println!("Response Body: {:?}", json),
            Err(e) => println!("Error parsing response body: {}\n{:?}", e, response.body),
        }
    }
}

/// Print the expected shape on success and the error body on failure.
fn print_outcome<'a, Body>(response: &'a Response)
where
    Body: serde::Deserialize<'a> + std::fmt::Debug,
{
    if response.status.unwrap_or(500) >= 400 {
        print_response::<api::ErrorBody>(response)
    } else {
        print_response::<Body>(response)
    }
}

fn run(options: &CLIOptions) -> CliResult<()> {
    let mut client = HttpClient::new(&options.target)?;
    let rest = options.rest.as_slice();

    match options.action {
        Action::Menu => {
            let response = client.send(&with_user(Request::get(routes::paths::MENU)))?;
            print_outcome::<api::TodayMenu>(&response);
        }
        Action::Publish => {
            let body = api::NewMenu {
                date: required(rest, 0, "date")?
                    .parse::<NaiveDate>()
                    .map_err(|_| CLIError::InvalidParameter("date"))?,
                detail: required(rest, 1, "detail")?.to_string(),
                dish_ids: id_list(rest.get(2..).unwrap_or(&[]))?,
            };
            let request = Request::post(routes::paths::MENUS, serde_json::to_string(&body)?);
            let response = client.send(&with_user(request))?;
            print_outcome::<api::MenuReceipt>(&response);
        }
        Action::EditMenu => {
            let token = required(rest, 0, "menu token")?;
            let body = api::MenuUpdate {
                detail: required(rest, 1, "detail")?.to_string(),
                dish_ids: id_list(rest.get(2..).unwrap_or(&[]))?,
            };
            let request = Request::put(
                &routes::menu_by_token(token),
                serde_json::to_string(&body)?,
            );
            let response = client.send(&with_user(request))?;
            print_outcome::<api::MenuReceipt>(&response);
        }
        Action::Notify => {
            let request = Request::post(routes::paths::MENU_NOTIFY, String::new());
            let response = client.send(&with_user(request))?;
            print_outcome::<api::NotifyReceipt>(&response);
        }
        Action::Order => {
            let token = required(rest, 0, "menu token")?;
            let body = api::NewOrder {
                dish_id: Some(required_i64(rest, 1, "dish id")?),
                customizations: rest.get(2..).unwrap_or(&[]).join(" "),
            };
            let request = Request::post(
                &routes::menu_order(token),
                serde_json::to_string(&body)?,
            );
            let response = client.send(&with_user(request))?;
            print_outcome::<api::OrderReceipt>(&response);
        }
        Action::MyOrder => {
            let token = required(rest, 0, "menu token")?;
            let response = client.send(&with_user(Request::get(&routes::menu_order(token))))?;
            print_outcome::<api::OrderPage>(&response);
        }
        Action::Orders => {
            let response = client.send(&with_user(Request::get(routes::paths::ORDERS)))?;
            print_outcome::<api::DayOrders>(&response);
        }
        Action::Dishes => {
            let response = client.send(&with_user(Request::get(routes::paths::DISHES)))?;
            print_outcome::<Vec<api::DishView>>(&response);
        }
        Action::AddDish => {
            if rest.is_empty() {
                return Err(CLIError::MissingParameter("dish name").into());
            }
            let body = api::NewDish {
                name: rest.join(" "),
            };
            let request = Request::post(routes::paths::DISHES, serde_json::to_string(&body)?);
            let response = client.send(&with_user(request))?;
            print_outcome::<api::DishReceipt>(&response);
        }
        Action::RenameDish => {
            let dish_id = required_i64(rest, 0, "dish id")?;
            let name = rest.get(1..).unwrap_or(&[]).join(" ");
            if name.is_empty() {
                return Err(CLIError::MissingParameter("dish name").into());
            }
            let request = Request::put(
                &routes::dish_by_id(dish_id),
                serde_json::to_string(&api::NewDish { name })?,
            );
            let response = client.send(&with_user(request))?;
            print_outcome::<api::DishReceipt>(&response);
        }
        Action::AddUser => {
            let username = required(rest, 0, "username")?.to_string();
            let role = Role::parse(required(rest, 1, "role")?)
                .ok_or(CLIError::InvalidParameter("role"))?;
            let body = api::NewUser {
                username,
                display_name: rest.get(2..).unwrap_or(&[]).join(" "),
                role,
            };
            let request = Request::post(routes::paths::USERS, serde_json::to_string(&body)?);
            let response = client.send(&with_user(request))?;
            print_outcome::<api::UserView>(&response);
        }
    }
    Ok(())
}

fn main() {
    let options = parse_cli_args(std::env::args()).unwrap_or_else(|err| {
        eprintln!("{}", err);
        eprintln!("{}", USAGE);
        std::process::exit(2);
    });

    if let Err(err) = run(&options) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
