use std::time::Duration;

use serde::Deserialize;

/// How a notification send can fail, from the administrator's perspective.
///
/// The messages double as the guidance shown to the admin: a failed
/// announcement is reported with something actionable, never a stack trace.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NotifyError {
    #[error("The messaging service rejected our credentials, double-check the configured token")]
    Auth,
    #[error("The messaging channel was not found, confirm the bot was invited to it")]
    ChannelNotFound,
    #[error("Could not deliver the announcement: {0}")]
    Other(String),
}

/// Trait hiding the messaging integration.
///
/// Same idea as the `Database` trait: the domain code talks to this, tests
/// swap in the recording mock, and the server picks the Slack
/// implementation (or `Disabled` when no credentials are configured).
pub trait Notifier: Send {
    /// Post one text message to the configured channel.
    ///
    /// One-shot with a bounded timeout; no retry is built in. Whether to
    /// announce again is always the administrator's call.
    fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Slack's chat.postMessage endpoint.
pub const SLACK_POST_MESSAGE: &str = "https://slack.com/api/chat.postMessage";

/// Map a Slack error string to our taxonomy.
///
/// Slack reports failures as `ok: false` plus a short error code; we only
/// distinguish the two families the admin can act on.
fn classify(error: &str) -> NotifyError {
    match error {
        "invalid_auth" | "not_authed" | "token_revoked" | "account_inactive" => NotifyError::Auth,
        "channel_not_found" | "not_in_channel" | "is_archived" => NotifyError::ChannelNotFound,
        other => NotifyError::Other(other.to_string()),
    }
}

#[derive(Deserialize)]
struct PostMessageReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Notifier posting to Slack's chat.postMessage API.
pub struct SlackNotifier {
    client: reqwest::blocking::Client,
    token: String,
    channel: String,
    url: String,
}

impl SlackNotifier {
    /// Build a notifier with a bounded request timeout, so an unreachable
    /// Slack can never hang a request indefinitely.
    pub fn new(token: &str, channel: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NotifyError::Other(err.to_string()))?;
        Ok(SlackNotifier {
            client,
            token: token.to_string(),
            channel: channel.to_string(),
            url: SLACK_POST_MESSAGE.to_string(),
        })
    }

    #[cfg(test)]
    fn at_url(token: &str, channel: &str, url: &str) -> Self {
        let mut notifier =
            SlackNotifier::new(token, channel, Duration::from_secs(2)).unwrap();
        notifier.url = url.to_string();
        notifier
    }
}

impl Notifier for SlackNotifier {
    fn send(&self, text: &str) -> Result<(), NotifyError> {
        let payload = serde_json::json!({
            "channel": self.channel,
            "text": text,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .map_err(|err| NotifyError::Other(err.to_string()))?;

        let reply: PostMessageReply = response
            .json()
            .map_err(|err| NotifyError::Other(err.to_string()))?;

        if reply.ok {
            Ok(())
        } else {
            Err(classify(reply.error.as_deref().unwrap_or("unknown_error")))
        }
    }
}

/// Stand-in used when no messaging credentials are configured. Announcing
/// still fails loudly instead of pretending the message went out.
pub struct Disabled;

impl Notifier for Disabled {
    fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Other(
            "notifications are not configured".to_string(),
        ))
    }
}

pub mod mock {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Notifier for unit tests: records what would have been sent, or fails
    /// with a chosen error to exercise the failure paths.
    pub struct RecordingNotifier {
        pub sent: Arc<Mutex<Vec<String>>>,
        pub fail_with: Option<NotifyError>,
    }

    impl RecordingNotifier {
        /// A notifier that accepts everything, plus a handle to what it saw.
        pub fn recording() -> (RecordingNotifier, Arc<Mutex<Vec<String>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            (
                RecordingNotifier {
                    sent: Arc::clone(&sent),
                    fail_with: None,
                },
                sent,
            )
        }

        /// A notifier that fails every send with the given error.
        pub fn failing(error: NotifyError) -> RecordingNotifier {
            RecordingNotifier {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_with: Some(error),
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, text: &str) -> Result<(), NotifyError> {
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::mock::RecordingNotifier;
    use super::*;
    use crate::http::{HttpServer, Response};

    #[test]
    fn test_classify_covers_the_families_the_admin_can_act_on() {
        assert_eq!(classify("invalid_auth"), NotifyError::Auth);
        assert_eq!(classify("token_revoked"), NotifyError::Auth);
        assert_eq!(classify("channel_not_found"), NotifyError::ChannelNotFound);
        assert_eq!(classify("not_in_channel"), NotifyError::ChannelNotFound);
        assert_eq!(
            classify("ratelimited"),
            NotifyError::Other("ratelimited".to_string())
        );
    }

    #[test]
    fn test_recording_notifier() {
        let (notifier, sent) = RecordingNotifier::recording();
        notifier.send("lunch is ready").unwrap();
        assert_eq!(*sent.lock().unwrap(), vec!["lunch is ready".to_string()]);

        let failing = RecordingNotifier::failing(NotifyError::Auth);
        assert_eq!(failing.send("anything"), Err(NotifyError::Auth));
        assert!(failing.sent.lock().unwrap().is_empty());
    }

    // Same caveats as the other socket tests: the port must be free. The
    // listener is bound before the serving thread starts, so the client
    // never races the bind.
    #[test]
    fn test_slack_error_reply_maps_to_channel_guidance() {
        static ADDR: &str = "127.0.0.1:18431";

        let server = HttpServer::new(ADDR).expect("Failed to bind test server");
        let handle = std::thread::spawn(move || {
            server.serve_once(|_| {
                Response::ok_with_body(r#"{"ok":false,"error":"channel_not_found"}"#.to_string())
            });
        });

        let notifier = SlackNotifier::at_url("xoxb-test", "#lunch", &format!("http://{}", ADDR));
        let result = notifier.send("Today: soup or salad");

        handle.join().unwrap();
        assert_eq!(result, Err(NotifyError::ChannelNotFound));
    }

    #[test]
    fn test_slack_ok_reply_is_a_success() {
        static ADDR: &str = "127.0.0.1:18432";

        let server = HttpServer::new(ADDR).expect("Failed to bind test server");
        let handle = std::thread::spawn(move || {
            server.serve_once(|_| Response::ok_with_body(r#"{"ok":true}"#.to_string()));
        });

        let notifier = SlackNotifier::at_url("xoxb-test", "#lunch", &format!("http://{}", ADDR));
        let result = notifier.send("Today: soup or salad");

        handle.join().unwrap();
        assert_eq!(result, Ok(()));
    }
}
