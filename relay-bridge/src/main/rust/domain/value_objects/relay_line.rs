use std::time::Duration;

use super::RestartCause;

/// Formatting of the single display line cross-posted to peer connections
pub struct RelayLine;

impl RelayLine {
    /// `<origin>: <sender>: <message>`, dropping the sender when it only repeats the origin
    pub fn chat(origin: &str, sender: &str, message: &str) -> String {
        if sender.is_empty() || sender == origin {
            format!("{}: {}", origin, message)
        } else {
            format!("{}: {}: {}", origin, sender, message)
        }
    }

    pub fn established(connection: &str) -> String {
        format!("connection to {} established.", connection)
    }

    pub fn outage(connection: &str, cause: RestartCause, retry_in: Option<Duration>) -> String {
        match (cause, retry_in) {
            (RestartCause::Lost, Some(delay)) => format!(
                "connection to {} lost. reconnect in {}.",
                connection,
                Self::human_delay(delay)
            ),
            (RestartCause::Failed, Some(delay)) => format!(
                "connection to {} failed. retrying in {}.",
                connection,
                Self::human_delay(delay)
            ),
            (_, None) => format!("connection to {} {}.", connection, cause),
        }
    }

    fn human_delay(delay: Duration) -> String {
        if delay.subsec_nanos() == 0 {
            let secs = delay.as_secs();
            if secs == 1 {
                "1 second".to_string()
            } else {
                format!("{} seconds", secs)
            }
        } else {
            format!("{:.1} seconds", delay.as_secs_f64())
        }
    }
}
