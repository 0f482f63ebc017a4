use std::time::Duration;

use crate::domain::value_objects::ConnectionState;

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_state_change(&self, connection: &str, state: &ConnectionState);
    fn report_reconnect_scheduled(&self, connection: &str, delay: Duration);
    fn report_message_relayed(&self, origin: &str);
    fn report_send_dropped(&self, connection: &str);
}
