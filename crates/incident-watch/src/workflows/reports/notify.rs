use tokio::sync::broadcast;
use tracing::debug;

use super::repository::{NotificationPublisher, NotifyError, ReportNotification};

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of report notifications to every connected listener. Nothing is buffered for
/// listeners that connect later, and a send with no listeners is not an error.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ReportNotification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReportNotification> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationPublisher for BroadcastNotifier {
    fn publish(&self, notification: ReportNotification) -> Result<(), NotifyError> {
        let event = notification.event;
        match self.sender.send(notification) {
            Ok(listeners) => debug!(event, listeners, "notification broadcast"),
            Err(_) => debug!(event, "notification dropped, no listeners connected"),
        }
        Ok(())
    }
}
