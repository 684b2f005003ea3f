// Structured-log notifier
// Alerts are emitted under the `waitline::notify` target so a log shipper
// or terminal can forward them to the requester.

use async_trait::async_trait;
use tracing::info;
use waitline_core::port::{Notification, Notifier};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) {
        info!(
            target: "waitline::notify",
            destination = %notification.destination,
            requester = %notification.requester,
            position = notification.position,
            title = %notification.title,
            "{}",
            notification.body
        );
    }
}
