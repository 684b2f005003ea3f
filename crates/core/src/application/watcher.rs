// Position Watcher - recompute positions and send proximity alerts
//
// Recomputes on every committed queue change and on a fixed interval, so
// a missed event only delays an alert by one tick.

use crate::application::notification::NotificationTracker;
use crate::application::position::{positions, PositionResolver};
use crate::application::shutdown::ShutdownToken;
use crate::domain::{DestinationId, QueueEvent};
use crate::error::Result;
use crate::port::{Notification, Notifier};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub struct PositionWatcher {
    resolver: Arc<PositionResolver>,
    notifier: Arc<dyn Notifier>,
    tracker: NotificationTracker,
    refresh_interval: Duration,
}

impl PositionWatcher {
    pub fn new(
        resolver: Arc<PositionResolver>,
        notifier: Arc<dyn Notifier>,
        refresh_interval: Duration,
    ) -> Self {
        let tracker = NotificationTracker::new(resolver.notify_threshold());
        Self {
            resolver,
            notifier,
            tracker,
            refresh_interval,
        }
    }

    pub fn tracker(&self) -> &NotificationTracker {
        &self.tracker
    }

    /// Watch loop (background task)
    ///
    /// Should be spawned in tokio::spawn. Returns on shutdown.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<QueueEvent>,
        mut shutdown: ShutdownToken,
    ) {
        info!(
            interval_secs = self.refresh_interval.as_secs(),
            threshold = self.tracker.threshold(),
            "Position watcher started"
        );

        let mut tick = interval(self.refresh_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tick.tick() => {
                    if let Err(e) = self.refresh_all().await {
                        error!(error = %e, "Periodic position refresh failed");
                    }
                }
                event = events.recv(), if events_open => match event {
                    Ok(event) => {
                        self.on_event(&event);
                        if let Err(e) = self.refresh(event.destination()).await {
                            warn!(
                                destination = %event.destination(),
                                error = %e,
                                "Position refresh failed"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Queue events lagged, refreshing everything");
                        if let Err(e) = self.refresh_all().await {
                            error!(error = %e, "Position refresh failed");
                        }
                    }
                    Err(RecvError::Closed) => {
                        info!("Queue event channel closed, falling back to periodic refresh");
                        events_open = false;
                    }
                },
            }
        }

        info!("Position watcher stopped");
    }

    fn on_event(&self, event: &QueueEvent) {
        match event {
            QueueEvent::Left {
                destination,
                requester,
            } => self.tracker.forget(destination, requester),
            QueueEvent::Served {
                destination,
                admitted,
            } => {
                for requester in admitted {
                    self.tracker.forget(destination, requester);
                }
            }
            QueueEvent::Joined { .. } => {}
        }
    }

    /// Recompute every position at one destination
    ///
    /// Returns the number of alerts sent.
    pub async fn refresh(&self, destination: &DestinationId) -> Result<usize> {
        let snapshot = self.resolver.snapshot(destination).await?;

        let active: HashSet<_> = snapshot.iter().map(|m| &m.requester).collect();
        self.tracker.retain_active(destination, &active);

        let mut sent = 0;
        for (member, position) in positions(&snapshot) {
            if self.tracker.observe(destination, &member.requester, position) {
                let notification = Notification::near_front(
                    destination.clone(),
                    member.requester.clone(),
                    position,
                );
                self.notifier.notify(&notification).await;
                sent += 1;
            }
        }

        if sent > 0 {
            debug!(destination = %destination, sent, "Proximity alerts sent");
        }
        Ok(sent)
    }

    /// Recompute every destination with a non-empty line
    pub async fn refresh_all(&self) -> Result<usize> {
        let mut sent = 0;
        for destination in self.resolver.active_destinations().await? {
            match self.refresh(&destination).await {
                Ok(n) => sent += n,
                Err(e) => warn!(destination = %destination, error = %e, "Position refresh failed"),
            }
        }
        Ok(sent)
    }
}
