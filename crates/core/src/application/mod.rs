// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod day_count;
pub mod feedback;
pub mod identity;
pub mod notification;
pub mod position;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod shutdown;
pub mod watcher;

// Re-exports
pub use day_count::DayCountResetScheduler;
pub use feedback::FeedbackService;
pub use identity::IdentityService;
pub use notification::NotificationTracker;
pub use position::{PositionResolver, QueueStatus};
pub use queue::{QueueService, ServeOutcome};
pub use registry::DestinationRegistry;
pub use retry::RetryPolicy;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use watcher::PositionWatcher;
