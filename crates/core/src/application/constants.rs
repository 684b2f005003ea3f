// Application constants (No magic values)
use std::time::Duration;

/// Default retry base delay for transient store reads (200ms)
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;

/// Default exponential backoff factor
pub const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 2.0;

/// Default number of read attempts before giving up
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 4;

/// Upper bound for a single backoff delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the queue change broadcast channel
pub const QUEUE_EVENT_CHANNEL_CAPACITY: usize = 256;

/// How often the day-count reset check runs
pub const DEFAULT_DAY_COUNT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Default daily reset instant: 18:00 Europe/London
pub const DEFAULT_RESET_HOUR: u32 = 18;
pub const DEFAULT_RESET_TIME_ZONE: &str = "Europe/London";

/// Default page size for feedback listings
pub const DEFAULT_FEEDBACK_LIMIT: usize = 50;
