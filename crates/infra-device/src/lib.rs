// Waitline Infrastructure - Device Adapters
// Implements: IdentityCache (JSON file), Notifier (structured log)

pub mod identity_file;
pub mod log_notifier;

pub use identity_file::FileIdentityCache;
pub use log_notifier::LogNotifier;
