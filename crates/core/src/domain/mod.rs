// Domain Layer - Pure business logic and entities

pub mod boundary;
pub mod destination;
pub mod error;
pub mod feedback;
pub mod identity;
pub mod membership;
pub mod queue;

// Re-exports
pub use boundary::DailyBoundary;
pub use destination::{ContactInfo, Destination, DestinationId, Registration};
pub use error::DomainError;
pub use feedback::{Feedback, Rating};
pub use identity::{LocalIdentity, RequesterId};
pub use membership::{PartySize, QueueMembership, SequenceNumber};
pub use queue::{QueueEvent, QueuePolicy};
