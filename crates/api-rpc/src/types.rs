//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use waitline_core::domain::{Destination, Feedback, QueueMembership};

/// Public view of a destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationInfo {
    pub id: String,
    pub name: String,
    pub website: String,
    pub phone: String,
    pub entry_rate: u32,
    pub day_count: u64,
}

impl From<Destination> for DestinationInfo {
    fn from(destination: Destination) -> Self {
        Self {
            id: destination.id.to_string(),
            name: destination.display_name,
            website: destination.contact.website,
            phone: destination.contact.phone,
            entry_rate: destination.entry_rate,
            day_count: destination.day_count,
        }
    }
}

/// destination.register.v1 - Register a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub website: String,
    pub phone: String,
    pub entry_rate: u32,
}

/// destination.find.v1 - Search destinations by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindResponse {
    pub destinations: Vec<DestinationInfo>,
}

/// destination.serve.v1 - Admit the next batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeRequest {
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyInfo {
    pub requester: String,
    pub party_size: u32,
    pub sequence: i64,
}

impl From<&QueueMembership> for PartyInfo {
    fn from(membership: &QueueMembership) -> Self {
        Self {
            requester: membership.requester.to_string(),
            party_size: membership.party_size.get(),
            sequence: membership.sequence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeResponse {
    pub destination: String,
    pub admitted: Vec<PartyInfo>,
    pub people_admitted: u64,
    pub day_count: u64,
}

/// queue.join.v1 - Join a line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub destination: String,
    pub requester: String,
    pub party_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub destination: String,
    pub requester: String,
    pub party_size: u32,
    pub sequence: i64,
}

/// queue.leave.v1 - Leave a line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub destination: String,
    pub requester: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub destination: String,
    pub requester: String,
    pub left: bool,
}

/// queue.position.v1 - Requester's place in line
///
/// Result is [`waitline_core::application::QueueStatus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRequest {
    pub destination: String,
    pub requester: String,
}

/// queue.snapshot.v1 - Whole line of a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotEntry {
    #[serde(flatten)]
    pub party: PartyInfo,
    pub position: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub destination: String,
    pub total_waiting: u64,
    pub parties: Vec<SnapshotEntry>,
}

/// feedback.submit.v1 - Rate a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub destination: String,
    pub requester: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackEntry {
    pub destination: String,
    pub requester: String,
    pub rating: u8,
    pub comment: String,
    pub submitted_at: i64,
}

impl From<Feedback> for FeedbackEntry {
    fn from(feedback: Feedback) -> Self {
        Self {
            destination: feedback.destination.to_string(),
            requester: feedback.requester.to_string(),
            rating: feedback.rating.stars(),
            comment: feedback.comment,
            submitted_at: feedback.submitted_at,
        }
    }
}

/// feedback.list.v1 - Recent feedback for a destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackListRequest {
    pub destination: String,
    #[serde(default = "default_feedback_limit")]
    pub limit: usize,
}

fn default_feedback_limit() -> usize {
    waitline_core::application::constants::DEFAULT_FEEDBACK_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackListResponse {
    pub destination: String,
    pub average_rating: Option<f64>,
    pub feedback: Vec<FeedbackEntry>,
}

/// admin.stats.v1 - Get system statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub destinations: usize,
    pub active_lines: usize,
    pub waiting_parties: usize,
    pub waiting_people: u64,
    pub served_today: u64,
    pub uptime_seconds: u64,
}
