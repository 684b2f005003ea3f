//! RPC Method Handlers
//!
//! Maps each JSON-RPC method onto the application services.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    DestinationInfo, FeedbackEntry, FeedbackListRequest, FeedbackListResponse, FeedbackRequest,
    FindRequest, FindResponse, JoinRequest, JoinResponse, LeaveRequest, LeaveResponse, PartyInfo,
    PositionRequest, RegisterRequest, ServeRequest, ServeResponse, SnapshotEntry, SnapshotRequest,
    SnapshotResponse, StatsRequest, StatsResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use waitline_core::application::position::{positions, total_waiting};
use waitline_core::application::{
    DestinationRegistry, FeedbackService, PositionResolver, QueueService, QueueStatus,
};
use waitline_core::domain::{ContactInfo, DestinationId, Registration, RequesterId};

/// Services the RPC surface dispatches to
#[derive(Clone)]
pub struct RpcServices {
    pub registry: Arc<DestinationRegistry>,
    pub queue: Arc<QueueService>,
    pub resolver: Arc<PositionResolver>,
    pub feedback: Arc<FeedbackService>,
}

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    services: RpcServices,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

type RpcResult<T> = Result<T, ErrorObjectOwned>;

impl RpcHandler {
    pub fn new(services: RpcServices, rate_limit_burst: u32, rate_limit_per_sec: u32) -> Self {
        Self {
            services,
            rate_limiter: RateLimiter::new(rate_limit_burst, rate_limit_per_sec),
            start_time: Instant::now(),
        }
    }

    fn throttle(&self) -> RpcResult<()> {
        if self.rate_limiter.check() {
            Ok(())
        } else {
            Err(throttled())
        }
    }

    /// destination.register.v1
    pub async fn register(&self, params: RegisterRequest) -> RpcResult<DestinationInfo> {
        self.throttle()?;

        let destination = self
            .services
            .registry
            .register(Registration {
                name: params.name,
                contact: ContactInfo {
                    website: params.website,
                    phone: params.phone,
                },
                entry_rate: params.entry_rate,
            })
            .await
            .map_err(to_rpc_error)?;

        Ok(destination.into())
    }

    /// destination.find.v1
    pub async fn find(&self, params: FindRequest) -> RpcResult<FindResponse> {
        let destinations = self
            .services
            .registry
            .find(&params.query)
            .await
            .map_err(to_rpc_error)?;

        Ok(FindResponse {
            destinations: destinations.into_iter().map(DestinationInfo::from).collect(),
        })
    }

    /// destination.serve.v1
    pub async fn serve(&self, params: ServeRequest) -> RpcResult<ServeResponse> {
        self.throttle()?;

        let destination = self.known_destination(&params.destination).await?;
        let outcome = self
            .services
            .queue
            .serve_next_batch(&destination)
            .await
            .map_err(to_rpc_error)?;

        Ok(ServeResponse {
            destination: outcome.destination.to_string(),
            admitted: outcome.admitted.iter().map(PartyInfo::from).collect(),
            people_admitted: outcome.people_admitted,
            day_count: outcome.day_count,
        })
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinRequest) -> RpcResult<JoinResponse> {
        self.throttle()?;

        let destination = DestinationId::from_name(&params.destination);
        let requester = parse_requester(&params.requester)?;
        let membership = self
            .services
            .queue
            .join(&destination, &requester, params.party_size)
            .await
            .map_err(to_rpc_error)?;

        Ok(JoinResponse {
            destination: membership.destination.to_string(),
            requester: membership.requester.to_string(),
            party_size: membership.party_size.get(),
            sequence: membership.sequence,
        })
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: LeaveRequest) -> RpcResult<LeaveResponse> {
        self.throttle()?;

        let destination = DestinationId::from_name(&params.destination);
        let requester = parse_requester(&params.requester)?;
        self.services
            .queue
            .leave(&destination, &requester)
            .await
            .map_err(to_rpc_error)?;

        Ok(LeaveResponse {
            destination: destination.to_string(),
            requester: requester.to_string(),
            left: true,
        })
    }

    /// queue.position.v1
    pub async fn position(&self, params: PositionRequest) -> RpcResult<QueueStatus> {
        let destination = self.known_destination(&params.destination).await?;
        let requester = parse_requester(&params.requester)?;

        self.services
            .resolver
            .status(&destination, &requester)
            .await
            .map_err(to_rpc_error)
    }

    /// queue.snapshot.v1
    pub async fn snapshot(&self, params: SnapshotRequest) -> RpcResult<SnapshotResponse> {
        let destination = self.known_destination(&params.destination).await?;
        let snapshot = self
            .services
            .resolver
            .snapshot(&destination)
            .await
            .map_err(to_rpc_error)?;

        Ok(SnapshotResponse {
            destination: destination.to_string(),
            total_waiting: total_waiting(&snapshot),
            parties: positions(&snapshot)
                .map(|(member, position)| SnapshotEntry {
                    party: PartyInfo::from(member),
                    position,
                })
                .collect(),
        })
    }

    /// feedback.submit.v1
    pub async fn submit_feedback(&self, params: FeedbackRequest) -> RpcResult<FeedbackEntry> {
        self.throttle()?;

        let destination = DestinationId::from_name(&params.destination);
        let requester = parse_requester(&params.requester)?;
        let feedback = self
            .services
            .feedback
            .submit(&destination, &requester, params.rating, &params.comment)
            .await
            .map_err(to_rpc_error)?;

        Ok(feedback.into())
    }

    /// feedback.list.v1
    pub async fn list_feedback(
        &self,
        params: FeedbackListRequest,
    ) -> RpcResult<FeedbackListResponse> {
        let destination = self.known_destination(&params.destination).await?;
        let feedback: Vec<FeedbackEntry> = self
            .services
            .feedback
            .list(&destination, params.limit)
            .await
            .map_err(to_rpc_error)?
            .into_iter()
            .map(FeedbackEntry::from)
            .collect();

        let average_rating = if feedback.is_empty() {
            None
        } else {
            let sum: u32 = feedback.iter().map(|f| u32::from(f.rating)).sum();
            Some(f64::from(sum) / feedback.len() as f64)
        };

        Ok(FeedbackListResponse {
            destination: destination.to_string(),
            average_rating,
            feedback,
        })
    }

    /// admin.stats.v1
    pub async fn stats(&self, _params: StatsRequest) -> RpcResult<StatsResponse> {
        let destinations = self
            .services
            .registry
            .find("")
            .await
            .map_err(to_rpc_error)?;
        let active = self
            .services
            .resolver
            .active_destinations()
            .await
            .map_err(to_rpc_error)?;

        let mut waiting_parties = 0;
        let mut waiting_people = 0;
        for destination in &active {
            let snapshot = self
                .services
                .resolver
                .snapshot(destination)
                .await
                .map_err(to_rpc_error)?;
            waiting_parties += snapshot.len();
            waiting_people += total_waiting(&snapshot);
        }

        Ok(StatsResponse {
            destinations: destinations.len(),
            active_lines: active.len(),
            waiting_parties,
            waiting_people,
            served_today: destinations.iter().map(|d| d.day_count).sum(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }

    /// Resolve a name to a registered destination, UnknownDestination otherwise
    async fn known_destination(&self, name: &str) -> RpcResult<DestinationId> {
        self.services
            .registry
            .get(name)
            .await
            .map(|destination| destination.id)
            .map_err(to_rpc_error)
    }
}

fn parse_requester(id: &str) -> RpcResult<RequesterId> {
    RequesterId::parse(id).map_err(|e| to_rpc_error(e.into()))
}
