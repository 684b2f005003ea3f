// Identity Service - stable requester id and the single active selection

use crate::domain::{LocalIdentity, PartySize, RequesterId};
use crate::error::Result;
use crate::port::{IdProvider, IdentityCache};
use std::sync::Arc;
use tracing::info;

pub struct IdentityService {
    cache: Arc<dyn IdentityCache>,
    id_provider: Arc<dyn IdProvider>,
}

impl IdentityService {
    pub fn new(cache: Arc<dyn IdentityCache>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self { cache, id_provider }
    }

    /// Load the cached identity, creating and persisting one on first use
    pub async fn ensure_identity(&self) -> Result<LocalIdentity> {
        if let Some(identity) = self.cache.load().await? {
            return Ok(identity);
        }

        let identity = LocalIdentity::new(RequesterId::new(self.id_provider.generate_id()));
        self.cache.store(&identity).await?;
        info!(requester = %identity.requester_id, "Generated new requester identity");
        Ok(identity)
    }

    /// Replace the active selection; at most one is ever kept
    pub async fn select_destination(
        &self,
        destination: &str,
        party_size: i64,
    ) -> Result<LocalIdentity> {
        let party_size = PartySize::new(party_size)?;
        let mut identity = self.ensure_identity().await?;
        identity.select(destination.trim(), party_size);
        self.cache.store(&identity).await?;
        Ok(identity)
    }

    pub async fn clear_selection(&self) -> Result<LocalIdentity> {
        let mut identity = self.ensure_identity().await?;
        identity.clear_selection();
        self.cache.store(&identity).await?;
        Ok(identity)
    }
}
