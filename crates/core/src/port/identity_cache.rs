// Local Device Cache Port
// Persists the requester identity and last selection across restarts

use crate::domain::LocalIdentity;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityCache: Send + Sync {
    /// Load the cached identity, None on first launch
    async fn load(&self) -> Result<Option<LocalIdentity>>;

    /// Replace the cached identity record
    async fn store(&self, identity: &LocalIdentity) -> Result<()>;

    /// Forget the identity entirely
    async fn clear(&self) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    #[derive(Default)]
    pub struct InMemoryIdentityCache {
        record: Mutex<Option<LocalIdentity>>,
    }

    #[async_trait]
    impl IdentityCache for InMemoryIdentityCache {
        async fn load(&self) -> Result<Option<LocalIdentity>> {
            Ok(self.record.lock().unwrap_or_else(PoisonError::into_inner).clone())
        }

        async fn store(&self, identity: &LocalIdentity) -> Result<()> {
            *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            *self.record.lock().unwrap_or_else(PoisonError::into_inner) = None;
            Ok(())
        }
    }
}
