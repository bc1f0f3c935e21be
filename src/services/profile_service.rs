//! Public profile lookup with an explicit TTL cache.
//!
//! The profile endpoint is public and hot, so results are cached per
//! deployment instance. Negative results are cached too - probing unknown
//! emails must not hammer the identity provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::identity::IdentityClient;
use crate::types::PublicProfile;

struct CacheEntry {
    stored_at: Instant,
    profile: Option<PublicProfile>,
}

pub struct ProfileService {
    identity: Arc<dyn IdentityClient>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ProfileService {
    pub fn new(identity: Arc<dyn IdentityClient>, ttl: Duration) -> Self {
        Self {
            identity,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Display name and photo for an account, by email.
    pub async fn lookup(&self, email: &str) -> Result<PublicProfile, ApiError> {
        if let Some(profile) = self.cached(email).await {
            return profile.ok_or_else(|| ApiError::not_found("User not found"));
        }

        let profile = self.identity.lookup_by_email(email).await?.map(|user| {
            PublicProfile {
                display_name: user.display_name,
                photo_url: user.photo_url,
            }
        });
        self.cache.lock().await.insert(
            email.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                profile: profile.clone(),
            },
        );

        profile.ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn cached(&self, email: &str) -> Option<Option<PublicProfile>> {
        let mut cache = self.cache.lock().await;
        match cache.get(email) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.profile.clone()),
            Some(_) => {
                cache.remove(email);
                None
            }
            None => None,
        }
    }
}
