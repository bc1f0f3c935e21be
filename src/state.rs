use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::firestore::{FirestoreClient, RestFirestoreClient};
use crate::gcp::ServiceAccountTokens;
use crate::identity::{IdentityClient, RestIdentityClient};
use crate::services::ProfileService;

/// Shared handler state: the two external collaborators plus the services
/// that keep per-instance state (the profile cache). Coordinators without
/// state of their own are constructed per request from the clients.
#[derive(Clone)]
pub struct AppState {
    pub firestore: Arc<dyn FirestoreClient>,
    pub identity: Arc<dyn IdentityClient>,
    pub profiles: Arc<ProfileService>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let tokens = Arc::new(ServiceAccountTokens::from_config(&config.gcp));
        let firestore: Arc<dyn FirestoreClient> =
            Arc::new(RestFirestoreClient::new(&config.gcp, tokens.clone()));
        let identity: Arc<dyn IdentityClient> =
            Arc::new(RestIdentityClient::new(&config.gcp, tokens));
        let profiles = Arc::new(ProfileService::new(
            identity.clone(),
            Duration::from_secs(config.cache.profile_ttl_secs),
        ));
        Self {
            firestore,
            identity,
            profiles,
        }
    }

    /// Build state around explicit collaborators (used by tests).
    pub fn with_clients(
        firestore: Arc<dyn FirestoreClient>,
        identity: Arc<dyn IdentityClient>,
        profile_ttl: Duration,
    ) -> Self {
        let profiles = Arc::new(ProfileService::new(identity.clone(), profile_ttl));
        Self {
            firestore,
            identity,
            profiles,
        }
    }
}
