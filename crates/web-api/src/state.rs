use std::sync::Arc;

use application::{ChatCoordinator, IdentityVerifier, StatsService, TokenIssuer, UserService};
use config::RealtimeConfig;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub stats_service: Arc<StatsService>,
    pub coordinator: Arc<ChatCoordinator>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub token_issuer: Arc<dyn TokenIssuer>,
    pub realtime: RealtimeConfig,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        stats_service: Arc<StatsService>,
        coordinator: Arc<ChatCoordinator>,
        verifier: Arc<dyn IdentityVerifier>,
        token_issuer: Arc<dyn TokenIssuer>,
        realtime: RealtimeConfig,
    ) -> Self {
        Self {
            user_service,
            stats_service,
            coordinator,
            verifier,
            token_issuer,
            realtime,
        }
    }
}
