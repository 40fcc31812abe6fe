use axum::extract::FromRef;

use super::ServerConfig;
use crate::recommend::RecommendService;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedRecommendService = Arc<RecommendService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub recommend: GuardedRecommendService,
}

impl ServerState {
    pub fn new(config: ServerConfig, recommend: GuardedRecommendService) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            recommend,
        }
    }
}

impl FromRef<ServerState> for GuardedRecommendService {
    fn from_ref(input: &ServerState) -> Self {
        input.recommend.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
