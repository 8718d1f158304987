use std::sync::Arc;

use crate::services::providers::MetadataResolver;
use crate::services::{ConversationService, RecommendationAggregator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationService>,
    pub aggregator: Arc<RecommendationAggregator>,
    pub resolver: Arc<dyn MetadataResolver>,
}
