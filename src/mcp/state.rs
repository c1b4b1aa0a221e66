use std::sync::Arc;

use crate::shared::config::GatewayConfig;
use crate::shared::exotel::ExotelClient;
use crate::shared::models::AppState;

#[derive(Clone)]
pub struct McpState {
    pub exotel: Arc<ExotelClient>,
}

impl McpState {
    pub fn new(app: Arc<AppState>, config: GatewayConfig) -> Self {
        Self {
            exotel: Arc::new(ExotelClient::new(app, config)),
        }
    }
}
