use abuseguard_detection::Application;
use erp_core::{Config, MetricsRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub app: Arc<Application>,
    pub metrics: Arc<MetricsRegistry>,
}
