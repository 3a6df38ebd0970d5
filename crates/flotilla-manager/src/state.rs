use std::sync::Arc;

use flotilla_composer::Composer;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<Composer>,
    pub metrics: Arc<Metrics>,
}
