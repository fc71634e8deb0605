use std::sync::Arc;

use crate::{
    application::{admission::AdmissionPipeline, coalescer::SettleBatchCoalescer},
    config::Config,
    infrastructure::{
        abuse::AbuseDetector, cache::TokenDeadlineCache, capacity::CapacityManager,
        chain::ChainClient, facilitator::FacilitatorClient, kv::KvPool,
        monitoring::MonitoringService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub kv: Arc<KvPool>,
    pub abuse: Arc<AbuseDetector>,
    pub capacity: Arc<CapacityManager>,
    pub deadline_cache: Arc<TokenDeadlineCache>,
    pub chain: Arc<dyn ChainClient>,
    pub facilitator: Arc<dyn FacilitatorClient>,
    pub coalescer: Arc<SettleBatchCoalescer>,
    pub admission: Arc<AdmissionPipeline>,
    pub monitoring: Arc<MonitoringService>,
}
