//! Application composition.

use std::sync::Arc;

use crate::infrastructure::capability::CapabilityRouter;
use crate::infrastructure::ports::{
    AssetQueuePort, ClockPort, CreditLedgerPort, EntityRepo,
};
use crate::infrastructure::progress::ProgressChannel;
use crate::use_cases::generation::{RunPipeline, StartGeneration};
use crate::use_cases::sessions::SessionStore;

/// All use cases, grouped for the API layer.
pub struct UseCases {
    pub start_generation: Arc<StartGeneration>,
}

/// The composed application: shared state for every handler.
pub struct App {
    pub use_cases: UseCases,
    pub sessions: Arc<SessionStore>,
    pub ledger: Arc<dyn CreditLedgerPort>,
    /// Concrete (not the port) because the WebSocket layer needs `join`.
    pub progress: Arc<ProgressChannel>,
}

impl App {
    pub fn new(
        router: Arc<CapabilityRouter>,
        ledger: Arc<dyn CreditLedgerPort>,
        repo: Arc<dyn EntityRepo>,
        queue: Arc<dyn AssetQueuePort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let progress = Arc::new(ProgressChannel::new());

        let pipeline = Arc::new(RunPipeline::new(
            router,
            ledger.clone(),
            repo,
            queue,
            progress.clone(),
            sessions.clone(),
        ));
        let start_generation = Arc::new(StartGeneration::new(
            pipeline,
            ledger.clone(),
            sessions.clone(),
            progress.clone(),
            clock,
        ));

        Self {
            use_cases: UseCases { start_generation },
            sessions,
            ledger,
            progress,
        }
    }
}
