use std::sync::Arc;

use crate::ledger::LedgerService;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        Self { ledger }
    }
}
