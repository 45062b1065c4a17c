//! Shared handler state

use std::sync::Arc;

use crate::database::CollectionRepository;
use crate::gateway::EntityGateway;
use crate::ledger::LedgerClient;

/// What every route needs: the local collection table and the ledger gateway
#[derive(Clone)]
pub struct AppState {
    pub collections: CollectionRepository,
    pub gateway: EntityGateway,
}

impl AppState {
    pub fn new(collections: CollectionRepository, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            collections,
            gateway: EntityGateway::new(ledger),
        }
    }
}
