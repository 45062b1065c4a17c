//! Golem Studio - admin backend for a Golem Base ledger
//!
//! Browse, create, edit and delete ledger entities grouped into locally
//! tracked collections, and summarize them on a dashboard.
//!
//! ## Architecture
//! HTTP route -> EntityGateway -> LedgerClient (JSON-RPC or in-memory)
//! HTTP route -> CollectionRepository -> SQLite
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use golem_studio::{EntityGateway, EntityQuery, InMemoryLedger};
//!
//! # async fn demo() -> golem_studio::StudioResult<()> {
//! let gateway = EntityGateway::new(Arc::new(InMemoryLedger::new()));
//! let rows = gateway.query(&EntityQuery::collection("notes")).await?;
//! println!("{} notes", rows.len());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Environment configuration
pub mod config;

// Local collection table (SQLite)
pub mod database;

// Ledger client seam and its implementations
pub mod ledger;

// Entity write/read/update/delete marshalling
pub mod gateway;

// Dashboard summary
pub mod analytics;

// Demo data
pub mod seed;

// HTTP routes (when server feature is enabled)
#[cfg(feature = "server")]
pub mod api;

pub use analytics::{dashboard_summary, DashboardSummary};
pub use config::{LedgerConfig, StudioConfig};
pub use database::{Collection, CollectionRepository, DatabaseConfig, DatabaseManager};
pub use error::{ConfigError, LedgerError, StudioError, StudioResult};
pub use gateway::{EntityGateway, EntityQuery, EntityRow};
pub use ledger::{InMemoryLedger, LedgerClient, RpcLedgerClient};

#[cfg(feature = "server")]
pub use api::{build_router, AppState};
