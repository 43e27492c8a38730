// Banco de Alimentos - Core Library
// Beneficiary registry: entities, SQLite persistence, controller, HTTP API

pub mod config;
pub mod context;
pub mod controller;
pub mod db;
pub mod entities;
pub mod error;
pub mod import;
pub mod logging;
pub mod validation;

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::{AppDbContext, Database, SavedChanges};
pub use controller::{ActionResult, BeneficiarioController};
pub use db::Event;
pub use entities::{Beneficiario, Situacao, TipoCesta};
pub use error::DbError;
pub use import::{import_beneficiarios, load_csv, ImportSummary};
pub use logging::init_tracing;
pub use validation::{validate_beneficiario, ValidationError};

#[cfg(feature = "server")]
pub use server::{create_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
