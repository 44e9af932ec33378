pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::{read_rows, read_rows_from_path, HttpTransport};
pub use config::{FacilityRegistry, RelayConfig};
pub use crate::core::{
    dispatcher::{BatchDispatcher, DispatchSettings},
    orchestrator::UploadOrchestrator,
    transformer::{normalize, EventTransformer},
    validator::RowValidator,
};
pub use domain::model::{DispatchOutcome, Event, Row, UploadResult};
pub use utils::error::{RelayError, Result};
