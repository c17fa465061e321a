//! `custrecon-engine`: customer master-data reconciliation engine.
//!
//! Pure engine crate: receives raw tables, returns per-check results and
//! report sheets. No CLI or file IO dependencies.

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod grouped;
pub mod mapping;
pub mod matcher;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod resolve;
pub mod table;

pub use config::{CheckConfig, CheckKind, LayoutKind, ReconConfig, SourceConfig};
pub use engine::run;
pub use error::ReconError;
pub use mapping::{FieldMapping, FieldPair};
pub use model::{CheckOutcome, CheckResult, CheckSummary, ReconInput, ReconResult};
pub use normalize::{normalize, HeaderLayout};
pub use report::{Report, Sheet};
pub use table::{RawTable, Table};
