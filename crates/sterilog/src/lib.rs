pub mod app;
pub mod config;
pub mod db;
pub mod decoder;
pub mod discovery;
pub mod error;
pub mod import;
pub mod lifecycle;
pub mod report;
pub mod sanitize;
pub mod storage;
pub mod telemetry;
pub mod validation;

pub use app::Sterilog;
pub use config::{load_config, Config};
pub use db::Database;
pub use decoder::{decode_report, DecodedReport};
pub use discovery::{FileOutcome, SourceDiscovery, VolumeScanResult};
pub use error::{
    ConfigError, DecodeError, DiscoveryError, Result, StorageError, SterilogError,
    TelemetryError,
};
pub use import::{ImportError, ImportOutcome, ImportOrchestrator};
pub use lifecycle::{
    ApprovalResult, ClientRef, CycleFieldUpdate, CycleLifecycle, CycleStatus, CycleType,
    LifecycleError, LogAction,
};
pub use report::{GeneratedReport, PdfReportGenerator, ReportGenerator};
pub use validation::{validate, Program, Strictness, ThresholdInput, ValidationReport, Violation};
