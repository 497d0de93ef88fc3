

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod records;

pub use cache::{MemoStats, RecordMemo};
pub use config::NullspaceConfig;
pub use error::{NullspaceError, Result};
pub use pipeline::{BuildReport, ExperimentDetails, ExperimentPipeline, PlatformStats, Snapshot};
pub use records::{ExperimentRecord, RejectedRecord};
