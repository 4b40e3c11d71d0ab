pub mod commands;
pub mod error;
pub mod export;
pub mod filter;
pub mod flatten;
pub mod model;
pub mod paginator;
pub mod replay;
pub mod source;

pub use commands::{cmd_export, cmd_save, ExportRequest, SaveOutcome};
pub use error::{ExportError, Result};
pub use export::ExportFormat;
pub use filter::{build_filter, FilterSource, LogScope};
pub use flatten::{flatten, FlattenOptions, Flattened};
pub use model::{Cursor, ExportRow, LogPage, RawLogEntry};
pub use paginator::{fetch_all, PageOptions};
pub use replay::{parse_script, run_script, ReplayMetadata, ReplayTurn, ScriptedConversation};
pub use source::{LogSource, Messenger};
