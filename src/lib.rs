//! Manage collections of shortcut files: resolve, check, deduplicate, retarget and copy.

pub mod config;
pub mod copies;
pub mod duplicates;
pub mod error;
pub mod export;
pub mod fs;
pub mod links;
pub mod paths;
pub mod repository;
pub mod service;
pub mod size;
pub mod task;
pub mod types;

pub use config::{load_config, save_config, Config, CopyConfig, ShortcutConfig};
pub use error::{
    ConfigError, ExportError, ItemError, OperationError, ResolveError, ServiceError,
    ValidationError,
};
pub use export::{export_failures, export_records};
pub use fs::{Filesystem, OsFilesystem, TargetInfo};
pub use links::{ShortcutResolver, ShortcutWriter, SymlinkShortcuts};
pub use repository::ShortcutRepository;
pub use service::ShortcutService;
pub use size::{format_size, FileSize, SizeUnit};
pub use task::{CancelFlag, NoProgress, ProgressSink, Task};
pub use types::{
    Availability, DuplicateEntry, ExportFormat, FailedFile, ImportSummary, LastAction,
    LastOperation, Progress, RepositoryEvent, RepositorySnapshot, ShortcutRecord,
};
