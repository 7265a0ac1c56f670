//! laymux-core: terminal layout model, persistence and grouping.
//!
//! Holds the versioned layout document, the repository over a key-value
//! store, the group partitioner and the host-agnostic replay engine.
//! No subprocesses here; the tmux boundary lives in `laymux-tmux`.

pub mod config;
pub mod error;
pub mod host;
pub mod migrate;
pub mod partition;
pub mod prompt;
pub mod replay;
pub mod repository;
pub mod resolve;
pub mod store;
pub mod types;

pub use config::{Config, ConfigError, SettleConfig};
pub use error::{LayoutError, StorageError};
pub use host::{CreateTerminal, TerminalHandle, TerminalHost};
pub use migrate::{LayoutDocument, RecordShape, STORAGE_VERSION};
pub use partition::{
    AfterGroup, EmptySelection, GroupingOperator, GroupingStrategy, PromptGrouping, partition,
};
pub use prompt::{InputRequest, Prompt, Prompter};
pub use replay::{ApplyOptions, ApplyReport, ReplayError, SettlePolicy, apply_layout};
pub use repository::LayoutRepository;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use types::{LayoutPatch, TerminalGroup, TerminalLayout, TerminalSpec, new_layout_id};
