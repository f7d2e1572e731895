//! Application layer logic for dial-in.
//!
//! This crate provides configuration, persistence, the typed pattern API and
//! the planner service shared by the CLI and any other frontend.

pub mod config;
pub mod dataset;
pub mod error;
pub mod pattern_api;
pub mod pattern_cache;
pub mod record_patch;
pub mod service;
pub mod store;
pub mod window;

// Re-exports for convenience
pub use config::{ExpansionConfig, GenerationConfig, ProjectConfig, StorageConfig};
pub use dataset::{Dataset, Orphaned};
pub use error::{FailureKind, RecordKind, ServiceError};
pub use pattern_api::{
    DecodeRequest, DecodeResponse, EncodeRequest, EncodeResponse, ExpandRequest, ExpandResponse,
    Expansion, PatternApi, PatternFailure, PatternView, ValidateRequest, ValidateResponse,
};
pub use pattern_cache::PatternCache;
pub use record_patch::{
    CategoryUpdate, EventUpdate, FieldPatch, NewCategory, NewEvent, NewRule, NewTask, RuleUpdate,
    TaskUpdate,
};
pub use service::{Generated, PlannerService, ServiceResult};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError};
pub use window::{Window, WindowError, parse_timestamp};
