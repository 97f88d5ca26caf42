//! Cortex memory store engine.
//!
//! A local, hierarchical memory store for autonomous agents: plain text
//! memory documents with structured front-matter, organized into
//! categories inside named stores. This crate is the shared engine
//! behind the Cortex CLI and tool server: the multi-store registry,
//! category hierarchy with policy inheritance, the memory document
//! lifecycle, per-category derived indexes, the storage adapter port,
//! and the typed client surface.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod ops;
pub mod policy;
pub mod storage;
pub mod tokens;
pub mod types;

// Re-export the surface most callers need.
pub use client::{CategoryClient, Cortex, CortexOptions, MemoryClient, StoreClient};
pub use config::{
    default_data_dir, parse_registry, render_registry, starter_registry, CategoryConfig,
    CategoryMode, PermissionsConfig, PolicyConfig, Registry, StoreData, StoreDefinition,
    DEFAULT_STORE_NAME, FILESYSTEM_KIND,
};
pub use error::{DomainError, ErrorCategory, ErrorCode, StorageError};
pub use index::{CategoryIndex, CategoryMemoryEntry, SubcategoryEntry};
pub use policy::{EffectivePolicy, Permissions};
pub use storage::{AdapterFactory, DefaultAdapterFactory, StorageAdapter};
pub use tokens::{create_estimator, HeuristicEstimator, TokenEstimator};
pub use types::{
    CategoryPath, CreateCategoryResult, CreateMemoryInput, GetMemoryOptions,
    ListMemoriesOptions, Memory, MemoryMetadata, MemoryPath, MemorySource, PruneOptions,
    PruneResult, RecentMemory, RecentOptions, ReindexResult, Slug, Update, UpdateMemoryInput,
};
