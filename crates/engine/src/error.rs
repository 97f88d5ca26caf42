//! Error types shared across the memory store engine.
//!
//! Every engine operation returns [`DomainError`] on failure. Each variant
//! carries a stable machine [`ErrorCode`] alongside a human message that
//! states what failed and what the caller can do about it. Adapter
//! implementations report [`StorageError`], which converts into the
//! matching `DomainError` code at the operation boundary.

use thiserror::Error;

/// Stable machine codes for every engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorCode {
    InvalidPath,
    InvalidSlug,
    InvalidArguments,
    InvalidStoreName,
    MemoryNotFound,
    CategoryNotFound,
    StoreNotFound,
    StoreNotInitialized,
    MemoryAlreadyExists,
    DestinationExists,
    StoreAlreadyExists,
    DuplicateStoreName,
    OperationNotPermitted,
    ContentTooLong,
    SubcategoryCreationNotAllowed,
    CategoryProtected,
    RootCategoryRejected,
    RootCategoryNotAllowed,
    DescriptionTooLong,
    StorageError,
    IndexUpdateFailed,
    ConfigReadFailed,
    ConfigWriteFailed,
    ParseFailed,
    SerializeFailed,
}

impl ErrorCode {
    /// Canonical SCREAMING_SNAKE form used in serialized errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidPath => "INVALID_PATH",
            ErrorCode::InvalidSlug => "INVALID_SLUG",
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::InvalidStoreName => "INVALID_STORE_NAME",
            ErrorCode::MemoryNotFound => "MEMORY_NOT_FOUND",
            ErrorCode::CategoryNotFound => "CATEGORY_NOT_FOUND",
            ErrorCode::StoreNotFound => "STORE_NOT_FOUND",
            ErrorCode::StoreNotInitialized => "STORE_NOT_INITIALIZED",
            ErrorCode::MemoryAlreadyExists => "MEMORY_ALREADY_EXISTS",
            ErrorCode::DestinationExists => "DESTINATION_EXISTS",
            ErrorCode::StoreAlreadyExists => "STORE_ALREADY_EXISTS",
            ErrorCode::DuplicateStoreName => "DUPLICATE_STORE_NAME",
            ErrorCode::OperationNotPermitted => "OPERATION_NOT_PERMITTED",
            ErrorCode::ContentTooLong => "CONTENT_TOO_LONG",
            ErrorCode::SubcategoryCreationNotAllowed => "SUBCATEGORY_CREATION_NOT_ALLOWED",
            ErrorCode::CategoryProtected => "CATEGORY_PROTECTED",
            ErrorCode::RootCategoryRejected => "ROOT_CATEGORY_REJECTED",
            ErrorCode::RootCategoryNotAllowed => "ROOT_CATEGORY_NOT_ALLOWED",
            ErrorCode::DescriptionTooLong => "DESCRIPTION_TOO_LONG",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::IndexUpdateFailed => "INDEX_UPDATE_FAILED",
            ErrorCode::ConfigReadFailed => "CONFIG_READ_FAILED",
            ErrorCode::ConfigWriteFailed => "CONFIG_WRITE_FAILED",
            ErrorCode::ParseFailed => "PARSE_FAILED",
            ErrorCode::SerializeFailed => "SERIALIZE_FAILED",
        }
    }

    /// The broad group a code belongs to, used by front-ends to pick exit
    /// codes and protocol error codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::InvalidPath
            | ErrorCode::InvalidSlug
            | ErrorCode::InvalidArguments
            | ErrorCode::InvalidStoreName => ErrorCategory::Input,
            ErrorCode::MemoryNotFound
            | ErrorCode::CategoryNotFound
            | ErrorCode::StoreNotFound
            | ErrorCode::StoreNotInitialized => ErrorCategory::NotFound,
            ErrorCode::MemoryAlreadyExists
            | ErrorCode::DestinationExists
            | ErrorCode::StoreAlreadyExists
            | ErrorCode::DuplicateStoreName => ErrorCategory::Conflict,
            ErrorCode::OperationNotPermitted
            | ErrorCode::ContentTooLong
            | ErrorCode::SubcategoryCreationNotAllowed
            | ErrorCode::CategoryProtected
            | ErrorCode::RootCategoryRejected
            | ErrorCode::RootCategoryNotAllowed
            | ErrorCode::DescriptionTooLong => ErrorCategory::Policy,
            ErrorCode::StorageError
            | ErrorCode::IndexUpdateFailed
            | ErrorCode::ConfigReadFailed
            | ErrorCode::ConfigWriteFailed => ErrorCategory::Storage,
            ErrorCode::ParseFailed | ErrorCode::SerializeFailed => ErrorCategory::Parse,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error groups, one per block of `ErrorCode`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Input,
    NotFound,
    Conflict,
    Policy,
    Storage,
    Parse,
}

/// Engine-level error returned by every domain operation and client method.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid path '{path}': {reason}. Paths are lowercase slugs separated by '/'.")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid slug '{slug}': {reason}. Slugs are lowercase letters, digits, and single hyphens.")]
    InvalidSlug { slug: String, reason: String },

    #[error("Invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("Invalid store name '{name}': {reason}. Store names are lowercase slugs.")]
    InvalidStoreName { name: String, reason: String },

    #[error("No memory exists at '{path}' in store '{store}'. Check the path or create the memory first.")]
    MemoryNotFound { path: String, store: String },

    #[error("No category exists at '{path}' in store '{store}'. Create it first or check the path.")]
    CategoryNotFound { path: String, store: String },

    #[error("No store named '{name}' is registered. Add it to the registry or check the name.")]
    StoreNotFound { name: String },

    #[error("Store '{name}' has not been initialized. Run initialize before using it.")]
    StoreNotInitialized { name: String },

    #[error("A memory already exists at '{path}' in store '{store}'. Use update to change it or pick another path.")]
    MemoryAlreadyExists { path: String, store: String },

    #[error("The destination '{path}' already exists in store '{store}'. Remove it first or pick another destination.")]
    DestinationExists { path: String, store: String },

    #[error("Store '{name}' already exists. Remove it first or pick another name.")]
    StoreAlreadyExists { name: String },

    #[error("A store named '{name}' is already registered. Pick another name.")]
    DuplicateStoreName { name: String },

    #[error("The {operation} operation is not permitted in category '/{category}'. Adjust the category's policies to allow it.")]
    OperationNotPermitted { operation: String, category: String },

    #[error("Memory content is {length} characters, exceeding the maximum length of {limit} characters for category '/{category}'. Reduce the content or split it into multiple memories.")]
    ContentTooLong {
        length: usize,
        limit: usize,
        category: String,
    },

    #[error("Creating subcategories under '/{category}' is not allowed. Enable subcategory_creation in the category's policies.")]
    SubcategoryCreationNotAllowed { category: String },

    #[error("Category '/{category}' is declared in the store configuration and is protected. Change the configuration to modify or delete it.")]
    CategoryProtected { category: String },

    #[error("The root category cannot be {operation}. Target a named category instead.")]
    RootCategoryRejected { operation: String },

    #[error("New root categories are not allowed in this store; '/{category}' is not declared. Create a subcategory under a declared root or declare it in the configuration.")]
    RootCategoryNotAllowed { category: String },

    #[error("Description is {length} characters, exceeding the maximum of {limit}. Shorten the description.")]
    DescriptionTooLong { length: usize, limit: usize },

    #[error("Storage operation failed: {reason}. Retry, or check the data directory.")]
    Storage { reason: String },

    #[error("Index update failed for category '/{category}': {reason}. Run reindex to repair the index.")]
    IndexUpdateFailed { category: String, reason: String },

    #[error("Failed to read configuration: {reason}. Check that the data directory and config.yaml exist and are readable.")]
    ConfigReadFailed { reason: String },

    #[error("Failed to write configuration: {reason}. Check permissions on the data directory.")]
    ConfigWriteFailed { reason: String },

    #[error("Failed to parse document '{path}': {reason}. Repair the file or remove it and recreate the memory.")]
    ParseFailed { path: String, reason: String },

    #[error("Failed to serialize document: {reason}")]
    SerializeFailed { reason: String },
}

impl DomainError {
    /// The stable machine code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::InvalidPath { .. } => ErrorCode::InvalidPath,
            DomainError::InvalidSlug { .. } => ErrorCode::InvalidSlug,
            DomainError::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            DomainError::InvalidStoreName { .. } => ErrorCode::InvalidStoreName,
            DomainError::MemoryNotFound { .. } => ErrorCode::MemoryNotFound,
            DomainError::CategoryNotFound { .. } => ErrorCode::CategoryNotFound,
            DomainError::StoreNotFound { .. } => ErrorCode::StoreNotFound,
            DomainError::StoreNotInitialized { .. } => ErrorCode::StoreNotInitialized,
            DomainError::MemoryAlreadyExists { .. } => ErrorCode::MemoryAlreadyExists,
            DomainError::DestinationExists { .. } => ErrorCode::DestinationExists,
            DomainError::StoreAlreadyExists { .. } => ErrorCode::StoreAlreadyExists,
            DomainError::DuplicateStoreName { .. } => ErrorCode::DuplicateStoreName,
            DomainError::OperationNotPermitted { .. } => ErrorCode::OperationNotPermitted,
            DomainError::ContentTooLong { .. } => ErrorCode::ContentTooLong,
            DomainError::SubcategoryCreationNotAllowed { .. } => {
                ErrorCode::SubcategoryCreationNotAllowed
            }
            DomainError::CategoryProtected { .. } => ErrorCode::CategoryProtected,
            DomainError::RootCategoryRejected { .. } => ErrorCode::RootCategoryRejected,
            DomainError::RootCategoryNotAllowed { .. } => ErrorCode::RootCategoryNotAllowed,
            DomainError::DescriptionTooLong { .. } => ErrorCode::DescriptionTooLong,
            DomainError::Storage { .. } => ErrorCode::StorageError,
            DomainError::IndexUpdateFailed { .. } => ErrorCode::IndexUpdateFailed,
            DomainError::ConfigReadFailed { .. } => ErrorCode::ConfigReadFailed,
            DomainError::ConfigWriteFailed { .. } => ErrorCode::ConfigWriteFailed,
            DomainError::ParseFailed { .. } => ErrorCode::ParseFailed,
            DomainError::SerializeFailed { .. } => ErrorCode::SerializeFailed,
        }
    }

    /// The error's broad group.
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

/// Adapter-level error. Capability implementations return this; the engine
/// converts it into the matching [`DomainError`] code at the operation
/// boundary.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("I/O error: {reason}")]
    Io { reason: String },

    #[error("Failed to parse '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialize { reason: String },

    #[error("Timed out acquiring the index lock for '/{category}'")]
    LockTimeout { category: String },

    #[error("Failed to read configuration: {reason}")]
    ConfigRead { reason: String },

    #[error("Failed to write configuration: {reason}")]
    ConfigWrite { reason: String },
}

impl StorageError {
    pub fn io(err: impl std::fmt::Display) -> Self {
        StorageError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io { reason } => DomainError::Storage { reason },
            StorageError::Parse { path, reason } => DomainError::ParseFailed { path, reason },
            StorageError::Serialize { reason } => DomainError::SerializeFailed { reason },
            StorageError::LockTimeout { category } => DomainError::IndexUpdateFailed {
                category,
                reason: "lock acquisition timed out".to_string(),
            },
            StorageError::ConfigRead { reason } => DomainError::ConfigReadFailed { reason },
            StorageError::ConfigWrite { reason } => DomainError::ConfigWriteFailed { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_display() {
        assert_eq!(ErrorCode::MemoryNotFound.to_string(), "MEMORY_NOT_FOUND");
        assert_eq!(
            ErrorCode::SubcategoryCreationNotAllowed.to_string(),
            "SUBCATEGORY_CREATION_NOT_ALLOWED"
        );
    }

    #[test]
    fn categories_group_codes() {
        assert_eq!(ErrorCode::InvalidPath.category(), ErrorCategory::Input);
        assert_eq!(ErrorCode::MemoryNotFound.category(), ErrorCategory::NotFound);
        assert_eq!(
            ErrorCode::MemoryAlreadyExists.category(),
            ErrorCategory::Conflict
        );
        assert_eq!(ErrorCode::ContentTooLong.category(), ErrorCategory::Policy);
        assert_eq!(
            ErrorCode::IndexUpdateFailed.category(),
            ErrorCategory::Storage
        );
        assert_eq!(ErrorCode::ParseFailed.category(), ErrorCategory::Parse);
    }

    #[test]
    fn storage_error_maps_to_domain_codes() {
        let err: DomainError = StorageError::LockTimeout {
            category: "notes".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::IndexUpdateFailed);

        let err: DomainError = StorageError::ConfigRead {
            reason: "missing".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ConfigReadFailed);
    }

    #[test]
    fn messages_name_the_failure_and_the_remedy() {
        let err = DomainError::ContentTooLong {
            length: 6000,
            limit: 5000,
            category: "standup".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("6000"));
        assert!(msg.contains("5000"));
        assert!(msg.contains("/standup"));
        assert!(msg.contains("Reduce the content"));
    }
}
