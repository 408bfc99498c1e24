//! Shared error type for the syncoll workspace.

use thiserror::Error;

/// Common result type for syncoll operations.
pub type SyncollResult<T> = Result<T, SyncollError>;

/// Unified error type shared by every syncoll crate.
#[derive(Error, Debug)]
pub enum SyncollError {
    #[error("input schema error in {context}: {message}")]
    InputSchema { context: String, message: String },

    #[error("failed to load structure file {path}: {message}")]
    StructureLoad { path: String, message: String },

    #[error("structure {structure_id} is ambiguous: {message}")]
    StructureAmbiguous {
        structure_id: String,
        message: String,
    },

    #[error("configuration is inconsistent: {message}")]
    ConfigInconsistent { message: String },

    #[error("tag decoding error for '{tag}': {message}")]
    TagDecode { tag: String, message: String },

    #[error("lookup backend failed: {message}")]
    LookupBackend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("store error: {context}")]
    Store {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("io error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SyncollError {
    pub fn input_schema<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Self::InputSchema {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn structure_load<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::StructureLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn structure_ambiguous<S: Into<String>, M: Into<String>>(structure_id: S, message: M) -> Self {
        Self::StructureAmbiguous {
            structure_id: structure_id.into(),
            message: message.into(),
        }
    }

    pub fn config_inconsistent<M: Into<String>>(message: M) -> Self {
        Self::ConfigInconsistent {
            message: message.into(),
        }
    }

    pub fn tag_decode<T: Into<String>, M: Into<String>>(tag: T, message: M) -> Self {
        Self::TagDecode {
            tag: tag.into(),
            message: message.into(),
        }
    }

    pub fn lookup_backend<M: Into<String>>(message: M) -> Self {
        Self::LookupBackend {
            message: message.into(),
            source: None,
        }
    }

    pub fn lookup_backend_with_source<M, E>(message: M, source: E) -> Self
    where
        M: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::LookupBackend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn store<C: Into<String>>(context: C) -> Self {
        Self::Store {
            context: context.into(),
            source: None,
        }
    }

    pub fn store_with_source<C, E>(context: C, source: E) -> Self
    where
        C: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io<O: Into<String>>(operation: O, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The single line a CLI should print on exit, naming the failed structure
    /// or file where possible (spec §7).
    pub fn user_facing_line(&self) -> String {
        format!("{self}")
    }
}
