//! Error types for catalog loading and pool operations.
use crate::InstanceId;
use core::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a catalog from its configuration source.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read pool catalog '{}'", path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid TOML or does not match the catalog layout.
    #[error("failed to parse pool catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A configuration problem found in a catalog.
///
/// Issues are diagnostics: the offending entry is excluded and the rest of the
/// catalog stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogIssue<K: Debug> {
    /// The kind was already declared by an earlier entry.
    #[error("duplicate pool object type {kind:?} in category '{category}'")]
    DuplicateKind {
        /// The repeated kind.
        kind: K,
        /// The category holding the repeated declaration.
        category: String,
    },

    /// The entry has no template to clone instances from.
    #[error("missing template for pool object type {kind:?} in category '{category}'")]
    MissingTemplate {
        /// The kind without a template.
        kind: K,
        /// The category holding the entry.
        category: String,
    },
}

impl<K: Debug> CatalogIssue<K> {
    /// The kind the issue is about.
    pub fn kind(&self) -> &K {
        match self {
            Self::DuplicateKind { kind, .. } | Self::MissingTemplate { kind, .. } => kind,
        }
    }
}

/// Result type for pool operations.
pub type PoolResult<T, K> = Result<T, PoolError<K>>;

/// Why an acquire or release did not happen.
///
/// None of these are fatal. [`PoolRegistry::acquire`] and
/// [`PoolRegistry::release`] log them and carry on.
///
/// [`PoolRegistry::acquire`]: crate::PoolRegistry::acquire
/// [`PoolRegistry::release`]: crate::PoolRegistry::release
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError<K: Debug> {
    /// No pool was built for the kind.
    #[error("no pool registered for type {kind:?}")]
    UnknownPool {
        /// The requested kind.
        kind: K,
    },

    /// The pool is empty and its entry does not allow growth.
    #[error("pool depleted for type {kind:?} and growth is not allowed")]
    Depleted {
        /// The exhausted kind.
        kind: K,
    },

    /// The acquired node lacks the requested component.
    #[error("instance {instance} of type {kind:?} has no {component} component")]
    MissingComponent {
        /// The acquired kind.
        kind: K,
        /// The instance that was acquired and handed back.
        instance: InstanceId,
        /// Type name of the missing component.
        component: &'static str,
    },

    /// The instance is already in its pool, or was dropped from it.
    #[error("instance {instance} of type {kind:?} is not acquired")]
    NotAcquired {
        /// The instance's kind.
        kind: K,
        /// The instance.
        instance: InstanceId,
    },

    /// The lease was released before and the instance has been acquired
    /// again since.
    #[error("lease on instance {instance} of type {kind:?} is no longer current")]
    StaleLease {
        /// The instance's kind.
        kind: K,
        /// The instance.
        instance: InstanceId,
    },

    /// The instance was pushed to the pool of another kind.
    #[error("instance {instance} of type {actual:?} pushed to the pool of type {expected:?}")]
    WrongPool {
        /// The kind named by the caller.
        expected: K,
        /// The kind the instance belongs to.
        actual: K,
        /// The instance.
        instance: InstanceId,
    },

    /// An auto-release was requested outside of a tokio runtime.
    #[error("auto-release for type {kind:?} requires a running tokio runtime")]
    NoRuntime {
        /// The requested kind.
        kind: K,
    },
}

impl<K: Debug> PoolError<K> {
    /// The kind named by the failed operation.
    pub fn kind(&self) -> &K {
        match self {
            Self::UnknownPool { kind }
            | Self::Depleted { kind }
            | Self::MissingComponent { kind, .. }
            | Self::NotAcquired { kind, .. }
            | Self::StaleLease { kind, .. }
            | Self::NoRuntime { kind } => kind,
            Self::WrongPool { expected, .. } => expected,
        }
    }

    /// Whether the error points at a caller bug rather than an expected
    /// runtime condition such as an exhausted pool.
    pub fn is_misuse(&self) -> bool {
        !matches!(self, Self::Depleted { .. } | Self::MissingComponent { .. })
    }

    /// Emits the error as a tracing event at the severity it warrants.
    pub fn log(&self) {
        match self {
            Self::NoRuntime { .. } => tracing::error!(kind = ?self.kind(), "{self}"),
            _ => tracing::warn!(kind = ?self.kind(), "{self}"),
        }
    }

    /// Like [`Self::log`], for errors returned by a release. Pushing to a kind
    /// without a pool is logged as an error there.
    pub fn log_release(&self) {
        match self {
            Self::UnknownPool { kind } => {
                tracing::error!(kind = ?kind, "attempting to push object to non-existent pool");
            }
            _ => self.log(),
        }
    }
}
