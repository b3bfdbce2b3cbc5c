//! # Store Error Types
//!
//! Errors returned by object-store operations, classified the way reconciliation needs to
//! react to them (absent object, lost optimistic-concurrency race, rejected mutation).

use super::ObjectKey;
use thiserror::Error;

/// Object-store error with classification
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed object does not exist (HTTP 404)
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: ObjectKey },

    /// The write lost an optimistic-concurrency race or the object already exists (HTTP 409)
    #[error("conflict writing {kind} {key}: {message}")]
    Conflict {
        kind: String,
        key: ObjectKey,
        message: String,
    },

    /// The platform refused the write (HTTP 403), e.g. an illegal change to a bound claim
    #[error("forbidden writing {kind} {key}: {message}")]
    Forbidden {
        kind: String,
        key: ObjectKey,
        message: String,
    },

    /// The object failed server-side validation (HTTP 422)
    #[error("invalid {kind} {key}: {message}")]
    Invalid {
        kind: String,
        key: ObjectKey,
        message: String,
    },

    /// The store is temporarily unable to serve the request (HTTP 429 / 5xx)
    #[error("store unavailable for {kind} {key}: {message}")]
    Unavailable {
        kind: String,
        key: ObjectKey,
        message: String,
    },

    /// Any other Kubernetes client failure (transport, TLS, decoding)
    #[error("kubernetes client error for {kind} {key}: {source}")]
    Kube {
        kind: String,
        key: ObjectKey,
        #[source]
        source: kube::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The object handed to the store has no name or namespace
    #[error("{kind} object has no name or namespace")]
    MissingIdentity { kind: String },

    /// A mutate function renamed or moved the object it was given
    #[error("mutate function changed object identity from {before} to {after}")]
    IdentityChanged { before: ObjectKey, after: ObjectKey },

    /// The object is already controlled by a different owner
    #[error("{kind} {key} is already controlled by {owner_kind} {owner_name}")]
    AlreadyOwned {
        kind: String,
        key: ObjectKey,
        owner_kind: String,
        owner_name: String,
    },

    /// The owner has no uid yet, so no owner reference can point at it
    #[error("owner {kind} {key} has no uid")]
    OwnerWithoutUid { kind: String, key: ObjectKey },
}

impl StoreError {
    /// Classify a kube client error by HTTP status code
    pub fn from_kube(kind: &str, key: &ObjectKey, error: kube::Error) -> Self {
        let kind = kind.to_string();
        let key = key.clone();
        let response = match &error {
            kube::Error::Api(response) => Some((response.code, response.message.clone())),
            _ => None,
        };
        match response {
            Some((404, _)) => StoreError::NotFound { kind, key },
            Some((409, message)) => StoreError::Conflict { kind, key, message },
            Some((403, message)) => StoreError::Forbidden { kind, key, message },
            Some((422, message)) => StoreError::Invalid { kind, key, message },
            Some((429 | 500..=599, message)) => StoreError::Unavailable { kind, key, message },
            _ => StoreError::Kube {
                kind,
                key,
                source: error,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, StoreError::Forbidden { .. })
    }

    /// Short label for metrics and structured logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Conflict { .. } => "conflict",
            StoreError::Forbidden { .. } => "forbidden",
            StoreError::Invalid { .. } => "invalid",
            StoreError::Unavailable { .. } => "unavailable",
            StoreError::Kube { .. } => "kube",
            StoreError::Serialization(_) => "serialization",
            StoreError::MissingIdentity { .. } => "missing_identity",
            StoreError::IdentityChanged { .. } => "identity_changed",
            StoreError::AlreadyOwned { .. } => "already_owned",
            StoreError::OwnerWithoutUid { .. } => "owner_without_uid",
        }
    }
}
