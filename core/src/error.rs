use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("No active session")]
    NoSession,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures reported by a remote store client.
///
/// `NotFound` is kept apart from every other variant so the login protocol
/// can choose between creating a row and falling back to the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Profile '{identity}' not found")]
    NotFound { identity: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed remote row: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn not_found(identity: impl Into<String>) -> Self {
        Self::NotFound { identity: identity.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Map a non-success HTTP status onto the remote error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Permission(message),
            404 => Self::NotFound { identity: message },
            409 => Self::Conflict(message),
            408 | 425 | 429 | 500..=599 => Self::Connection(message),
            _ => Self::Api { status, message },
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Why a gameplay action was refused. A rejection leaves the profile
/// untouched; it is a normal outcome, not a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Not enough energy: have {have}, need {need}")]
    InsufficientResource { have: f64, need: f64 },

    #[error("Reward on cooldown for another {remaining_ms} ms")]
    CooldownActive { remaining_ms: i64 },

    #[error("Not enough score: have {have}, need {need}")]
    InsufficientScore { have: u64, need: u64 },

    #[error("Variant {0} is already owned")]
    AlreadyOwned(u32),

    #[error("Variant {0} is not owned")]
    NotOwned(u32),

    #[error("Unknown variant {0}")]
    UnknownVariant(u32),

    #[error("No bonus is currently armed")]
    NoBonusArmed,
}
