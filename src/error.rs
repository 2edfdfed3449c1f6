use std::fmt;
use thiserror::Error;

/// What kind of entity a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Indicator,
    Group,
    WeightIndicator,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Indicator => write!(f, "indicator"),
            Entity::Group => write!(f, "group"),
            Entity::WeightIndicator => write!(f, "weight indicator"),
        }
    }
}

/// Domain errors raised by the catalog, the membership registry and the engine.
///
/// An empty series is never an error: callers should treat `NotFound` as an
/// invalid request and an empty payload as "no data available".
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("unknown {kind} '{id}'")]
    NotFound { kind: Entity, id: String },

    #[error("at least one group id required")]
    EmptyQuery,

    #[error("invalid indicator catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid group '{group}': {reason}")]
    InvalidGroup { group: String, reason: String },
}

impl Error {
    pub(crate) fn not_found(kind: Entity, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for unknown indicator, group or weight reference.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
