use thiserror::Error;

/// Errors raised while resolving a Doge configuration.
///
/// Every variant names the offending field (or the topology rule) so the
/// input can be fixed without looking at the resolver internals.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "unknown rope_type '{0}' (expected one of: default, linear, dynamic, yarn, longrope, llama3)"
    )]
    UnknownRopeType(String),

    #[error("invalid rope_scaling field '{field}': {reason}")]
    InvalidRopeScaling { field: String, reason: String },

    #[error("invalid layer topology: {0}")]
    InvalidTopology(String),

    #[error("invalid model dimension '{field}': {reason}")]
    InvalidDimensions { field: String, reason: String },

    #[error("invalid expert retrieval field '{field}': {reason}")]
    InvalidExpertRetrieval { field: String, reason: String },

    #[error("model_type '{0}' is not 'doge'")]
    ModelTypeMismatch(String),

    #[error("malformed config document: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn rope(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRopeScaling {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn dims(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn experts(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidExpertRetrieval {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// The field this error points at, when it points at a single one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidRopeScaling { field, .. }
            | Self::InvalidDimensions { field, .. }
            | Self::InvalidExpertRetrieval { field, .. } => Some(field.as_str()),
            Self::UnknownRopeType(_) => Some("rope_type"),
            Self::ModelTypeMismatch(_) => Some("model_type"),
            Self::InvalidTopology(_) | Self::Json(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
