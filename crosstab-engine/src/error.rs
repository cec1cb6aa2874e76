//! FILENAME: crosstab-engine/src/error.rs

use thiserror::Error;

pub type CrosstabResult<T> = Result<T, CrosstabError>;

#[derive(Error, Debug)]
pub enum CrosstabError {
    #[error("Invalid dimension '{dimension}': {reason}")]
    InvalidDimension { dimension: String, reason: String },

    #[error("Dimension '{dimension}' has no items")]
    EmptyDimension { dimension: String },

    #[error("Dimensions '{first}' and '{second}' cannot be specified together")]
    MutuallyExclusiveDimensions { first: String, second: String },

    #[error("Dimension '{dimension}' cannot be specified as filter")]
    ForbiddenFilterDimension { dimension: String },

    #[error("Unsupported sort target '{target}': {reason}")]
    UnsupportedSortTarget { target: String, reason: String },

    #[error("Result set has no value header")]
    MissingValueHeader,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrosstabError {
    pub(crate) fn invalid_dimension(dimension: impl Into<String>, reason: impl Into<String>) -> Self {
        CrosstabError::InvalidDimension {
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported_sort(target: impl Into<String>, reason: impl Into<String>) -> Self {
        CrosstabError::UnsupportedSortTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
