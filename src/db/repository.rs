//! Row-level persistence for reports, extractions, insights, the
//! processing queue, engagement and user interests.
//!
//! Every function takes a borrowed `Connection`; callers decide whether a
//! connection is per-request or per-batch.

pub mod company;
pub mod engagement;
pub mod extraction;
pub mod feed;
pub mod insight;
pub mod preference;
pub mod queue;

pub use company::*;
pub use engagement::*;
pub use extraction::*;
pub use feed::*;
pub use insight::*;
pub use preference::*;
pub use queue::*;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::DatabaseError;

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::InvalidColumn {
        field: field.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_json<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(value).map_err(|e| DatabaseError::InvalidColumn {
        field: field.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn to_json<T: serde::Serialize>(field: &str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::InvalidColumn {
        field: field.into(),
        reason: e.to_string(),
    })
}
