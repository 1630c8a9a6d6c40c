//! Error types for roadgraph.

/// Alias for Results returning [`RoadGraphError`].
pub type Result<T> = std::result::Result<T, RoadGraphError>;

/// Top-level error type for the graph access layer.
#[derive(Debug, thiserror::Error)]
pub enum RoadGraphError {
    #[error("Graph store is not connected")]
    NotConnected,

    #[error("Connection error: graph store is already open")]
    AlreadyConnected,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Failed to decode property `{property}`: {reason}")]
    Decode { property: String, reason: String },

    #[error("Write conflict on {entity}: requested {requested}, store returned {returned}")]
    WriteConflict {
        entity: &'static str,
        requested: String,
        returned: String,
    },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RoadGraphError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn decode(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            property: property.into(),
            reason: reason.into(),
        }
    }

    pub fn write_conflict(
        entity: &'static str,
        requested: impl ToString,
        returned: impl ToString,
    ) -> Self {
        Self::WriteConflict {
            entity,
            requested: requested.to_string(),
            returned: returned.to_string(),
        }
    }

    /// `true` when the request addressed something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` when the store itself could not be reached; callers may retry.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::AlreadyConnected | Self::Connection(_)
        )
    }
}

impl From<neo4rs::Error> for RoadGraphError {
    fn from(err: neo4rs::Error) -> Self {
        Self::Driver(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_entity_and_key() {
        let err = RoadGraphError::not_found("intersection", 42);
        assert_eq!(err.to_string(), "intersection not found: 42");
        assert!(err.is_not_found());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn decode_error_names_the_property() {
        let err = RoadGraphError::decode("osmid", "missing required property");
        assert!(err.to_string().contains("`osmid`"));
    }

    #[test]
    fn connection_failures_are_unavailable() {
        assert!(RoadGraphError::NotConnected.is_unavailable());
        assert!(RoadGraphError::AlreadyConnected.is_unavailable());
        assert!(RoadGraphError::Connection("refused".into()).is_unavailable());
        assert!(!RoadGraphError::Driver("syntax".into()).is_unavailable());
    }

    #[test]
    fn write_conflict_reports_both_ids() {
        let err = RoadGraphError::write_conflict("street", 7, 8);
        let msg = err.to_string();
        assert!(msg.contains("requested 7"));
        assert!(msg.contains("returned 8"));
    }
}
