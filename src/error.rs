//! Precondition failures surfaced by participant queries.

use serde::Serialize;
use thiserror::Error;

/// Result type for participant queries
pub type Result<T> = std::result::Result<T, ParticipantsError>;

/// Errors are returned as values and serialize to `{ "error": CODE, ...context }`.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantsError {
    /// No competition snapshot was supplied
    #[error("MISSING_TOURNAMENT_RECORD")]
    MissingTournamentRecord,

    /// The snapshot carries no participant list
    #[error("MISSING_PARTICIPANTS")]
    MissingParticipants,

    /// A targeted lookup was made without an id
    #[error("MISSING_PARTICIPANT_ID")]
    MissingParticipantId,

    /// A targeted lookup named an id absent from the snapshot
    #[error("PARTICIPANT_NOT_FOUND: {participant_id}")]
    ParticipantNotFound {
        #[serde(rename = "participantId")]
        participant_id: String,
    },

    /// A filter specification was not an object
    #[error("INVALID_OBJECT: {context}")]
    InvalidObject { context: String },
}

impl ParticipantsError {
    pub fn code(&self) -> &'static str {
        match self {
            ParticipantsError::MissingTournamentRecord => "MISSING_TOURNAMENT_RECORD",
            ParticipantsError::MissingParticipants => "MISSING_PARTICIPANTS",
            ParticipantsError::MissingParticipantId => "MISSING_PARTICIPANT_ID",
            ParticipantsError::ParticipantNotFound { .. } => "PARTICIPANT_NOT_FOUND",
            ParticipantsError::InvalidObject { .. } => "INVALID_OBJECT",
        }
    }

    /// Lookup failures map to 404, everything else is a bad request.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ParticipantsError::ParticipantNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_serializes_with_context() {
        let err = ParticipantsError::ParticipantNotFound {
            participant_id: "P9".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "error": "PARTICIPANT_NOT_FOUND", "participantId": "P9" })
        );
        assert_eq!(err.code(), "PARTICIPANT_NOT_FOUND");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unit_error_serializes_code_only() {
        let err = ParticipantsError::MissingParticipants;
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "error": "MISSING_PARTICIPANTS" })
        );
        assert_eq!(err.to_string(), err.code());
    }
}
