use super::repository::{RepositoryError, RoomClaimError};

/// Error taxonomy shared by every housing command.
///
/// Each variant maps to a stable machine-readable [`code`](HousingError::code) so callers can
/// branch without parsing messages. Validation and state errors are raised before any write.
#[derive(Debug, thiserror::Error)]
pub enum HousingError {
    #[error("{entity} {id} cannot {operation} while {state}")]
    InvalidStateTransition {
        entity: &'static str,
        id: String,
        state: String,
        operation: &'static str,
    },
    #[error("room {room_id} is not available (currently {availability})")]
    RoomUnavailable {
        room_id: String,
        availability: &'static str,
    },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} {id} has already been completed")]
    AlreadyCompleted { entity: &'static str, id: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{role} is not the designated approver for {tier}")]
    UnauthorizedApprover {
        role: &'static str,
        tier: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HousingError {
    pub const fn code(&self) -> &'static str {
        match self {
            HousingError::InvalidStateTransition { .. } => "invalid_state_transition",
            HousingError::RoomUnavailable { .. } => "room_unavailable",
            HousingError::Validation(_) => "validation_error",
            HousingError::AlreadyCompleted { .. } => "already_completed",
            HousingError::NotFound { .. } => "not_found",
            HousingError::UnauthorizedApprover { .. } => "unauthorized_approver",
            HousingError::Repository(_) => "repository_unavailable",
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        HousingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<RoomClaimError> for HousingError {
    fn from(value: RoomClaimError) -> Self {
        match value {
            RoomClaimError::NotFound(room_id) => HousingError::not_found("room", room_id),
            RoomClaimError::Unavailable {
                room_id,
                availability,
            } => HousingError::RoomUnavailable {
                room_id: room_id.0,
                availability: availability.label(),
            },
            RoomClaimError::Repository(err) => HousingError::Repository(err),
        }
    }
}
