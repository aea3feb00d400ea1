use harmony_core::{HarmonyError, UserId};
use thiserror::Error;

/// Reasons an event is abandoned before anything is delivered.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("actor {0} is not in the role roster")]
    UnknownActor(UserId),

    #[error("{event} event is missing {field}")]
    MissingEntityData {
        event: &'static str,
        field: &'static str,
    },

    #[error("role roster unavailable: {0}")]
    RosterUnavailable(#[from] HarmonyError),
}
