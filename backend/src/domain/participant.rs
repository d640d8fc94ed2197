//! Room member model

use crate::domain::ParticipantId;

/// A member of a room together with the handle used to reach its session.
#[derive(Debug, Clone)]
pub struct Participant<S> {
    pub id: ParticipantId,
    pub session: S,
}

impl<S> Participant<S> {
    pub fn new(id: ParticipantId, session: S) -> Self {
        Participant { id, session }
    }
}
