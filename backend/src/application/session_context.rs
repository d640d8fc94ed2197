//! Per-connection signaling state.

use crate::domain::{ParticipantId, RoomId};
use crate::infrastructure::session::SessionHandle;

/// The room a session joined and the name it joined under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room: RoomId,
    pub participant: ParticipantId,
}

/// State owned by one client connection.
pub struct SessionContext {
    pub session: SessionHandle,
    pub membership: Option<Membership>,
    /// Tagged with the session id, plus room and participant while joined.
    pub logger: logging::Logger,
    session_logger: logging::Logger,
}

impl SessionContext {
    pub fn new(session: SessionHandle, logger: logging::Logger) -> Self {
        let session_logger = logger.with_context("session", format!("{:016x}", session.id()));
        SessionContext {
            session,
            membership: None,
            logger: session_logger.clone(),
            session_logger,
        }
    }

    pub(crate) fn enter(&mut self, membership: Membership) {
        self.logger = self
            .session_logger
            .with_context("room", &membership.room)
            .with_context("participant", &membership.participant);
        self.membership = Some(membership);
    }

    pub(crate) fn exit(&mut self) -> Option<Membership> {
        self.logger = self.session_logger.clone();
        self.membership.take()
    }
}
