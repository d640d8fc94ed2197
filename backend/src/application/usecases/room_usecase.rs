//! Join and leave use cases.

use std::sync::Arc;

use signaling::SignalingError;

use crate::application::{Membership, SessionContext};
use crate::domain::{LinkKey, ParticipantId, RoomId};
use crate::infrastructure::media::MediaEngine;
use crate::infrastructure::registry::RoomRegistry;

/// Room membership use case handler
pub struct RoomUseCase {
    registry: RoomRegistry,
    engine: Arc<dyn MediaEngine>,
    logger: logging::Logger,
}

impl RoomUseCase {
    pub fn new(registry: RoomRegistry, engine: Arc<dyn MediaEngine>, logger: logging::Logger) -> Self {
        RoomUseCase {
            registry,
            engine,
            logger,
        }
    }

    /// Handle joinRoom. A session that is already in a room leaves it first,
    /// unless the name is taken in the target room: then the join is refused
    /// and the current membership is kept.
    pub fn handle_join(
        &self,
        ctx: &mut SessionContext,
        room: RoomId,
        name: ParticipantId,
    ) -> Result<(), SignalingError> {
        if let Some(current) = &ctx.membership {
            let rejoin = current.room == room && current.participant == name;
            let taken = self
                .registry
                .with_room(&room, |r| r.contains(&name))
                .unwrap_or(false);
            if taken && !rejoin {
                return Err(SignalingError::DuplicateParticipant {
                    room,
                    participant: name,
                });
            }

            self.logger.info(&format!(
                "Session switches to room '{}' as '{}'",
                room, name
            ));
            self.handle_leave(ctx);
        }

        let existing = self.registry.join(&room, &name, &ctx.session)?;
        ctx.enter(Membership {
            room,
            participant: name,
        });
        ctx.logger
            .info(&format!("Joined with {} existing participants", existing.len()));
        Ok(())
    }

    /// Handle leaveRoom and disconnects. Returns `false` if the session was
    /// not in a room.
    pub fn handle_leave(&self, ctx: &mut SessionContext) -> bool {
        let logger = ctx.logger.clone();
        let Some(membership) = ctx.exit() else {
            return false;
        };
        let Some(departure) = self.registry.leave(&membership.room, &membership.participant) else {
            return false;
        };

        for (key, _) in &departure.closed_links {
            self.engine.release_leg(&membership.room, key);
        }
        // Subscribers may have made the engine create the publishing leg
        // even though this participant never offered on it.
        let publishing = LinkKey::publishing(membership.participant.clone());
        if !departure.closed_links.iter().any(|(key, _)| key == &publishing) {
            self.engine.release_leg(&membership.room, &publishing);
        }
        if departure.room_reclaimed {
            self.engine.release_room(&membership.room);
        }
        logger.info(&format!(
            "Left room ({} links released)",
            departure.closed_links.len()
        ));
        true
    }
}
