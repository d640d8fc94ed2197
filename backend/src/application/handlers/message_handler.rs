//! Message handler - routes inbound signaling frames to use cases

use std::sync::Arc;

use signaling::{ClientMessage, DecodeError, ServerMessage, SignalingError};

use crate::application::usecases::{NegotiationUseCase, RoomUseCase};
use crate::application::{Membership, SessionContext};
use crate::infrastructure::media::MediaEngine;
use crate::infrastructure::registry::RoomRegistry;

/// Message orchestrator - delegates to the room and negotiation use cases
#[derive(Clone)]
pub struct MessageHandler {
    room_usecase: Arc<RoomUseCase>,
    negotiation_usecase: NegotiationUseCase,
}

impl MessageHandler {
    pub fn new(registry: RoomRegistry, engine: Arc<dyn MediaEngine>, logger: logging::Logger) -> Self {
        let room_logger = logger.for_component("Room Usecase");
        let negotiation_logger = logger.for_component("Negotiation Usecase");

        MessageHandler {
            room_usecase: Arc::new(RoomUseCase::new(
                registry.clone(),
                Arc::clone(&engine),
                room_logger,
            )),
            negotiation_usecase: NegotiationUseCase::new(registry, engine, negotiation_logger),
        }
    }

    pub fn negotiation(&self) -> &NegotiationUseCase {
        &self.negotiation_usecase
    }

    /// Decodes and handles one text frame.
    ///
    /// Only a closed transport is returned as an error; every other problem
    /// is logged and the frame dropped.
    pub fn process_text(&self, ctx: &mut SessionContext, text: &str) -> Result<(), SignalingError> {
        match ClientMessage::decode(text) {
            Ok(message) => self.process_message(ctx, message),
            Err(DecodeError::UnknownKind(kind)) => {
                ctx.logger
                    .warn(&format!("Ignoring unknown message kind '{}'", kind));
                Ok(())
            }
            Err(err @ DecodeError::Malformed(_)) => {
                let err = SignalingError::from(err);
                ctx.logger.warn(&format!("Dropping frame: {}", err));
                ctx.session.send(ServerMessage::rejection(&err))
            }
        }
    }

    /// Process a decoded message and delegate to the matching use case.
    pub fn process_message(
        &self,
        ctx: &mut SessionContext,
        message: ClientMessage,
    ) -> Result<(), SignalingError> {
        let kind = message.kind();
        let result = match message {
            ClientMessage::JoinRoom { name, room } => {
                self.room_usecase.handle_join(ctx, room, name)
            }
            ClientMessage::LeaveRoom => {
                if !self.room_usecase.handle_leave(ctx) {
                    ctx.logger.debug("leaveRoom outside of a room");
                }
                Ok(())
            }
            ClientMessage::ReceiveVideoFrom { sender, sdp_offer } => {
                self.require_membership(ctx, |membership| {
                    self.negotiation_usecase
                        .handle_offer(membership, sender, sdp_offer)
                })
            }
            ClientMessage::OnIceCandidate { name, candidate } => {
                self.require_membership(ctx, |membership| {
                    self.negotiation_usecase
                        .handle_ice_candidate(membership, name, candidate)
                })
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => Err(err),
            Err(err @ SignalingError::DuplicateParticipant { .. }) => {
                ctx.logger.warn(&format!("{} rejected: {}", kind, err));
                ctx.session.send(ServerMessage::rejection(&err))
            }
            Err(err) => {
                ctx.logger.warn(&format!("{} dropped: {}", kind, err));
                Ok(())
            }
        }
    }

    /// Helper to require a joined room before processing
    fn require_membership<F>(&self, ctx: &SessionContext, handler: F) -> Result<(), SignalingError>
    where
        F: FnOnce(&Membership) -> Result<(), SignalingError>,
    {
        match &ctx.membership {
            Some(membership) => handler(membership),
            None => Err(SignalingError::UnknownParticipant(
                "session has not joined a room".to_string(),
            )),
        }
    }

    /// Cleanup when the connection goes away: closes the session and leaves
    /// its room.
    pub fn cleanup_disconnect(&self, ctx: &mut SessionContext) {
        ctx.session.close();
        if self.room_usecase.handle_leave(ctx) {
            ctx.logger.info("Left room after disconnect");
        }
    }
}
