//! Offer/answer and ICE candidate use cases.
//!
//! Offers are answered by the media engine on a worker thread, so a slow
//! engine never holds up the room or the client connection. The answer is
//! applied only if the link it was made for still exists with the same epoch.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread;

use signaling::{ServerMessage, SignalingError};

use crate::application::Membership;
use crate::domain::{IceCandidate, LinkKey, ParticipantId, RoomId};
use crate::infrastructure::media::{MediaEngine, MediaEvent};
use crate::infrastructure::registry::RoomRegistry;

fn not_in_room(room: &RoomId) -> SignalingError {
    SignalingError::UnknownParticipant(format!("room '{}' does not exist", room))
}

/// Media negotiation use case handler
#[derive(Clone)]
pub struct NegotiationUseCase {
    registry: RoomRegistry,
    engine: Arc<dyn MediaEngine>,
    logger: logging::Logger,
}

impl NegotiationUseCase {
    pub fn new(registry: RoomRegistry, engine: Arc<dyn MediaEngine>, logger: logging::Logger) -> Self {
        NegotiationUseCase {
            registry,
            engine,
            logger,
        }
    }

    /// Handle receiveVideoFrom: records the offer and hands it to a worker.
    pub fn handle_offer(
        &self,
        membership: &Membership,
        sender: ParticipantId,
        sdp_offer: String,
    ) -> Result<(), SignalingError> {
        let room = membership.room.clone();
        let key = LinkKey::new(membership.participant.clone(), sender);
        let epoch = self
            .registry
            .with_room(&room, |r| r.begin_offer(&key, &sdp_offer))
            .ok_or_else(|| not_in_room(&room))??;
        self.logger
            .debug(&format!("Offer for {} in room '{}' (epoch {})", key, room, epoch));

        let worker = self.clone();
        let spawned = thread::Builder::new()
            .name("offer-worker".to_string())
            .spawn({
                let room = room.clone();
                let key = key.clone();
                move || worker.negotiate(room, key, epoch, sdp_offer)
            });
        if let Err(e) = spawned {
            self.logger
                .error(&format!("Failed to start offer worker for {}: {}", key, e));
            self.abandon(&room, &key, epoch);
        }
        Ok(())
    }

    fn negotiate(&self, room: RoomId, key: LinkKey, epoch: u64, sdp_offer: String) {
        let sdp_answer = match self.engine.process_offer(&room, &key, &sdp_offer) {
            Ok(answer) => answer,
            Err(e) => {
                self.logger.error(&format!(
                    "Media engine failed on {} in room '{}': {}; skipping this video",
                    key, room, e
                ));
                self.abandon(&room, &key, epoch);
                return;
            }
        };

        let applied = self.registry.with_room(&room, |r| {
            let queued = r.complete_answer(&key, epoch, &sdp_answer)?;
            if let Some(viewer) = r.session(&key.viewer) {
                let answer = ServerMessage::ReceiveVideoAnswer {
                    name: key.publisher.clone(),
                    sdp_answer: sdp_answer.clone(),
                };
                if let Err(e) = viewer.send(answer) {
                    self.logger
                        .warn(&format!("Answer for {} not delivered: {}", key, e));
                }
            }
            Ok::<_, SignalingError>(queued)
        });

        match applied {
            Some(Ok(queued)) => {
                self.logger
                    .info(&format!("{} answered in room '{}'", key, room));
                for candidate in queued {
                    self.forward_to_engine(&room, &key, &candidate);
                }
            }
            Some(Err(e)) => {
                self.logger
                    .info(&format!("Discarding late answer for {}: {}", key, e));
                self.abandon(&room, &key, epoch);
            }
            None => {
                self.logger.info(&format!(
                    "Discarding answer for {}: room '{}' is gone",
                    key, room
                ));
                self.engine.release_leg(&room, &key);
                self.engine.release_room(&room);
            }
        }
    }

    /// Drops the link and its engine leg if the link is still the one the
    /// offer was made on. A newer link for the same pair keeps its leg.
    fn abandon(&self, room: &RoomId, key: &LinkKey, epoch: u64) {
        let superseded = self
            .registry
            .with_room(room, |r| match r.link_epoch(key) {
                Some(current) if current == epoch => {
                    r.abandon_link(key);
                    false
                }
                Some(_) => true,
                None => false,
            })
            .unwrap_or(false);
        if superseded {
            self.logger
                .debug(&format!("{} was renegotiated; keeping its media leg", key));
            return;
        }
        self.engine.release_leg(room, key);
    }

    fn forward_to_engine(&self, room: &RoomId, key: &LinkKey, candidate: &IceCandidate) {
        if let Err(e) = self.engine.add_ice_candidate(room, key, candidate) {
            self.logger
                .warn(&format!("Media engine refused candidate for {}: {}", key, e));
        }
    }

    /// Handle onIceCandidate: queued until the link is answered.
    pub fn handle_ice_candidate(
        &self,
        membership: &Membership,
        name: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        let room = &membership.room;
        let key = LinkKey::new(membership.participant.clone(), name);
        let ready = self
            .registry
            .with_room(room, |r| r.accept_candidate(&key, candidate))
            .ok_or_else(|| not_in_room(room))??;

        match ready {
            Some(candidate) => self.forward_to_engine(room, &key, &candidate),
            None => self.logger.debug(&format!("Queued candidate for {}", key)),
        }
        Ok(())
    }

    /// Routes one engine event to the viewer of its leg.
    pub fn handle_media_event(&self, event: MediaEvent) {
        match event {
            MediaEvent::IceCandidate {
                room,
                leg,
                candidate,
            } => {
                self.registry.with_room(&room, |r| {
                    if r.link_epoch(&leg).is_none() {
                        return;
                    }
                    let Some(viewer) = r.session(&leg.viewer) else {
                        return;
                    };
                    let message = ServerMessage::IceCandidate {
                        name: leg.publisher.clone(),
                        candidate,
                    };
                    if let Err(e) = viewer.send(message) {
                        self.logger
                            .warn(&format!("Candidate for {} not delivered: {}", leg, e));
                    }
                });
            }
            MediaEvent::Connected { room, leg } => {
                let confirmed = self
                    .registry
                    .with_room(&room, |r| r.confirm_connected(&leg))
                    .unwrap_or(false);
                if confirmed {
                    self.logger
                        .info(&format!("{} is active in room '{}'", leg, room));
                }
            }
        }
    }

    /// Drains engine events until the engine drops its sender.
    pub fn pump_media_events(&self, events: Receiver<MediaEvent>) {
        for event in events {
            self.handle_media_event(event);
        }
        self.logger.warn("Media event channel closed");
    }
}
