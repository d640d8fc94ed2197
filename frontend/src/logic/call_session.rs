//! Client side of a group call.
//!
//! Reacts to server messages the way a browser client does: on joining it
//! publishes its own media and subscribes to every member already present,
//! subscribes to each newcomer, and tears a peer down when it leaves.
//! Outbound messages are queued on a channel drained by the transport.

use std::sync::mpsc::Sender;

use signaling::{
    ClientMessage, ErrorReason, IceCandidate, LinkState, ParticipantId, RoomId, ServerMessage,
    SignalingError,
};

use crate::error::{ClientError, Result};
use crate::media::{LocalMedia, MediaDirection, ParticipantView};
use crate::models::Peer;

/// Where the session stands with respect to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// `joinRoom` sent, waiting for `existingParticipants`.
    Joining { room: RoomId, name: ParticipantId },
    Joined { room: RoomId, name: ParticipantId },
}

pub struct CallSession<M: LocalMedia, V: ParticipantView> {
    media: M,
    view: V,
    outbox: Sender<ClientMessage>,
    state: SessionState,
    /// Local participant first, then others in arrival order.
    peers: Vec<Peer>,
    logger: logging::Logger,
}

impl<M: LocalMedia, V: ParticipantView> CallSession<M, V> {
    pub fn new(media: M, view: V, outbox: Sender<ClientMessage>, logger: logging::Logger) -> Self {
        CallSession {
            media,
            view,
            outbox,
            state: SessionState::Idle,
            peers: Vec::new(),
            logger,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Participants with a peer connection, local participant first.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.peers.iter().map(|p| p.id.clone()).collect()
    }

    pub fn link_state(&self, peer: &ParticipantId) -> Option<LinkState> {
        self.peer(peer).map(Peer::state)
    }

    fn peer(&self, id: &ParticipantId) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.id == id)
    }

    fn peer_mut(&mut self, id: &ParticipantId) -> Result<&mut Peer> {
        self.peers
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| SignalingError::UnknownParticipant(id.to_string()).into())
    }

    fn send(&self, message: ClientMessage) -> Result<()> {
        self.logger.debug(&format!("Queueing {}", message.kind()));
        self.outbox
            .send(message)
            .map_err(|_| ClientError::Signaling(SignalingError::TransportClosed))
    }

    /// Asks to join `room` as `name`.
    pub fn join(&mut self, name: &str, room: &str) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(ClientError::AlreadyJoined);
        }
        let name = ParticipantId::parse(name)?;
        let room = RoomId::parse(room)?;
        self.send(ClientMessage::JoinRoom {
            name: name.clone(),
            room: room.clone(),
        })?;
        self.logger
            .info(&format!("Joining room '{}' as '{}'", room, name));
        self.state = SessionState::Joining { room, name };
        Ok(())
    }

    /// Leaves the room and disposes every peer connection.
    pub fn leave(&mut self) -> Result<()> {
        if self.state == SessionState::Idle {
            return Err(ClientError::NotJoined);
        }
        let sent = self.send(ClientMessage::LeaveRoom);
        for mut peer in std::mem::take(&mut self.peers) {
            self.close_peer(&mut peer);
        }
        self.state = SessionState::Idle;
        self.logger.info("Left room");
        sent
    }

    /// Forwards a candidate gathered by the local stack for `peer`.
    pub fn local_candidate(&self, peer: &ParticipantId, candidate: IceCandidate) -> Result<()> {
        if self.peer(peer).is_none() {
            return Err(SignalingError::UnknownParticipant(peer.to_string()).into());
        }
        self.send(ClientMessage::OnIceCandidate {
            name: peer.clone(),
            candidate,
        })
    }

    /// Applies one message from the server.
    pub fn handle(&mut self, message: ServerMessage) -> Result<()> {
        match message {
            ServerMessage::ExistingParticipants { data } => self.on_existing_participants(data),
            ServerMessage::NewParticipantArrived { name } => {
                self.require_joined()?;
                self.receive_video(name)
            }
            ServerMessage::ReceiveVideoAnswer { name, sdp_answer } => {
                self.on_answer(&name, &sdp_answer)
            }
            ServerMessage::IceCandidate { name, candidate } => self.on_candidate(&name, candidate),
            ServerMessage::ParticipantLeft { name } => {
                self.on_participant_left(&name);
                Ok(())
            }
            ServerMessage::Error { reason, message } => self.on_error(reason, message),
        }
    }

    fn require_joined(&self) -> Result<()> {
        match self.state {
            SessionState::Joined { .. } => Ok(()),
            _ => Err(ClientError::NotJoined),
        }
    }

    fn on_existing_participants(&mut self, existing: Vec<ParticipantId>) -> Result<()> {
        let SessionState::Joining { room, name } = self.state.clone() else {
            return Err(ClientError::NotJoined);
        };
        self.logger.info(&format!(
            "Joined room '{}' with {} participants",
            room,
            existing.len()
        ));
        self.state = SessionState::Joined {
            room,
            name: name.clone(),
        };

        self.view.add(&name, true);
        self.start_peer(name, MediaDirection::SendOnly)?;
        for participant in existing {
            self.receive_video(participant)?;
        }
        Ok(())
    }

    fn receive_video(&mut self, sender: ParticipantId) -> Result<()> {
        if self.peer(&sender).is_some() {
            self.logger
                .warn(&format!("Already receiving video from '{}'", sender));
            return Ok(());
        }
        self.view.add(&sender, false);
        self.start_peer(sender, MediaDirection::RecvOnly)
    }

    /// Creates the peer connection and sends its offer. A media failure only
    /// skips this participant's video.
    fn start_peer(&mut self, id: ParticipantId, direction: MediaDirection) -> Result<()> {
        let mut peer = Peer::new(id.clone(), direction);
        let offer = match self.media.generate_offer(&id, direction) {
            Ok(offer) => offer,
            Err(e) => {
                self.logger
                    .error(&format!("No offer for '{}': {}; skipping video", id, e));
                self.close_peer(&mut peer);
                return Ok(());
            }
        };
        peer.link
            .send_offer(&offer)
            .map_err(|e| SignalingError::ConflictingNegotiation(e.to_string()))?;
        self.peers.push(peer);
        self.view.state_changed(&id, LinkState::OfferSent);
        self.send(ClientMessage::ReceiveVideoFrom {
            sender: id,
            sdp_offer: offer,
        })
    }

    fn on_answer(&mut self, name: &ParticipantId, sdp_answer: &str) -> Result<()> {
        let queued = self
            .peer_mut(name)?
            .link
            .receive_answer(sdp_answer)
            .map_err(|e| SignalingError::UnexpectedAnswer(format!("{name}: {e}")))?;

        if let Err(e) = self.media.process_answer(name, sdp_answer) {
            self.logger
                .error(&format!("Answer from '{}' not applied: {}; skipping video", name, e));
            self.on_participant_left(name);
            return Err(e);
        }
        for candidate in queued {
            self.media.add_ice_candidate(name, &candidate)?;
        }
        self.view.state_changed(name, LinkState::AnswerReceived);
        Ok(())
    }

    fn on_candidate(&mut self, name: &ParticipantId, candidate: IceCandidate) -> Result<()> {
        let ready = self
            .peer_mut(name)?
            .link
            .accept_candidate(candidate)
            .map_err(|e| SignalingError::UnknownParticipant(format!("{name}: {e}")))?;
        match ready {
            Some(candidate) => self.media.add_ice_candidate(name, &candidate),
            None => Ok(()),
        }
    }

    fn on_participant_left(&mut self, name: &ParticipantId) {
        let Some(index) = self.peers.iter().position(|p| &p.id == name) else {
            self.logger
                .debug(&format!("participantLeft for unknown '{}'", name));
            return;
        };
        let mut peer = self.peers.remove(index);
        self.close_peer(&mut peer);
        self.logger.info(&format!("'{}' left", name));
    }

    fn close_peer(&mut self, peer: &mut Peer) {
        peer.link.close();
        self.media.dispose(&peer.id);
        self.view.state_changed(&peer.id, LinkState::Closed);
        self.view.remove(&peer.id);
    }

    fn on_error(&mut self, reason: ErrorReason, message: String) -> Result<()> {
        self.logger
            .warn(&format!("Server error ({:?}): {}", reason, message));
        if reason == ErrorReason::DuplicateParticipant
            && matches!(self.state, SessionState::Joining { .. })
        {
            self.state = SessionState::Idle;
        }
        Err(ClientError::Rejected { reason, message })
    }
}
