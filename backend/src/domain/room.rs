//! Membership and link bookkeeping of a single room.
//!
//! A [`Room`] is plain data. Callers serialise access to it (the registry
//! keeps each room behind its own mutex) and do all I/O outside of it.

use std::collections::HashMap;

use signaling::{SignalingError, TransitionError};

use crate::domain::{IceCandidate, LinkKey, LinkState, Participant, ParticipantId, PeerLink, RoomId};

/// Result of admitting a participant.
#[derive(Debug)]
pub struct Admission<S> {
    /// Members that were already present, in join order.
    pub existing: Vec<ParticipantId>,
    /// Sessions of those members, same order as `existing`.
    pub others: Vec<S>,
}

/// Result of removing a participant.
#[derive(Debug)]
pub struct Removal<S> {
    pub participant: Participant<S>,
    /// Every link the participant took part in, already closed.
    pub closed_links: Vec<(LinkKey, PeerLink)>,
    /// Sessions of the members still in the room, in join order.
    pub remaining: Vec<S>,
}

#[derive(Debug)]
pub struct Room<S> {
    id: RoomId,
    participants: Vec<Participant<S>>,
    links: HashMap<LinkKey, PeerLink>,
}

impl<S: Clone> Room<S> {
    pub fn new(id: RoomId) -> Self {
        Room {
            id,
            participants: Vec::new(),
            links: HashMap::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.participants.iter().any(|p| &p.id == participant)
    }

    /// Member identifiers in join order.
    pub fn member_ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    pub fn session(&self, participant: &ParticipantId) -> Option<&S> {
        self.participants
            .iter()
            .find(|p| &p.id == participant)
            .map(|p| &p.session)
    }

    pub fn admit(&mut self, id: ParticipantId, session: S) -> Result<Admission<S>, SignalingError> {
        if self.contains(&id) {
            return Err(SignalingError::DuplicateParticipant {
                room: self.id.clone(),
                participant: id,
            });
        }
        let admission = Admission {
            existing: self.member_ids(),
            others: self.participants.iter().map(|p| p.session.clone()).collect(),
        };
        self.participants.push(Participant::new(id, session));
        Ok(admission)
    }

    /// Removes `participant` and closes its links. `None` if absent.
    pub fn remove(&mut self, participant: &ParticipantId) -> Option<Removal<S>> {
        let index = self.participants.iter().position(|p| &p.id == participant)?;
        let removed = self.participants.remove(index);

        let keys: Vec<LinkKey> = self
            .links
            .keys()
            .filter(|key| key.involves(participant))
            .cloned()
            .collect();
        let mut closed_links = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(mut link) = self.links.remove(&key) {
                link.close();
                closed_links.push((key, link));
            }
        }
        closed_links.sort_by(|a, b| a.0.cmp(&b.0));

        Some(Removal {
            participant: removed,
            closed_links,
            remaining: self.participants.iter().map(|p| p.session.clone()).collect(),
        })
    }

    fn require_members(&self, key: &LinkKey) -> Result<(), SignalingError> {
        for id in [&key.viewer, &key.publisher] {
            if !self.contains(id) {
                return Err(SignalingError::UnknownParticipant(format!(
                    "'{id}' is not in room '{}'",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Records the viewer's offer for `key`, creating the link if needed.
    /// Returns the link epoch the answer must be matched against.
    pub fn begin_offer(&mut self, key: &LinkKey, sdp_offer: &str) -> Result<u64, SignalingError> {
        self.require_members(key)?;
        let link = self.links.entry(key.clone()).or_default();
        match link.send_offer(sdp_offer) {
            Ok(()) => Ok(link.epoch()),
            Err(TransitionError::Closed) => Err(SignalingError::UnknownParticipant(format!(
                "link {key} is closed"
            ))),
            Err(err) => Err(SignalingError::ConflictingNegotiation(format!("{key}: {err}"))),
        }
    }

    /// Applies the engine's answer if the link is the one the offer was made
    /// on. Returns candidates queued while the offer was outstanding.
    pub fn complete_answer(
        &mut self,
        key: &LinkKey,
        epoch: u64,
        sdp_answer: &str,
    ) -> Result<Vec<IceCandidate>, SignalingError> {
        let link = self
            .links
            .get_mut(key)
            .filter(|link| link.epoch() == epoch)
            .ok_or_else(|| SignalingError::UnexpectedAnswer(format!("no pending offer on {key}")))?;
        link.receive_answer(sdp_answer)
            .map_err(|err| SignalingError::UnexpectedAnswer(format!("{key}: {err}")))
    }

    /// Queues or releases a remote candidate for `key`. `Some` means the
    /// link is negotiated and the candidate goes straight to the engine.
    pub fn accept_candidate(
        &mut self,
        key: &LinkKey,
        candidate: IceCandidate,
    ) -> Result<Option<IceCandidate>, SignalingError> {
        self.require_members(key)?;
        self.links
            .entry(key.clone())
            .or_default()
            .accept_candidate(candidate)
            .map_err(|err| SignalingError::UnknownParticipant(format!("{key}: {err}")))
    }

    /// Marks a negotiated link as connected. Returns `false` if there is no
    /// such link or it has not been answered yet.
    pub fn confirm_connected(&mut self, key: &LinkKey) -> bool {
        self.links
            .get_mut(key)
            .is_some_and(|link| link.confirm_connected().is_ok())
    }

    /// Drops one link after a failed negotiation, leaving every other link
    /// of both participants untouched.
    pub fn abandon_link(&mut self, key: &LinkKey) -> Option<PeerLink> {
        let mut link = self.links.remove(key)?;
        link.close();
        Some(link)
    }

    /// Epoch of the live link for `key`, if any.
    pub fn link_epoch(&self, key: &LinkKey) -> Option<u64> {
        self.links.get(key).map(PeerLink::epoch)
    }

    /// State of `key`. A pair of current members without a link yet is
    /// `Idle`; a pair involving a non-member is `Closed`.
    pub fn link_state(&self, key: &LinkKey) -> LinkState {
        match self.links.get(key) {
            Some(link) => link.state(),
            None if self.contains(&key.viewer) && self.contains(&key.publisher) => LinkState::Idle,
            None => LinkState::Closed,
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
