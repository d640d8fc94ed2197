//! Server-wide map of rooms.
//!
//! Each room lives behind its own mutex so unrelated rooms never contend.
//! The map lock is only held to look a room up, insert it or reclaim it;
//! it is never held while waiting for a room lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use signaling::{ServerMessage, SignalingError};

use crate::domain::{LinkKey, LinkState, ParticipantId, PeerLink, Room, RoomId};
use crate::infrastructure::session::SessionHandle;

struct RoomSlot {
    room: Room<SessionHandle>,
    /// Set once the slot was removed from the map; late lookups retry.
    reclaimed: bool,
}

type SharedRoom = Arc<Mutex<RoomSlot>>;

/// What a participant left behind.
#[derive(Debug)]
pub struct Departure {
    pub closed_links: Vec<(LinkKey, PeerLink)>,
    /// The room became empty and was removed.
    pub room_reclaimed: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<RoomId, SharedRoom>>>,
    logger: logging::Logger,
}

impl RoomRegistry {
    pub fn new(logger: logging::Logger) -> Self {
        RoomRegistry {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            logger,
        }
    }

    fn lookup(&self, room_id: &RoomId) -> Option<SharedRoom> {
        lock(&self.rooms).get(room_id).cloned()
    }

    fn get_or_create(&self, room_id: &RoomId) -> SharedRoom {
        let mut rooms = lock(&self.rooms);
        Arc::clone(rooms.entry(room_id.clone()).or_insert_with(|| {
            self.logger.info(&format!("Room '{}' created", room_id));
            Arc::new(Mutex::new(RoomSlot {
                room: Room::new(room_id.clone()),
                reclaimed: false,
            }))
        }))
    }

    /// Removes an empty room from the map. Called with the room lock held.
    fn reclaim(&self, shared: &SharedRoom, slot: &mut RoomSlot) -> bool {
        if !slot.room.is_empty() || slot.reclaimed {
            return false;
        }
        let mut rooms = lock(&self.rooms);
        if rooms
            .get(slot.room.id())
            .is_some_and(|current| Arc::ptr_eq(current, shared))
        {
            rooms.remove(slot.room.id());
        }
        slot.reclaimed = true;
        self.logger
            .info(&format!("Room '{}' is empty and was reclaimed", slot.room.id()));
        true
    }

    /// Admits `participant` into `room_id`, creating the room on first join.
    ///
    /// The joiner receives `existingParticipants` and every other member
    /// `newParticipantArrived`, both while the room is locked. Returns the
    /// members that were already present, in join order.
    ///
    /// # Errors
    ///
    /// `DuplicateParticipant` if the name is taken in that room,
    /// `TransportClosed` if the joiner's session is already gone.
    pub fn join(
        &self,
        room_id: &RoomId,
        participant: &ParticipantId,
        session: &SessionHandle,
    ) -> Result<Vec<ParticipantId>, SignalingError> {
        loop {
            let shared = self.get_or_create(room_id);
            let mut slot = lock(&shared);
            if slot.reclaimed {
                continue;
            }

            let admission = slot.room.admit(participant.clone(), session.clone())?;
            let snapshot = ServerMessage::ExistingParticipants {
                data: admission.existing.clone(),
            };
            if let Err(err) = session.send(snapshot) {
                slot.room.remove(participant);
                self.reclaim(&shared, &mut slot);
                return Err(err);
            }

            for other in &admission.others {
                let arrived = ServerMessage::NewParticipantArrived {
                    name: participant.clone(),
                };
                if let Err(err) = other.send(arrived) {
                    self.logger.warn(&format!(
                        "Could not notify session {} in room '{}': {}",
                        other.id(),
                        room_id,
                        err
                    ));
                }
            }

            self.logger.info(&format!(
                "'{}' joined room '{}' ({} members)",
                participant,
                room_id,
                slot.room.len()
            ));
            return Ok(admission.existing);
        }
    }

    /// Removes `participant` from `room_id`, closing all of its links and
    /// telling every remaining member. `None` if it was not a member.
    pub fn leave(&self, room_id: &RoomId, participant: &ParticipantId) -> Option<Departure> {
        let shared = self.lookup(room_id)?;
        let mut slot = lock(&shared);
        if slot.reclaimed {
            return None;
        }
        let removal = slot.room.remove(participant)?;

        for remaining in &removal.remaining {
            let left = ServerMessage::ParticipantLeft {
                name: participant.clone(),
            };
            if let Err(err) = remaining.send(left) {
                self.logger.warn(&format!(
                    "Could not notify session {} in room '{}': {}",
                    remaining.id(),
                    room_id,
                    err
                ));
            }
        }
        self.logger.info(&format!(
            "'{}' left room '{}' ({} links closed)",
            participant,
            room_id,
            removal.closed_links.len()
        ));

        let room_reclaimed = self.reclaim(&shared, &mut slot);
        Some(Departure {
            closed_links: removal.closed_links,
            room_reclaimed,
        })
    }

    /// Runs `f` with the room locked. `None` if the room does not exist.
    pub fn with_room<R>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut Room<SessionHandle>) -> R,
    ) -> Option<R> {
        let shared = self.lookup(room_id)?;
        let mut slot = lock(&shared);
        if slot.reclaimed {
            return None;
        }
        Some(f(&mut slot.room))
    }

    /// Members of `room_id` in join order; empty for an unknown room.
    pub fn members(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.with_room(room_id, |room| room.member_ids())
            .unwrap_or_default()
    }

    pub fn link_state(&self, room_id: &RoomId, key: &LinkKey) -> LinkState {
        self.with_room(room_id, |room| room.link_state(key))
            .unwrap_or(LinkState::Closed)
    }

    pub fn room_count(&self) -> usize {
        lock(&self.rooms).len()
    }
}
