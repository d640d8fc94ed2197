//! [`MediaEngine`] on top of Kurento media objects.
//!
//! Every room gets one `MediaPipeline`. Every leg gets one
//! `WebRtcEndpoint`; a viewer's endpoint is fed by the publisher's own
//! publishing endpoint, which is created on demand if the publisher has not
//! offered yet.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

use super::client::KurentoClient;
use super::rpc::{KurentoEvent, RpcCall, candidate_from_event, candidate_to_kurento, string_value};
use crate::config::MediaConfig;
use crate::domain::{IceCandidate, LinkKey, RoomId};
use crate::infrastructure::media::{MediaEngine, MediaError, MediaEvent, MediaResult};

const ICE_CANDIDATE_FOUND: &str = "IceCandidateFound";
const CONNECTION_STATE_CHANGED: &str = "ConnectionStateChanged";

struct RoomMedia {
    pipeline: String,
    endpoints: HashMap<LinkKey, String>,
}

/// Endpoint id to the leg it serves.
type LegIndex = Arc<Mutex<HashMap<String, (RoomId, LinkKey)>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct KurentoEngine {
    client: KurentoClient,
    rooms: Mutex<HashMap<RoomId, RoomMedia>>,
    legs: LegIndex,
    logger: logging::Logger,
}

impl KurentoEngine {
    /// Connects to the media server and starts forwarding its events to
    /// `events`.
    pub fn connect(
        config: &MediaConfig,
        events: Sender<MediaEvent>,
        logger: logging::Logger,
    ) -> MediaResult<Self> {
        let (raw_sender, raw_events) = channel();
        let client = KurentoClient::connect(
            &config.kurento_uri,
            Duration::from_millis(config.request_timeout_ms),
            raw_sender,
            logger.for_component("Kurento"),
        )?;

        let legs: LegIndex = Arc::new(Mutex::new(HashMap::new()));
        let index = Arc::clone(&legs);
        let event_logger = logger.clone();
        thread::Builder::new()
            .name("kurento-events".to_string())
            .spawn(move || translate_events(raw_events, index, events, event_logger))?;

        Ok(KurentoEngine {
            client,
            rooms: Mutex::new(HashMap::new()),
            legs,
            logger,
        })
    }

    fn create(&self, kind: &str, constructor_params: Value) -> MediaResult<String> {
        let result = self.client.request(RpcCall::create(kind, constructor_params))?;
        string_value(&result)
            .map(str::to_string)
            .ok_or_else(|| MediaError::Protocol(format!("create {kind} returned no object id")))
    }

    fn invoke(&self, object: &str, operation: &str, params: Value) -> MediaResult<Value> {
        let result = self.client.request(RpcCall::invoke(object, operation, params))?;
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }

    fn release_object(&self, object: &str) {
        if let Err(err) = self.client.request(RpcCall::release(object)) {
            self.logger
                .warn(&format!("Failed to release media object {}: {}", object, err));
        }
    }

    fn pipeline(&self, room: &RoomId) -> MediaResult<String> {
        if let Some(media) = lock(&self.rooms).get(room) {
            return Ok(media.pipeline.clone());
        }

        let created = self.create("MediaPipeline", json!({}))?;
        let mut rooms = lock(&self.rooms);
        if let Some(media) = rooms.get(room) {
            let existing = media.pipeline.clone();
            drop(rooms);
            self.release_object(&created);
            return Ok(existing);
        }
        rooms.insert(
            room.clone(),
            RoomMedia {
                pipeline: created.clone(),
                endpoints: HashMap::new(),
            },
        );
        self.logger
            .info(&format!("Created pipeline {} for room '{}'", created, room));
        Ok(created)
    }

    fn existing_endpoint(&self, room: &RoomId, leg: &LinkKey) -> Option<String> {
        lock(&self.rooms)
            .get(room)
            .and_then(|media| media.endpoints.get(leg).cloned())
    }

    /// Endpoint of `leg`, created and subscribed on first use.
    fn endpoint(&self, room: &RoomId, leg: &LinkKey) -> MediaResult<String> {
        if let Some(endpoint) = self.existing_endpoint(room, leg) {
            return Ok(endpoint);
        }

        let pipeline = self.pipeline(room)?;
        let created = self.create("WebRtcEndpoint", json!({ "mediaPipeline": pipeline }))?;
        {
            let mut rooms = lock(&self.rooms);
            let Some(media) = rooms.get_mut(room) else {
                drop(rooms);
                self.release_object(&created);
                return Err(MediaError::UnknownLeg {
                    room: room.clone(),
                    leg: leg.clone(),
                });
            };
            if let Some(existing) = media.endpoints.get(leg).cloned() {
                drop(rooms);
                self.release_object(&created);
                return Ok(existing);
            }
            media.endpoints.insert(leg.clone(), created.clone());
        }
        lock(&self.legs).insert(created.clone(), (room.clone(), leg.clone()));

        for event in [ICE_CANDIDATE_FOUND, CONNECTION_STATE_CHANGED] {
            self.client.request(RpcCall::subscribe(&created, event))?;
        }
        self.logger.debug(&format!(
            "Created endpoint {} for leg {} in room '{}'",
            created, leg, room
        ));
        Ok(created)
    }
}

impl MediaEngine for KurentoEngine {
    fn process_offer(&self, room: &RoomId, leg: &LinkKey, sdp_offer: &str) -> MediaResult<String> {
        let endpoint = self.endpoint(room, leg)?;
        if !leg.is_publishing() {
            let source = self.endpoint(room, &LinkKey::publishing(leg.publisher.clone()))?;
            self.invoke(&source, "connect", json!({ "sink": endpoint }))?;
        }

        let answer = self.invoke(&endpoint, "processOffer", json!({ "offer": sdp_offer }))?;
        let answer = answer
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MediaError::Protocol("processOffer returned no SDP".to_string()))?;

        self.invoke(&endpoint, "gatherCandidates", json!({}))?;
        Ok(answer)
    }

    fn add_ice_candidate(
        &self,
        room: &RoomId,
        leg: &LinkKey,
        candidate: &IceCandidate,
    ) -> MediaResult<()> {
        let endpoint = self
            .existing_endpoint(room, leg)
            .ok_or_else(|| MediaError::UnknownLeg {
                room: room.clone(),
                leg: leg.clone(),
            })?;
        self.invoke(
            &endpoint,
            "addIceCandidate",
            json!({ "candidate": candidate_to_kurento(candidate) }),
        )?;
        Ok(())
    }

    fn release_leg(&self, room: &RoomId, leg: &LinkKey) {
        let endpoint = lock(&self.rooms)
            .get_mut(room)
            .and_then(|media| media.endpoints.remove(leg));
        if let Some(endpoint) = endpoint {
            lock(&self.legs).remove(&endpoint);
            self.release_object(&endpoint);
        }
    }

    fn release_room(&self, room: &RoomId) {
        let Some(media) = lock(&self.rooms).remove(room) else {
            return;
        };
        {
            let mut legs = lock(&self.legs);
            for endpoint in media.endpoints.values() {
                legs.remove(endpoint);
            }
        }
        // Releasing the pipeline releases its endpoints too.
        self.release_object(&media.pipeline);
        self.logger
            .info(&format!("Released pipeline {} of room '{}'", media.pipeline, room));
    }
}

/// Maps an event raised by a media object to the leg it belongs to.
fn to_media_event(event: &KurentoEvent, room: RoomId, leg: LinkKey) -> Option<MediaEvent> {
    match event.kind.as_str() {
        ICE_CANDIDATE_FOUND => candidate_from_event(&event.data).map(|candidate| {
            MediaEvent::IceCandidate {
                room,
                leg,
                candidate,
            }
        }),
        CONNECTION_STATE_CHANGED
            if event.data.get("newState").and_then(Value::as_str) == Some("CONNECTED") =>
        {
            Some(MediaEvent::Connected { room, leg })
        }
        _ => None,
    }
}

fn translate_events(
    raw_events: Receiver<KurentoEvent>,
    legs: LegIndex,
    events: Sender<MediaEvent>,
    logger: logging::Logger,
) {
    for event in raw_events {
        let Some((room, leg)) = lock(&legs).get(&event.object).cloned() else {
            logger.debug(&format!("{} for released object {}", event.kind, event.object));
            continue;
        };
        if let Some(media_event) = to_media_event(&event, room, leg)
            && events.send(media_event).is_err()
        {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParticipantId;

    fn leg() -> LinkKey {
        LinkKey::new(ParticipantId::from("bob"), ParticipantId::from("alice"))
    }

    #[test]
    fn test_candidate_event_maps_to_leg() {
        let event = KurentoEvent {
            kind: ICE_CANDIDATE_FOUND.to_string(),
            object: "ep-1".to_string(),
            data: json!({ "candidate": {
                "__module__": "kurento", "__type__": "IceCandidate",
                "candidate": "candidate:1", "sdpMid": "0", "sdpMLineIndex": 0
            }}),
        };
        let mapped = to_media_event(&event, RoomId::from("r1"), leg()).unwrap();
        assert_eq!(
            mapped,
            MediaEvent::IceCandidate {
                room: RoomId::from("r1"),
                leg: leg(),
                candidate: IceCandidate::new(json!({
                    "candidate": "candidate:1", "sdpMid": "0", "sdpMLineIndex": 0
                })),
            }
        );
    }

    #[test]
    fn test_only_connected_state_is_reported() {
        let event = |state: &str| KurentoEvent {
            kind: CONNECTION_STATE_CHANGED.to_string(),
            object: "ep-1".to_string(),
            data: json!({ "oldState": "DISCONNECTED", "newState": state }),
        };
        assert_eq!(
            to_media_event(&event("CONNECTED"), RoomId::from("r1"), leg()),
            Some(MediaEvent::Connected {
                room: RoomId::from("r1"),
                leg: leg(),
            })
        );
        assert_eq!(to_media_event(&event("DISCONNECTED"), RoomId::from("r1"), leg()), None);
    }

    #[test]
    fn test_events_for_unknown_objects_are_dropped() {
        let (raw_sender, raw_events) = channel();
        let (sender, receiver) = channel();
        let legs: LegIndex = Arc::new(Mutex::new(HashMap::new()));
        legs.lock()
            .unwrap()
            .insert("ep-1".to_string(), (RoomId::from("r1"), leg()));

        for object in ["ep-gone", "ep-1"] {
            raw_sender
                .send(KurentoEvent {
                    kind: CONNECTION_STATE_CHANGED.to_string(),
                    object: object.to_string(),
                    data: json!({ "newState": "CONNECTED" }),
                })
                .unwrap();
        }
        drop(raw_sender);
        translate_events(raw_events, legs, sender, logging::Logger::disabled());

        let received: Vec<MediaEvent> = receiver.try_iter().collect();
        assert_eq!(
            received,
            vec![MediaEvent::Connected {
                room: RoomId::from("r1"),
                leg: leg(),
            }]
        );
    }
}
