//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use groupcall_server::domain::{IceCandidate, RoomId};
use groupcall_server::{
    LinkKey, MediaEngine, MediaError, MediaResult, MessageHandler, RoomRegistry, SessionContext,
    SessionHandle,
};
use serde_json::Value;
use signaling::{ServerMessage, SignalingError};

pub const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Offer(RoomId, LinkKey),
    Candidate(RoomId, LinkKey, IceCandidate),
    ReleaseLeg(RoomId, LinkKey),
    ReleaseRoom(RoomId),
}

/// Media engine answering every offer from a table, recording each call.
#[derive(Default)]
pub struct StubEngine {
    answers: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    gate: Mutex<Option<Receiver<()>>>,
    calls: Mutex<Vec<EngineCall>>,
}

impl StubEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(StubEngine::default())
    }

    /// Answers `offer` with `answer` instead of `answer:<offer>`.
    pub fn answer(&self, offer: &str, answer: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(offer.to_string(), answer.to_string());
    }

    pub fn fail(&self, offer: &str) {
        self.failing.lock().unwrap().insert(offer.to_string());
    }

    /// Blocks the next offer until the returned sender fires.
    pub fn hold(&self) -> Sender<()> {
        let (release, gate) = channel();
        *self.gate.lock().unwrap() = Some(gate);
        release
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Polls the call log until `expected` shows up.
    pub fn wait_for_call(&self, expected: &EngineCall) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if self.calls().contains(expected) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MediaEngine for StubEngine {
    fn process_offer(&self, room: &RoomId, leg: &LinkKey, sdp_offer: &str) -> MediaResult<String> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(WAIT);
        }
        self.record(EngineCall::Offer(room.clone(), leg.clone()));

        if self.failing.lock().unwrap().contains(sdp_offer) {
            return Err(MediaError::Rejected {
                operation: "processOffer".to_string(),
                message: "stub failure".to_string(),
            });
        }
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(sdp_offer)
            .cloned()
            .unwrap_or_else(|| format!("answer:{sdp_offer}")))
    }

    fn add_ice_candidate(
        &self,
        room: &RoomId,
        leg: &LinkKey,
        candidate: &IceCandidate,
    ) -> MediaResult<()> {
        self.record(EngineCall::Candidate(room.clone(), leg.clone(), candidate.clone()));
        Ok(())
    }

    fn release_leg(&self, room: &RoomId, leg: &LinkKey) {
        self.record(EngineCall::ReleaseLeg(room.clone(), leg.clone()));
    }

    fn release_room(&self, room: &RoomId) {
        self.record(EngineCall::ReleaseRoom(room.clone()));
    }
}

pub fn setup(engine: &Arc<StubEngine>) -> (MessageHandler, RoomRegistry) {
    let registry = RoomRegistry::new(logging::Logger::disabled());
    let engine: Arc<dyn MediaEngine> = engine.clone();
    let handler = MessageHandler::new(registry.clone(), engine, logging::Logger::disabled());
    (handler, registry)
}

/// A session driven directly through the message handler.
pub struct TestClient {
    pub ctx: SessionContext,
    pub inbox: Receiver<ServerMessage>,
}

impl TestClient {
    pub fn new() -> Self {
        let (session, inbox) = SessionHandle::channel();
        TestClient {
            ctx: SessionContext::new(session, logging::Logger::disabled()),
            inbox,
        }
    }

    pub fn send(&mut self, handler: &MessageHandler, frame: Value) -> Result<(), SignalingError> {
        handler.process_text(&mut self.ctx, &frame.to_string())
    }

    pub fn recv(&self) -> ServerMessage {
        self.inbox
            .recv_timeout(WAIT)
            .expect("expected a server message")
    }

    /// Everything received so far, without waiting.
    pub fn drain(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    pub fn assert_silent(&self) {
        if let Ok(message) = self.inbox.recv_timeout(Duration::from_millis(200)) {
            panic!("unexpected message: {message:?}");
        }
    }
}
