//! Integration tests for room membership
//!
//! Covers:
//! - Join snapshots and arrival notifications
//! - Duplicate names
//! - Leave, disconnect and room reclamation
//! - Malformed and unknown frames

mod common;

use std::collections::HashSet;
use std::thread;

use common::{EngineCall, StubEngine, TestClient, setup};
use groupcall_server::domain::{ParticipantId, RoomId};
use groupcall_server::{LinkKey, RoomRegistry, SessionHandle};
use serde_json::json;
use signaling::{ErrorReason, ServerMessage};

fn pid(name: &str) -> ParticipantId {
    ParticipantId::from(name)
}

fn join(name: &str, room: &str) -> serde_json::Value {
    json!({"id": "joinRoom", "name": name, "room": room})
}

#[test]
fn test_join_snapshot_and_arrival() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();

    alice.send(&handler, join("alice", "r1")).unwrap();
    assert_eq!(alice.recv(), ServerMessage::ExistingParticipants { data: vec![] });

    bob.send(&handler, join("bob", "r1")).unwrap();
    assert_eq!(
        bob.recv(),
        ServerMessage::ExistingParticipants {
            data: vec![pid("alice")]
        }
    );
    assert_eq!(
        alice.recv(),
        ServerMessage::NewParticipantArrived { name: pid("bob") }
    );

    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("alice"), pid("bob")]);
    assert_eq!(registry.room_count(), 1);
}

#[test]
fn test_duplicate_name_is_rejected_and_session_survives() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut impostor = TestClient::new();

    alice.send(&handler, join("alice", "r1")).unwrap();
    alice.recv();

    impostor.send(&handler, join("alice", "r1")).unwrap();
    match impostor.recv() {
        ServerMessage::Error { reason, .. } => assert_eq!(reason, ErrorReason::DuplicateParticipant),
        other => panic!("unexpected message: {other:?}"),
    }
    alice.assert_silent();
    assert!(impostor.ctx.membership.is_none());

    impostor.send(&handler, join("alice2", "r1")).unwrap();
    assert_eq!(
        impostor.recv(),
        ServerMessage::ExistingParticipants {
            data: vec![pid("alice")]
        }
    );
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("alice"), pid("alice2")]);
}

#[test]
fn test_leave_broadcasts_once_to_each_remaining_member() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut clients: Vec<TestClient> = (0..3).map(|_| TestClient::new()).collect();
    for (client, name) in clients.iter_mut().zip(["alice", "bob", "carol"]) {
        client.send(&handler, join(name, "r1")).unwrap();
    }
    for client in &clients {
        client.drain();
    }

    clients[0].send(&handler, json!({"id": "leaveRoom"})).unwrap();
    clients[0].send(&handler, json!({"id": "leaveRoom"})).unwrap();

    for client in &clients[1..] {
        assert_eq!(
            client.recv(),
            ServerMessage::ParticipantLeft { name: pid("alice") }
        );
        client.assert_silent();
    }
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("bob"), pid("carol")]);
}

#[test]
fn test_snapshot_excludes_departed_members() {
    let engine = StubEngine::new();
    let (handler, _registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();
    let mut carol = TestClient::new();

    alice.send(&handler, join("alice", "r1")).unwrap();
    bob.send(&handler, join("bob", "r1")).unwrap();
    bob.send(&handler, json!({"id": "leaveRoom"})).unwrap();

    carol.send(&handler, join("carol", "r1")).unwrap();
    assert_eq!(
        carol.recv(),
        ServerMessage::ExistingParticipants {
            data: vec![pid("alice")]
        }
    );
}

#[test]
fn test_disconnect_acts_as_leave() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();
    alice.send(&handler, join("alice", "r1")).unwrap();
    bob.send(&handler, join("bob", "r1")).unwrap();
    alice.drain();

    handler.cleanup_disconnect(&mut bob.ctx);

    assert_eq!(alice.recv(), ServerMessage::ParticipantLeft { name: pid("bob") });
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("alice")]);
    assert!(bob.ctx.session.is_closed());
}

#[test]
fn test_empty_room_is_reclaimed() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();

    alice.send(&handler, join("alice", "r1")).unwrap();
    assert_eq!(registry.room_count(), 1);

    alice.send(&handler, json!({"id": "leaveRoom"})).unwrap();
    assert_eq!(registry.room_count(), 0);
    assert!(engine
        .calls()
        .contains(&EngineCall::ReleaseRoom(RoomId::from("r1"))));

    alice.send(&handler, join("alice", "r1")).unwrap();
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("alice")]);
}

#[test]
fn test_joining_another_room_leaves_the_first() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();
    alice.send(&handler, join("alice", "r1")).unwrap();
    bob.send(&handler, join("bob", "r1")).unwrap();
    bob.drain();

    alice.send(&handler, join("alice", "r2")).unwrap();

    assert_eq!(bob.recv(), ServerMessage::ParticipantLeft { name: pid("alice") });
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("bob")]);
    assert_eq!(registry.members(&RoomId::from("r2")), vec![pid("alice")]);
    assert_eq!(
        alice.ctx.membership.as_ref().map(|m| m.room.clone()),
        Some(RoomId::from("r2"))
    );
}

#[test]
fn test_refused_switch_keeps_current_room() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();
    let mut carol = TestClient::new();
    alice.send(&handler, join("alice", "r1")).unwrap();
    bob.send(&handler, join("bob", "r1")).unwrap();
    carol.send(&handler, join("carol", "r2")).unwrap();
    alice.drain();
    bob.drain();
    carol.drain();

    alice.send(&handler, join("carol", "r2")).unwrap();

    match alice.recv() {
        ServerMessage::Error { reason, .. } => assert_eq!(reason, ErrorReason::DuplicateParticipant),
        other => panic!("unexpected message: {other:?}"),
    }
    bob.assert_silent();
    carol.assert_silent();
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("alice"), pid("bob")]);
    assert_eq!(registry.members(&RoomId::from("r2")), vec![pid("carol")]);
    assert_eq!(
        alice.ctx.membership.as_ref().map(|m| m.room.clone()),
        Some(RoomId::from("r1"))
    );
}

#[test]
fn test_rejoining_same_room_under_same_name() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();
    alice.send(&handler, join("alice", "r1")).unwrap();
    bob.send(&handler, join("bob", "r1")).unwrap();
    alice.drain();
    bob.drain();

    alice.send(&handler, join("alice", "r1")).unwrap();

    assert_eq!(
        alice.recv(),
        ServerMessage::ExistingParticipants {
            data: vec![pid("bob")]
        }
    );
    assert_eq!(bob.recv(), ServerMessage::ParticipantLeft { name: pid("alice") });
    assert_eq!(bob.recv(), ServerMessage::NewParticipantArrived { name: pid("alice") });
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("bob"), pid("alice")]);
}

#[test]
fn test_padded_name_is_the_same_participant() {
    let engine = StubEngine::new();
    let (handler, registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut impostor = TestClient::new();
    alice.send(&handler, join("alice", "r1")).unwrap();
    alice.drain();

    impostor.send(&handler, join(" alice ", " r1")).unwrap();

    match impostor.recv() {
        ServerMessage::Error { reason, .. } => assert_eq!(reason, ErrorReason::DuplicateParticipant),
        other => panic!("unexpected message: {other:?}"),
    }
    assert_eq!(registry.members(&RoomId::from("r1")), vec![pid("alice")]);
}

#[test]
fn test_leave_releases_publishing_leg_without_offer() {
    let engine = StubEngine::new();
    let (handler, _registry) = setup(&engine);
    let mut alice = TestClient::new();
    let mut bob = TestClient::new();
    alice.send(&handler, join("alice", "r1")).unwrap();
    bob.send(&handler, join("bob", "r1")).unwrap();

    alice.send(&handler, json!({"id": "leaveRoom"})).unwrap();

    let releases: Vec<EngineCall> = engine
        .calls()
        .into_iter()
        .filter(|call| matches!(call, EngineCall::ReleaseLeg(..)))
        .collect();
    assert_eq!(
        releases,
        vec![EngineCall::ReleaseLeg(
            RoomId::from("r1"),
            LinkKey::publishing(pid("alice"))
        )]
    );
}

#[test]
fn test_malformed_frame_gets_error_and_unknown_kind_is_ignored() {
    let engine = StubEngine::new();
    let (handler, _registry) = setup(&engine);
    let mut alice = TestClient::new();

    alice.send(&handler, json!({"id": "stop"})).unwrap();
    alice.assert_silent();

    handler.process_text(&mut alice.ctx, "{not json").unwrap();
    match alice.recv() {
        ServerMessage::Error { reason, .. } => assert_eq!(reason, ErrorReason::MalformedMessage),
        other => panic!("unexpected message: {other:?}"),
    }

    alice.send(&handler, json!({"id": "joinRoom", "name": "alice"})).unwrap();
    assert!(matches!(alice.recv(), ServerMessage::Error { .. }));

    alice.send(&handler, join("alice", "r1")).unwrap();
    assert!(matches!(alice.recv(), ServerMessage::ExistingParticipants { .. }));
}

#[test]
fn test_concurrent_joins_never_duplicate_members() {
    let registry = RoomRegistry::new(logging::Logger::disabled());
    let room = RoomId::from("busy");
    let names = ["alice", "bob", "carol", "dave"];

    let workers: Vec<_> = (0..32)
        .map(|i| {
            let registry = registry.clone();
            let room = room.clone();
            let name = pid(names[i % names.len()]);
            thread::spawn(move || {
                let (session, inbox) = SessionHandle::channel();
                let joined = registry.join(&room, &name, &session).is_ok();
                if joined && i % 3 == 0 {
                    registry.leave(&room, &name);
                }
                (joined, inbox)
            })
        })
        .collect();
    let _inboxes: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    let members = registry.members(&room);
    let unique: HashSet<_> = members.iter().collect();
    assert_eq!(unique.len(), members.len());
    assert!(members.len() <= names.len());
}

#[test]
fn test_registry_is_shared_between_clones() {
    let registry = RoomRegistry::new(logging::Logger::disabled());
    let clone = registry.clone();
    let (session, _inbox) = SessionHandle::channel();
    registry
        .join(&RoomId::from("r1"), &pid("alice"), &session)
        .unwrap();
    assert_eq!(clone.members(&RoomId::from("r1")), vec![pid("alice")]);
}
