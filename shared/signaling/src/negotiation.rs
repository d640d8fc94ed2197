//! Negotiation state of one media leg between two participants.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::candidate::IceCandidate;

/// Negotiation progress of a leg. States only move forward until `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkState {
    Idle,
    OfferSent,
    AnswerReceived,
    /// Connectivity confirmed by the media engine.
    Active,
    Closed,
}

impl LinkState {
    pub fn is_closed(self) -> bool {
        self == LinkState::Closed
    }

    /// Answer applied; candidates can go straight to the engine.
    pub fn is_negotiated(self) -> bool {
        matches!(self, LinkState::AnswerReceived | LinkState::Active)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Idle => "Idle",
            LinkState::OfferSent => "OfferSent",
            LinkState::AnswerReceived => "AnswerReceived",
            LinkState::Active => "Active",
            LinkState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// A transition that the current state does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("an offer was already made (link is {0})")]
    OfferAlreadyMade(LinkState),
    #[error("no offer is waiting for an answer (link is {0})")]
    NoPendingOffer(LinkState),
    #[error("link is {0}, not AnswerReceived")]
    NotNegotiated(LinkState),
    #[error("link is closed")]
    Closed,
}

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Signaling relationship for one ordered pair of participants.
///
/// Every link gets a process-unique epoch, so work started for a link that
/// was torn down and recreated in the meantime can be recognised as stale.
#[derive(Debug, Clone)]
pub struct PeerLink {
    state: LinkState,
    epoch: u64,
    offer: Option<String>,
    answer: Option<String>,
    pending_candidates: Vec<IceCandidate>,
}

impl PeerLink {
    pub fn new() -> Self {
        PeerLink {
            state: LinkState::Idle,
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            offer: None,
            answer: None,
            pending_candidates: Vec::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn offer(&self) -> Option<&str> {
        self.offer.as_deref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    /// `Idle -> OfferSent`.
    pub fn send_offer(&mut self, sdp_offer: &str) -> Result<(), TransitionError> {
        match self.state {
            LinkState::Idle => {
                self.offer = Some(sdp_offer.to_string());
                self.state = LinkState::OfferSent;
                Ok(())
            }
            LinkState::Closed => Err(TransitionError::Closed),
            other => Err(TransitionError::OfferAlreadyMade(other)),
        }
    }

    /// `OfferSent -> AnswerReceived`. Returns the candidates queued while
    /// the answer was outstanding, oldest first.
    pub fn receive_answer(&mut self, sdp_answer: &str) -> Result<Vec<IceCandidate>, TransitionError> {
        match self.state {
            LinkState::OfferSent => {
                self.answer = Some(sdp_answer.to_string());
                self.state = LinkState::AnswerReceived;
                Ok(std::mem::take(&mut self.pending_candidates))
            }
            LinkState::Closed => Err(TransitionError::Closed),
            other => Err(TransitionError::NoPendingOffer(other)),
        }
    }

    /// `AnswerReceived -> Active`.
    pub fn confirm_connected(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LinkState::AnswerReceived => {
                self.state = LinkState::Active;
                Ok(())
            }
            LinkState::Active => Ok(()),
            LinkState::Closed => Err(TransitionError::Closed),
            other => Err(TransitionError::NotNegotiated(other)),
        }
    }

    /// Accepts a remote candidate without changing state.
    ///
    /// Before the answer it is queued and `None` is returned; afterwards it
    /// is handed back for immediate delivery.
    pub fn accept_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<Option<IceCandidate>, TransitionError> {
        match self.state {
            LinkState::Closed => Err(TransitionError::Closed),
            state if state.is_negotiated() => Ok(Some(candidate)),
            _ => {
                self.pending_candidates.push(candidate);
                Ok(None)
            }
        }
    }

    /// Moves to `Closed` and drops queued candidates. Returns whether the
    /// link was open before the call.
    pub fn close(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        self.state = LinkState::Closed;
        self.pending_candidates.clear();
        true
    }
}

impl Default for PeerLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(n: u32) -> IceCandidate {
        IceCandidate::new(json!({ "candidate": format!("candidate:{n}") }))
    }

    #[test]
    fn test_full_forward_path() {
        let mut link = PeerLink::new();
        assert_eq!(link.state(), LinkState::Idle);

        link.send_offer("O1").unwrap();
        assert_eq!(link.state(), LinkState::OfferSent);
        assert_eq!(link.offer(), Some("O1"));

        link.receive_answer("A1").unwrap();
        assert_eq!(link.state(), LinkState::AnswerReceived);
        assert_eq!(link.answer(), Some("A1"));

        link.confirm_connected().unwrap();
        assert_eq!(link.state(), LinkState::Active);
    }

    #[test]
    fn test_answer_without_offer_is_rejected() {
        let mut link = PeerLink::new();
        assert_eq!(
            link.receive_answer("A1"),
            Err(TransitionError::NoPendingOffer(LinkState::Idle))
        );
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_second_answer_is_rejected() {
        let mut link = PeerLink::new();
        link.send_offer("O1").unwrap();
        link.receive_answer("A1").unwrap();

        assert_eq!(
            link.receive_answer("A2"),
            Err(TransitionError::NoPendingOffer(LinkState::AnswerReceived))
        );
        assert_eq!(link.answer(), Some("A1"));
    }

    #[test]
    fn test_second_offer_conflicts() {
        let mut link = PeerLink::new();
        link.send_offer("O1").unwrap();

        assert_eq!(
            link.send_offer("O2"),
            Err(TransitionError::OfferAlreadyMade(LinkState::OfferSent))
        );
        assert_eq!(link.offer(), Some("O1"));
    }

    #[test]
    fn test_candidates_queue_until_answer() {
        let mut link = PeerLink::new();
        assert_eq!(link.accept_candidate(candidate(1)), Ok(None));
        link.send_offer("O1").unwrap();
        assert_eq!(link.accept_candidate(candidate(2)), Ok(None));
        assert_eq!(link.pending_candidates(), 2);
        assert_eq!(link.state(), LinkState::OfferSent);

        let drained = link.receive_answer("A1").unwrap();
        assert_eq!(drained, vec![candidate(1), candidate(2)]);
        assert_eq!(link.pending_candidates(), 0);

        assert_eq!(link.accept_candidate(candidate(3)), Ok(Some(candidate(3))));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let mut link = PeerLink::new();
        link.send_offer("O1").unwrap();
        link.accept_candidate(candidate(1)).unwrap();

        assert!(link.close());
        assert!(!link.close());
        assert_eq!(link.state(), LinkState::Closed);
        assert_eq!(link.pending_candidates(), 0);

        assert_eq!(link.receive_answer("A1"), Err(TransitionError::Closed));
        assert_eq!(link.send_offer("O2"), Err(TransitionError::Closed));
        assert_eq!(link.accept_candidate(candidate(2)), Err(TransitionError::Closed));
    }

    #[test]
    fn test_recreated_link_has_new_epoch() {
        let first = PeerLink::new();
        let second = PeerLink::new();
        assert_ne!(first.epoch(), second.epoch());
    }
}
