//! Identity of a media leg inside a room.

use std::fmt;

use crate::domain::ParticipantId;

/// Ordered pair naming one media leg: `viewer` receives what `publisher`
/// sends. A participant's own publishing leg has `viewer == publisher`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub viewer: ParticipantId,
    pub publisher: ParticipantId,
}

impl LinkKey {
    pub fn new(viewer: ParticipantId, publisher: ParticipantId) -> Self {
        LinkKey { viewer, publisher }
    }

    /// The leg a participant uses to send its own media.
    pub fn publishing(participant: ParticipantId) -> Self {
        LinkKey {
            viewer: participant.clone(),
            publisher: participant,
        }
    }

    pub fn is_publishing(&self) -> bool {
        self.viewer == self.publisher
    }

    pub fn involves(&self, participant: &ParticipantId) -> bool {
        &self.viewer == participant || &self.publisher == participant
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.viewer, self.publisher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishing_leg() {
        let key = LinkKey::publishing(ParticipantId::from("alice"));
        assert!(key.is_publishing());
        assert_eq!(key.to_string(), "(alice, alice)");
    }

    #[test]
    fn test_involves_either_side() {
        let key = LinkKey::new(ParticipantId::from("bob"), ParticipantId::from("alice"));
        assert!(!key.is_publishing());
        assert!(key.involves(&ParticipantId::from("alice")));
        assert!(key.involves(&ParticipantId::from("bob")));
        assert!(!key.involves(&ParticipantId::from("carol")));
    }
}
