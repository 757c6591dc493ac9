//! Session state machine.
//!
//! Every session is in exactly one [`SessionState`]. [`SessionState::apply`]
//! is total: each `(state, event)` pair either yields the next state or a
//! [`TransitionError`], never a panic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a session returns to when an in-flight turn fails or is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resume {
    FirstDirective,
    Continuation,
}

impl Resume {
    pub fn state(self) -> SessionState {
        match self {
            Resume::FirstDirective => SessionState::AwaitingFirstDirective,
            Resume::Continuation => SessionState::AwaitingContinuation,
        }
    }
}

/// Position of a session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No user identity has been accepted yet.
    AwaitingIdentity,
    /// Identified, but the story has no segments.
    AwaitingFirstDirective,
    /// A generation request is outstanding.
    TurnInFlight { resume: Resume },
    /// At least one segment exists; the user may continue or stop.
    AwaitingContinuation,
    /// The user stopped; the story is final until a reset.
    Terminal,
}

/// Named transitions between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    IdentityAccepted,
    DirectiveSubmitted,
    TurnSucceeded,
    TurnFailed,
    Abandon,
    Stop,
    Reset,
}

/// An event that is not valid in the current state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot apply {event:?} while {state:?}")]
pub struct TransitionError {
    pub state: SessionState,
    pub event: SessionEvent,
}

impl SessionState {
    /// Compute the state that follows `event`.
    pub fn apply(self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::AwaitingIdentity, E::IdentityAccepted) => Ok(S::AwaitingFirstDirective),

            (S::AwaitingFirstDirective, E::DirectiveSubmitted) => Ok(S::TurnInFlight {
                resume: Resume::FirstDirective,
            }),
            (S::AwaitingContinuation, E::DirectiveSubmitted) => Ok(S::TurnInFlight {
                resume: Resume::Continuation,
            }),

            (S::TurnInFlight { .. }, E::TurnSucceeded) => Ok(S::AwaitingContinuation),
            (S::TurnInFlight { resume }, E::TurnFailed | E::Abandon) => Ok(resume.state()),

            (S::AwaitingFirstDirective | S::AwaitingContinuation, E::Stop) => Ok(S::Terminal),

            (
                S::AwaitingFirstDirective
                | S::AwaitingContinuation
                | S::TurnInFlight { .. }
                | S::Terminal,
                E::Reset,
            ) => Ok(S::AwaitingFirstDirective),

            (state, event) => Err(TransitionError { state, event }),
        }
    }

    /// Whether a new directive may be submitted.
    pub fn accepts_directive(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingFirstDirective | SessionState::AwaitingContinuation
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionState; 6] = [
        SessionState::AwaitingIdentity,
        SessionState::AwaitingFirstDirective,
        SessionState::TurnInFlight {
            resume: Resume::FirstDirective,
        },
        SessionState::TurnInFlight {
            resume: Resume::Continuation,
        },
        SessionState::AwaitingContinuation,
        SessionState::Terminal,
    ];

    const ALL_EVENTS: [SessionEvent; 7] = [
        SessionEvent::IdentityAccepted,
        SessionEvent::DirectiveSubmitted,
        SessionEvent::TurnSucceeded,
        SessionEvent::TurnFailed,
        SessionEvent::Abandon,
        SessionEvent::Stop,
        SessionEvent::Reset,
    ];

    #[test]
    fn test_happy_path() {
        let state = SessionState::AwaitingIdentity
            .apply(SessionEvent::IdentityAccepted)
            .and_then(|s| s.apply(SessionEvent::DirectiveSubmitted))
            .and_then(|s| s.apply(SessionEvent::TurnSucceeded))
            .and_then(|s| s.apply(SessionEvent::DirectiveSubmitted))
            .and_then(|s| s.apply(SessionEvent::TurnSucceeded))
            .and_then(|s| s.apply(SessionEvent::Stop))
            .unwrap();
        assert_eq!(state, SessionState::Terminal);
    }

    #[test]
    fn test_failure_returns_to_preflight_state() {
        let first = SessionState::AwaitingFirstDirective
            .apply(SessionEvent::DirectiveSubmitted)
            .unwrap();
        assert_eq!(
            first.apply(SessionEvent::TurnFailed),
            Ok(SessionState::AwaitingFirstDirective)
        );

        let later = SessionState::AwaitingContinuation
            .apply(SessionEvent::DirectiveSubmitted)
            .unwrap();
        assert_eq!(
            later.apply(SessionEvent::Abandon),
            Ok(SessionState::AwaitingContinuation)
        );
    }

    #[test]
    fn test_reset_from_identified_states() {
        for state in ALL_STATES {
            let result = state.apply(SessionEvent::Reset);
            if state == SessionState::AwaitingIdentity {
                assert!(result.is_err());
            } else {
                assert_eq!(result, Ok(SessionState::AwaitingFirstDirective));
            }
        }
    }

    #[test]
    fn test_invalid_transitions_are_errors() {
        assert!(SessionState::AwaitingIdentity
            .apply(SessionEvent::DirectiveSubmitted)
            .is_err());
        assert!(SessionState::Terminal
            .apply(SessionEvent::DirectiveSubmitted)
            .is_err());
        assert!(SessionState::AwaitingContinuation
            .apply(SessionEvent::IdentityAccepted)
            .is_err());
        let err = SessionState::AwaitingFirstDirective
            .apply(SessionEvent::TurnSucceeded)
            .unwrap_err();
        assert_eq!(err.state, SessionState::AwaitingFirstDirective);
        assert_eq!(err.event, SessionEvent::TurnSucceeded);
    }

    #[test]
    fn test_apply_is_total() {
        let mut valid = 0;
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                if state.apply(event).is_ok() {
                    valid += 1;
                }
            }
        }
        // 1 identity, 2 submits, 2 successes, 4 fail/abandon, 2 stops, 5 resets
        assert_eq!(valid, 16);
    }

    #[test]
    fn test_accepts_directive() {
        assert!(SessionState::AwaitingFirstDirective.accepts_directive());
        assert!(SessionState::AwaitingContinuation.accepts_directive());
        assert!(!SessionState::Terminal.accepts_directive());
        assert!(!SessionState::AwaitingIdentity.accepts_directive());
    }
}
