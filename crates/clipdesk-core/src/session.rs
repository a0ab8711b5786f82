//! Upload session state machine
//!
//! One session drives one upload attempt. Transfer callbacks are modelled as
//! [`SessionEvent`] values consumed by a single transition function,
//! [`SessionState::on_event`], so that terminal states absorb every later event.
//!
//! ```text
//! Idle ──begin_transfer──▶ InFlight(p) ──progress──▶ InFlight(p')
//!   │                          ├──success──▶ Complete
//!   │                          ├──error────▶ Failed(detail)
//!   │                          └──abort────▶ Aborted
//!   ├──complete_remote──▶ Complete
//!   └──fail─────────────▶ Failed(detail)
//! ```
//!
//! The session holds the cancelable control handle of the transfer while it is in
//! flight and hands it back exactly once, on the transition into a terminal state.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// Transfer running; integer percent in `0..=100`
    InFlight(u8),
    Complete,
    Failed(String),
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::Failed(_) | SessionState::Aborted
        )
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, SessionState::InFlight(_))
    }

    /// Percent to display. Only defined while the transfer is running.
    pub fn percent(&self) -> Option<u8> {
        match self {
            SessionState::InFlight(percent) => Some(*percent),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::InFlight(_) => "in_flight",
            SessionState::Complete => "complete",
            SessionState::Failed(_) => "failed",
            SessionState::Aborted => "aborted",
        }
    }

    /// Apply a transfer event. Events only act on a running transfer; in every
    /// other state the current state is returned unchanged.
    pub fn on_event(self, event: &SessionEvent) -> SessionState {
        match (self, event) {
            (SessionState::InFlight(_), SessionEvent::Progress(raw)) => {
                SessionState::InFlight(clamp_percent(*raw))
            }
            (SessionState::InFlight(_), SessionEvent::Error(detail)) => {
                SessionState::Failed(detail.clone())
            }
            (SessionState::InFlight(_), SessionEvent::Success) => SessionState::Complete,
            (state, _) => state,
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SessionState::InFlight(percent) => write!(f, "in_flight({}%)", percent),
            SessionState::Failed(message) => write!(f, "failed({})", message),
            other => f.write_str(other.name()),
        }
    }
}

/// Something the chunked transfer reported.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Raw progress in percent; may be fractional or out of range
    Progress(f64),
    Error(String),
    Success,
}

/// Floor a raw progress value into `0..=100`. NaN counts as zero.
pub fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.floor().clamp(0.0, 100.0) as u8
}

/// State of one upload attempt plus the control handle of its transfer.
#[derive(Debug)]
pub struct UploadSession<H> {
    state: SessionState,
    control: Option<H>,
}

impl<H> Default for UploadSession<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> UploadSession<H> {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            control: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    fn holds_control(&self) -> bool {
        self.control.is_some()
    }

    fn require_idle(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::InFlight(_) => Err(SessionError::AlreadyInFlight),
            ref other => Err(SessionError::NotInFlight {
                state: other.name().to_string(),
            }),
        }
    }

    /// Idle → InFlight(0). The session keeps `control` until it terminates.
    pub fn begin_transfer(&mut self, control: H) -> Result<(), SessionError> {
        self.require_idle()?;
        self.state = SessionState::InFlight(0);
        self.control = Some(control);
        Ok(())
    }

    /// Idle → Complete, for sources the provider ingests on its own.
    pub fn complete_remote(&mut self) -> Result<(), SessionError> {
        self.require_idle()?;
        self.state = SessionState::Complete;
        Ok(())
    }

    /// Idle → Failed, when the upload could not be registered at all.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        self.require_idle()?;
        self.state = SessionState::Failed(message.into());
        Ok(())
    }

    /// Apply a transfer event. Returns the control handle when this event ended
    /// the session.
    pub fn apply(&mut self, event: &SessionEvent) -> Option<H> {
        let previous = std::mem::replace(&mut self.state, SessionState::Idle);
        let was_terminal = previous.is_terminal();
        self.state = previous.on_event(event);

        if !was_terminal && self.state.is_terminal() {
            self.control.take()
        } else {
            None
        }
    }

    /// InFlight → Aborted. Returns the control handle so the caller can cancel the
    /// transfer. Any other state is left untouched and reported as an error.
    pub fn abort(&mut self) -> Result<Option<H>, SessionError> {
        if !self.state.is_in_flight() {
            return Err(SessionError::NotInFlight {
                state: self.state.name().to_string(),
            });
        }
        self.state = SessionState::Aborted;
        Ok(self.control.take())
    }
}
