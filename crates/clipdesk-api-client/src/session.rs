//! Upload sessions driven against the live API.
//!
//! Each session is owned by one driver task. The task holds the
//! [`UploadSession`] value and consumes a single message stream carrying transfer
//! events and abort commands, so transitions never interleave. The current state is
//! published on a `watch` channel.

use crate::error::{ApiError, StartError};
use crate::transfer::{ChunkedTransfer, TransferOptions};
use crate::{ApiClient, SubmitOutcome};
use clipdesk_core::models::{UploadForm, UploadSource};
use clipdesk_core::session::{SessionEvent, SessionState, UploadSession};
use clipdesk_core::{log_error, validate_upload_form, ErrorMetadata, SessionError, UploadError};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

const INBOX_CAPACITY: usize = 64;

/// Message consumed by the session driver.
#[derive(Debug)]
pub enum SessionMessage {
    Transfer(SessionEvent),
    Abort(oneshot::Sender<Result<(), SessionError>>),
}

impl From<SessionEvent> for SessionMessage {
    fn from(event: SessionEvent) -> Self {
        SessionMessage::Transfer(event)
    }
}

/// Caller's view of a running or finished session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: watch::Receiver<SessionState>,
    inbox: mpsc::Sender<SessionMessage>,
}

impl SessionHandle {
    /// Handle for a session that never needs a driver (already terminal).
    fn finished(state: SessionState) -> Self {
        let (_state_tx, state_rx) = watch::channel(state);
        let (inbox, _) = mpsc::channel(1);
        Self {
            state: state_rx,
            inbox,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Abort the transfer. Only legal while the session is in flight; in any other
    /// state nothing changes and the error names the current state.
    pub async fn abort(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.inbox.send(SessionMessage::Abort(reply_tx)).await.is_err() {
            return Err(self.stopped_error());
        }
        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(self.stopped_error()),
        }
    }

    /// Wait for the session to reach a terminal state.
    pub async fn wait(&self) -> Result<SessionState, SessionError> {
        let mut state = self.state.clone();
        let terminal = match state.wait_for(SessionState::is_terminal).await {
            Ok(current) => (*current).clone(),
            Err(_) => return Err(SessionError::Closed),
        };
        Ok(terminal)
    }

    fn stopped_error(&self) -> SessionError {
        let state = self.state();
        if state.is_terminal() {
            SessionError::NotInFlight {
                state: state.name().to_string(),
            }
        } else {
            SessionError::Closed
        }
    }
}

fn publish(state_tx: &watch::Sender<SessionState>, current: &SessionState) {
    state_tx.send_if_modified(|published| {
        if *published == *current {
            return false;
        }
        tracing::debug!(from = %published, to = %current, "Upload session transition");
        *published = current.clone();
        true
    });
}

async fn drive(
    mut session: UploadSession<CancellationToken>,
    mut inbox: mpsc::Receiver<SessionMessage>,
    state_tx: watch::Sender<SessionState>,
) {
    while let Some(message) = inbox.recv().await {
        match message {
            SessionMessage::Transfer(event) => {
                if session.apply(&event).is_some() {
                    tracing::debug!("Transfer control released");
                    if let SessionState::Failed(detail) = session.state() {
                        log_error(&UploadError::from_failure(detail.as_str()));
                    }
                }
                publish(&state_tx, session.state());
            }
            SessionMessage::Abort(reply) => {
                let result = session.abort().map(|control| {
                    if let Some(token) = control {
                        token.cancel();
                    }
                });
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "Abort ignored");
                }
                // The caller must observe the new state once the reply arrives.
                publish(&state_tx, session.state());
                let _ = reply.send(result);
            }
        }

        if session.state().is_terminal() {
            tracing::info!(state = %session.state(), "Upload session finished");
            break;
        }
    }
}

/// Starts upload sessions, one at a time.
#[derive(Debug)]
pub struct Uploader {
    api: ApiClient,
    transfer_client: Client,
    options: TransferOptions,
    current: Option<SessionHandle>,
}

impl Uploader {
    pub fn new(api: ApiClient) -> anyhow::Result<Self> {
        let config = api.config();
        // 308 answers from the upload target mean "resume", never a redirect.
        let transfer_client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let options = TransferOptions::from_config(config);

        Ok(Self {
            api,
            transfer_client,
            options,
            current: None,
        })
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }

    /// Validate the form, register the upload and start a session.
    ///
    /// Field problems are reported before any request is made. A rejection by the
    /// host's own validation is reported the same way. Any other failure to register
    /// the upload yields a session that is already `Failed`.
    pub async fn start(&mut self, form: &UploadForm) -> Result<SessionHandle, StartError> {
        if self
            .current
            .as_ref()
            .is_some_and(|handle| !handle.state().is_terminal())
        {
            return Err(SessionError::AlreadyInFlight.into());
        }

        let request = validate_upload_form(form)?;

        let mut session = UploadSession::new();
        let outcome = match self.api.submit_upload(&request).await {
            Ok(outcome) => outcome,
            Err(ApiError::Rejected(errors)) => {
                return Err(UploadError::FieldValidation(errors).into())
            }
            Err(e) => {
                let error = UploadError::from(e);
                log_error(&error);
                session.fail(error.client_message())?;
                return Ok(self.keep(SessionHandle::finished(session.state().clone())));
            }
        };

        let handle = match (outcome, request.source) {
            (SubmitOutcome::UploadTarget { url }, UploadSource::File(file)) => {
                let cancel = CancellationToken::new();
                session.begin_transfer(cancel.clone())?;

                let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
                let (state_tx, state_rx) = watch::channel(session.state().clone());
                tokio::spawn(drive(session, inbox_rx, state_tx));

                let transfer =
                    ChunkedTransfer::new(self.transfer_client.clone(), url, file, self.options);
                tokio::spawn(transfer.run(inbox_tx.clone(), cancel));

                SessionHandle {
                    state: state_rx,
                    inbox: inbox_tx,
                }
            }
            (SubmitOutcome::Accepted { .. }, UploadSource::RemoteUrl(url)) => {
                tracing::info!(url = %url, "Remote upload registered");
                session.complete_remote()?;
                SessionHandle::finished(session.state().clone())
            }
            (outcome, source) => {
                tracing::warn!(?outcome, kind = %source.kind(), "Unexpected upload response");
                session.fail("Unable to resolve upload state")?;
                SessionHandle::finished(session.state().clone())
            }
        };

        Ok(self.keep(handle))
    }

    fn keep(&mut self, handle: SessionHandle) -> SessionHandle {
        self.current = Some(handle.clone());
        handle
    }

    /// Discard the current session so a new one can start. A transfer still in
    /// flight is aborted first.
    pub async fn reset(&mut self) {
        if let Some(handle) = self.current.take() {
            if handle.state().is_in_flight() {
                if let Err(e) = handle.abort().await {
                    tracing::debug!(error = %e, "Discarded session was no longer in flight");
                }
            }
        }
    }
}
