//! UI-facing state machine for one generation at a time.
//!
//! `Idle -> Pending -> Succeeded | Failed`. Transitions are computed by the
//! pure [`reduce`] function; [`Session`] wires it to a
//! [`GenerationOrchestrator`] for async completion.

use crate::cancel::CancelToken;
use crate::models::{GenerateParams, GenerationMode, GenerationResult};
use crate::orchestrator::GenerationOrchestrator;
use crate::{Error, ErrorKind};

/// Form contents shown while idle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub prompt: String,
    pub mode: GenerationMode,
}

/// A failed operation as shown to the user. The kind is kept so callers can
/// branch on it later even though only the message is displayed today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: format!("Generation failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle {
        draft: Draft,
    },
    Pending {
        params: GenerateParams,
    },
    Succeeded {
        params: GenerateParams,
        result: GenerationResult,
    },
    Failed {
        params: GenerateParams,
        failure: Failure,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle {
            draft: Draft::default(),
        }
    }
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Pending { .. })
    }

    /// Parameters of the most recent submission, kept for retry.
    pub fn last_params(&self) -> Option<&GenerateParams> {
        match self {
            SessionState::Idle { .. } => None,
            SessionState::Pending { params }
            | SessionState::Succeeded { params, .. }
            | SessionState::Failed { params, .. } => Some(params),
        }
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            SessionState::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            SessionState::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start a new operation.
    Submit(GenerateParams),
    /// The pending operation finished.
    Resolved(std::result::Result<GenerationResult, Failure>),
    /// Re-run the last submission with identical parameters.
    Retry,
    /// Discard everything and return to an empty form.
    Reset,
    /// Seed a thumbnail-set draft with one of the suggested titles.
    UseTitle(String),
}

/// Compute the next state. Actions that make no sense in the current state
/// leave it unchanged.
pub fn reduce(state: SessionState, action: Action) -> SessionState {
    match (state, action) {
        (SessionState::Pending { params }, Action::Submit(_)) => {
            tracing::debug!("Ignoring submit while a generation is pending");
            SessionState::Pending { params }
        }
        (state, Action::Submit(params)) => {
            if params.prompt.trim().is_empty() {
                tracing::debug!("Ignoring submit with an empty prompt");
                state
            } else {
                SessionState::Pending { params }
            }
        }

        (SessionState::Pending { params }, Action::Resolved(Ok(result))) => {
            if result.is_empty() {
                SessionState::Failed {
                    params,
                    failure: Failure::from(&Error::NoResultsProduced),
                }
            } else {
                SessionState::Succeeded { params, result }
            }
        }
        (SessionState::Pending { params }, Action::Resolved(Err(failure))) => {
            SessionState::Failed { params, failure }
        }

        (SessionState::Succeeded { params, .. }, Action::Retry)
        | (SessionState::Failed { params, .. }, Action::Retry) => {
            SessionState::Pending { params }
        }

        (_, Action::Reset) => SessionState::default(),

        (
            SessionState::Succeeded {
                result: GenerationResult::Titles(titles),
                params,
            },
            Action::UseTitle(title),
        ) => {
            if titles.iter().any(|candidate| candidate.title == title) {
                SessionState::Idle {
                    draft: Draft {
                        prompt: title,
                        mode: GenerationMode::ThumbnailSet,
                    },
                }
            } else {
                tracing::debug!("Ignoring unknown title '{}'", title);
                SessionState::Succeeded {
                    params,
                    result: GenerationResult::Titles(titles),
                }
            }
        }

        (state, action) => {
            tracing::debug!("Ignoring {:?} in state {:?}", action, state);
            state
        }
    }
}

/// Drives [`reduce`] around real generation calls.
pub struct Session<'a> {
    orchestrator: &'a GenerationOrchestrator,
    state: SessionState,
    cancel: CancelToken,
}

impl<'a> Session<'a> {
    pub fn new(orchestrator: &'a GenerationOrchestrator) -> Self {
        Self {
            orchestrator,
            state: SessionState::default(),
            cancel: CancelToken::never(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) -> &SessionState {
        let current = std::mem::take(&mut self.state);
        self.state = reduce(current, action);
        &self.state
    }

    pub async fn submit(&mut self, params: GenerateParams) -> &SessionState {
        self.dispatch(Action::Submit(params));
        self.run_pending().await
    }

    pub async fn retry(&mut self) -> &SessionState {
        self.dispatch(Action::Retry);
        self.run_pending().await
    }

    pub fn reset(&mut self) -> &SessionState {
        self.dispatch(Action::Reset)
    }

    pub fn use_title(&mut self, title: impl Into<String>) -> &SessionState {
        self.dispatch(Action::UseTitle(title.into()))
    }

    async fn run_pending(&mut self) -> &SessionState {
        let params = match &self.state {
            SessionState::Pending { params } => params.clone(),
            _ => return &self.state,
        };

        let outcome = self
            .orchestrator
            .generate_with_cancel(&params, &self.cancel)
            .await
            .map_err(|e| Failure::from(&e));

        self.dispatch(Action::Resolved(outcome))
    }
}
