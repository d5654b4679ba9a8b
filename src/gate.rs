use crate::config::GateSettings;

pub const LOGIN_SUCCESS_MESSAGE: &str = "Login Successful!";
pub const LOGIN_FAILURE_MESSAGE: &str = "Incorrect Password!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    InvalidCredential,
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthOutcome::Success => LOGIN_SUCCESS_MESSAGE,
            AuthOutcome::InvalidCredential => LOGIN_FAILURE_MESSAGE,
        }
    }
}

/// Password gate in front of the upload workflow.
///
/// The comparison is a plaintext equality check against configuration; it
/// keeps casual visitors out and nothing more.
#[derive(Debug, Clone)]
pub struct AccessGate {
    settings: GateSettings,
    authenticated: bool,
    last_outcome: Option<AuthOutcome>,
}

impl AccessGate {
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            authenticated: false,
            last_outcome: None,
        }
    }

    pub fn attempt_login(&mut self, candidate: &str) -> AuthOutcome {
        let outcome = if self.settings.matches(candidate) {
            self.authenticated = true;
            AuthOutcome::Success
        } else {
            AuthOutcome::InvalidCredential
        };
        self.last_outcome = Some(outcome);
        outcome
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
        self.last_outcome = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Status line for the last attempt, if any.
    pub fn message(&self) -> Option<&'static str> {
        self.last_outcome.map(|outcome| outcome.message())
    }
}
