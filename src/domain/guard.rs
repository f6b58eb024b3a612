//! Guard decision and what the protected area renders for it.

/// Outcome of one authentication evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardDecision {
    #[default]
    Pending,
    Denied,
    Granted,
}

impl GuardDecision {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GuardDecision::Pending)
    }
}

/// What the guarded layout shows. Placeholders never carry failure detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    CheckingAuthentication,
    RedirectingToLogin,
    Protected,
}

impl RenderState {
    pub fn placeholder_text(self) -> Option<&'static str> {
        match self {
            RenderState::CheckingAuthentication => Some("Checking authentication..."),
            RenderState::RedirectingToLogin => Some("Redirecting to login..."),
            RenderState::Protected => None,
        }
    }
}

impl From<GuardDecision> for RenderState {
    fn from(decision: GuardDecision) -> Self {
        match decision {
            GuardDecision::Pending => RenderState::CheckingAuthentication,
            GuardDecision::Denied => RenderState::RedirectingToLogin,
            GuardDecision::Granted => RenderState::Protected,
        }
    }
}
