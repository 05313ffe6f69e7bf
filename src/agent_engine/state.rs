/// Lifecycle of a single answer attempt. Strictly sequential; a platform
/// error at any step jumps straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    Classifying,
    Planning,
    Resolving,
    Interacting,
    Validating,
    Succeeded,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Succeeded | AttemptState::Failed)
    }

    /// The state that follows on the happy path.
    pub fn next(self) -> AttemptState {
        match self {
            AttemptState::Idle => AttemptState::Classifying,
            AttemptState::Classifying => AttemptState::Planning,
            AttemptState::Planning => AttemptState::Resolving,
            AttemptState::Resolving => AttemptState::Interacting,
            AttemptState::Interacting => AttemptState::Validating,
            AttemptState::Validating => AttemptState::Succeeded,
            terminal => terminal,
        }
    }
}

/// Tracks one attempt through its states, refusing to go backwards.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    question_index: u32,
    state: AttemptState,
}

impl AttemptTracker {
    pub fn new(question_index: u32) -> Self {
        Self {
            question_index,
            state: AttemptState::Idle,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Move to the next happy-path state.
    pub fn advance(&mut self) -> AttemptState {
        let next = self.state.next();
        if next != self.state {
            tracing::debug!(question = self.question_index, from = ?self.state, to = ?next, "attempt state");
        }
        self.state = next;
        next
    }

    /// Advance until `target` is reached. Returns false when `target` lies behind.
    pub fn advance_to(&mut self, target: AttemptState) -> bool {
        while self.state != target {
            if self.state.is_terminal() {
                return false;
            }
            self.advance();
        }
        true
    }

    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(question = self.question_index, from = ?self.state, "attempt failed");
            self.state = AttemptState::Failed;
        }
    }
}
