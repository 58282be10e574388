//! Exchange lifecycle states.

/// The progress of a single request/response exchange.
///
/// States only move forward through the pipeline. `ReadingBody` is the one
/// state that is re-entered, once per body read issued by the caller.
/// `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Connecting,
    SendingHeaders,
    SendingBody,
    ReadingHeaders,
    ReadingBody,
    Complete,
    Failed,
}

impl ExchangeState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangeState::Complete | ExchangeState::Failed)
    }

    /// Pipeline position, used to reject backward transitions.
    fn rank(self) -> u8 {
        match self {
            ExchangeState::Idle => 0,
            ExchangeState::Connecting => 1,
            ExchangeState::SendingHeaders => 2,
            ExchangeState::SendingBody => 3,
            ExchangeState::ReadingHeaders => 4,
            ExchangeState::ReadingBody => 5,
            ExchangeState::Complete | ExchangeState::Failed => 6,
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: ExchangeState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == ExchangeState::Failed {
            return true;
        }
        if self == ExchangeState::ReadingBody && next == ExchangeState::ReadingBody {
            return true;
        }
        next.rank() > self.rank()
    }
}
