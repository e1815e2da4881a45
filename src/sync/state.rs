//! Sweep states and the cursor.

/// What the sequencer is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No request outstanding.
    #[default]
    Idle,
    /// Names of the sample bank with this id.
    AwaitingSampleBank(u8),
    /// One bar of a sequence. `seq` may be the active-sequence sentinel.
    AwaitingSequenceBar { seq: u8, bar: u8 },
    /// Parameters of the voice at this position of the config order.
    AwaitingVoiceConfig(usize),
    AwaitingAdc,
    AwaitingReverb,
    AwaitingStatus,
}

impl SyncState {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }
}

/// Position of the sequencer within the current sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCursor {
    state: SyncState,
    accepted: usize,
}

impl SyncCursor {
    /// Cursor of a freshly started sweep.
    pub fn start(state: SyncState) -> Self {
        Self { state, accepted: 0 }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Responses accepted since the sweep started.
    #[inline]
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Record an accepted response and move to the next state.
    pub(crate) fn advance(&mut self, next: SyncState) {
        self.state = next;
        self.accepted += 1;
    }
}
