/// Reordering timer. Counts admitted units instead of wall clock time, so expiry is fully
/// determined by the sequence of received units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReorderingTimer {
    #[default]
    Idle,

    /// Running since the delivery cursor was at `anchor`, `ticks` units admitted since then
    Armed { anchor: u32, ticks: u32 },
}

impl ReorderingTimer {
    pub fn is_armed(&self) -> bool {
        matches!(self, ReorderingTimer::Armed { .. })
    }

    /// Start the timer, a no-op if it is already running
    pub fn arm(&mut self, anchor: u32) {
        if !self.is_armed() {
            *self = ReorderingTimer::Armed { anchor, ticks: 0 }
        }
    }

    pub fn disarm(&mut self) {
        *self = ReorderingTimer::Idle
    }

    /// Count one admitted unit, returns the number of ticks so far
    pub fn tick(&mut self) -> u32 {
        match self {
            ReorderingTimer::Idle => 0,
            ReorderingTimer::Armed { ticks, .. } => {
                *ticks += 1;
                *ticks
            }
        }
    }

    pub fn anchor(&self) -> Option<u32> {
        match self {
            ReorderingTimer::Idle => None,
            ReorderingTimer::Armed { anchor, .. } => Some(*anchor),
        }
    }

    pub fn ticks(&self) -> u32 {
        match self {
            ReorderingTimer::Idle => 0,
            ReorderingTimer::Armed { ticks, .. } => *ticks,
        }
    }
}
