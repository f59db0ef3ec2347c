use alloc::vec::Vec;

/// Running tallies of a receiver
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReceiverMetrics {
    pub discarded_duplicate: u64,
    pub discarded_stale: u64,
    pub discarded_corrupt: u64,
    pub discarded_integrity: u64,
    pub discarded_malformed: u64,
    pub discarded_out_of_window: u64,
    pub out_of_order_deliveries: u64,
    pub timer_expiries: u64,
}

/// Point in time snapshot of a receiver
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Status {
    /// Distinct payload ids delivered so far
    pub delivered: u64,
    pub buffered: usize,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub metrics: ReceiverMetrics,
    pub rx_deliv: u32,
    pub rx_next: u32,
    pub timer_active: bool,
    /// Lowest buffered counts, at most [Status::HEAD_LEN]
    pub buffered_head: Vec<u32>,
}

impl Status {
    pub const HEAD_LEN: usize = 10;
}
