use alloc::{
    boxed::Box,
    collections::{BTreeMap, VecDeque},
};
use core::mem;
use hashbrown::HashSet;
use pdcp_rs_types::{
    count::{distance, increment32, CountSpace, SnWidth},
    error::{self, Error},
    traits::queue::{ReorderQueueEvent, ReorderQueueInput, ReorderQueueOutput},
    unit::Unit,
};

use super::timer::ReorderingTimer;
use crate::{integrity::IntegrityAlgorithm, window};

mod status;

pub use status::{ReceiverMetrics, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReceiverConfig {
    pub sn_width: SnWidth,

    /// Number of admitted units the receiver waits for a missing unit before it gives up on it
    pub reordering_threshold: u32,

    /// Largest accepted distance of a count ahead of the delivery cursor.
    /// Defaults to the window size of the sequence number width.
    pub max_outstanding: Option<u32>,
}

impl ReceiverConfig {
    pub fn new(sn_width: SnWidth, reordering_threshold: u32) -> Self {
        Self {
            sn_width,
            reordering_threshold,
            max_outstanding: None,
        }
    }

    pub fn try_from_bits(bits: u8, reordering_threshold: u32) -> Result<Self, Error> {
        Ok(Self::new(SnWidth::try_from(bits)?, reordering_threshold))
    }
}

/// Why a received unit was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Corrupted,
    /// The sequence number does not fit the configured width
    MalformedSn(u32),
    IntegrityFailure(u32),
    Duplicate(u32),
    Stale(u32),
    OutOfWindow(u32),
}

/// Result of handing a unit to the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Buffered under the reconstructed count
    Accepted(u32),
    Discarded(DiscardReason),
}

/// Receiving side of a session.
///
/// Reconstructs the count of every unit from its sequence number, drops corrupted, duplicate
/// and stale units, and buffers the rest until they can be delivered in count order. If a gap
/// persists for `reordering_threshold` admitted units, everything buffered below `rx_next` is
/// delivered anyway and the missing counts are abandoned.
///
/// Delivered units are queued and read with [ReorderQueueOutput::next_event].
pub struct Receiver {
    space: CountSpace,

    reordering_threshold: u32,

    max_outstanding: u32,

    /// count of the first unit not yet delivered
    rx_deliv: u32,

    /// one past the highest admitted count
    rx_next: u32,

    /// admitted, undelivered units
    buffer: BTreeMap<u32, Unit>,

    /// every count ever admitted
    seen: HashSet<u32>,

    timer: ReorderingTimer,

    delivered_ids: HashSet<u64>,

    events: VecDeque<ReorderQueueEvent<Unit>>,

    metrics: ReceiverMetrics,

    integrity: Option<Box<dyn IntegrityAlgorithm + Send>>,
}

impl Receiver {
    pub fn try_new(config: ReceiverConfig) -> Result<Self, Error> {
        let space = CountSpace::new(config.sn_width);
        if config.reordering_threshold == 0 {
            return Err(error::invalid_threshold(config.reordering_threshold));
        }
        let max_outstanding = config.max_outstanding.unwrap_or(space.window_size());
        if max_outstanding == 0 || max_outstanding > space.window_size() {
            return Err(error::invalid_reordering_window(
                max_outstanding,
                space.window_size(),
            ));
        }
        tracing::info!(
            window_size = space.window_size(),
            threshold = config.reordering_threshold,
            max_outstanding,
            "receiver initialized with {} sequence numbers",
            config.sn_width
        );
        Ok(Self {
            space,
            reordering_threshold: config.reordering_threshold,
            max_outstanding,
            rx_deliv: 0,
            rx_next: 0,
            buffer: BTreeMap::new(),
            seen: HashSet::new(),
            timer: ReorderingTimer::Idle,
            delivered_ids: HashSet::new(),
            events: VecDeque::new(),
            metrics: ReceiverMetrics::default(),
            integrity: None,
        })
    }

    /// Expect the first unit at `count` instead of zero
    pub fn with_initial_count(mut self, count: u32) -> Self {
        self.rx_deliv = count;
        self.rx_next = count;
        self
    }

    /// Verify the integrity tag of every unit before admitting it
    pub fn with_integrity(mut self, algorithm: impl IntegrityAlgorithm + Send + 'static) -> Self {
        self.integrity = Some(Box::new(algorithm));
        self
    }
}

impl Receiver {
    /// Run a received unit through the admission pipeline
    pub fn receive(&mut self, unit: Unit) -> Admission {
        match self.admit(unit) {
            Ok(count) => {
                self.deliver_in_sequence();
                self.update_timer();
                Admission::Accepted(count)
            }
            Err(reason) => Admission::Discarded(reason),
        }
    }

    /// Deliver what is contiguous from `rx_deliv` and stop at the first gap. Units behind the
    /// gap stay buffered, returns their number.
    pub fn flush(&mut self) -> usize {
        tracing::info!(
            rx_deliv = self.rx_deliv,
            buffered = self.buffer.len(),
            "flush reordering buffer"
        );
        self.deliver_in_sequence();
        let residual = self.buffer.len();
        if residual > 0 {
            tracing::warn!(
                residual,
                rx_deliv = self.rx_deliv,
                "units remain buffered behind a missing count after flush"
            );
        }
        residual
    }

    fn admit(&mut self, unit: Unit) -> Result<u32, DiscardReason> {
        if unit.corrupted {
            self.metrics.discarded_corrupt += 1;
            tracing::warn!(
                sn = unit.sn,
                payload_id = unit.payload_id,
                "discard corrupted unit"
            );
            return Err(DiscardReason::Corrupted);
        }
        if !self.space.is_valid_sn(unit.sn) {
            self.metrics.discarded_malformed += 1;
            tracing::error!(
                sn = unit.sn,
                max_sn = self.space.max_sn(),
                "discard unit with malformed sequence number"
            );
            return Err(DiscardReason::MalformedSn(unit.sn));
        }

        let hfn = window::estimate_hfn(self.rx_deliv, &self.space, unit.sn);
        let count = self.space.reconstruct(hfn, unit.sn);
        tracing::trace!(
            sn = unit.sn,
            hfn,
            count,
            rx_deliv = self.rx_deliv,
            rx_next = self.rx_next,
            "reconstructed count"
        );

        if let Some(integrity) = &self.integrity {
            let verified = unit
                .mac
                .map(|mac| integrity.verify(count, &unit.payload, &mac))
                .unwrap_or(false);
            if !verified {
                self.metrics.discarded_integrity += 1;
                tracing::warn!(count, payload_id = unit.payload_id, "integrity check failed");
                return Err(DiscardReason::IntegrityFailure(count));
            }
        }
        if self.seen.contains(&count) {
            self.metrics.discarded_duplicate += 1;
            tracing::debug!(count, payload_id = unit.payload_id, "discard duplicate");
            return Err(DiscardReason::Duplicate(count));
        }
        if count < self.rx_deliv {
            self.metrics.discarded_stale += 1;
            tracing::debug!(
                count,
                rx_deliv = self.rx_deliv,
                payload_id = unit.payload_id,
                "discard stale unit"
            );
            return Err(DiscardReason::Stale(count));
        }
        if distance(self.rx_deliv, count) >= self.max_outstanding {
            self.metrics.discarded_out_of_window += 1;
            tracing::debug!(
                count,
                rx_deliv = self.rx_deliv,
                max_outstanding = self.max_outstanding,
                "discard unit beyond the reordering window"
            );
            return Err(DiscardReason::OutOfWindow(count));
        }

        self.buffer.insert(count, unit);
        self.seen.insert(count);
        // plain comparison, does not survive the 32 bit wrap of the count
        self.rx_next = self.rx_next.max(increment32(count));
        Ok(count)
    }

    fn deliver(&mut self, count: u32, unit: Unit, in_order: bool) {
        if in_order {
            tracing::debug!(count, payload_id = unit.payload_id, "deliver");
        } else {
            self.metrics.out_of_order_deliveries += 1;
            tracing::warn!(
                count,
                payload_id = unit.payload_id,
                "deliver out of order after reordering timeout"
            );
        }
        self.delivered_ids.insert(unit.payload_id);
        self.events.push_back(ReorderQueueEvent::Packet {
            count,
            packet: unit,
            in_order,
        });
    }

    /// Deliver buffered units while the one at `rx_deliv` is present
    fn deliver_in_sequence(&mut self) {
        while let Some(unit) = self.buffer.remove(&self.rx_deliv) {
            self.deliver(self.rx_deliv, unit, true);
            self.rx_deliv = increment32(self.rx_deliv);
        }
    }

    fn gap_exists(&self) -> bool {
        !self.buffer.is_empty()
            && !self.buffer.contains_key(&self.rx_deliv)
            && self.rx_deliv < self.rx_next
    }

    /// Arm, tick, expire or stop the reordering timer after a unit was admitted
    fn update_timer(&mut self) {
        if !self.gap_exists() {
            if self.timer.is_armed() {
                tracing::debug!(rx_deliv = self.rx_deliv, "gap closed, stop reordering timer");
                self.timer.disarm();
            }
            return;
        }
        if !self.timer.is_armed() {
            self.timer.arm(self.rx_deliv);
            tracing::info!(
                rx_deliv = self.rx_deliv,
                rx_next = self.rx_next,
                "gap detected, start reordering timer"
            );
        }
        if self.timer.tick() >= self.reordering_threshold {
            self.expire_timer();
        }
    }

    /// Deliver everything buffered below `rx_next` in count order and move the cursor past
    /// the counts that never arrived.
    fn expire_timer(&mut self) {
        tracing::warn!(
            rx_deliv = self.rx_deliv,
            anchor = ?self.timer.anchor(),
            rx_next = self.rx_next,
            threshold = self.reordering_threshold,
            "reordering timer expired"
        );
        self.metrics.timer_expiries += 1;

        let above = self.buffer.split_off(&self.rx_next);
        let due = mem::replace(&mut self.buffer, above);
        let mut expected = self.rx_deliv;
        for (count, unit) in due {
            let in_order = count == expected;
            if !in_order {
                self.events.push_back(ReorderQueueEvent::Missing {
                    from: expected,
                    to: count,
                });
            }
            self.deliver(count, unit, in_order);
            expected = increment32(count);
        }

        // everything below rx_next is now either delivered or given up on
        if expected != self.rx_next {
            self.events.push_back(ReorderQueueEvent::Missing {
                from: expected,
                to: self.rx_next,
            });
        }
        // first missing count at or above rx_next, nothing is buffered past rx_next
        self.rx_deliv = self.rx_next;
        self.timer.disarm();
        self.deliver_in_sequence();

        tracing::info!(
            rx_deliv = self.rx_deliv,
            buffered = self.buffer.len(),
            "delivery cursor moved after reordering timeout"
        );
    }
}

impl Receiver {
    pub fn rx_deliv(&self) -> u32 {
        self.rx_deliv
    }

    pub fn rx_next(&self) -> u32 {
        self.rx_next
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_timer_active(&self) -> bool {
        self.timer.is_armed()
    }

    /// Payload ids delivered so far
    pub fn delivered_ids(&self) -> &HashSet<u64> {
        &self.delivered_ids
    }

    pub fn space(&self) -> &CountSpace {
        &self.space
    }

    pub fn status(&self) -> Status {
        Status {
            delivered: self.delivered_ids.len() as u64,
            buffered: self.buffer.len(),
            metrics: self.metrics.clone(),
            rx_deliv: self.rx_deliv,
            rx_next: self.rx_next,
            timer_active: self.timer.is_armed(),
            buffered_head: self.buffer.keys().take(Status::HEAD_LEN).copied().collect(),
        }
    }
}

impl ReorderQueueInput<Unit> for Receiver {
    type Outcome = Admission;

    fn put(&mut self, packet: Unit) -> Admission {
        self.receive(packet)
    }
}

impl ReorderQueueOutput<Unit> for Receiver {
    fn next_event(&mut self) -> ReorderQueueEvent<Unit> {
        self.events
            .pop_front()
            .unwrap_or(ReorderQueueEvent::NeedMore)
    }
}
