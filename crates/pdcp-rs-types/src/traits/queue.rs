/// Output of a reordering queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderQueueEvent<P> {
    /// A packet released to the upper layer. `in_order` is false if the packet was released
    /// by a forced delivery that skipped over at least one missing count.
    Packet { count: u32, packet: P, in_order: bool },

    /// Counts in `from..to` were given up on and will never be delivered
    Missing { from: u32, to: u32 },

    /// Nothing to deliver, need more packets
    NeedMore,
}

/**
 * Write unordered packets
 */
pub trait ReorderQueueInput<P> {
    type Outcome;

    fn put(&mut self, packet: P) -> Self::Outcome;
}

/**
 * Read reordered packets
 */
pub trait ReorderQueueOutput<P> {
    fn next_event(&mut self) -> ReorderQueueEvent<P>;
}
