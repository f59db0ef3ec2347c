/// Traits implemented by reordering queues
pub mod queue;
