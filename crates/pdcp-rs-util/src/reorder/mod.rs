/// Count reconstructing reordering receiver
pub mod receiver;

/// Logical forced delivery timer
pub mod timer;
