#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

/// Integrity protection of payloads
pub mod integrity;

/// Reordering receiver and its forced delivery timer
pub mod reorder;

pub mod tx;

/// Hyper frame number estimation
pub mod window;
