#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

/// Count arithmetic: sequence numbers, hyper frame numbers and 32 bit wrapping
pub mod count;

pub mod error;

pub mod traits;

pub mod unit;
