//! Application layer: the workflow engine and the payment bridge.
//!
//! Both own their store ports as boxed trait objects and are shared across
//! request handlers behind an `Arc`. Neither holds any mutable state of its own.

pub mod payments;
pub mod workflow;
