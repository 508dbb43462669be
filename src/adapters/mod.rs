//! Adapters implementing the domain ports outside the HTTP stack.

pub mod memory;
