//! Synchronization primitives for in-process communication.
//!
//! This module provides the thread-safe blocking queue used for
//! communication between threads within the same process.

pub mod mpmc;
