//! Core FIFO (First-In First-Out) list primitives.
//!
//! This module contains the unsynchronized linked-list algorithm used by:
//! - [`crate::sync::mpmc`] - Blocking in-process queues over heap memory
//!
//! The list itself carries no locking. Callers are responsible for
//! serializing access; see the queue layer for the locking protocol.

pub(crate) mod list;
