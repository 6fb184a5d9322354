//! Blocking MPMC queue primitives for inter-thread communication.
//!
//! waitline provides an unbounded FIFO queue that any number of threads can
//! push to and pop from concurrently. Consumers block while the queue is
//! empty and wake when an element arrives; non-blocking and deadline-bounded
//! variants cover callers that cannot wait.
//!
//! # Overview
//!
//! - [`Queue`] - Cloneable handle to one shared queue
//! - [`Queue::push`] / [`Queue::pop`] - Blocking operations
//! - [`Queue::try_push`] / [`Queue::try_pop`] - Non-blocking variants
//! - [`Queue::pop_timeout`] - Blocking pop with a deadline
//!
//! # Example
//!
//! ```
//! use std::thread;
//! use waitline::Queue;
//!
//! let queue = Queue::new();
//!
//! let producer = queue.clone();
//! let worker = thread::spawn(move || {
//!     for job in 0..4u32 {
//!         producer.push(job);
//!     }
//! });
//!
//! for _ in 0..4 {
//!     let job = queue.pop();
//!     println!("got job {job}");
//! }
//! worker.join().unwrap();
//! ```
//!
//! # Tracing
//!
//! Build with `--features tracing` and call [`init_tracing`] to see queue
//! suspend/wake events. Filter with `RUST_LOG=waitline=trace`.

mod fifo;
pub mod sync;
mod trace;

#[doc(inline)]
pub use sync::mpmc::{Queue, TryPushError};

pub use trace::init_tracing;
