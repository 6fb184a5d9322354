//! Core singly-linked FIFO list with owned nodes.
//!
//! This is the data structure underneath the blocking MPMC queue. Nodes are
//! heap-allocated one per element and owned by the chain starting at `head`;
//! a raw tail cursor makes appends O(1) without walking the chain.
//!
//! # Safety
//!
//! The tail cursor aliases the last node of the owned chain, so the type
//! maintains a strict invariant: `tail` is null if and only if the list is
//! empty, and a non-null `tail` always points at the final node reachable
//! from `head`. Every mutation re-establishes this before returning.

use std::ptr;

/// A single heap-allocated element of the list.
///
/// Nodes are constructed separately from linking so callers can choose
/// which side of a critical section pays for the allocation.
pub struct Node<T> {
    value: T,
    next: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    /// Creates an unlinked node holding `value`.
    pub fn new(value: T) -> Self {
        Self { value, next: None }
    }
}

/// Unsynchronized FIFO list: push at the tail, pop at the head.
///
/// `len` counts the nodes in the chain; `len == 0` exactly when `head` is
/// `None` and `tail` is null.
pub struct List<T> {
    head: Option<Box<Node<T>>>,

    /// Append cursor. Null means the next push lands in `head`; otherwise
    /// it points at the last node and the push lands in that node's `next`.
    tail: *mut Node<T>,

    len: usize,
}

// SAFETY: List is Send because it owns every node it can reach. The raw
// `tail` pointer never outlives the chain it points into and is never shared
// outside the struct, so moving the whole List to another thread moves all
// aliases along with the data they alias. (List is intentionally not Sync:
// the queue layer wraps it in a Mutex.)
unsafe impl<T: Send> Send for List<T> {}

impl<T> List<T> {
    /// Creates an empty list.
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: ptr::null_mut(),
            len: 0,
        }
    }

    /// Appends `value` at the tail, allocating the node inline.
    pub fn push_back(&mut self, value: T) {
        self.push_node(Box::new(Node::new(value)));
    }

    /// Links a pre-allocated node at the tail.
    ///
    /// `Node::new` leaves `next` unlinked, so the node always becomes the
    /// new final element of the chain.
    pub fn push_node(&mut self, mut node: Box<Node<T>>) {
        // Capture the node's heap address before the box is moved into the
        // chain; boxed contents do not move when the Box itself does.
        let raw: *mut Node<T> = &mut *node;

        if self.tail.is_null() {
            self.head = Some(node);
        } else {
            // SAFETY: A non-null tail points at the last node of the chain
            // owned by `head` (module invariant), which is alive for the
            // duration of this call. `&mut self` rules out other access.
            unsafe {
                (*self.tail).next = Some(node);
            }
        }

        self.tail = raw;
        self.len += 1;
    }

    /// Removes and returns the head element, or `None` if the list is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let node = self.head.take()?;
        let Node { value, next } = *node;
        self.head = next;

        // Last node removed: the append cursor must fall back to the head
        // slot, otherwise the next push would write through a freed node.
        if self.head.is_none() {
            self.tail = ptr::null_mut();
        }

        self.len -= 1;
        Some(value)
    }

    /// Number of elements currently in the list.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        // Unlink nodes one at a time. The derived drop would recurse down
        // the `next` chain and overflow the stack on long lists.
        let mut next = self.head.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}
