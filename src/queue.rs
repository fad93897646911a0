//! FIFO used by a [`Future`](crate::Future) to hold reactions registered
//! before it resolves.
//!
//! The queue is a circular singly linked list that only keeps a pointer to
//! its tail. The node after the tail is the head, so both ends are reachable
//! in constant time without storing a second pointer.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

struct Node<T> {
    value: T,
    next: NonNull<Node<T>>,
}

pub struct PendingQueue<T> {
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    _owns: PhantomData<Box<Node<T>>>,
}

// Safety: the queue owns every node exclusively, exactly like a `Box<T>` per item.
unsafe impl<T: Send> Send for PendingQueue<T> {}
unsafe impl<T: Sync> Sync for PendingQueue<T> {}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingQueue<T> {
    pub const fn new() -> Self {
        PendingQueue {
            tail: None,
            len: 0,
            _owns: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.tail.is_none()
    }

    /// Appends `value` behind every item already queued.
    pub fn enqueue(&mut self, value: T) {
        let node = Box::leak(Box::new(Node {
            value,
            next: NonNull::dangling(),
        }));
        let mut node = NonNull::from(node);
        match self.tail {
            None => {
                // Safety: `node` was just allocated and is not shared yet.
                unsafe { node.as_mut().next = node };
            }
            Some(mut tail) => {
                // Safety: `tail` is a live node owned by this queue, and `node` is not
                // reachable from anywhere else until it is linked in.
                unsafe {
                    node.as_mut().next = tail.as_ref().next;
                    tail.as_mut().next = node;
                }
            }
        }
        self.tail = Some(node);
        self.len += 1;
    }

    /// Removes and returns the oldest item, if any.
    pub fn dequeue(&mut self) -> Option<T> {
        let mut tail = self.tail?;
        // Safety: every pointer reachable from `tail` is a live node owned by this
        // queue. The head is unlinked before its box is reclaimed.
        let head = unsafe {
            let head = tail.as_ref().next;
            if head == tail {
                self.tail = None;
            } else {
                tail.as_mut().next = head.as_ref().next;
            }
            Box::from_raw(head.as_ptr())
        };
        self.len -= 1;
        Some(head.value)
    }

    /// Visits the queued items from oldest to newest without removing them.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            // Safety: `tail` is live, so its successor (the head) is too.
            next: self.tail.map(|tail| unsafe { tail.as_ref().next }),
            remaining: self.len,
            _queue: PhantomData,
        }
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&T),
    {
        self.iter().for_each(f)
    }

    /// Drops every queued item.
    pub fn clear(&mut self) {
        while self.dequeue().is_some() {}
    }
}

impl<T> Drop for PendingQueue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for PendingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    next: Option<NonNull<Node<T>>>,
    remaining: usize,
    _queue: PhantomData<&'a PendingQueue<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.next?;
        self.remaining -= 1;
        // Safety: the queue is borrowed for `'a`, so no node can be freed or
        // relinked while the iterator is alive.
        let node = unsafe { &*node.as_ptr() };
        self.next = Some(node.next);
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a PendingQueue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
