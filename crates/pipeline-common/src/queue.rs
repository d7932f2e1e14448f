//! # Command Queue
//!
//! A FIFO of commands handed from producer threads to consumer threads.
//!
//! Every structural operation runs under one lock. The "has items" signal is
//! kept equal to `!items.is_empty()` inside the same critical section as the
//! mutation, and consumers block on a condition variable guarded by it. Like
//! a manual-reset event, raising the signal releases every waiter.
//!
//! Ordering is strictly FIFO except for [`CommandQueue::clear_and_enqueue`],
//! which discards everything pending so that its item is the only and next
//! one, and [`CommandQueue::remove_all_of_kind`], a stable filter.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::QueueError;

/// An item that can be placed in a [`CommandQueue`].
///
/// The queue never looks inside a command; it only compares kinds.
pub trait Command {
    /// Tag used by [`CommandQueue::remove_all_of_kind`]
    type Kind: PartialEq + Copy + fmt::Debug;

    /// The tag of this command
    fn kind(&self) -> Self::Kind;
}

struct State<T> {
    items: VecDeque<T>,
    signaled: bool,
    closed: bool,
}

impl<T> State<T> {
    /// Re-derives the signal from the queue length. Returns true when the
    /// queue just went from empty to non-empty.
    #[inline]
    fn update_signal(&mut self) -> bool {
        let was_signaled = self.signaled;
        self.signaled = !self.items.is_empty();
        self.signaled && !was_signaled
    }
}

/// Thread-safe FIFO of commands with wake-on-enqueue.
pub struct CommandQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T: Command> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Command> CommandQueue<T> {
    /// Creates an empty, open queue
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty queue with room for `capacity` commands
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                signaled: false,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends a command. Every waiting consumer is released when the queue
    /// was empty.
    pub fn enqueue(&self, item: T) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            trace!(kind = ?item.kind(), "dropping command for closed queue");
            return Err(QueueError::Closed);
        }

        state.items.push_back(item);
        if state.update_signal() {
            self.available.notify_all();
        }
        Ok(())
    }

    /// Pops the front command
    pub fn dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front();
        state.update_signal();
        item
    }

    /// Discards every pending command and inserts `item` as the only one.
    ///
    /// Returns the number of commands discarded.
    pub fn clear_and_enqueue(&self, item: T) -> Result<usize, QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            trace!(kind = ?item.kind(), "dropping preemptive command for closed queue");
            return Err(QueueError::Closed);
        }

        let discarded = state.items.len();
        state.items.clear();
        trace!(kind = ?item.kind(), discarded, "preempting queued commands");
        state.items.push_back(item);
        if state.update_signal() {
            self.available.notify_all();
        }
        Ok(discarded)
    }

    /// Removes every command of `kind`, keeping the others in order.
    ///
    /// Returns the number of commands removed.
    pub fn remove_all_of_kind(&self, kind: T::Kind) -> usize {
        let mut state = self.state.lock();
        let before = state.items.len();
        state.items.retain(|item| item.kind() != kind);
        state.update_signal();
        before - state.items.len()
    }

    /// Blocks until a command is available, the queue is closed, or
    /// `timeout` elapses. Returns true when a command is available.
    ///
    /// Another consumer may take the command first, so `dequeue` can still
    /// return `None` afterwards.
    pub fn wait_for_item(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !state.signaled && !state.closed {
            self.available
                .wait_while_for(&mut state, |s| !s.signaled && !s.closed, timeout);
        }
        state.signaled
    }

    /// Number of pending commands
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        !self.state.lock().signaled
    }

    /// Rejects further commands and wakes every waiter. Pending commands can
    /// still be dequeued.
    ///
    /// Returns true for the call that actually closed the queue.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        debug!(pending = state.items.len(), "command queue closed");
        self.available.notify_all();
        true
    }

    /// True once [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Takes every pending command in order
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let items = state.items.drain(..).collect();
        state.update_signal();
        items
    }
}

impl<T> fmt::Debug for CommandQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CommandQueue")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_test_tracing;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestCommand {
        Data(u32),
        Seek(u32),
        Stop,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestKind {
        Data,
        Seek,
        Stop,
    }

    impl Command for TestCommand {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                TestCommand::Data(_) => TestKind::Data,
                TestCommand::Seek(_) => TestKind::Seek,
                TestCommand::Stop => TestKind::Stop,
            }
        }
    }

    #[test]
    fn test_fifo_across_threads() {
        init_test_tracing!();
        let queue = Arc::new(CommandQueue::new());
        let count = 1000;

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..count {
                    queue.enqueue(TestCommand::Data(i)).unwrap();
                }
            })
        };

        let mut received = Vec::with_capacity(count as usize);
        while received.len() < count as usize {
            if queue.wait_for_item(Duration::from_secs(5)) {
                while let Some(TestCommand::Data(i)) = queue.dequeue() {
                    received.push(i);
                }
            }
        }
        producer.join().unwrap();

        assert_eq!(received, (0..count).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_and_enqueue_preempts() {
        let queue = CommandQueue::new();
        assert_eq!(queue.clear_and_enqueue(TestCommand::Stop), Ok(0));
        assert_eq!(queue.dequeue(), Some(TestCommand::Stop));

        for i in 0..5 {
            queue.enqueue(TestCommand::Data(i)).unwrap();
        }
        assert_eq!(queue.clear_and_enqueue(TestCommand::Seek(9)), Ok(5));
        queue.enqueue(TestCommand::Data(10)).unwrap();

        assert_eq!(queue.dequeue(), Some(TestCommand::Seek(9)));
        assert_eq!(queue.dequeue(), Some(TestCommand::Data(10)));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_remove_all_of_kind_is_stable() {
        let queue = CommandQueue::new();
        for command in [
            TestCommand::Data(1),
            TestCommand::Seek(2),
            TestCommand::Data(3),
            TestCommand::Seek(4),
            TestCommand::Data(5),
        ] {
            queue.enqueue(command).unwrap();
        }

        assert_eq!(queue.remove_all_of_kind(TestKind::Seek), 2);
        assert_eq!(queue.remove_all_of_kind(TestKind::Stop), 0);
        assert_eq!(
            queue.drain(),
            vec![
                TestCommand::Data(1),
                TestCommand::Data(3),
                TestCommand::Data(5)
            ]
        );

        queue.enqueue(TestCommand::Seek(6)).unwrap();
        assert_eq!(queue.remove_all_of_kind(TestKind::Seek), 1);
        assert!(queue.is_empty());
        assert!(!queue.wait_for_item(Duration::ZERO));
    }

    #[test]
    fn test_wait_times_out_without_items() {
        let queue: CommandQueue<TestCommand> = CommandQueue::new();
        let start = Instant::now();
        assert!(!queue.wait_for_item(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_wakes_on_enqueue() {
        let queue = Arc::new(CommandQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_for_item(Duration::from_secs(10)))
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(TestCommand::Data(1)).unwrap();
        assert!(waiter.join().unwrap());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_enqueue_releases_every_waiter() {
        let queue = Arc::new(CommandQueue::new());
        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let start = Instant::now();
                    let ready = queue.wait_for_item(Duration::from_secs(5));
                    (ready, start.elapsed())
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        queue.enqueue(TestCommand::Data(1)).unwrap();
        queue.enqueue(TestCommand::Data(2)).unwrap();

        for waiter in waiters {
            let (ready, elapsed) = waiter.join().unwrap();
            assert!(ready);
            assert!(elapsed < Duration::from_secs(2), "waiter slept for {elapsed:?}");
        }
    }

    #[test]
    fn test_close_wakes_waiter() {
        let queue = Arc::new(CommandQueue::<TestCommand>::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_for_item(Duration::from_secs(10)))
        };

        thread::sleep(Duration::from_millis(20));
        assert!(queue.close());
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn test_close_is_idempotent() {
        let queue = CommandQueue::new();
        queue.enqueue(TestCommand::Data(1)).unwrap();

        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(TestCommand::Stop), Err(QueueError::Closed));
        assert_eq!(
            queue.clear_and_enqueue(TestCommand::Stop),
            Err(QueueError::Closed)
        );

        // Pending commands survive the close
        assert!(queue.wait_for_item(Duration::ZERO));
        assert_eq!(queue.dequeue(), Some(TestCommand::Data(1)));
        assert!(!queue.wait_for_item(Duration::from_secs(10)));
    }
}
