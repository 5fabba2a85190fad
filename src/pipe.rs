//! The unidirectional command pipe.
//!
//! A byte-granular FIFO channel: the host thread enqueues one command code
//! per write, the application thread's loop wakes once per code and reads
//! exactly one. Writes never block; a write after the read end is gone is
//! logged and dropped rather than aborting the caller.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::error;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::looper::Waker;

struct PipeShared {
    queue: Mutex<VecDeque<u8>>,
    // Set once, when the application thread registers the read end with its
    // loop. Codes written earlier are delivered on registration.
    waker: OnceCell<Waker>,
    closed: AtomicBool,
}

/// Create the two endpoints of a command pipe.
pub fn command_pipe() -> (CommandWriter, CommandReader) {
    let shared = Arc::new(PipeShared {
        queue: Mutex::new(VecDeque::new()),
        waker: OnceCell::new(),
        closed: AtomicBool::new(false),
    });
    (
        CommandWriter {
            shared: shared.clone(),
        },
        CommandReader { shared },
    )
}

/// Host-thread write end.
pub struct CommandWriter {
    shared: Arc<PipeShared>,
}

impl CommandWriter {
    /// Enqueue one command code and wake the reader.
    ///
    /// Failure (the read end has been dropped) is logged and otherwise
    /// ignored; the caller carries on.
    pub fn write(&self, code: u8) {
        if self.shared.closed.load(Ordering::Acquire) {
            error!("[CommandPipe] failure writing command {code}: read end closed");
            return;
        }
        // The queue lock is held across the wake so a concurrent
        // registration either sees this code in the backlog or the waker is
        // already in place; a notification is never lost between the two.
        let mut queue = self.shared.queue.lock();
        queue.push_back(code);
        if let Some(waker) = self.shared.waker.get() {
            waker.wake();
        }
    }
}

/// Application-thread read end.
pub struct CommandReader {
    shared: Arc<PipeShared>,
}

impl CommandReader {
    /// Register the loop waker that readiness is reported through.
    ///
    /// Codes that were written before registration are announced here so
    /// none are stranded in the queue.
    pub fn register(&self, waker: Waker) {
        let queue = self.shared.queue.lock();
        if self.shared.waker.set(waker).is_err() {
            error!("[CommandPipe] read end registered twice, keeping first waker");
            return;
        }
        if let Some(waker) = self.shared.waker.get() {
            for _ in 0..queue.len() {
                waker.wake();
            }
        }
    }

    /// Dequeue one command code, or `None` when the pipe is empty.
    pub fn read(&self) -> Option<u8> {
        self.shared.queue.lock().pop_front()
    }
}

impl Drop for CommandReader {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::{Looper, PollEvent, SourceId};
    use std::time::Duration;

    #[test]
    fn codes_arrive_in_write_order() {
        let (writer, reader) = command_pipe();
        for code in [4u8, 2, 9, 9, 0] {
            writer.write(code);
        }
        let mut seen = Vec::new();
        while let Some(code) = reader.read() {
            seen.push(code);
        }
        assert_eq!(seen, vec![4, 2, 9, 9, 0]);
    }

    #[test]
    fn empty_pipe_reads_none() {
        let (_writer, reader) = command_pipe();
        assert_eq!(reader.read(), None);
    }

    #[test]
    fn writes_after_reader_drop_are_dropped() {
        let (writer, reader) = command_pipe();
        drop(reader);
        // Must not panic; the failure is logged.
        writer.write(7);
    }

    #[test]
    fn registration_announces_backlog() {
        let (writer, reader) = command_pipe();
        writer.write(1);
        writer.write(2);

        let looper = Looper::new();
        reader.register(looper.waker(SourceId::Commands));

        for expected in [1u8, 2] {
            assert_eq!(
                looper.poll(Some(Duration::ZERO)),
                PollEvent::Source(SourceId::Commands)
            );
            assert_eq!(reader.read(), Some(expected));
        }
        assert_eq!(looper.poll(Some(Duration::ZERO)), PollEvent::Timeout);
    }

    #[test]
    fn each_write_wakes_the_loop_once() {
        let (writer, reader) = command_pipe();
        let looper = Looper::new();
        reader.register(looper.waker(SourceId::Commands));

        writer.write(11);
        writer.write(12);
        assert_eq!(
            looper.poll(Some(Duration::ZERO)),
            PollEvent::Source(SourceId::Commands)
        );
        assert_eq!(reader.read(), Some(11));
        assert_eq!(
            looper.poll(Some(Duration::ZERO)),
            PollEvent::Source(SourceId::Commands)
        );
        assert_eq!(reader.read(), Some(12));
    }
}
