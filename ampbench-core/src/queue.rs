//! Paced display command queue
//!
//! The display firmware drops commands that arrive back-to-back, so
//! everything written to it funnels through this queue: commands go out
//! one per poll with a minimum spacing, and a page-query heartbeat is
//! enqueued periodically so the controller always knows which page is
//! showing.

use heapless::{Deque, String};

use ampbench_protocol::panel::text::{CMD_BKCMD, CMD_MAX, CMD_QUERY_PAGE};

/// Minimum spacing between commands sent to the display
pub const TX_INTERVAL_MS: u64 = 35;

/// Period of the automatic page-query heartbeat
pub const HEARTBEAT_MS: u64 = 500;

/// Queue capacity; a full page flush plus a burst of updates
pub const QUEUE_DEPTH: usize = 32;

/// Bounded FIFO of display commands with send pacing
#[derive(Debug, Default)]
pub struct CommandQueue {
    queue: Deque<String<CMD_MAX>, QUEUE_DEPTH>,
    last_sent_at: Option<u64>,
    last_heartbeat_at: u64,
    dropped: u32,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue the boot synchronization commands.
    ///
    /// `bkcmd=3` makes the display report command results, then the page
    /// query establishes which page it booted into.
    pub fn boot_sync(&mut self) {
        self.enqueue_str(CMD_BKCMD);
        self.enqueue_str(CMD_QUERY_PAGE);
    }

    /// Enqueue a command; a full queue drops it and counts the drop
    pub fn enqueue(&mut self, cmd: String<CMD_MAX>) {
        if self.queue.push_back(cmd).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
    }

    fn enqueue_str(&mut self, cmd: &str) {
        let mut s = String::new();
        if s.push_str(cmd).is_ok() {
            self.enqueue(s);
        }
    }

    /// Commands dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Number of commands waiting to be sent
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no command is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Return the next command to send, if the pacing interval allows.
    ///
    /// Also enqueues the page-query heartbeat when it is due, so a quiet
    /// queue still emits one command per heartbeat period.
    pub fn poll(&mut self, now_ms: u64) -> Option<String<CMD_MAX>> {
        if now_ms.saturating_sub(self.last_heartbeat_at) >= HEARTBEAT_MS {
            self.last_heartbeat_at = now_ms;
            self.enqueue_str(CMD_QUERY_PAGE);
        }

        if let Some(sent) = self.last_sent_at {
            if now_ms.saturating_sub(sent) < TX_INTERVAL_MS {
                return None;
            }
        }

        let cmd = self.queue.pop_front()?;
        self.last_sent_at = Some(now_ms);
        Some(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(text: &str) -> String<CMD_MAX> {
        let mut s = String::new();
        s.push_str(text).unwrap();
        s
    }

    #[test]
    fn test_pacing_one_command_per_interval() {
        let mut queue = CommandQueue::new();
        queue.enqueue(cmd("a"));
        queue.enqueue(cmd("b"));

        // The first poll also enqueues the heartbeat, behind a and b
        assert_eq!(queue.poll(1000).as_deref(), Some("a"));
        assert_eq!(queue.poll(1010), None);
        assert_eq!(queue.poll(1035).as_deref(), Some("b"));
        assert_eq!(queue.poll(1050), None);
        assert_eq!(queue.poll(1070).as_deref(), Some("sendme"));
    }

    #[test]
    fn test_boot_sync_order() {
        let mut queue = CommandQueue::new();
        queue.boot_sync();
        assert_eq!(queue.poll(600).as_deref(), Some(CMD_BKCMD));
        assert_eq!(queue.poll(635).as_deref(), Some(CMD_QUERY_PAGE));
    }

    #[test]
    fn test_heartbeat_enqueued_periodically() {
        let mut queue = CommandQueue::new();
        assert_eq!(queue.poll(500).as_deref(), Some(CMD_QUERY_PAGE));
        // Nothing due before the next period
        assert_eq!(queue.poll(700), None);
        assert_eq!(queue.poll(1000).as_deref(), Some(CMD_QUERY_PAGE));
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let mut queue = CommandQueue::new();
        for _ in 0..QUEUE_DEPTH {
            queue.enqueue(cmd("x"));
        }
        queue.enqueue(cmd("overflow"));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.len(), QUEUE_DEPTH);
    }
}
