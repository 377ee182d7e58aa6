use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub line: String,
    /// Issued by a script or another command rather than typed by the user.
    pub automated: bool,
}

/// Runs queued entries one at a time.
#[async_trait]
pub trait EntryProcessor: Send + Sync + 'static {
    /// `queue` is the queue the entry came from, for handlers that chain
    /// further commands.
    async fn process(&self, entry: QueueEntry, queue: &CommandQueue);
}

#[derive(Default)]
struct Pending {
    entries: VecDeque<QueueEntry>,
    processing: bool,
}

struct QueueInner {
    pending: Mutex<Pending>,
    processor: Arc<dyn EntryProcessor>,
    idle: Notify,
    drains: AtomicUsize,
}

/// FIFO of command lines drained by a single task.
///
/// The processing flag is read and written under the same lock as the
/// pending entries, so an entry pushed while a drain is running is always
/// picked up by that drain and a second loop is never started.
#[derive(Clone)]
pub struct CommandQueue {
    inner: Arc<QueueInner>,
}

impl CommandQueue {
    pub fn new(processor: Arc<dyn EntryProcessor>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(Pending::default()),
                processor,
                idle: Notify::new(),
                drains: AtomicUsize::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a line and returns immediately. Blank lines are dropped and
    /// yield `false`.
    ///
    /// Must be called from within a tokio runtime; the drain loop is spawned
    /// onto it.
    pub fn enqueue(&self, line: &str, automated: bool) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        let start_drain = {
            let mut pending = self.lock();
            pending.entries.push_back(QueueEntry {
                line: line.to_string(),
                automated,
            });
            if pending.processing {
                false
            } else {
                pending.processing = true;
                true
            }
        };

        if start_drain {
            self.inner.drains.fetch_add(1, Ordering::SeqCst);
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }

        true
    }

    async fn drain(self) {
        debug!("Command queue drain started");
        loop {
            let entry = {
                let mut pending = self.lock();
                match pending.entries.pop_front() {
                    Some(entry) => entry,
                    None => {
                        pending.processing = false;
                        break;
                    }
                }
            };

            let line = entry.line.clone();
            let processor = self.inner.processor.clone();
            let run = AssertUnwindSafe(processor.process(entry, &self)).catch_unwind();
            if run.await.is_err() {
                error!("Command processor panicked while running '{}'", line);
            }
        }
        debug!("Command queue drained");
        self.inner.idle.notify_waiters();
    }

    /// Resolves once nothing is queued and no drain is running.
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }

    /// True while entries are pending or a drain loop is active.
    pub fn is_busy(&self) -> bool {
        let pending = self.lock();
        pending.processing || !pending.entries.is_empty()
    }

    /// Number of drain loops started so far.
    pub fn drain_count(&self) -> usize {
        self.inner.drains.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<QueueEntry>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl EntryProcessor for Recorder {
        async fn process(&self, entry: QueueEntry, queue: &CommandQueue) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            // "slow N" sleeps N ms; "chain X" enqueues X behind everything else
            let mut parts = entry.line.splitn(2, ' ');
            match (parts.next(), parts.next()) {
                (Some("slow"), Some(ms)) => {
                    let ms: u64 = ms.parse().unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                }
                (Some("chain"), Some(next)) => {
                    queue.enqueue(next, true);
                }
                (Some("panic"), _) => panic!("processor blew up"),
                _ => {}
            }

            self.seen.lock().unwrap().push(entry);
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn lines(recorder: &Recorder) -> Vec<String> {
        recorder
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.line.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_fifo_regardless_of_latency() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::new(recorder.clone());

        queue.enqueue("slow 40", false);
        queue.enqueue("slow 1", false);
        queue.enqueue("fast", false);
        queue.enqueue("slow 15", false);
        queue.idle().await;

        assert_eq!(lines(&recorder), vec!["slow 40", "slow 1", "fast", "slow 15"]);
        assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_drain_loop_for_burst() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::new(recorder.clone());

        queue.enqueue("slow 20", false);
        assert!(queue.is_busy());
        for i in 0..10 {
            queue.enqueue(&format!("cmd {}", i), false);
        }
        queue.idle().await;

        assert_eq!(queue.drain_count(), 1);
        assert!(!queue.is_busy());
        assert_eq!(lines(&recorder).len(), 11);

        // a later burst gets its own loop
        queue.enqueue("again", false);
        queue.idle().await;
        assert_eq!(queue.drain_count(), 2);
    }

    #[tokio::test]
    async fn test_chained_entries_join_current_drain() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::new(recorder.clone());

        queue.enqueue("chain follow-up", false);
        queue.enqueue("second", false);
        queue.idle().await;

        assert_eq!(lines(&recorder), vec!["chain follow-up", "second", "follow-up"]);
        let seen = recorder.seen.lock().unwrap();
        assert!(!seen[0].automated);
        assert!(seen[2].automated);
        assert_eq!(queue.drain_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_lines_rejected() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::new(recorder.clone());

        assert!(!queue.enqueue("   \t ", false));
        assert!(!queue.enqueue("", true));
        assert_eq!(queue.drain_count(), 0);
        queue.idle().await;
        assert!(lines(&recorder).is_empty());
    }

    #[tokio::test]
    async fn test_processor_panic_does_not_stop_queue() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::new(recorder.clone());

        queue.enqueue("panic", false);
        queue.enqueue("after", false);
        queue.idle().await;

        assert_eq!(lines(&recorder), vec!["after"]);
        assert!(!queue.is_busy());
    }
}
