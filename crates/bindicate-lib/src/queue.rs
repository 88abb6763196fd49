//! Serialized command delivery.
//!
//! The strip controller exposes a single writable characteristic and
//! handles one command at a time, so every batch goes through
//! [`CommandQueue`]: commands are written strictly one after another, in
//! ascending strip order, and the batch aborts on the first failure. A
//! `tokio::sync::Mutex` keeps at most one batch in flight across callers.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::protocol::Command;

/// Destination for encoded commands.
///
/// Implemented by [`LinkHandle`](crate::connection::LinkHandle) in
/// production and by [`mock::MockSink`] in tests.
pub trait CommandSink {
    /// Deliver one command, resolving only after the peer has
    /// acknowledged it (or delivery failed).
    async fn write(&self, data: &[u8]) -> Result<()>;
}

/// Outcome of delivering one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every command in the batch was acknowledged.
    Delivered { sent: usize },
    /// Delivery stopped at the first failing command; `sent` commands
    /// were acknowledged before it.
    Aborted { sent: usize, error: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// Number of commands acknowledged by the peer.
    pub fn sent(&self) -> usize {
        match self {
            DeliveryOutcome::Delivered { sent } | DeliveryOutcome::Aborted { sent, .. } => *sent,
        }
    }
}

/// Write queue in front of a [`CommandSink`].
pub struct CommandQueue<S: CommandSink> {
    sink: Mutex<S>,
}

impl<S: CommandSink> CommandQueue<S> {
    pub fn new(sink: S) -> Self {
        CommandQueue { sink: Mutex::new(sink) }
    }

    /// Deliver one batch of commands, one per strip id.
    ///
    /// `BTreeMap` iteration gives the ascending strip order. The first
    /// write error aborts the remainder of the batch; commands already
    /// acknowledged are not rolled back.
    pub async fn deliver(&self, batch: BTreeMap<u8, Command>) -> DeliveryOutcome {
        let sink = self.sink.lock().await;
        let mut sent = 0;
        for (strip, command) in &batch {
            log::debug!("strip {strip}: writing {}", command.to_hex());
            if let Err(e) = sink.write(command.as_bytes()).await {
                log::warn!("strip {strip}: write failed, aborting batch: {e}");
                return DeliveryOutcome::Aborted { sent, error: e.to_string() };
            }
            sent += 1;
        }
        DeliveryOutcome::Delivered { sent }
    }
}

// ── mock ──────────────────────────────────────────────────────────────────

pub mod mock {
    //! In-memory sink for tests.

    use std::sync::{Arc, Mutex};

    use crate::error::{BindicateError, Result};

    use super::CommandSink;

    #[derive(Default)]
    struct Inner {
        writes: Mutex<Vec<Vec<u8>>>,
        fail_on: Mutex<Vec<usize>>,
        attempts: Mutex<usize>,
    }

    /// Records every write and fails on scripted attempt indices.
    ///
    /// Clones share state, so a test can hand one clone to the code under
    /// test and inspect the other.
    #[derive(Clone, Default)]
    pub struct MockSink {
        inner: Arc<Inner>,
    }

    impl MockSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the write at the given zero-based attempt index.
        pub fn fail_on_attempt(&self, index: usize) {
            self.inner.fail_on.lock().unwrap().push(index);
        }

        /// Every payload that was accepted, in write order.
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.inner.writes.lock().unwrap().clone()
        }

        /// Total write attempts, including failed ones.
        pub fn attempts(&self) -> usize {
            *self.inner.attempts.lock().unwrap()
        }
    }

    impl CommandSink for MockSink {
        async fn write(&self, data: &[u8]) -> Result<()> {
            let mut attempts = self.inner.attempts.lock().unwrap();
            let index = *attempts;
            *attempts += 1;
            drop(attempts);

            if self.inner.fail_on.lock().unwrap().contains(&index) {
                return Err(BindicateError::WriteFailed("scripted failure".into()));
            }
            self.inner.writes.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }
}
