//! Batch writer
//!
//! Sends the composed operation list in fixed-size chunks. A rate-limited
//! chunk waits out one cooldown and is retried exactly once; any other
//! failure aborts the remaining chunks.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::operations::WriteOperation;
use crate::sheets::{RemoteResult, SheetsService};

pub const CHUNK_SIZE: usize = 25;
pub const CHUNK_PAUSE: Duration = Duration::from_millis(500);
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub operations: usize,
    pub chunks: usize,
    pub retries: usize,
}

#[derive(Debug, Clone)]
pub struct BatchWriter {
    chunk_size: usize,
    pause: Duration,
    cooldown: Duration,
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            pause: CHUNK_PAUSE,
            cooldown: RATE_LIMIT_COOLDOWN,
        }
    }
}

impl BatchWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same chunking with custom delays (tests use zero).
    pub fn with_timing(pause: Duration, cooldown: Duration) -> Self {
        Self {
            pause,
            cooldown,
            ..Self::default()
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn write<S: SheetsService + ?Sized>(
        &self,
        service: &S,
        spreadsheet_id: &str,
        operations: &[WriteOperation],
    ) -> RemoteResult<WriteSummary> {
        let mut summary = WriteSummary {
            operations: operations.len(),
            ..Default::default()
        };
        let total_chunks = operations.len().div_ceil(self.chunk_size);

        for (i, chunk) in operations.chunks(self.chunk_size).enumerate() {
            match service.apply_batch(spreadsheet_id, chunk) {
                Ok(()) => {}
                Err(e) if e.is_transient() => {
                    warn!(
                        "Rate limit hit on chunk {}/{}, waiting {}s...",
                        i + 1,
                        total_chunks,
                        self.cooldown.as_secs()
                    );
                    sleep(self.cooldown);
                    summary.retries += 1;
                    service.apply_batch(spreadsheet_id, chunk)?;
                }
                Err(e) => return Err(e),
            }
            summary.chunks += 1;
            debug!("Applied chunk {}/{} ({} operations)", i + 1, total_chunks, chunk.len());

            if i + 1 < total_chunks {
                sleep(self.pause);
            }
        }

        info!(
            "Applied {} operations in {} chunks",
            summary.operations, summary.chunks
        );
        Ok(summary)
    }
}

fn sleep(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
