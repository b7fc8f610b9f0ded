//! Assembly: the single consumer that writes chunks to their absolute offsets.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::error::{Error, Result};
use crate::sink::ArtifactSink;
use crate::types::{ChunkResult, Event};

/// What the assembler wrote before the channel closed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AssemblyReport {
    pub(crate) chunks_written: usize,
    pub(crate) bytes_written: u64,
}

/// Drain `results` until the channel closes, writing each payload at its range start.
///
/// Writes happen one at a time, in arrival order, so the sink never sees concurrent
/// writers. Each write runs on the blocking pool to keep file I/O off the async workers.
///
/// Stops at the first failed write and returns [`Error::Write`] without draining the
/// rest of the channel. `total_bytes` only feeds progress events.
pub(crate) async fn assemble(
    mut results: mpsc::Receiver<ChunkResult>,
    sink: Arc<dyn ArtifactSink>,
    total_bytes: u64,
    event_tx: &broadcast::Sender<Event>,
) -> Result<AssemblyReport> {
    let mut report = AssemblyReport::default();

    while let Some(chunk) = results.recv().await {
        let index = chunk.range.index;
        let offset = chunk.range.start;
        let len = chunk.payload.len();

        let writer = sink.clone();
        let written = tokio::task::spawn_blocking(move || writer.write_at(offset, &chunk.payload))
            .await
            .map_err(|e| Error::TaskFailed(format!("write task for range {index} failed: {e}")))?;

        if let Err(source) = written {
            tracing::error!(index, offset, len, error = %source, "Write failed, aborting");
            return Err(Error::Write {
                offset,
                len,
                source,
            });
        }

        report.chunks_written += 1;
        report.bytes_written += len as u64;

        tracing::trace!(index, offset, len, "Chunk written");
        event_tx
            .send(Event::ChunkWritten {
                index,
                bytes_written: report.bytes_written,
                total_bytes,
            })
            .ok();
    }

    let syncer = sink.clone();
    tokio::task::spawn_blocking(move || syncer.sync())
        .await
        .map_err(|e| Error::TaskFailed(format!("sync task failed: {e}")))??;

    Ok(report)
}
