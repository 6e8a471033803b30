//! Response output chunks and sinks

use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::io::Write;
use uuid::Uuid;

/// One function response emitted during a run
///
/// Each successful invocation produces exactly one chunk, sequenced in the
/// order the states ran.
#[derive(Debug, Clone, Serialize)]
pub struct OutputChunk {
    /// Run this chunk belongs to
    pub run_id: Uuid,

    /// State whose invocation produced the response
    pub state_name: String,

    /// Sequence number for ordering chunks
    pub sequence: u64,

    /// Raw response bytes
    #[serde(serialize_with = "serialize_lossy")]
    pub data: Bytes,

    /// Timestamp in milliseconds since Unix epoch
    pub timestamp: u64,
}

impl OutputChunk {
    /// Create a new chunk stamped with the current time
    pub fn new(run_id: Uuid, state_name: String, sequence: u64, data: Bytes) -> Self {
        Self {
            run_id,
            state_name,
            sequence,
            data,
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }

    /// Get the size of this chunk in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Convert chunk data to string (lossy)
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

fn serialize_lossy<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(data))
}

/// Consumer of function responses, called once per successful step
pub trait OutputSink: Send {
    fn emit(&mut self, chunk: OutputChunk) -> std::io::Result<()>;
}

/// Writes raw response bytes to a byte stream as they arrive
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn emit(&mut self, chunk: OutputChunk) -> std::io::Result<()> {
        self.writer.write_all(&chunk.data)?;
        self.writer.flush()
    }
}

/// Keeps every chunk in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    chunks: Vec<OutputChunk>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> &[OutputChunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<OutputChunk> {
        self.chunks
    }

    /// All response bytes concatenated in emission order
    pub fn concatenated(&self) -> Vec<u8> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.data.iter().copied())
            .collect()
    }
}

impl OutputSink for CollectingSink {
    fn emit(&mut self, chunk: OutputChunk) -> std::io::Result<()> {
        self.chunks.push(chunk);
        Ok(())
    }
}
