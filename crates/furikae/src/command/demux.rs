//! Multiplexed stream decoding
//!
//! When a container is attached without a TTY, the engine frames every write as
//! an 8-byte header followed by the payload:
//!
//! ```text
//! [tag, 0, 0, 0, len(4 bytes, big-endian)] payload...
//! ```
//!
//! `tag` names the originating stream (0 stdin, 1 stdout, 2 stderr).

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Frame header length in bytes.
pub const HEADER_LEN: usize = 8;

/// Stream a frame was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
  /// tag 0
  Stdin,
  /// tag 1
  Stdout,
  /// tag 2
  Stderr,
  /// Any other tag
  Unknown(u8),
}

impl StreamKind {
  /// Maps a header tag byte.
  pub fn from_tag(tag: u8) -> Self {
    match tag {
      0 => StreamKind::Stdin,
      1 => StreamKind::Stdout,
      2 => StreamKind::Stderr,
      other => StreamKind::Unknown(other),
    }
  }

  /// Name used in log fields.
  pub fn as_str(&self) -> &'static str {
    match self {
      StreamKind::Stdin => "stdin",
      StreamKind::Stdout => "stdout",
      StreamKind::Stderr => "stderr",
      StreamKind::Unknown(_) => "unknown",
    }
  }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  /// Originating stream
  pub stream: StreamKind,
  /// Payload bytes (never empty)
  pub payload: Vec<u8>,
}

fn payload_len(header: &[u8]) -> usize {
  u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize
}

/// Reads a complete framed stream and returns every payload concatenated in arrival order.
///
/// stdout and stderr are merged. Zero-length frames are skipped. The result is trimmed of
/// leading and trailing ASCII whitespace.
///
/// # Errors
/// - End of stream in the middle of a header or payload: `io::ErrorKind::UnexpectedEof`
/// - Any other read error is returned as is
///
/// End of stream exactly on a frame boundary is a clean stop.
pub async fn demux<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
  let mut output = Vec::new();
  let mut header = [0u8; HEADER_LEN];

  while read_header(&mut reader, &mut header).await? {
    let len = payload_len(&header);
    if len == 0 {
      continue;
    }

    let read = (&mut reader).take(len as u64).read_to_end(&mut output).await?;
    if read < len {
      return Err(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("truncated frame payload: expected {len} bytes, got {read}"),
      ));
    }
  }

  Ok(output.trim_ascii().to_vec())
}

/// Fills `header`. Returns `false` on a clean end of stream.
async fn read_header<R: AsyncRead + Unpin>(
  reader: &mut R,
  header: &mut [u8; HEADER_LEN],
) -> io::Result<bool> {
  let mut filled = 0;
  while filled < HEADER_LEN {
    let n = reader.read(&mut header[filled..]).await?;
    if n == 0 {
      if filled == 0 {
        return Ok(false);
      }
      return Err(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("truncated frame header: {filled} of {HEADER_LEN} bytes"),
      ));
    }
    filled += n;
  }
  Ok(true)
}

/// Incremental decoder for unbounded streams such as followed logs.
///
/// Bytes are pushed as they arrive; complete frames are returned and any partial
/// frame is kept for the next push.
#[derive(Debug, Default)]
pub struct FrameDecoder {
  buffer: Vec<u8>,
}

impl FrameDecoder {
  /// Creates an empty decoder.
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `chunk` and returns every frame completed by it.
  pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
    self.buffer.extend_from_slice(chunk);

    let mut frames = Vec::new();
    let mut pos = 0;
    while self.buffer.len() - pos >= HEADER_LEN {
      let header = &self.buffer[pos..pos + HEADER_LEN];
      let len = payload_len(header);
      let start = pos + HEADER_LEN;
      if self.buffer.len() - start < len {
        break;
      }
      if len > 0 {
        frames.push(Frame {
          stream: StreamKind::from_tag(header[0]),
          payload: self.buffer[start..start + len].to_vec(),
        });
      }
      pos = start + len;
    }

    self.buffer.drain(..pos);
    frames
  }

  /// Number of buffered bytes not yet forming a complete frame.
  pub fn pending(&self) -> usize {
    self.buffer.len()
  }
}

/// Encodes one frame. Used by in-memory runtimes.
pub fn encode_frame(stream: StreamKind, payload: &[u8]) -> Vec<u8> {
  let tag = match stream {
    StreamKind::Stdin => 0,
    StreamKind::Stdout => 1,
    StreamKind::Stderr => 2,
    StreamKind::Unknown(tag) => tag,
  };
  let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);

  let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
  frame.extend_from_slice(&[tag, 0, 0, 0]);
  frame.extend_from_slice(&len.to_be_bytes());
  frame.extend_from_slice(&payload[..len as usize]);
  frame
}

// ─────────────────────────────────────────────────────────────────────────────
// Test Module
// ─────────────────────────────────────────────────────────────────────────────
