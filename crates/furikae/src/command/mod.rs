//! Request execution against the analyzer container
//!
//! runner → demux → extract: each stage consumes the previous stage's full output.

pub mod demux;
pub mod extract;
pub mod runner;

pub use demux::{Frame, FrameDecoder, StreamKind, demux};
pub use extract::extract_json;
pub use runner::{
  CommandRunner, ExecOutput, analysis_command, kanji_readings_command, shell_argument,
};
