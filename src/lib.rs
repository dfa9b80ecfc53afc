//! # Transcript Format
//!
//! Every 16 input bytes become one text line:
//!
//! ```text
//! 0000000 0201 0403 0605 0807 0a09 0c0b 0e0d 100f
//! ▲       ▲
//! │       └── 8 words, two input bytes each, little-endian, 4 lowercase
//! │           hex digits, single-space separated
//! └── stream offset of the first byte of the line, 7 lowercase hex digits,
//!     zero-padded (the field widens instead of truncating past 7 digits)
//! ```
//!
//! A line shorter than 16 bytes (only ever the last one) renders its unused
//! word slots as 4 spaces each, so columns stay aligned. The odd trailing
//! byte of an odd-length line fills the low half of its word, high byte 0.
//!
//! # Run Elision
//!
//! A line whose packed words equal the previous line's packed words is not
//! repeated. The first duplicate of a run emits a single marker line:
//!
//! ```text
//! *
//! ```
//!
//! Further duplicates emit nothing until a differing line arrives. The very
//! first line of a stream is always written in full, even if all zero.
//!
//! Equality is compared over the packed words, zero padding included, so a
//! short line can collapse into a run only when the zero fill matches too.
//!
//! # Finalize Line
//!
//! Finishing a dump writes one trailing line holding only the total number
//! of bytes consumed, in the same offset format:
//!
//! ```text
//! 0000020
//! ```
//!
//! # Windowing Across Writes
//!
//! By default every `write` call restarts 16-byte windowing at its own first
//! byte, so a short call ends with a short line and the next call begins a
//! fresh window. This matches the reference transcript for callers that
//! write in 16-byte multiples and is kept for compatibility. The `carrying`
//! constructors instead hold a trailing fragment across calls and flush it
//! as the final short line on finish.

#[macro_use]
extern crate log;

mod dump;
mod error;
pub mod line;
mod session;

pub use dump::Dumper;
pub use error::DumpError;
pub use session::{open_sink, Readback, Session, SinkOptions};

/// input bytes per transcript line
pub const LINE_BYTES: usize = 16;
/// 16-bit words per transcript line
pub const WORDS_PER_LINE: usize = LINE_BYTES / 2;
/// minimum width of the offset field, in hex digits
pub const OFFSET_DIGITS: usize = 7;
/// bounce-buffer size for the passthrough read path
pub const MAX_CHUNK: usize = 65536;
