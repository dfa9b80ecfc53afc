//! Word packing and text rendering for a single transcript line.
//!
//! Everything here is a pure function of its arguments; the run elision
//! state lives in [`crate::Dumper`].

use crate::{LINE_BYTES, OFFSET_DIGITS, WORDS_PER_LINE};

/// Pack up to 16 bytes into 8 little-endian 16-bit words.
///
/// Bytes pair up least-significant-first; an odd trailing byte fills the
/// low half of its word with the high byte 0. Word slots past the supplied
/// length are exactly 0, so packed lines compare with their zero fill.
pub fn pack_words(line: &[u8]) -> [u16; WORDS_PER_LINE] {
    debug_assert!(!line.is_empty() && line.len() <= LINE_BYTES);
    let mut words = [0u16; WORDS_PER_LINE];
    for (word, pair) in words.iter_mut().zip(line.chunks(2)) {
        let hi = if pair.len() == 2 { pair[1] } else { 0 };
        *word = u16::from_le_bytes([pair[0], hi]);
    }
    words
}

/// Render one full transcript line.
///
/// `len` is the number of input bytes behind `words`; slots past ⌈len/2⌉
/// render as 4 spaces to keep columns aligned. The offset field is
/// zero-padded to [`OFFSET_DIGITS`] and widens rather than truncates.
pub fn format_line(offset: u64, words: &[u16; WORDS_PER_LINE], len: usize) -> String {
    debug_assert!(len >= 1 && len <= LINE_BYTES);
    let used = len.div_ceil(2);
    let mut out = String::with_capacity(OFFSET_DIGITS + 5 * WORDS_PER_LINE + 1);
    out.push_str(&format!("{offset:0width$x}", width = OFFSET_DIGITS));
    for (i, word) in words.iter().enumerate() {
        out.push(' ');
        if i < used {
            out.push_str(&hex::encode(word.to_be_bytes()));
        } else {
            out.push_str("    ");
        }
    }
    out.push('\n');
    out
}

/// Render the trailing offset-only line written once when a dump finishes.
pub fn offset_line(offset: u64) -> String {
    format!("{offset:0width$x}\n", width = OFFSET_DIGITS)
}
