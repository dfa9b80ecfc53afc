use crate::error::DumpError;
use crate::line::{format_line, offset_line, pack_words};
use crate::{LINE_BYTES, WORDS_PER_LINE};
use std::fmt::Debug;
use std::{fmt, io};

/// Streaming hexdump transcoder over an [`io::Write`] sink.
///
/// Feed bytes with [`update`](Dumper::update); every 16-byte window becomes
/// one transcript line, runs of identical lines collapse to a `*` marker,
/// and [`finish`](Dumper::finish) writes the trailing offset-only line.
///
/// [`Dumper::new`] restarts windowing at the start of every `update` call,
/// matching the reference transcript. [`Dumper::carrying`] instead holds a
/// trailing fragment across calls; in that mode bytes count as consumed
/// once buffered, and a held fragment whose flush failed stays buffered for
/// the next call.
pub struct Dumper<W> {
    run: RunState,
    offset: u64,
    partial: [u8; LINE_BYTES],
    partial_len: usize,
    carry: bool,
    writer: W,
}

#[derive(Copy, Clone)]
enum RunState {
    /// No line processed yet; the first line has no predecessor to match.
    First,
    /// Words of the last fully formatted line.
    Fresh([u16; WORDS_PER_LINE]),
    /// Same, but the current run already has its marker written.
    Elided([u16; WORDS_PER_LINE]),
}

impl<W: io::Write> Dumper<W> {
    pub fn new(writer: W) -> Self {
        Self::with_carry(writer, false)
    }

    /// A dumper that carries a trailing partial window across calls.
    pub fn carrying(writer: W) -> Self {
        Self::with_carry(writer, true)
    }

    fn with_carry(writer: W, carry: bool) -> Self {
        Dumper {
            run: RunState::First,
            offset: 0,
            partial: [0; LINE_BYTES],
            partial_len: 0,
            carry,
            writer,
        }
    }

    /// Count of input bytes transcoded into lines so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes held in the carry buffer, waiting for a full window.
    pub fn pending(&self) -> usize {
        self.partial_len
    }

    /// Transcode `chunk`, returning the count of bytes consumed.
    ///
    /// On a sink failure the error carries the count of bytes this call
    /// had already committed, so the caller can retry the remainder.
    pub fn update(&mut self, chunk: &[u8]) -> Result<usize, DumpError> {
        let mut consumed = 0usize;
        let mut rest = chunk;

        // Complete a held fragment first.
        if self.carry && self.partial_len > 0 {
            let take = rest.len().min(LINE_BYTES - self.partial_len);
            self.partial[self.partial_len..self.partial_len + take].copy_from_slice(&rest[..take]);
            self.partial_len += take;
            consumed += take;
            rest = &rest[take..];
            if self.partial_len == LINE_BYTES {
                let held = self.partial;
                self.put_line(&held).map_err(|source| DumpError::SinkWriteFailed {
                    committed: consumed as u64,
                    source,
                })?;
                self.partial_len = 0;
            }
        }

        for line in rest.chunks(LINE_BYTES) {
            if self.carry && line.len() < LINE_BYTES {
                trace!("holding {} byte fragment", line.len());
                self.partial[..line.len()].copy_from_slice(line);
                self.partial_len = line.len();
            } else if let Err(source) = self.put_line(line) {
                return Err(DumpError::SinkWriteFailed {
                    committed: consumed as u64,
                    source,
                });
            }
            consumed += line.len();
        }
        Ok(consumed)
    }

    fn put_line(&mut self, line: &[u8]) -> io::Result<()> {
        let words = pack_words(line);
        trace!("current run {:?}", self.run);
        match self.run {
            RunState::Fresh(prev) if prev == words => {
                trace!("repeat at {:#x}, writing marker", self.offset);
                self.writer.write_all(b"*\n")?;
                self.run = RunState::Elided(words);
            }
            RunState::Elided(prev) if prev == words => {
                trace!("repeat at {:#x}, already elided", self.offset);
            }
            _ => {
                let text = format_line(self.offset, &words, line.len());
                trace!("line at {:#x}: {:?}", self.offset, text);
                self.writer.write_all(text.as_bytes())?;
                self.run = RunState::Fresh(words);
            }
        }
        self.offset += line.len() as u64;
        Ok(())
    }

    /// Flush any held fragment, write the finalize line, and flush the sink.
    pub fn finish(mut self) -> Result<(), DumpError> {
        if self.partial_len > 0 {
            let held = self.partial;
            let len = self.partial_len;
            self.put_line(&held[..len])
                .map_err(|source| DumpError::SinkWriteFailed {
                    committed: self.offset,
                    source,
                })?;
            self.partial_len = 0;
        }
        trace!("finalize at {:#x}", self.offset);
        self.writer
            .write_all(offset_line(self.offset).as_bytes())
            .map_err(|source| DumpError::SinkWriteFailed {
                committed: self.offset,
                source,
            })?;
        self.writer.flush().map_err(|source| DumpError::SinkWriteFailed {
            committed: self.offset,
            source,
        })
    }
}

impl Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |words: &[u16; WORDS_PER_LINE]| {
            words
                .iter()
                .map(|w| format!("{w:04x}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            RunState::First => f.write_str("First"),
            RunState::Fresh(words) => write!(f, "Fresh({})", join(words)),
            RunState::Elided(words) => write!(f, "Elided({})", join(words)),
        }
    }
}

impl<W: io::Write> io::Write for Dumper<W> {
    /// Short-write semantics: a sink failure after progress reports the
    /// bytes that made it, a failure with none surfaces the error.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.update(buf) {
            Ok(n) => Ok(n),
            Err(DumpError::SinkWriteFailed { committed, .. }) if committed > 0 => {
                Ok(committed as usize)
            }
            Err(DumpError::SinkWriteFailed { source, .. }) => Err(source),
            Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Setup function that is only run once, even if called multiple times.
    fn setup() {
        INIT.call_once(|| {
            let _ = pretty_env_logger::try_init();
        });
    }

    fn dump(chunks: &[&[u8]]) -> (String, u64) {
        let mut out = vec![];
        let mut dumper = Dumper::new(&mut out);
        for chunk in chunks {
            assert_eq!(dumper.update(chunk).unwrap(), chunk.len());
        }
        let offset = dumper.offset();
        dumper.finish().unwrap();
        (String::from_utf8(out).unwrap(), offset)
    }

    #[test]
    fn sixteen_distinct_bytes() {
        setup();
        let bytes: Vec<u8> = (1..=16).collect();
        let (text, offset) = dump(&[&bytes]);
        assert_eq!(
            text,
            "0000000 0201 0403 0605 0807 0a09 0c0b 0e0d 100f\n0000010\n"
        );
        assert_eq!(offset, 16);
    }

    #[test]
    fn two_identical_lines_emit_one_marker() {
        setup();
        let bytes = [0xab; 32];
        let (text, _) = dump(&[&bytes]);
        assert_eq!(
            text,
            "0000000 abab abab abab abab abab abab abab abab\n*\n0000020\n"
        );
    }

    #[test]
    fn long_runs_still_emit_one_marker() {
        setup();
        for lines in [3usize, 100] {
            let bytes = vec![0x55u8; lines * LINE_BYTES];
            let (text, offset) = dump(&[&bytes]);
            assert_eq!(
                text,
                format!(
                    "0000000 5555 5555 5555 5555 5555 5555 5555 5555\n*\n{:07x}\n",
                    offset
                )
            );
            assert_eq!(offset, (lines * LINE_BYTES) as u64);
        }
    }

    #[test]
    fn first_line_of_zeros_is_not_elided() {
        setup();
        let (text, _) = dump(&[&[0u8; 16]]);
        assert_eq!(
            text,
            "0000000 0000 0000 0000 0000 0000 0000 0000 0000\n0000010\n"
        );
    }

    #[test]
    fn run_break_resets_elision() {
        setup();
        // A A B A A: each maximal run of A gets its own marker
        let mut bytes = vec![];
        bytes.extend_from_slice(&[0x11; 32]);
        bytes.extend_from_slice(&[0x22; 16]);
        bytes.extend_from_slice(&[0x11; 32]);
        let (text, _) = dump(&[&bytes]);
        assert_eq!(
            text,
            concat!(
                "0000000 1111 1111 1111 1111 1111 1111 1111 1111\n",
                "*\n",
                "0000020 2222 2222 2222 2222 2222 2222 2222 2222\n",
                "0000030 1111 1111 1111 1111 1111 1111 1111 1111\n",
                "*\n",
                "0000050\n"
            )
        );
    }

    #[test]
    fn line_offsets_follow_the_stream() {
        setup();
        let mut bytes: Vec<u8> = (0..=255).collect();
        bytes.extend(0..=255);
        let (text, offset) = dump(&[&bytes]);
        assert_eq!(offset, 512);
        for (i, line) in text.lines().enumerate().take(32) {
            assert!(line.starts_with(&format!("{:07x} ", i * 16)));
        }
        assert!(text.ends_with("0000200\n"));
    }

    #[test]
    fn five_bytes_pad_and_finalize() {
        setup();
        let (text, offset) = dump(&[&[0x01, 0x02, 0x03, 0x04, 0x05]]);
        assert_eq!(
            text,
            "0000000 0201 0403 0005                         \n0000005\n"
        );
        assert_eq!(offset, 5);
    }

    #[test]
    fn empty_stream_writes_only_the_finalize_line() {
        setup();
        let (text, offset) = dump(&[]);
        assert_eq!(text, "0000000\n");
        assert_eq!(offset, 0);
    }

    #[test]
    fn each_call_restarts_windowing() {
        setup();
        // identical 8-byte writes produce a short line and then a marker,
        // not one 16-byte line
        let (text, offset) = dump(&[&[0x42; 8], &[0x42; 8]]);
        assert_eq!(
            text,
            "0000000 4242 4242 4242 4242                    \n*\n0000010\n"
        );
        assert_eq!(offset, 16);
    }

    #[test]
    fn short_lines_compare_with_their_zero_fill() {
        setup();
        // 1-byte line packs as 0x0042; an explicit [0x42, 0x00] line packs
        // the same and must collapse into the run
        let (text, _) = dump(&[&[0x42], &[0x42, 0x00]]);
        assert_eq!(
            text,
            "0000000 0042                                   \n*\n0000003\n"
        );
    }

    #[test]
    fn carry_joins_fragments_across_calls() {
        setup();
        let mut out = vec![];
        let mut dumper = Dumper::carrying(&mut out);
        assert_eq!(dumper.update(&[0x42; 8]).unwrap(), 8);
        assert_eq!(dumper.pending(), 8);
        assert_eq!(dumper.update(&[0x42; 8]).unwrap(), 8);
        assert_eq!(dumper.pending(), 0);
        dumper.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0000000 4242 4242 4242 4242 4242 4242 4242 4242\n0000010\n"
        );
    }

    #[test]
    fn carry_flushes_held_fragment_on_finish() {
        setup();
        let mut out = vec![];
        let mut dumper = Dumper::carrying(&mut out);
        let bytes: Vec<u8> = (1..=20).collect();
        assert_eq!(dumper.update(&bytes).unwrap(), 20);
        assert_eq!(dumper.pending(), 4);
        dumper.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            concat!(
                "0000000 0201 0403 0605 0807 0a09 0c0b 0e0d 100f\n",
                "0000010 1211 1413                              \n",
                "0000014\n"
            )
        );
    }

    /// Accepts `cap` bytes, then fails every write.
    struct FailAfter {
        cap: usize,
        wrote: usize,
    }

    impl io::Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.wrote + buf.len() > self.cap {
                return Err(io::Error::new(io::ErrorKind::Other, "sink full"));
            }
            self.wrote += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failure_reports_committed_bytes() {
        setup();
        // one formatted line is 48 bytes, so the second line's write fails
        let mut dumper = Dumper::new(FailAfter { cap: 48, wrote: 0 });
        let bytes: Vec<u8> = (0..32).collect();
        match dumper.update(&bytes) {
            Err(DumpError::SinkWriteFailed { committed, .. }) => assert_eq!(committed, 16),
            other => panic!("expected SinkWriteFailed, got {other:?}"),
        }
        // offset stays consistent with what was durably appended
        assert_eq!(dumper.offset(), 16);
    }

    #[test]
    fn io_write_reports_short_writes() {
        setup();
        use io::Write;
        let mut dumper = Dumper::new(FailAfter { cap: 48, wrote: 0 });
        let bytes: Vec<u8> = (0..32).collect();
        assert_eq!(dumper.write(&bytes).unwrap(), 16);
        // no progress at all surfaces the error itself
        assert!(dumper.write(&bytes[16..]).is_err());
    }
}
