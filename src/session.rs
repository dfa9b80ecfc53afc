//! Device-style session layer: open a sink, stream writes through the
//! transcoder, close with the finalize line, and read raw bytes back.

use crate::dump::Dumper;
use crate::error::DumpError;
use crate::MAX_CHUNK;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

/// Open policy for a file-backed sink.
///
/// The write path always creates the target if absent; truncation and
/// append are the caller's choice, like the `O_TRUNC`/`O_APPEND` flags of
/// a plain file open.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkOptions {
    pub truncate: bool,
    pub append: bool,
}

/// Open a file sink for a transcoding session.
pub fn open_sink(path: &Path, opts: &SinkOptions) -> Result<File, DumpError> {
    info!("opening sink {} with {:?}", path.display(), opts);
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if opts.truncate {
        options.truncate(true);
    }
    if opts.append {
        options.append(true);
    }
    options.open(path).map_err(|err| {
        error!("failed to open sink {}: {}", path.display(), err);
        DumpError::ResourceUnavailable(err)
    })
}

/// One transcoding session over an exclusively owned sink.
///
/// `write` and `close` require a prior [`open`](Session::open) and fail
/// with [`DumpError::InvalidState`] otherwise; closing an already-closed
/// session is a no-op. `&mut self` everywhere keeps the session
/// single-writer by construction.
pub struct Session<W: io::Write> {
    dumper: Option<Dumper<W>>,
    carry: bool,
}

impl<W: io::Write> Session<W> {
    pub fn new() -> Self {
        Session {
            dumper: None,
            carry: false,
        }
    }

    /// A session whose dumper carries partial windows across writes.
    pub fn carrying() -> Self {
        Session {
            dumper: None,
            carry: true,
        }
    }

    /// Acquire `sink` and reset the transcoding state.
    pub fn open(&mut self, sink: W) -> Result<(), DumpError> {
        if self.dumper.is_some() {
            error!("open on an already-open session");
            return Err(DumpError::InvalidState);
        }
        info!("session opened");
        self.dumper = Some(if self.carry {
            Dumper::carrying(sink)
        } else {
            Dumper::new(sink)
        });
        Ok(())
    }

    /// Transcode `data` into the sink, returning the bytes consumed.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, DumpError> {
        match self.dumper.as_mut() {
            Some(dumper) => dumper.update(data),
            None => {
                error!("write on a closed session");
                Err(DumpError::InvalidState)
            }
        }
    }

    /// Write the finalize line and release the sink.
    ///
    /// The sink is released even when the finalize write fails; the error
    /// is still reported.
    pub fn close(&mut self) -> Result<(), DumpError> {
        match self.dumper.take() {
            Some(dumper) => {
                let offset = dumper.offset();
                let result = dumper.finish();
                if let Err(err) = &result {
                    error!("error writing finalize line: {err}");
                } else {
                    info!("session closed at {offset:#x}");
                }
                result
            }
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.dumper.is_some()
    }

    /// Bytes transcoded since open; 0 when closed.
    pub fn offset(&self) -> u64 {
        self.dumper.as_ref().map_or(0, Dumper::offset)
    }
}

impl<W: io::Write> Default for Session<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw passthrough reader over the sink file, with its own cursor.
///
/// Independent of any transcoding session: reading never disturbs the
/// session's write position or stream offset.
pub struct Readback {
    file: File,
}

impl Readback {
    pub fn open(path: &Path) -> Result<Self, DumpError> {
        let file = File::open(path).map_err(|err| {
            error!("failed to open {} for readback: {}", path.display(), err);
            DumpError::ResourceUnavailable(err)
        })?;
        Ok(Readback { file })
    }

    /// Copy everything from the current cursor to `out` in bounded chunks.
    pub fn drain_to<T: Write>(&mut self, out: &mut T) -> io::Result<u64> {
        let mut buf = vec![0u8; MAX_CHUNK];
        let mut total = 0u64;
        loop {
            let n = self.file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            total += n as u64;
        }
        Ok(total)
    }
}

impl Read for Readback {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}
