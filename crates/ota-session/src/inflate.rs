use flate2::{Decompress, FlushDecompress, Status};
use tracing::trace;

use crate::config::MIN_SCRATCH_SIZE;
use crate::error::InflateError;

/// Streaming zlib decoder with a fixed output buffer.
///
/// Input arrives in arbitrary pieces; output is produced in chunks of at
/// most `scratch_size` bytes. Nothing is accumulated beyond the scratch
/// buffer and the decoder's own window, so memory use does not depend on
/// image size.
///
/// ```text
///   compressed piece ──feed()──▶ Feed ──next()──▶ &[u8] (≤ scratch_size)
///                                      ──next()──▶ &[u8]
///                                      ──next()──▶ None   (input drained)
/// ```
pub struct Inflater {
    stream: Decompress,
    scratch: Box<[u8]>,
    finished: bool,
}

impl Inflater {
    /// # Errors
    ///
    /// Returns [`InflateError::ScratchTooSmall`] if `scratch_size` is below
    /// [`MIN_SCRATCH_SIZE`].
    pub fn new(scratch_size: usize) -> Result<Self, InflateError> {
        if scratch_size < MIN_SCRATCH_SIZE {
            return Err(InflateError::ScratchTooSmall {
                size: scratch_size,
                min: MIN_SCRATCH_SIZE,
            });
        }
        Ok(Self {
            stream: Decompress::new(true),
            scratch: vec![0u8; scratch_size].into_boxed_slice(),
            finished: false,
        })
    }

    /// Decode `input`, yielding output chunks until it is consumed.
    pub fn feed<'a>(&'a mut self, input: &'a [u8]) -> Feed<'a> {
        Feed {
            inflater: self,
            input,
            flush: FlushDecompress::None,
            done: false,
        }
    }

    /// Drain whatever the decoder still holds with no further input.
    ///
    /// A stream that was cut short simply yields nothing more; the caller
    /// decides from the byte count whether that is an error.
    pub fn finish(&mut self) -> Feed<'_> {
        Feed {
            inflater: self,
            input: &[],
            flush: FlushDecompress::Finish,
            done: false,
        }
    }

    /// `true` once the zlib trailer has been seen.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    #[must_use]
    pub fn total_out(&self) -> u64 {
        self.stream.total_out()
    }

    #[must_use]
    pub fn scratch_size(&self) -> usize {
        self.scratch.len()
    }
}

/// One pass of input through an [`Inflater`].
///
/// Works like an iterator, but each chunk borrows the inflater's scratch
/// buffer and must be used before the next call to [`next`](Self::next).
/// After an error the feed is exhausted.
pub struct Feed<'a> {
    inflater: &'a mut Inflater,
    input: &'a [u8],
    flush: FlushDecompress,
    done: bool,
}

impl Feed<'_> {
    /// Produce the next chunk of decompressed bytes.
    ///
    /// Returns `None` once the input is consumed and the scratch buffer was
    /// not filled by the last step, or after the end of the stream.
    #[allow(clippy::should_implement_trait, clippy::cast_possible_truncation)]
    pub fn next(&mut self) -> Option<Result<&[u8], InflateError>> {
        loop {
            if self.done {
                return None;
            }
            if self.inflater.finished {
                if !self.input.is_empty() {
                    trace!(bytes = self.input.len(), "ignoring bytes after end of stream");
                    self.input = &[];
                }
                self.done = true;
                return None;
            }

            let before_in = self.inflater.stream.total_in();
            let before_out = self.inflater.stream.total_out();
            let status = match self.inflater.stream.decompress(
                self.input,
                &mut self.inflater.scratch[..],
                self.flush,
            ) {
                Ok(status) => status,
                Err(e) => {
                    self.done = true;
                    return Some(Err(InflateError::Malformed(e.to_string())));
                }
            };
            let consumed = (self.inflater.stream.total_in() - before_in) as usize;
            let produced = (self.inflater.stream.total_out() - before_out) as usize;
            self.input = &self.input[consumed..];

            if matches!(status, Status::StreamEnd) {
                self.inflater.finished = true;
            }

            // A full scratch buffer may mean the decoder has more pending.
            let more = !self.input.is_empty() || produced == self.inflater.scratch.len();
            if !more || (consumed == 0 && produced == 0) {
                self.done = true;
            }

            if produced > 0 {
                return Some(Ok(&self.inflater.scratch[..produced]));
            }
        }
    }
}
