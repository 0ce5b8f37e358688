use crate::error::WireError;
use crate::header::{HEADER_SIZE, SubElementHeader};

/// Result of feeding one delivery to a [`HeaderCursor`].
///
/// `consumed` counts the bytes taken into the header buffer by this call;
/// `rest` is everything after the header boundary, untouched.
#[derive(Debug, PartialEq, Eq)]
pub struct Consumed<'a> {
    pub consumed: usize,
    pub rest: &'a [u8],
    pub header: Option<SubElementHeader>,
}

impl Consumed<'_> {
    /// `true` once the full header has been collected and validated.
    #[must_use]
    pub fn header_ready(&self) -> bool {
        self.header.is_some()
    }
}

/// Incremental reader for the 6-byte sub-element header.
///
/// The transport hands over chunks of whatever size it likes, so a single
/// delivery may hold anywhere from zero to all six header bytes. The cursor
/// accumulates into an owned buffer until it is full, then parses it once.
///
/// ```text
///   Collecting(fill < 6) ──consume──▶ Collecting ──fill == 6──▶ Ready(header)
///                                                     │
///                                                     └──bad tag──▶ Rejected
/// ```
///
/// After `Ready`, every `consume` passes its input straight through.
#[derive(Clone, Debug, Default)]
pub struct HeaderCursor {
    buf: [u8; HEADER_SIZE],
    fill: usize,
    state: CursorState,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum CursorState {
    #[default]
    Collecting,
    Ready(SubElementHeader),
    Rejected(u16),
}

impl HeaderCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of header bytes collected so far (`0..=6`).
    #[must_use]
    pub fn fill(&self) -> usize {
        self.fill
    }

    /// The parsed header, once all six bytes have arrived.
    #[must_use]
    pub fn header(&self) -> Option<SubElementHeader> {
        match self.state {
            CursorState::Ready(header) => Some(header),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.header().is_some()
    }

    /// Forget everything collected so far.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed the next delivery.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnsupportedSubElement`] on the call that completes
    /// a header with an unknown tag, and on every call after that.
    pub fn consume<'a>(&mut self, input: &'a [u8]) -> Result<Consumed<'a>, WireError> {
        match self.state {
            CursorState::Ready(header) => {
                return Ok(Consumed {
                    consumed: 0,
                    rest: input,
                    header: Some(header),
                });
            }
            CursorState::Rejected(tag) => return Err(WireError::UnsupportedSubElement { tag }),
            CursorState::Collecting => {}
        }

        let take = (HEADER_SIZE - self.fill).min(input.len());
        self.buf[self.fill..self.fill + take].copy_from_slice(&input[..take]);
        self.fill += take;

        if self.fill < HEADER_SIZE {
            return Ok(Consumed {
                consumed: take,
                rest: &input[take..],
                header: None,
            });
        }

        match SubElementHeader::read_from(&self.buf) {
            Ok(header) => {
                self.state = CursorState::Ready(header);
                Ok(Consumed {
                    consumed: take,
                    rest: &input[take..],
                    header: Some(header),
                })
            }
            Err(err) => {
                if let WireError::UnsupportedSubElement { tag } = err {
                    self.state = CursorState::Rejected(tag);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(length: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = SubElementHeader::upgrade_image(length).to_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn whole_header_in_one_delivery() {
        let bytes = image(3, b"abc");
        let mut cursor = HeaderCursor::new();
        let out = cursor.consume(&bytes).unwrap();
        assert_eq!(out.consumed, HEADER_SIZE);
        assert_eq!(out.rest, b"abc");
        assert_eq!(out.header, Some(SubElementHeader::upgrade_image(3)));
    }

    #[test]
    fn header_split_byte_by_byte() {
        let bytes = image(0x0102_0304, b"z");
        let mut cursor = HeaderCursor::new();
        for (i, byte) in bytes[..HEADER_SIZE - 1].iter().enumerate() {
            let out = cursor.consume(std::slice::from_ref(byte)).unwrap();
            assert!(!out.header_ready());
            assert_eq!(cursor.fill(), i + 1);
        }
        let out = cursor.consume(&bytes[HEADER_SIZE - 1..]).unwrap();
        assert_eq!(out.consumed, 1);
        assert_eq!(out.rest, b"z");
        assert_eq!(out.header.unwrap().length, 0x0102_0304);
    }

    #[test]
    fn empty_delivery_is_harmless() {
        let mut cursor = HeaderCursor::new();
        let out = cursor.consume(&[]).unwrap();
        assert_eq!(out.consumed, 0);
        assert!(out.rest.is_empty());
        assert!(!out.header_ready());
    }

    #[test]
    fn ready_cursor_passes_input_through() {
        let mut cursor = HeaderCursor::new();
        cursor.consume(&image(9, &[])).unwrap();
        let out = cursor.consume(b"payload").unwrap();
        assert_eq!(out.consumed, 0);
        assert_eq!(out.rest, b"payload");
        assert!(out.header_ready());
    }

    #[test]
    fn unknown_tag_is_sticky() {
        let mut cursor = HeaderCursor::new();
        let bad = [0x01, 0x00, 0x10, 0x00, 0x00, 0x00, 0xAA];
        assert_eq!(
            cursor.consume(&bad),
            Err(WireError::UnsupportedSubElement { tag: 1 })
        );
        assert!(cursor.consume(b"more").is_err());
        assert!(!cursor.is_ready());
    }

    #[test]
    fn reset_starts_over() {
        let mut cursor = HeaderCursor::new();
        cursor.consume(&[0, 0, 5]).unwrap();
        cursor.reset();
        assert_eq!(cursor.fill(), 0);
        let bytes = image(7, &[]);
        let out = cursor.consume(&bytes).unwrap();
        assert_eq!(out.header.unwrap().length, 7);
    }
}
