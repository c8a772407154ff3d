//! Text frame payloads.
//!
//! The first payload byte selects the encoding:
//!
//! | byte | encoding                 | terminator |
//! |------|--------------------------|------------|
//! | 0    | ISO-8859-1               | `00`       |
//! | 1    | UTF-16 with byte-order mark | `00 00` |
//! | 2    | UTF-16BE, no byte-order mark | `00 00` |
//! | 3    | UTF-8                    | `00`       |
//!
//! Unknown encoding bytes are read as ISO-8859-1.

const UNSYNC_ESCAPE: [u8; 3] = [0xFF, 0x00, 0xFE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    Utf16Bom,
    Utf16Be,
    Utf8,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16Bom,
            2 => TextEncoding::Utf16Be,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Latin1,
        }
    }

    /// Whether strings in this encoding end with a two-byte terminator
    pub fn is_wide(&self) -> bool {
        matches!(self, TextEncoding::Utf16Bom | TextEncoding::Utf16Be)
    }
}

/// Decode a text frame payload, encoding byte included
pub fn decode_text(payload: &[u8], unsynchronised: bool) -> String {
    let Some((&encoding_byte, body)) = payload.split_first() else {
        return String::new();
    };

    match TextEncoding::from_byte(encoding_byte) {
        TextEncoding::Latin1 => {
            if encoding_byte == 0 && unsynchronised {
                if let Some(start) = find_unsync_escape(payload) {
                    let filtered: Vec<u8> = payload[start..].iter().copied().filter(|b| *b != 0).collect();
                    return latin1(&filtered);
                }
            }
            latin1(strip_terminator(body))
        }
        TextEncoding::Utf16Bom => {
            let little_endian = body.starts_with(&[0xFF, 0xFE]);
            let units = body.get(2..).unwrap_or(&[]);
            utf16(strip_wide_terminator(units), little_endian)
        }
        TextEncoding::Utf16Be => utf16(strip_wide_terminator(body), false),
        TextEncoding::Utf8 => String::from_utf8_lossy(strip_terminator(body)).into_owned(),
    }
}

/// ISO-8859-1: every byte is the code point of the same value
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Length of the run of non-zero bytes starting at `start`
pub fn null_terminated_len(bytes: &[u8], start: usize) -> usize {
    bytes
        .get(start..)
        .map(|rest| rest.iter().take_while(|b| **b != 0).count())
        .unwrap_or(0)
}

/// Length of a wide string starting at `start`, up to an aligned `00 00`
pub fn wide_terminated_len(bytes: &[u8], start: usize) -> usize {
    bytes
        .get(start..)
        .map(|rest| {
            rest.chunks(2)
                .take_while(|unit| *unit != [0, 0])
                .map(<[u8]>::len)
                .sum()
        })
        .unwrap_or(0)
}

fn find_unsync_escape(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(UNSYNC_ESCAPE.len())
        .position(|window| window == UNSYNC_ESCAPE)
        .map(|index| index + UNSYNC_ESCAPE.len())
}

fn strip_terminator(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(&[0]).unwrap_or(bytes)
}

fn strip_wide_terminator(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(&[0, 0]).unwrap_or(bytes)
}

fn utf16(bytes: &[u8], little_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_with_terminator() {
        assert_eq!(decode_text(b"\x00Caf\xE9\x00", false), "Café");
        assert_eq!(decode_text(b"\x00Plain", false), "Plain");
    }

    #[test]
    fn test_utf16_little_endian_bom() {
        let payload = [0x01, 0xFF, 0xFE, b'H', 0x00, b'i', 0x00, 0x00, 0x00];
        assert_eq!(decode_text(&payload, false), "Hi");
    }

    #[test]
    fn test_utf16_big_endian_bom() {
        let payload = [0x01, 0xFE, 0xFF, 0x00, b'H', 0x00, b'i', 0x00, 0x00];
        assert_eq!(decode_text(&payload, false), "Hi");
    }

    #[test]
    fn test_utf16_without_bom() {
        let payload = [0x02, 0x00, b'O', 0x00, b'K', 0x00, 0x00];
        assert_eq!(decode_text(&payload, false), "OK");
    }

    #[test]
    fn test_utf8() {
        let mut payload = vec![0x03];
        payload.extend_from_slice("Ünïcode".as_bytes());
        payload.push(0);
        assert_eq!(decode_text(&payload, false), "Ünïcode");
    }

    #[test]
    fn test_unknown_encoding_falls_back_to_latin1() {
        assert_eq!(decode_text(b"\x09Rock", false), "Rock");
    }

    #[test]
    fn test_unsynchronised_escape_filters_zero_bytes() {
        let payload = [0x00, 0xFF, 0x00, 0xFE, b'A', 0x00, b'B', 0x00];
        assert_eq!(decode_text(&payload, true), "AB");

        // Without the flag the escape bytes are ordinary Latin-1
        assert_eq!(decode_text(&payload, false), "\u{FF}\u{0}\u{FE}A\u{0}B");

        // Flag set but no escape present
        assert_eq!(decode_text(&[0x00, b'x', 0x00], true), "x");
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(decode_text(&[], false), "");
        assert_eq!(decode_text(&[0x01], false), "");
    }

    #[test]
    fn test_terminated_lengths() {
        let bytes = b"\x00image/png\x00rest";
        assert_eq!(null_terminated_len(bytes, 1), 9);
        assert_eq!(null_terminated_len(bytes, 100), 0);

        let wide = [b'a', 0x00, b'b', 0x00, 0x00, 0x00, 0xFF];
        assert_eq!(wide_terminated_len(&wide, 0), 4);
        assert_eq!(wide_terminated_len(&[b'a', 0x00], 0), 2);
    }
}
