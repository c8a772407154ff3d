use super::TagDiagnostic;

/// Decode a 4-byte synchsafe integer: 7 significant bits per byte, big-endian.
pub fn synchsafe(bytes: [u8; 4]) -> u32 {
    (u32::from(bytes[0] & 0x7F) << 21)
        | (u32::from(bytes[1] & 0x7F) << 14)
        | (u32::from(bytes[2] & 0x7F) << 7)
        | u32::from(bytes[3] & 0x7F)
}

/// Bounds-checked forward cursor over the raw file bytes
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move the cursor to an absolute position; may point past the end
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn skip(&mut self, count: usize) {
        self.offset = self.offset.saturating_add(count);
    }

    /// Borrow `len` bytes at an absolute position without moving the cursor
    pub fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], TagDiagnostic> {
        let end = start.checked_add(len).ok_or(TagDiagnostic::Truncated {
            offset: start,
            wanted: len,
            available: 0,
        })?;
        self.bytes.get(start..end).ok_or(TagDiagnostic::Truncated {
            offset: start,
            wanted: len,
            available: self.bytes.len().saturating_sub(start),
        })
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], TagDiagnostic> {
        let bytes = self.slice(self.offset, len)?;
        self.offset += len;
        Ok(bytes)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], TagDiagnostic> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, TagDiagnostic> {
        Ok(u32::from_be_bytes(self.take_array::<4>()?))
    }

    pub fn read_synchsafe(&mut self) -> Result<u32, TagDiagnostic> {
        Ok(synchsafe(self.take_array::<4>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synchsafe_uses_low_seven_bits() {
        assert_eq!(synchsafe([0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(synchsafe([0x7F, 0x7F, 0x7F, 0x7F]), 0x0FFF_FFFF);
        // High bits are ignored
        assert_eq!(synchsafe([0x80, 0x80, 0x81, 0xFF]), 0xFF);
    }

    #[test]
    fn test_reader_advances_and_reports_truncation() {
        let bytes = [0x00, 0x00, 0x01, 0x00, 0xAA];
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(reader.read_u32_be().unwrap(), 256);
        assert_eq!(reader.offset(), 4);

        match reader.read_u32_be() {
            Err(TagDiagnostic::Truncated { offset, wanted, available }) => {
                assert_eq!(offset, 4);
                assert_eq!(wanted, 4);
                assert_eq!(available, 1);
            }
            other => panic!("Expected truncation, got {:?}", other),
        }
        // A failed read leaves the cursor in place
        assert_eq!(reader.offset(), 4);
    }

    #[test]
    fn test_slice_past_end_after_seek() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);
        reader.seek(10);
        assert!(reader.take(1).is_err());
        assert_eq!(reader.slice(1, 2).unwrap(), &[2, 3]);
        assert!(reader.slice(usize::MAX, 2).is_err());
    }
}
