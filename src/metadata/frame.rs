use super::reader::ByteReader;
use super::TagDiagnostic;
use crate::models::TagField;

const COMPRESSION_BIT: u8 = 1 << 3;
const UNSYNCHRONISATION_BIT: u8 = 1 << 1;

/// Header of a single frame inside the tag region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: [u8; 4],
    /// Declared payload size; the next frame starts this many bytes after the flags
    pub size: u32,
    pub flags: [u8; 2],
}

impl FrameHeader {
    pub const LEN: usize = 10;

    /// Read a frame header at the cursor.
    ///
    /// Returns `Ok(None)` when the cursor sits on zero padding, which ends the
    /// frame sequence. Version 3 tags store plain 32-bit sizes, every other
    /// version stores synchsafe sizes.
    pub fn read(reader: &mut ByteReader<'_>, major_version: u8) -> Result<Option<Self>, TagDiagnostic> {
        let start = reader.offset();
        let id = reader.take_array::<4>()?;
        if id == [0; 4] {
            return Ok(None);
        }
        if !is_word_id(&id) {
            return Err(TagDiagnostic::InvalidFrameId { offset: start, id });
        }

        let size = if major_version == 3 {
            reader.read_u32_be()?
        } else {
            reader.read_synchsafe()?
        };
        let flags = reader.take_array::<2>()?;

        Ok(Some(Self { id, size, flags }))
    }

    pub fn is_compressed(&self) -> bool {
        self.flags[1] & COMPRESSION_BIT != 0
    }

    pub fn is_unsynchronised(&self) -> bool {
        self.flags[1] & UNSYNCHRONISATION_BIT != 0
    }

    pub fn field(&self) -> Option<TagField> {
        TagField::from_frame_id(&self.id)
    }

    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }
}

fn is_word_id(id: &[u8; 4]) -> bool {
    id.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}
