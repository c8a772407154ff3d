//! Embedded tag decoding straight from the raw file bytes.
//!
//! The tag region starts with a 10-byte header (`"ID3"`, major version,
//! revision, flags, synchsafe body size) followed by frames. Decoding never
//! fails: anything already read is returned together with the reason the
//! scan stopped early, if it did.

pub mod frame;
pub mod picture;
pub mod reader;
pub mod text;

use log::debug;
use thiserror::Error;

use crate::models::{TagField, Tags};
use frame::FrameHeader;
use reader::ByteReader;

/// Marker at offset 0 of a tagged file
pub const TAG_MARKER: &[u8; 3] = b"ID3";

/// Length of the tag header preceding the frames
pub const TAG_HEADER_LEN: usize = 10;

/// Why a scan stopped before reaching the end of the tag region
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagDiagnostic {
    #[error("tag data truncated at byte {offset}: wanted {wanted} bytes, {available} available")]
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("malformed frame identifier {id:02X?} at byte {offset}")]
    InvalidFrameId { offset: usize, id: [u8; 4] },
}

/// Result of a decode: the best-effort tags plus scan details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    pub tags: Tags,
    /// Major version byte from the header
    pub version: Option<u8>,
    /// Absolute offset where the tag region ends
    pub tag_end: usize,
    /// Offset the frame scan reached
    pub scanned_to: usize,
    pub frames_seen: usize,
    /// Recognised frames left undecoded because their payload is compressed
    pub compressed_skipped: Vec<TagField>,
    pub diagnostic: Option<TagDiagnostic>,
}

impl TagReport {
    pub fn is_complete(&self) -> bool {
        self.diagnostic.is_none()
    }
}

/// Decoder for the embedded tag region
pub struct TagDecoder;

impl TagDecoder {
    /// Whether the buffer starts with the tag marker
    pub fn has_marker(buffer: &[u8]) -> bool {
        buffer.starts_with(TAG_MARKER)
    }

    /// Decode the tag region at the start of `buffer`.
    ///
    /// The marker itself is not checked here; callers test it with
    /// [`TagDecoder::has_marker`] first.
    pub fn decode(buffer: &[u8]) -> TagReport {
        let mut report = TagReport::default();
        let mut reader = ByteReader::new(buffer);

        if let Err(diagnostic) = Self::scan(&mut reader, &mut report) {
            debug!("Tag scan stopped early: {}", diagnostic);
            report.diagnostic = Some(diagnostic);
        }
        report.scanned_to = reader.offset();

        debug!(
            "Decoded tag v2.{} with {} frames ({} bytes)",
            report.version.unwrap_or(0),
            report.frames_seen,
            report.tag_end
        );
        report
    }

    fn scan(reader: &mut ByteReader<'_>, report: &mut TagReport) -> Result<(), TagDiagnostic> {
        // Marker and version
        let version = reader.take_array::<4>()?[3];
        report.version = Some(version);
        // Revision and flags
        reader.skip(2);
        let body_len = reader.read_synchsafe()? as usize;
        let tag_end = body_len + TAG_HEADER_LEN;
        report.tag_end = tag_end;

        while reader.offset() < tag_end {
            let Some(header) = FrameHeader::read(reader, version)? else {
                break;
            };
            report.frames_seen += 1;

            let payload_start = reader.offset();
            let next_frame = payload_start.saturating_add(header.size as usize);

            if header.is_compressed() {
                let inflated = reader.read_synchsafe()?;
                if let Some(field) = header.field() {
                    if !report.tags.is_set(field) {
                        debug!(
                            "Skipping compressed {} frame ({} bytes inflated)",
                            header.id_str(),
                            inflated
                        );
                        report.compressed_skipped.push(field);
                    }
                }
            } else if let Some(field) = header.field() {
                if !report.tags.is_set(field) {
                    let payload = reader.slice(payload_start, header.size as usize)?;
                    match field {
                        TagField::Picture => {
                            report.tags.set_picture(picture::decode_picture(payload));
                        }
                        _ => {
                            let value = text::decode_text(payload, header.is_unsynchronised());
                            report.tags.set_text(field, value);
                        }
                    }
                }
            }

            reader.seek(next_frame);
        }

        Ok(())
    }
}
