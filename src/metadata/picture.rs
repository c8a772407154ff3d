use super::text::{latin1, null_terminated_len, wide_terminated_len, TextEncoding};
use crate::models::EmbeddedPicture;

/// Decode an attached-picture payload.
///
/// Layout: description encoding (1), MIME type + `00`, picture type (1),
/// description + terminator, image bytes. Boundaries are found by scanning
/// for terminators; a payload that ends early yields an empty image.
pub fn decode_picture(payload: &[u8]) -> EmbeddedPicture {
    let description_encoding = TextEncoding::from_byte(payload.first().copied().unwrap_or(0));

    let mut offset = 1;
    let mime_len = null_terminated_len(payload, offset);
    let mime_type = payload
        .get(offset..offset + mime_len)
        .map(latin1)
        .unwrap_or_default();
    offset += mime_len + 1;

    let picture_type = payload.get(offset).copied().unwrap_or(0);
    offset += 1;

    if description_encoding.is_wide() {
        offset += wide_terminated_len(payload, offset) + 2;
    } else {
        offset += null_terminated_len(payload, offset) + 1;
        // Some writers pad the terminator to two bytes
        if payload.get(offset) == Some(&0) {
            offset += 1;
        }
    }

    let data = payload.get(offset..).map(<[u8]>::to_vec).unwrap_or_default();

    EmbeddedPicture {
        mime_type,
        picture_type,
        data,
    }
}
