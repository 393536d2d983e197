//! Minimal BSON framing
//!
//! Only what the archive needs: splitting a stream into documents and
//! finding the top-level `_id`. Values are skipped, never decoded.

use std::io::{self, Read};

use bytes::Bytes;

use super::{DocumentError, ObjectId};

/// Smallest valid document: length prefix plus terminator
pub const MIN_DOCUMENT_SIZE: u32 = 5;

/// Largest document accepted from a stream
pub const MAX_DOCUMENT_SIZE: u32 = 16 * 1024 * 1024;

const OBJECT_ID_KIND: u8 = 0x07;

/// Read the next length-prefixed document
///
/// Returns `Ok(None)` on a clean end of stream before a length prefix.
pub fn read_document<R: Read>(reader: &mut R) -> Result<Option<Bytes>, DocumentError> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(DocumentError::UnexpectedEof),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    let length = u32::from_le_bytes(len_buf);
    if !(MIN_DOCUMENT_SIZE..=MAX_DOCUMENT_SIZE).contains(&length) {
        return Err(DocumentError::InvalidLength(length));
    }

    let mut doc = vec![0u8; length as usize];
    doc[..4].copy_from_slice(&len_buf);
    reader.read_exact(&mut doc[4..]).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DocumentError::UnexpectedEof,
        _ => DocumentError::Io(e),
    })?;

    if doc[doc.len() - 1] != 0 {
        return Err(DocumentError::Malformed("missing terminator".into()));
    }
    Ok(Some(Bytes::from(doc)))
}

/// Find the top-level `_id` if it is an ObjectId
pub fn extract_object_id(doc: &[u8]) -> Result<Option<ObjectId>, DocumentError> {
    if doc.len() < MIN_DOCUMENT_SIZE as usize {
        return Err(DocumentError::InvalidLength(doc.len() as u32));
    }
    let declared = read_i32(doc, 0)? as usize;
    if declared != doc.len() {
        return Err(DocumentError::Malformed(format!(
            "declared length {} but {} bytes present",
            declared,
            doc.len()
        )));
    }

    let end = doc.len() - 1;
    let mut pos = 4;
    while pos < end {
        let kind = doc[pos];
        pos += 1;
        let name_end = find_nul(doc, pos)?;
        let name = &doc[pos..name_end];
        pos = name_end + 1;

        if name == b"_id" {
            if kind != OBJECT_ID_KIND {
                return Ok(None);
            }
            let bytes = doc
                .get(pos..pos + 12)
                .ok_or_else(|| DocumentError::Malformed("truncated _id".into()))?;
            let mut id = [0u8; 12];
            id.copy_from_slice(bytes);
            return Ok(Some(ObjectId::from_bytes(id)));
        }

        pos += value_len(doc, pos, kind)?;
    }
    Ok(None)
}

fn read_i32(doc: &[u8], pos: usize) -> Result<i32, DocumentError> {
    let bytes = doc
        .get(pos..pos + 4)
        .ok_or_else(|| DocumentError::Malformed(format!("truncated length at {}", pos)))?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn find_nul(doc: &[u8], from: usize) -> Result<usize, DocumentError> {
    doc.get(from..)
        .and_then(|rest| rest.iter().position(|&b| b == 0))
        .map(|offset| from + offset)
        .ok_or_else(|| DocumentError::Malformed(format!("unterminated name at {}", from)))
}

fn checked_len(len: i32, pos: usize) -> Result<usize, DocumentError> {
    usize::try_from(len).map_err(|_| DocumentError::Malformed(format!("negative length at {}", pos)))
}

/// Size of the value starting at `pos`
fn value_len(doc: &[u8], pos: usize, kind: u8) -> Result<usize, DocumentError> {
    let len = match kind {
        0x01 | 0x09 | 0x11 | 0x12 => 8,
        0x02 | 0x0D | 0x0E => 4 + checked_len(read_i32(doc, pos)?, pos)?,
        0x03 | 0x04 | 0x0F => checked_len(read_i32(doc, pos)?, pos)?,
        0x05 => 5 + checked_len(read_i32(doc, pos)?, pos)?,
        0x06 | 0x0A | 0x7F | 0xFF => 0,
        0x07 => 12,
        0x08 => 1,
        0x0B => {
            let pattern_end = find_nul(doc, pos)?;
            let options_end = find_nul(doc, pattern_end + 1)?;
            options_end + 1 - pos
        }
        0x0C => 4 + checked_len(read_i32(doc, pos)?, pos)? + 12,
        0x10 => 4,
        0x13 => 16,
        other => {
            return Err(DocumentError::Malformed(format!(
                "unknown element type 0x{:02x} at {}",
                other,
                pos - 1
            )))
        }
    };
    if pos + len > doc.len() {
        return Err(DocumentError::Malformed(format!("value overruns document at {}", pos)));
    }
    Ok(len)
}

/// Builds small documents element by element
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    body: Vec<u8>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&mut self, kind: u8, name: &str) {
        self.body.push(kind);
        self.body.extend_from_slice(name.as_bytes());
        self.body.push(0);
    }

    pub fn object_id(mut self, name: &str, id: ObjectId) -> Self {
        self.header(OBJECT_ID_KIND, name);
        self.body.extend_from_slice(&id.bytes());
        self
    }

    pub fn string(mut self, name: &str, value: &str) -> Self {
        self.header(0x02, name);
        self.body
            .extend_from_slice(&((value.len() + 1) as i32).to_le_bytes());
        self.body.extend_from_slice(value.as_bytes());
        self.body.push(0);
        self
    }

    pub fn int32(mut self, name: &str, value: i32) -> Self {
        self.header(0x10, name);
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn document(mut self, name: &str, doc: &[u8]) -> Self {
        self.header(0x03, name);
        self.body.extend_from_slice(doc);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total = (self.body.len() + 5) as i32;
        let mut out = Vec::with_capacity(total as usize);
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }
}
