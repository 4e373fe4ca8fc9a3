use std::io::{Read, Seek, SeekFrom};

use crate::errors::SubtitleError;

// @module: EBML element reader over any seekable byte source

pub const ID_EBML: u32 = 0x1A45_DFA3;
pub const ID_DOC_TYPE: u32 = 0x4282;
pub const ID_SEGMENT: u32 = 0x1853_8067;
pub const ID_SEEK_HEAD: u32 = 0x114D_9B74;
pub const ID_INFO: u32 = 0x1549_A966;
pub const ID_TIMECODE_SCALE: u32 = 0x2A_D7B1;
pub const ID_TRACKS: u32 = 0x1654_AE6B;
pub const ID_TRACK_ENTRY: u32 = 0xAE;
pub const ID_TRACK_NUMBER: u32 = 0xD7;
pub const ID_TRACK_TYPE: u32 = 0x83;
pub const ID_CODEC_ID: u32 = 0x86;
pub const ID_CODEC_PRIVATE: u32 = 0x63A2;
pub const ID_LANGUAGE: u32 = 0x22_B59C;
pub const ID_NAME: u32 = 0x536E;
pub const ID_DEFAULT_DURATION: u32 = 0x23_E383;
pub const ID_CONTENT_ENCODINGS: u32 = 0x6D80;
pub const ID_CONTENT_ENCODING: u32 = 0x6240;
pub const ID_CONTENT_COMPRESSION: u32 = 0x5034;
pub const ID_CONTENT_COMP_ALGO: u32 = 0x4254;
pub const ID_CONTENT_COMP_SETTINGS: u32 = 0x4255;
pub const ID_CLUSTER: u32 = 0x1F43_B675;
pub const ID_TIMECODE: u32 = 0xE7;
pub const ID_SIMPLE_BLOCK: u32 = 0xA3;
pub const ID_BLOCK_GROUP: u32 = 0xA0;
pub const ID_BLOCK: u32 = 0xA1;
pub const ID_BLOCK_DURATION: u32 = 0x9B;
pub const ID_CUES: u32 = 0x1C53_BB6B;
pub const ID_CHAPTERS: u32 = 0x1043_A770;
pub const ID_TAGS: u32 = 0x1254_C367;
pub const ID_ATTACHMENTS: u32 = 0x1941_A469;

/// Segment children; meeting one ends an unknown-size cluster
pub const SEGMENT_LEVEL_IDS: [u32; 8] = [
    ID_SEEK_HEAD,
    ID_INFO,
    ID_TRACKS,
    ID_CLUSTER,
    ID_CUES,
    ID_CHAPTERS,
    ID_TAGS,
    ID_ATTACHMENTS,
];

/// Magic bytes opening every EBML document
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Largest element payload read into memory at once
pub const MAX_READ_SIZE: u64 = 64 * 1024 * 1024;

/// An element id and size, positioned at the start of its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub id: u32,
    /// `None` for unknown-size (live streamed) elements
    pub size: Option<u64>,
    /// Absolute offset of the header itself
    pub header_start: u64,
    /// Absolute offset of the payload
    pub data_start: u64,
}

impl ElementHeader {
    /// Absolute end offset, when the size is known
    pub fn end(&self) -> Option<u64> {
        self.size.map(|size| self.data_start + size)
    }
}

/// Length of a variable-size integer from its first byte
pub fn vint_length(first: u8) -> Option<usize> {
    match first.leading_zeros() {
        n @ 0..=7 => Some(n as usize + 1),
        _ => None,
    }
}

/// Decode a size-style vint (marker bit removed) from a byte slice,
/// returning the value and its length
pub fn parse_vint(bytes: &[u8]) -> Option<(u64, usize)> {
    let first = *bytes.first()?;
    let length = vint_length(first)?;
    if bytes.len() < length {
        return None;
    }
    let mut value = u64::from(first) & (0xFF >> length);
    for b in &bytes[1..length] {
        value = (value << 8) | u64::from(*b);
    }
    Some((value, length))
}

/// Element reader
pub struct EbmlReader<R: Read + Seek> {
    reader: R,
    length: u64,
}

impl<R: Read + Seek> EbmlReader<R> {
    pub fn new(mut reader: R) -> Result<Self, SubtitleError> {
        let length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(EbmlReader { reader, length })
    }

    /// Total length of the source
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn position(&mut self) -> Result<u64, SubtitleError> {
        Ok(self.reader.stream_position()?)
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<(), SubtitleError> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, SubtitleError> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Read an element id (marker bit kept)
    fn read_id(&mut self) -> Result<u32, SubtitleError> {
        let first = self.read_u8()?;
        let length = vint_length(first)
            .filter(|l| *l <= 4)
            .ok_or_else(|| SubtitleError::Container(format!("invalid element id byte 0x{:02X}", first)))?;
        let mut id = u32::from(first);
        for _ in 1..length {
            id = (id << 8) | u32::from(self.read_u8()?);
        }
        Ok(id)
    }

    /// Read an element size; all value bits set means unknown
    fn read_size(&mut self) -> Result<Option<u64>, SubtitleError> {
        let first = self.read_u8()?;
        let length = vint_length(first)
            .ok_or_else(|| SubtitleError::Container(format!("invalid element size byte 0x{:02X}", first)))?;
        let mut value = u64::from(first) & (0xFF >> length);
        let mut all_ones = value == (0xFF >> length);
        for _ in 1..length {
            let b = self.read_u8()?;
            all_ones &= b == 0xFF;
            value = (value << 8) | u64::from(b);
        }
        Ok(if all_ones { None } else { Some(value) })
    }

    /// Read the next element header, or `None` at `limit` or end of source
    pub fn next_header(&mut self, limit: Option<u64>) -> Result<Option<ElementHeader>, SubtitleError> {
        let header_start = self.position()?;
        let bound = limit.unwrap_or(self.length).min(self.length);
        if header_start >= bound {
            return Ok(None);
        }
        let id = self.read_id()?;
        let size = self.read_size()?;
        let data_start = self.position()?;
        if let Some(size) = size {
            if data_start.saturating_add(size) > self.length {
                return Err(SubtitleError::Container(format!(
                    "element 0x{:X} at {} overruns the file",
                    id, header_start
                )));
            }
        }
        Ok(Some(ElementHeader {
            id,
            size,
            header_start,
            data_start,
        }))
    }

    /// Seek past an element's payload
    pub fn skip(&mut self, header: &ElementHeader) -> Result<(), SubtitleError> {
        match header.end() {
            Some(end) => self.seek_to(end),
            None => Err(SubtitleError::Container(format!(
                "cannot skip unknown-size element 0x{:X}",
                header.id
            ))),
        }
    }

    pub fn read_bytes(&mut self, size: u64) -> Result<Vec<u8>, SubtitleError> {
        if size > MAX_READ_SIZE {
            return Err(SubtitleError::Container(format!("element of {} bytes is too large", size)));
        }
        let mut buffer = vec![0u8; size as usize];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_uint(&mut self, size: u64) -> Result<u64, SubtitleError> {
        if size > 8 {
            return Err(SubtitleError::Container(format!("unsigned integer of {} bytes", size)));
        }
        Ok(self
            .read_bytes(size)?
            .iter()
            .fold(0u64, |value, b| (value << 8) | u64::from(*b)))
    }

    pub fn read_string(&mut self, size: u64) -> Result<String, SubtitleError> {
        let bytes = self.read_bytes(size)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
