/*!
 * Matroska structure walker.
 *
 * Reads the EBML header, the segment `Info` and `Tracks` elements, then walks
 * every cluster collecting the blocks of subtitle tracks. Video and audio
 * payload is skipped by seeking. Tracks are expected before the first
 * cluster, as every muxer writes them.
 */

use std::collections::HashMap;
use std::io::{Read, Seek};

use flate2::read::ZlibDecoder;
use log::{debug, trace};

use super::ebml::*;
use crate::errors::SubtitleError;

/// Nanoseconds per tick unless `TimecodeScale` says otherwise
const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

const TRACK_TYPE_VIDEO: u64 = 1;
const TRACK_TYPE_SUBTITLE: u64 = 0x11;

/// How a track's block payloads are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
    /// Bytes stripped from the front of every frame
    HeaderStrip(Vec<u8>),
}

/// A `TrackEntry`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    pub number: u64,
    pub track_type: u64,
    pub codec_id: String,
    pub codec_private: Vec<u8>,
    pub language: String,
    pub name: Option<String>,
    /// Nanoseconds per frame
    pub default_duration: Option<u64>,
    pub compression: Compression,
}

impl Default for TrackEntry {
    fn default() -> Self {
        TrackEntry {
            number: 0,
            track_type: 0,
            codec_id: String::new(),
            codec_private: Vec::new(),
            language: "eng".to_string(),
            name: None,
            default_duration: None,
            compression: Compression::None,
        }
    }
}

impl TrackEntry {
    pub fn is_subtitle(&self) -> bool {
        self.track_type == TRACK_TYPE_SUBTITLE
    }

    pub fn is_video(&self) -> bool {
        self.track_type == TRACK_TYPE_VIDEO
    }

    /// Undo the track's content compression on one frame
    pub fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>, SubtitleError> {
        match &self.compression {
            Compression::None => Ok(data),
            Compression::HeaderStrip(prefix) => {
                let mut restored = prefix.clone();
                restored.extend_from_slice(&data);
                Ok(restored)
            }
            Compression::Zlib => inflate(&data, self.number, MAX_READ_SIZE),
        }
    }
}

/// Inflate a zlib frame, refusing output beyond `limit` bytes
fn inflate(data: &[u8], track: u64, limit: u64) -> Result<Vec<u8>, SubtitleError> {
    let mut restored = Vec::new();
    ZlibDecoder::new(data)
        .take(limit.saturating_add(1))
        .read_to_end(&mut restored)
        .map_err(|e| SubtitleError::Container(format!("zlib block in track {}: {}", track, e)))?;
    if restored.len() as u64 > limit {
        return Err(SubtitleError::Container(format!(
            "zlib block in track {} inflates beyond {} bytes",
            track, limit
        )));
    }
    Ok(restored)
}

/// One subtitle frame, timed in milliseconds
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleBlock {
    pub start_ms: f64,
    pub duration_ms: Option<f64>,
    pub data: Vec<u8>,
}

/// Parsed container: every track plus the blocks of its subtitle tracks
#[derive(Debug, Clone, Default)]
pub struct MatroskaFile {
    pub doc_type: String,
    pub timecode_scale: u64,
    pub tracks: Vec<TrackEntry>,
    pub blocks: HashMap<u64, Vec<SubtitleBlock>>,
}

impl MatroskaFile {
    /// Walk a whole container
    pub fn parse<R: Read + Seek>(source: R) -> Result<Self, SubtitleError> {
        let mut reader = EbmlReader::new(source)?;
        let mut file = MatroskaFile {
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            ..Default::default()
        };

        let header = reader
            .next_header(None)?
            .filter(|h| h.id == ID_EBML)
            .ok_or_else(|| SubtitleError::Container("missing EBML header".to_string()))?;
        file.doc_type = read_doc_type(&mut reader, &header)?;
        if file.doc_type != "matroska" && file.doc_type != "webm" {
            return Err(SubtitleError::Container(format!("unsupported document type '{}'", file.doc_type)));
        }

        let segment = loop {
            match reader.next_header(None)? {
                Some(h) if h.id == ID_SEGMENT => break h,
                Some(h) => reader.skip(&h)?,
                None => return Err(SubtitleError::Container("no segment element".to_string())),
            }
        };

        while let Some(element) = reader.next_header(segment.end())? {
            match element.id {
                ID_INFO => file.read_info(&mut reader, &element)?,
                ID_TRACKS => file.read_tracks(&mut reader, &element)?,
                ID_CLUSTER => file.read_cluster(&mut reader, &element)?,
                _ => match element.size {
                    Some(_) => reader.skip(&element)?,
                    None => {
                        return Err(SubtitleError::Container(format!(
                            "unknown-size element 0x{:X} inside segment",
                            element.id
                        )))
                    }
                },
            }
        }
        Ok(file)
    }

    /// Frame rate of the first video track carrying a default duration
    pub fn video_frame_rate(&self) -> Option<f64> {
        self.tracks
            .iter()
            .filter(|t| t.is_video())
            .find_map(|t| t.default_duration)
            .filter(|ns| *ns > 0)
            .map(|ns| 1_000_000_000.0 / ns as f64)
    }

    fn read_info<R: Read + Seek>(&mut self, reader: &mut EbmlReader<R>, info: &ElementHeader) -> Result<(), SubtitleError> {
        let end = known_end(info)?;
        while let Some(child) = reader.next_header(Some(end))? {
            let size = known_size(&child)?;
            if child.id == ID_TIMECODE_SCALE {
                self.timecode_scale = reader.read_uint(size)?.max(1);
            } else {
                reader.skip(&child)?;
            }
        }
        Ok(())
    }

    fn read_tracks<R: Read + Seek>(&mut self, reader: &mut EbmlReader<R>, tracks: &ElementHeader) -> Result<(), SubtitleError> {
        let end = known_end(tracks)?;
        while let Some(child) = reader.next_header(Some(end))? {
            if child.id == ID_TRACK_ENTRY {
                let entry = read_track_entry(reader, &child)?;
                debug!(
                    "Track {}: type 0x{:X}, codec {}, language {}",
                    entry.number, entry.track_type, entry.codec_id, entry.language
                );
                self.tracks.push(entry);
            } else {
                reader.skip(&child)?;
            }
        }
        Ok(())
    }

    fn read_cluster<R: Read + Seek>(&mut self, reader: &mut EbmlReader<R>, cluster: &ElementHeader) -> Result<(), SubtitleError> {
        let subtitle_tracks: Vec<u64> = self.tracks.iter().filter(|t| t.is_subtitle()).map(|t| t.number).collect();
        let mut cluster_time = 0u64;

        while let Some(child) = reader.next_header(cluster.end())? {
            if cluster.size.is_none() && SEGMENT_LEVEL_IDS.contains(&child.id) {
                reader.seek_to(child.header_start)?;
                break;
            }
            let size = known_size(&child)?;
            match child.id {
                ID_TIMECODE => cluster_time = reader.read_uint(size)?,
                ID_SIMPLE_BLOCK => {
                    if let Some((track, relative, data)) = read_block(reader, &child, &subtitle_tracks)? {
                        self.push_block(track, cluster_time, relative, None, data);
                    }
                }
                ID_BLOCK_GROUP => {
                    let mut block = None;
                    let mut duration = None;
                    let group_end = child.data_start + size;
                    while let Some(part) = reader.next_header(Some(group_end))? {
                        match part.id {
                            ID_BLOCK => block = read_block(reader, &part, &subtitle_tracks)?,
                            ID_BLOCK_DURATION => duration = Some(reader.read_uint(known_size(&part)?)?),
                            _ => reader.skip(&part)?,
                        }
                    }
                    if let Some((track, relative, data)) = block {
                        self.push_block(track, cluster_time, relative, duration, data);
                    }
                }
                _ => reader.skip(&child)?,
            }
        }
        Ok(())
    }

    fn push_block(&mut self, track: u64, cluster_time: u64, relative: i16, duration: Option<u64>, data: Vec<u8>) {
        let ticks = cluster_time as i64 + i64::from(relative);
        let scale_ms = self.timecode_scale as f64 / 1_000_000.0;
        let block = SubtitleBlock {
            start_ms: ticks.max(0) as f64 * scale_ms,
            duration_ms: duration.map(|d| d as f64 * scale_ms),
            data,
        };
        trace!("Track {} block at {} ms", track, block.start_ms);
        self.blocks.entry(track).or_default().push(block);
    }

    /// Decompressed blocks of one track in presentation order
    pub fn track_blocks(&self, track: &TrackEntry) -> Result<Vec<SubtitleBlock>, SubtitleError> {
        let mut blocks = Vec::new();
        for block in self.blocks.get(&track.number).into_iter().flatten() {
            blocks.push(SubtitleBlock {
                data: track.decompress(block.data.clone())?,
                ..block.clone()
            });
        }
        blocks.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));
        Ok(blocks)
    }
}

fn known_size(header: &ElementHeader) -> Result<u64, SubtitleError> {
    header
        .size
        .ok_or_else(|| SubtitleError::Container(format!("element 0x{:X} has unknown size", header.id)))
}

fn known_end(header: &ElementHeader) -> Result<u64, SubtitleError> {
    Ok(header.data_start + known_size(header)?)
}

fn read_doc_type<R: Read + Seek>(reader: &mut EbmlReader<R>, header: &ElementHeader) -> Result<String, SubtitleError> {
    let end = known_end(header)?;
    let mut doc_type = String::from("matroska");
    while let Some(child) = reader.next_header(Some(end))? {
        if child.id == ID_DOC_TYPE {
            doc_type = reader.read_string(known_size(&child)?)?;
        } else {
            reader.skip(&child)?;
        }
    }
    Ok(doc_type)
}

fn read_track_entry<R: Read + Seek>(reader: &mut EbmlReader<R>, header: &ElementHeader) -> Result<TrackEntry, SubtitleError> {
    let end = known_end(header)?;
    let mut entry = TrackEntry::default();
    while let Some(child) = reader.next_header(Some(end))? {
        let size = known_size(&child)?;
        match child.id {
            ID_TRACK_NUMBER => entry.number = reader.read_uint(size)?,
            ID_TRACK_TYPE => entry.track_type = reader.read_uint(size)?,
            ID_CODEC_ID => entry.codec_id = reader.read_string(size)?,
            ID_CODEC_PRIVATE => entry.codec_private = reader.read_bytes(size)?,
            ID_LANGUAGE => entry.language = reader.read_string(size)?,
            ID_NAME => entry.name = Some(reader.read_string(size)?),
            ID_DEFAULT_DURATION => entry.default_duration = Some(reader.read_uint(size)?),
            ID_CONTENT_ENCODINGS => entry.compression = read_compression(reader, child.data_start + size)?,
            _ => reader.skip(&child)?,
        }
    }
    Ok(entry)
}

/// First `ContentCompression` found under `ContentEncodings`
fn read_compression<R: Read + Seek>(reader: &mut EbmlReader<R>, end: u64) -> Result<Compression, SubtitleError> {
    let mut compression = Compression::None;
    while let Some(child) = reader.next_header(Some(end))? {
        let size = known_size(&child)?;
        match child.id {
            // Containers are descended into
            ID_CONTENT_ENCODING => {}
            ID_CONTENT_COMPRESSION => {
                let mut algo = 0;
                let mut settings = Vec::new();
                let compression_end = child.data_start + size;
                while let Some(field) = reader.next_header(Some(compression_end))? {
                    let field_size = known_size(&field)?;
                    match field.id {
                        ID_CONTENT_COMP_ALGO => algo = reader.read_uint(field_size)?,
                        ID_CONTENT_COMP_SETTINGS => settings = reader.read_bytes(field_size)?,
                        _ => reader.skip(&field)?,
                    }
                }
                compression = match algo {
                    0 => Compression::Zlib,
                    3 => Compression::HeaderStrip(settings),
                    other => {
                        return Err(SubtitleError::Container(format!(
                            "unsupported content compression algorithm {}",
                            other
                        )))
                    }
                };
            }
            _ => reader.skip(&child)?,
        }
    }
    Ok(compression)
}

/// Read a block; only subtitle tracks get their payload loaded
fn read_block<R: Read + Seek>(
    reader: &mut EbmlReader<R>,
    header: &ElementHeader,
    subtitle_tracks: &[u64],
) -> Result<Option<(u64, i16, Vec<u8>)>, SubtitleError> {
    let size = known_size(header)?;
    let probe_len = size.min(8);
    let probe = reader.read_bytes(probe_len)?;
    let (track, vint_len) =
        parse_vint(&probe).ok_or_else(|| SubtitleError::Container("invalid block track number".to_string()))?;
    let header_len = vint_len + 3;
    if !subtitle_tracks.contains(&track) || (header_len as u64) > size {
        reader.skip(header)?;
        return Ok(None);
    }
    if probe.len() < header_len {
        return Err(SubtitleError::Container("truncated block header".to_string()));
    }
    let relative = i16::from_be_bytes([probe[vint_len], probe[vint_len + 1]]);
    let flags = probe[vint_len + 2];
    if flags & 0x06 != 0 {
        debug!("Skipping laced block in subtitle track {}", track);
        reader.skip(header)?;
        return Ok(None);
    }
    reader.seek_to(header.data_start + header_len as u64)?;
    let data = reader.read_bytes(size - header_len as u64)?;
    Ok(Some((track, relative, data)))
}
