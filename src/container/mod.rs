/*!
 * Subtitle track extraction from Matroska containers.
 *
 * `demux` walks a container and turns every subtitle track into one of:
 * - a decoded `Subtitle`, tagged with the codec family it came from;
 * - an image-track marker (`S_VOBSUB`, `S_HDMV/PGS`), reported and skipped;
 * - a per-track failure (bad compression, undecodable script).
 *
 * Scripted tracks are rebuilt into a complete script and decoded by the
 * Advanced Sub Station Alpha codec. Every other text track becomes plain
 * timed paragraphs.
 */

pub mod ebml;
pub mod matroska;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::{debug, warn};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::formats::ssa::AdvancedSubStationAlpha;
use crate::formats::FormatKind;
use crate::subtitle::{Paragraph, Subtitle};
use crate::text_encoding;
use crate::timecode::TimeCode;
use matroska::{MatroskaFile, SubtitleBlock, TrackEntry};

/// File extensions handled by the demuxer
pub const CONTAINER_EXTENSIONS: [&str; 2] = ["mkv", "mks"];

/// Display time of a block that has neither a duration nor a successor
const LAST_BLOCK_DURATION_MS: f64 = 2500.0;

const IMAGE_CODEC_IDS: [&str; 2] = ["S_VOBSUB", "S_HDMV/PGS"];

const SCRIPT_CODEC_IDS: [&str; 4] = ["S_TEXT/ASS", "S_TEXT/SSA", "S_ASS", "S_SSA"];

const SCRIPT_EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// What a subtitle track turned into
#[derive(Debug, Clone)]
pub enum TrackContent {
    /// Decoded text track and the codec family it was read as
    Text { format: FormatKind, subtitle: Subtitle },
    /// Bitmap subtitles, never converted
    Image,
    /// The track could not be extracted
    Failed(String),
}

/// One subtitle track of a container
#[derive(Debug, Clone)]
pub struct ContainerTrack {
    pub number: u64,
    pub language: String,
    pub name: Option<String>,
    pub codec_id: String,
    pub content: TrackContent,
}

impl ContainerTrack {
    /// `_<number>_<language>` appended to output stems when a container
    /// yields several tracks
    pub fn output_suffix(&self) -> String {
        format!("_{}_{}", self.number, FileManager::sanitize_file_name(&self.language))
    }

    pub fn is_convertible(&self) -> bool {
        matches!(self.content, TrackContent::Text { .. })
    }
}

/// Result of demuxing one container
#[derive(Debug, Clone, Default)]
pub struct DemuxedContainer {
    /// Frame rate of the first video track, when declared
    pub frame_rate: Option<f64>,
    /// Subtitle tracks in file order
    pub tracks: Vec<ContainerTrack>,
}

impl DemuxedContainer {
    pub fn convertible_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_convertible()).count()
    }
}

/// Whether `path` carries a container extension
pub fn is_container_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| CONTAINER_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the file starts with the EBML magic
pub fn has_ebml_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .map(|_| magic == ebml::EBML_MAGIC)
        .unwrap_or(false)
}

/// Demux the container at `path`
pub fn demux_file(path: &Path) -> Result<DemuxedContainer, SubtitleError> {
    let file = File::open(path)?;
    demux(BufReader::new(file))
}

/// Demux a container from any seekable source
pub fn demux<R: Read + Seek>(source: R) -> Result<DemuxedContainer, SubtitleError> {
    let file = MatroskaFile::parse(source)?;
    let frame_rate = file.video_frame_rate();
    if let Some(fps) = frame_rate {
        debug!("Container video frame rate: {:.3}", fps);
    }

    let tracks = file
        .tracks
        .iter()
        .filter(|t| t.is_subtitle())
        .map(|track| ContainerTrack {
            number: track.number,
            language: track.language.clone(),
            name: track.name.clone(),
            codec_id: track.codec_id.clone(),
            content: extract_track(&file, track),
        })
        .collect();

    Ok(DemuxedContainer { frame_rate, tracks })
}

fn extract_track(file: &MatroskaFile, track: &TrackEntry) -> TrackContent {
    let codec_id = track.codec_id.to_ascii_uppercase();
    if IMAGE_CODEC_IDS.iter().any(|id| codec_id.starts_with(id)) {
        return TrackContent::Image;
    }

    let blocks = match file.track_blocks(track) {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!("Track {}: {}", track.number, e);
            return TrackContent::Failed(e.to_string());
        }
    };
    let timed = timed_blocks(&blocks);

    if SCRIPT_CODEC_IDS.contains(&codec_id.as_str()) {
        let script = rebuild_script(&track.codec_private, &timed);
        let outcome = AdvancedSubStationAlpha::parse_str(&script);
        if outcome.subtitle.is_empty() && !timed.is_empty() {
            return TrackContent::Failed(format!("track {} holds no readable events", track.number));
        }
        if outcome.error_count > 0 {
            debug!("Track {}: {} malformed event(s)", track.number, outcome.error_count);
        }
        return TrackContent::Text {
            format: FormatKind::AdvancedSubStationAlpha,
            subtitle: outcome.subtitle,
        };
    }

    let paragraphs = timed
        .iter()
        .map(|(start, end, data)| {
            let text = text_encoding::decode_text(data).replace("\r\n", "\n");
            Paragraph::new(
                TimeCode::from_milliseconds(*start),
                TimeCode::from_milliseconds(*end),
                text.trim(),
            )
        })
        .collect();
    TrackContent::Text {
        format: FormatKind::SubRip,
        subtitle: Subtitle::from_paragraphs(paragraphs),
    }
}

/// Pair every block with its end time: own duration, else the next block's
/// start, else a fixed display time
fn timed_blocks(blocks: &[SubtitleBlock]) -> Vec<(f64, f64, &[u8])> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let end = match (block.duration_ms, blocks.get(i + 1)) {
                (Some(duration), _) => block.start_ms + duration,
                (None, Some(next)) => next.start_ms,
                (None, None) => block.start_ms + LAST_BLOCK_DURATION_MS,
            };
            (block.start_ms, end, block.data.as_slice())
        })
        .collect()
}

/// Complete script from the track header and its block payloads. A block is
/// `ReadOrder,Layer,Style,Name,MarginL,MarginR,MarginV,Effect,Text`.
fn rebuild_script(codec_private: &[u8], timed: &[(f64, f64, &[u8])]) -> String {
    let private = text_encoding::decode_text(codec_private);
    let header = match private.to_ascii_lowercase().find("[events]") {
        Some(index) => &private[..index],
        None => private.as_str(),
    };

    let mut script = String::from(header.trim_end());
    script.push_str("\n\n[Events]\n");
    script.push_str(SCRIPT_EVENT_FORMAT);
    script.push('\n');
    for (start, end, data) in timed {
        let payload = text_encoding::decode_text(data);
        let payload = payload.trim_end_matches(['\r', '\n']).replace("\r\n", "\\N").replace('\n', "\\N");
        let start = AdvancedSubStationAlpha::format_time(&TimeCode::from_milliseconds(*start));
        let end = AdvancedSubStationAlpha::format_time(&TimeCode::from_milliseconds(*end));
        let fields: Vec<&str> = payload.splitn(9, ',').collect();
        let line = if fields.len() == 9 {
            format!(
                "Dialogue: {},{},{},{}",
                fields[1],
                start,
                end,
                fields[2..].join(",")
            )
        } else {
            format!("Dialogue: 0,{},{},Default,,0,0,0,,{}", start, end, payload)
        };
        script.push_str(&line);
        script.push('\n');
    }
    script
}
