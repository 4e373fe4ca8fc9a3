use log::{debug, error, info, warn};
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app_config::Config;
use crate::container::{self, DemuxedContainer, TrackContent};
use crate::detection::DetectionCascade;
use crate::errors::ConversionError;
use crate::file_utils::FileManager;
use crate::formats::{CodecContext, EncodedOutput, FormatKind, FormatRegistry, SourceContent};
use crate::request::ConversionRequest;
use crate::subtitle::Subtitle;
use crate::text_encoding::TextEncoding;

// @module: Batch orchestration of subtitle conversions

/// What happened to one input file
#[derive(Debug)]
pub struct ConversionOutcome {
    // @field: Input path as expanded from the pattern
    pub input: PathBuf,
    // @field: Every file written, class-split extras included
    pub outputs: Vec<PathBuf>,
    // @field: Failure of the input as a whole
    pub error: Option<ConversionError>,
    // @field: Failed container tracks
    pub track_errors: usize,
}

impl ConversionOutcome {
    fn new(input: &Path) -> Self {
        ConversionOutcome {
            input: input.to_path_buf(),
            outputs: Vec::new(),
            error: None,
            track_errors: 0,
        }
    }

    fn failed(input: &Path, error: ConversionError) -> Self {
        ConversionOutcome {
            error: Some(error),
            ..Self::new(input)
        }
    }

    pub fn is_converted(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Errors this input adds to the run
    pub fn error_count(&self) -> usize {
        self.track_errors + usize::from(self.error.is_some())
    }
}

/// Counters of a whole run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub attempted: usize,
    /// Inputs with at least one written output
    pub converted: usize,
    pub errors: usize,
    pub outcomes: Vec<ConversionOutcome>,
    /// The run stopped early on request
    pub cancelled: bool,
}

impl BatchSummary {
    fn record(&mut self, outcome: ConversionOutcome) {
        if outcome.is_converted() {
            self.converted += 1;
        }
        self.errors += outcome.error_count();
        self.outcomes.push(outcome);
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && self.attempted == self.converted && self.errors == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Main application controller for subtitle conversion
pub struct Controller {
    // @field: App configuration
    config: Config,
    registry: FormatRegistry,
    cascade: DetectionCascade,
    cancelled: Arc<AtomicBool>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        let cascade = DetectionCascade::new(config.cascade_size_limit_bytes);
        Controller {
            config,
            registry: FormatRegistry::new(),
            cascade,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag checked between files; setting it stops the run
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run one request, writing progress lines to `out`
    pub fn run(&self, request: &ConversionRequest, out: &mut dyn Write) -> BatchSummary {
        self.run_all(std::slice::from_ref(request), out)
    }

    /// Run several requests with shared counters and one running index
    pub fn run_all(&self, requests: &[ConversionRequest], out: &mut dyn Write) -> BatchSummary {
        let mut summary = BatchSummary::default();

        let guarded = panic::catch_unwind(AssertUnwindSafe(|| {
            'requests: for request in requests {
                let input_folder = FileManager::resolve_input_folder(request.input_folder.as_deref());
                if let Some(dir) = request.output_folder.as_deref() {
                    if let Err(e) = FileManager::ensure_dir(dir) {
                        warn!("{:#}", e);
                    }
                }

                let files = FileManager::expand_pattern(&request.pattern, &input_folder);
                if files.is_empty() {
                    info!("No files match '{}'", request.pattern);
                }

                for path in files {
                    if self.cancelled.load(Ordering::SeqCst) {
                        warn!("Conversion cancelled after {} file(s)", summary.attempted);
                        summary.cancelled = true;
                        break 'requests;
                    }
                    summary.attempted += 1;
                    let index = summary.attempted;
                    let outcome = self.convert_guarded(&path, request, index, out);
                    summary.record(outcome);
                }
            }
        }));
        if let Err(payload) = guarded {
            error!("Run aborted: {}", panic_message(payload.as_ref()));
            summary.errors += 1;
        }

        emit(out, "");
        emit(out, &format!("{} file(s) converted", summary.converted));
        summary
    }

    /// Convert one file, never letting a failure escape
    fn convert_guarded(
        &self,
        path: &Path,
        request: &ConversionRequest,
        index: usize,
        out: &mut dyn Write,
    ) -> ConversionOutcome {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.convert_file(path, request, index, &display_name, out)));
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(payload) => ConversionOutcome::failed(path, ConversionError::Unexpected(panic_message(payload.as_ref()))),
        };

        if let Some(e) = &outcome.error {
            error!("{}: {}", path.display(), e);
            emit(out, &format!("{}: {} - {}!", index, display_name, e));
        }
        outcome
    }

    fn convert_file(
        &self,
        path: &Path,
        request: &ConversionRequest,
        index: usize,
        display_name: &str,
        out: &mut dyn Write,
    ) -> ConversionOutcome {
        let size = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => return ConversionOutcome::failed(path, ConversionError::FileNotFound(path.to_path_buf())),
        };

        let base_context = self.context_for(path, request, None);

        let container_candidate = container::is_container_path(path)
            || (!self.cascade.admits(size) && container::has_ebml_magic(path));
        if container_candidate && request.source_format.is_none() {
            match container::demux_file(path) {
                Ok(demuxed) if demuxed.tracks.iter().any(|t| !matches!(t.content, TrackContent::Image)) => {
                    return self.convert_tracks(path, request, index, display_name, demuxed, out);
                }
                Ok(demuxed) => {
                    self.report_image_tracks(index, display_name, &demuxed, out);
                    debug!("{}: no text tracks, trying the detection cascade", display_name);
                }
                Err(e) => debug!("{}: not a readable container ({}), trying the detection cascade", display_name, e),
            }
        }

        let decoded = match &request.source_format {
            Some(name) => self.decode_as(path, name, &base_context),
            None => self.detect(path, size, &base_context),
        };
        let (format, subtitle) = match decoded {
            Ok(decoded) => decoded,
            Err(e) => return ConversionOutcome::failed(path, e),
        };
        info!("{}: {} paragraph(s) read as {}", display_name, subtitle.len(), format);

        let mut outcome = ConversionOutcome::new(path);
        match self.save(subtitle, format, base_context, path, "", request) {
            Ok(outputs) => {
                if let Some(primary) = outputs.first() {
                    emit(out, &format!("{}: {} -> {}... done.", index, display_name, primary.display()));
                }
                outcome.outputs = outputs;
            }
            Err(e) => outcome.error = Some(e),
        }
        outcome
    }

    fn report_image_tracks(&self, index: usize, display_name: &str, demuxed: &DemuxedContainer, out: &mut dyn Write) {
        for track in demuxed.tracks.iter().filter(|t| matches!(t.content, TrackContent::Image)) {
            emit(
                out,
                &format!(
                    "{}: {} - track {} ({}) is image based, skipped",
                    index, display_name, track.number, track.codec_id
                ),
            );
        }
    }

    /// Save every text track of a demuxed container
    fn convert_tracks(
        &self,
        path: &Path,
        request: &ConversionRequest,
        index: usize,
        display_name: &str,
        demuxed: DemuxedContainer,
        out: &mut dyn Write,
    ) -> ConversionOutcome {
        self.report_image_tracks(index, display_name, &demuxed, out);
        let mut outcome = ConversionOutcome::new(path);
        let several = demuxed.convertible_count() > 1;
        let context = self.context_for(path, request, demuxed.frame_rate);

        for track in demuxed.tracks {
            let suffix = if several { track.output_suffix() } else { String::new() };
            let result = match track.content {
                TrackContent::Image => continue,
                TrackContent::Failed(reason) => Err(ConversionError::Unexpected(reason)),
                TrackContent::Text { format, subtitle } => {
                    self.save(subtitle, format, context.clone(), path, &suffix, request)
                }
            };
            match result {
                Ok(outputs) => {
                    if let Some(primary) = outputs.first() {
                        emit(out, &format!("{}: {} -> {}... done.", index, display_name, primary.display()));
                    }
                    outcome.outputs.extend(outputs);
                }
                Err(e) => {
                    error!("{} track {}: {}", path.display(), track.number, e);
                    emit(out, &format!("{}: {} - track {}: {}!", index, display_name, track.number, e));
                    outcome.track_errors += 1;
                }
            }
        }
        outcome
    }

    /// Per-file codec context; an explicit frame rate beats container
    /// metadata, which beats the configured default
    fn context_for(&self, path: &Path, request: &ConversionRequest, container_rate: Option<f64>) -> CodecContext {
        let frame_rate = request
            .source_frame_rate
            .or(container_rate)
            .unwrap_or(self.config.default_frame_rate);
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut context = CodecContext::new(frame_rate).with_title(title);
        context.options = request.codec_options.clone();
        context
    }

    fn read_source(&self, path: &Path) -> Result<SourceContent, ConversionError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConversionError::FileNotFound(path.to_path_buf()),
            _ => ConversionError::Unexpected(format!("unable to read {}: {}", path.display(), e)),
        })?;
        Ok(SourceContent::from_bytes(bytes, Some(path.to_path_buf())))
    }

    /// Decode with an explicitly named source format
    fn decode_as(&self, path: &Path, name: &str, context: &CodecContext) -> Result<(FormatKind, Subtitle), ConversionError> {
        let format = self
            .registry
            .resolve_source(name)
            .ok_or_else(|| ConversionError::Decode { format: name.to_string() })?;
        let source = self.read_source(path)?;
        let outcome = format.codec().decode(&source, context);
        if !outcome.is_plausible() {
            return Err(ConversionError::Decode {
                format: format.name().to_string(),
            });
        }
        Ok((format, outcome.subtitle))
    }

    /// Run the size-gated cascade
    fn detect(&self, path: &Path, size: u64, context: &CodecContext) -> Result<(FormatKind, Subtitle), ConversionError> {
        if !self.cascade.admits(size) {
            return Err(ConversionError::FormatTooLarge {
                path: path.to_path_buf(),
                size,
            });
        }
        let source = self.read_source(path)?;
        let detection = self
            .cascade
            .detect(&source, context)
            .map_err(|e| ConversionError::from_detection(e, path.to_path_buf()))?;
        Ok((detection.format, detection.outcome.subtitle))
    }

    /// Shared save step: adjust timing, encode, write, then split by class
    fn save(
        &self,
        mut subtitle: Subtitle,
        source: FormatKind,
        mut context: CodecContext,
        input: &Path,
        suffix: &str,
        request: &ConversionRequest,
    ) -> Result<Vec<PathBuf>, ConversionError> {
        if let Some(offset) = request.offset {
            subtitle.add_time_to_all_paragraphs(offset);
            if subtitle.was_loaded_with_frame_numbers {
                subtitle.calculate_frame_numbers_from_time_codes(context.frame_rate);
            }
        }
        if let Some(target_rate) = request.target_frame_rate {
            subtitle.change_frame_rate(context.frame_rate, target_rate);
            context.frame_rate = target_rate;
        }

        let target = self
            .registry
            .resolve_target(&request.target_format)
            .ok_or_else(|| ConversionError::TargetFormatNotFound(request.target_format.clone()))?;
        let descriptor = target.codec().descriptor();

        if descriptor.is_frame_based && subtitle.paragraphs.iter().any(|p| p.start_frame.is_none()) {
            subtitle.calculate_frame_numbers_from_time_codes(context.frame_rate);
        } else if descriptor.is_time_based && subtitle.was_loaded_with_frame_numbers {
            // frames stay authoritative; times snap back onto the frame grid
            subtitle.calculate_time_codes_from_frame_numbers(context.frame_rate);
        }
        if source != target {
            source.codec().remove_native_formatting(&mut subtitle, descriptor);
        }

        let output_dir = request.output_folder.as_deref();
        let primary = FileManager::output_path(input, output_dir, suffix, descriptor.extension, request.overwrite);
        self.write_encoded(&subtitle, target, &context, &primary, request)?;
        let mut outputs = vec![primary];

        if descriptor.is_text_based {
            for class in source.codec().style_classes(&subtitle) {
                let subset = subtitle.filter_by_class(&class);
                if subset.is_empty() || subset.len() == subtitle.len() {
                    continue;
                }
                let class_suffix = format!("{}_{}", suffix, FileManager::sanitize_file_name(&class));
                let path = FileManager::output_path(input, output_dir, &class_suffix, descriptor.extension, request.overwrite);
                match self.write_encoded(&subset, target, &context, &path, request) {
                    Ok(()) => {
                        info!("Class {}: {} paragraph(s) -> {}", class, subset.len(), path.display());
                        outputs.push(path);
                    }
                    Err(e) => warn!("Class {} not written: {}", class, e),
                }
            }
        }
        Ok(outputs)
    }

    fn write_encoded(
        &self,
        subtitle: &Subtitle,
        target: FormatKind,
        context: &CodecContext,
        path: &Path,
        request: &ConversionRequest,
    ) -> Result<(), ConversionError> {
        let bytes = match target.codec().encode(subtitle, context)? {
            EncodedOutput::Binary(bytes) => bytes,
            EncodedOutput::Text(text) => self.output_encoding(target, request).encode(&text),
        };
        FileManager::write_bytes(path, &bytes).map_err(|source| ConversionError::WriteFailure {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Requested encoding, except for formats whose consumers reject a BOM
    fn output_encoding(&self, target: FormatKind, request: &ConversionRequest) -> TextEncoding {
        if target.codec().descriptor().utf8_without_bom {
            return TextEncoding::utf8_without_bom();
        }
        let label = request.encoding.as_deref().unwrap_or(&self.config.default_encoding);
        TextEncoding::resolve(label).unwrap_or_else(|e| {
            warn!("{}, writing UTF-8", e);
            TextEncoding::utf8()
        })
    }
}

/// Write one whole progress line
fn emit(out: &mut dyn Write, line: &str) {
    if let Err(e) = writeln!(out, "{}", line) {
        debug!("Progress output failed: {}", e);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}
