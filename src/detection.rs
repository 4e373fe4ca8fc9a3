/*!
 * Detection cascade.
 *
 * Resolves unlabeled content to a codec:
 * - content at or above the size gate is never offered to any codec
 *   (`DetectionError::TooLarge`);
 * - otherwise the primary formats are tried in registry order, then the
 *   fallback formats; the first plausible decode wins;
 * - if every codec declines, the content is `DetectionError::NotRecognized`.
 *
 * The winning decode is returned with the verdict so the caller never
 * decodes twice.
 */

use log::{debug, trace};

use crate::app_config::DEFAULT_CASCADE_SIZE_LIMIT;
use crate::errors::DetectionError;
use crate::formats::{CodecContext, DecodeOutcome, FormatKind, FormatRegistry, SourceContent};

/// A codec that claimed the content, with its decode
#[derive(Debug, Clone)]
pub struct Detection {
    pub format: FormatKind,
    pub outcome: DecodeOutcome,
}

/// Ordered trial of every decodable format
#[derive(Debug, Clone)]
pub struct DetectionCascade {
    registry: FormatRegistry,
    size_limit: u64,
}

impl Default for DetectionCascade {
    fn default() -> Self {
        Self::new(DEFAULT_CASCADE_SIZE_LIMIT)
    }
}

impl DetectionCascade {
    pub fn new(size_limit: u64) -> Self {
        DetectionCascade {
            registry: FormatRegistry::new(),
            size_limit,
        }
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// Whether content of `size` bytes is offered to the cascade at all
    pub fn admits(&self, size: u64) -> bool {
        size < self.size_limit
    }

    /// Run the cascade against `source`
    pub fn detect(&self, source: &SourceContent, ctx: &CodecContext) -> Result<Detection, DetectionError> {
        let size = source.bytes().len() as u64;
        if !self.admits(size) {
            debug!("Skipping detection for {} byte input (gate {} bytes)", size, self.size_limit);
            return Err(DetectionError::TooLarge { size });
        }

        for format in self.registry.detection_order() {
            let outcome = format.codec().decode(source, ctx);
            trace!(
                "{}: {} paragraph(s), {} error(s)",
                format,
                outcome.subtitle.len(),
                outcome.error_count
            );
            if outcome.is_plausible() {
                debug!("Detected format: {}", format);
                return Ok(Detection { format, outcome });
            }
        }
        Err(DetectionError::NotRecognized)
    }
}
