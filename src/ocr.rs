//! OCR triggering.
//!
//! The classic failed redaction is a black rectangle drawn over live text.
//! The text itself is caught by the content scan; OCR exists for the
//! inverse case, where the page is an image whose pixels show what the
//! vectors hide. Rasterizing every page is expensive, so `auto` mode only
//! fires when draw-over geometry is present: a filled rectangle or image
//! overlapping an extracted text run.

use crate::content::InterpretedContent;
use crate::document::Document;
use crate::error::Result;
use std::str::FromStr;

/// When pages are rasterized for OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrMode {
    /// Never rasterize.
    #[default]
    Off,
    /// Rasterize pages whose geometry suggests a draw-over redaction.
    Auto,
    /// Rasterize every page.
    Always,
}

impl FromStr for OcrMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "off" => Ok(OcrMode::Off),
            "auto" => Ok(OcrMode::Auto),
            "always" => Ok(OcrMode::Always),
            other => Err(format!("unknown ocr mode '{}', expected off, auto, or always", other)),
        }
    }
}

/// OCR tuning knobs.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Trigger mode.
    pub mode: OcrMode,
    /// Fraction of a text run's box that must be covered to count as a
    /// draw-over.
    pub min_overlap_ratio: f64,
    /// Rasterization scale passed to the engine.
    pub zoom: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            mode: OcrMode::Off,
            min_overlap_ratio: 0.1,
            zoom: 2.0,
        }
    }
}

/// A pluggable page recognizer.
///
/// Rasterization and recognition both live behind this trait; the crate
/// ships only [`NoOpOcr`], and callers with a real engine (Tesseract,
/// a cloud API) implement it themselves.
pub trait PageOcr: Send + Sync {
    /// Recognize the text on one page, rendered at `zoom` times its
    /// nominal size. `Ok(None)` means the engine cannot service the
    /// request (no rasterizer compiled in, unsupported page).
    fn recognize_page(
        &self,
        doc: &Document,
        page_index: usize,
        zoom: f64,
    ) -> Result<Option<String>>;
}

/// Engine that never recognizes anything. With it, `auto` and `always`
/// modes cost nothing and find nothing.
pub struct NoOpOcr;

impl PageOcr for NoOpOcr {
    fn recognize_page(&self, _: &Document, _: usize, _: f64) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Decide whether a page should be rasterized.
pub fn page_needs_ocr(config: &OcrConfig, content: &InterpretedContent) -> bool {
    match config.mode {
        OcrMode::Off => false,
        OcrMode::Always => true,
        OcrMode::Auto => has_draw_over(config, content),
    }
}

fn has_draw_over(config: &OcrConfig, content: &InterpretedContent) -> bool {
    let covers = content.fill_rects.iter().chain(&content.image_rects);
    for cover in covers {
        for run in &content.runs {
            let area = run.bbox.area();
            if area <= 0.0 {
                continue;
            }
            if cover.intersection_area(&run.bbox) >= config.min_overlap_ratio * area {
                return true;
            }
        }
    }
    false
}
