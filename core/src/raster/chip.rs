use crate::features::Envelope;
use crate::math::stats::{BandStats, StatsHelper};
use crate::prelude::{ToolError, ToolResult};
use crate::raster::grid::{PixelWindow, Raster, SampleKind};

/// An 8-bit grayscale or RGB image cut out of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageChip {
    pub width: u32,
    pub height: u32,
    /// 1 for grayscale, 3 for RGB.
    pub channels: u8,
    pub pixels: Vec<u8>,
    pub window: PixelWindow,
}

impl ImageChip {
    pub fn to_png(&self) -> ToolResult<Vec<u8>> {
        let color = match self.channels {
            1 => png::ColorType::Grayscale,
            3 => png::ColorType::Rgb,
            n => {
                return Err(ToolError::Encoding(format!(
                    "cannot encode {} channels as PNG",
                    n
                )))
            }
        };

        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buf, self.width, self.height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| ToolError::Encoding(format!("PNG header: {}", e)))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| ToolError::Encoding(format!("PNG data: {}", e)))?;
            writer
                .finish()
                .map_err(|e| ToolError::Encoding(format!("PNG finish: {}", e)))?;
        }
        Ok(buf)
    }
}

/// Cuts 8-bit chips out of a raster. Wide sample types are stretched with
/// whole-raster band statistics so chips from one image share a scale.
pub struct ChipExtractor<'a> {
    raster: &'a Raster,
    bands: Vec<usize>,
    stats: Vec<Option<BandStats>>,
}

impl<'a> ChipExtractor<'a> {
    pub fn new(raster: &'a Raster) -> Self {
        let bands: Vec<usize> = if raster.bands() >= 3 {
            vec![0, 1, 2]
        } else {
            vec![0]
        };
        let stats = match raster.sample_kind {
            SampleKind::U8 => Vec::new(),
            SampleKind::Wide => bands.iter().map(|&b| raster.band_stats(b)).collect(),
        };
        Self {
            raster,
            bands,
            stats,
        }
    }

    pub fn channels(&self) -> u8 {
        self.bands.len() as u8
    }

    fn to_u8(&self, slot: usize, value: f32) -> u8 {
        if !self.raster.is_valid(value) {
            return 0;
        }
        match self.stats.get(slot) {
            Some(Some(stats)) => StatsHelper::stretch_to_u8(value, stats),
            Some(None) => 0,
            None => value.round().clamp(0.0, 255.0) as u8,
        }
    }

    /// Chip covering `env`, or `None` when the envelope misses the raster or
    /// every covered pixel is nodata.
    pub fn extract(&self, env: &Envelope) -> Option<ImageChip> {
        let window = self.raster.pixel_window(env)?;
        let data = &self.raster.data;

        let mut any_valid = false;
        let mut pixels = Vec::with_capacity(window.width() * window.height() * self.bands.len());
        for row in window.row0..window.row1 {
            for col in window.col0..window.col1 {
                for (slot, &band) in self.bands.iter().enumerate() {
                    let value = data[[band, row, col]];
                    any_valid |= self.raster.is_valid(value);
                    pixels.push(self.to_u8(slot, value));
                }
            }
        }

        if !any_valid {
            return None;
        }

        Some(ImageChip {
            width: window.width() as u32,
            height: window.height() as u32,
            channels: self.channels(),
            pixels,
            window,
        })
    }
}
