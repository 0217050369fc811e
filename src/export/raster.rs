//! JPEG rendering of a report.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use rusttype::{Font, Scale};
use tracing::warn;

use super::layout::{
    JPEG_QUALITY, RASTER_BORDER, RASTER_CHART_PADDING, RASTER_HEIGHT, RASTER_SCALE, RASTER_TEXT,
    RASTER_WIDTH, Rect, fit_contain, raster_layout,
};
use super::{ReportAssets, ReportMetadata};
use crate::error::{FleetError, Result};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn rgba([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

/// Render the report onto a white canvas and encode it as JPEG.
pub fn render(metadata: &ReportMetadata, assets: &ReportAssets, chart: &DynamicImage) -> Result<Vec<u8>> {
    let layout = raster_layout();
    let scale = RASTER_SCALE as f32;
    let mut canvas = RgbaImage::from_pixel(RASTER_WIDTH * RASTER_SCALE, RASTER_HEIGHT * RASTER_SCALE, WHITE);

    if let Some(logo) = &assets.logo {
        paste(&mut canvas, logo, layout.logo.scaled(scale));
    }

    for section in [layout.header, layout.metadata, layout.chart] {
        stroke(&mut canvas, section.scaled(scale), RASTER_SCALE);
    }

    let area = layout.chart.inset(RASTER_CHART_PADDING);
    let fitted = fit_contain(chart.width() as f32, chart.height() as f32, area);
    paste(&mut canvas, chart, fitted.scaled(scale));

    match &assets.font {
        Some(font) => {
            let text = TextPainter { font, scale };
            let header = layout.header_text;
            text.draw_bold(&mut canvas, &metadata.header_text(), header.x, header.baseline, layout.header_font_size);

            for ((label, value), baseline) in metadata.rows().iter().zip(layout.metadata_baselines) {
                text.draw_bold(&mut canvas, label, layout.label_x, baseline, layout.metadata_font_size);
                text.draw(&mut canvas, value, layout.value_x, baseline, layout.metadata_font_size);
            }
        }
        None => warn!("No font configured, report text skipped"),
    }

    encode(canvas)
}

/// Resize `img` into `rect` and composite it onto the canvas.
fn paste(canvas: &mut RgbaImage, img: &DynamicImage, rect: Rect) {
    let w = rect.w.round().max(1.0) as u32;
    let h = rect.h.round().max(1.0) as u32;
    let resized = imageops::resize(&img.to_rgba8(), w, h, FilterType::Triangle);
    imageops::overlay(canvas, &resized, rect.x.round() as i64, rect.y.round() as i64);
}

/// Draw a border `thickness` pixels wide along the inside of `rect`.
fn stroke(canvas: &mut RgbaImage, rect: Rect, thickness: u32) {
    for i in 0..thickness {
        let inner = rect.inset(i as f32);
        if inner.w < 1.0 || inner.h < 1.0 {
            break;
        }
        let r = imageproc::rect::Rect::at(inner.x.round() as i32, inner.y.round() as i32)
            .of_size(inner.w.round() as u32, inner.h.round() as u32);
        draw_hollow_rect_mut(canvas, r, rgba(RASTER_BORDER));
    }
}

struct TextPainter<'a> {
    font: &'a Font<'static>,
    scale: f32,
}

impl TextPainter<'_> {
    /// Draw `text` with its baseline at `baseline` (base canvas units).
    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, size: f32) {
        let px = Scale::uniform(size * self.scale);
        let ascent = self.font.v_metrics(px).ascent;
        let top = baseline * self.scale - ascent;
        draw_text_mut(
            canvas,
            rgba(RASTER_TEXT),
            (x * self.scale).round() as i32,
            top.round() as i32,
            px,
            self.font,
            text,
        );
    }

    /// Single-face fonts get a one-pixel double strike for bold.
    fn draw_bold(&self, canvas: &mut RgbaImage, text: &str, x: f32, baseline: f32, size: f32) {
        self.draw(canvas, text, x, baseline, size);
        self.draw(canvas, text, x + 1.0 / self.scale, baseline, size);
    }
}

fn encode(canvas: RgbaImage) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| FleetError::Export(e.to_string()))?;
    Ok(out)
}
