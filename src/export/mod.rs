//! Report export to JPEG and PDF.
//!
//! Both formats share one layout: logo, a "Report Type" bar, a metadata block
//! (device and date range) and the chart image captured by the front end.
//! Rendering is CPU-bound and runs on the blocking pool; the async entry
//! points resolve to the encoded file once it is complete.
//!
//! A missing or unreadable logo is not fatal. The export goes ahead without
//! it and the failure is logged. An undecodable chart image is an error.

pub mod document;
pub mod layout;
pub mod raster;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use image::DynamicImage;
use rusttype::Font;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{FleetError, Result};
use crate::timezone::format_range_boundary;

pub const JPG_FILENAME: &str = "temperature-report.jpg";
pub const PDF_FILENAME: &str = "temperature-report.pdf";

/// Output format of a report export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Jpg,
    Pdf,
}

impl ExportFormat {
    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Jpg => JPG_FILENAME,
            ExportFormat::Pdf => PDF_FILENAME,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Jpg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// What the metadata block of an export shows.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub report_name: String,
    pub device: String,
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl ReportMetadata {
    pub fn header_text(&self) -> String {
        format!("Report Type: {}", self.report_name)
    }

    /// Label/value pairs in display order.
    pub fn rows(&self) -> [(&'static str, String); 3] {
        [
            ("Device:", self.device.clone()),
            ("From Date:", format_range_boundary(&self.from)),
            ("To Date:", format_range_boundary(&self.to)),
        ]
    }
}

/// Static assets loaded for one export.
#[derive(Default)]
pub struct ReportAssets {
    pub logo: Option<DynamicImage>,
    pub font: Option<Font<'static>>,
}

/// Renders report exports, loading the logo and font from disk.
#[derive(Debug, Clone, Default)]
pub struct ReportExporter {
    logo_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
}

impl ReportExporter {
    pub fn new(logo_path: Option<PathBuf>, font_path: Option<PathBuf>) -> Self {
        Self {
            logo_path,
            font_path,
        }
    }

    async fn load_logo(&self) -> Result<Option<DynamicImage>> {
        let Some(path) = &self.logo_path else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FleetError::AssetLoad(format!("{}: {e}", path.display())))?;
        image::load_from_memory(&bytes)
            .map(Some)
            .map_err(|e| FleetError::AssetLoad(format!("{}: {e}", path.display())))
    }

    async fn load_font(&self) -> Result<Option<Font<'static>>> {
        let Some(path) = &self.font_path else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FleetError::AssetLoad(format!("{}: {e}", path.display())))?;
        Font::try_from_vec(bytes)
            .map(Some)
            .ok_or_else(|| FleetError::AssetLoad(format!("{}: not a TrueType font", path.display())))
    }

    /// Load the logo and font, degrading to `None` on failure.
    pub async fn load_assets(&self) -> ReportAssets {
        let logo = self.load_logo().await.unwrap_or_else(|e| {
            warn!(error = %e, "Logo unavailable, exporting without it");
            None
        });
        let font = self.load_font().await.unwrap_or_else(|e| {
            warn!(error = %e, "Font unavailable");
            None
        });
        ReportAssets { logo, font }
    }

    /// Render the report as a JPEG.
    pub async fn render_jpg(&self, metadata: &ReportMetadata, chart_image: Vec<u8>) -> Result<Vec<u8>> {
        self.render(ExportFormat::Jpg, metadata, chart_image).await
    }

    /// Render the report as a one-page A4 landscape PDF.
    pub async fn render_pdf(&self, metadata: &ReportMetadata, chart_image: Vec<u8>) -> Result<Vec<u8>> {
        self.render(ExportFormat::Pdf, metadata, chart_image).await
    }

    pub async fn render(
        &self,
        format: ExportFormat,
        metadata: &ReportMetadata,
        chart_image: Vec<u8>,
    ) -> Result<Vec<u8>> {
        let assets = self.load_assets().await;
        let metadata = metadata.clone();

        let bytes = tokio::task::spawn_blocking(move || {
            let chart = decode_chart(&chart_image)?;
            match format {
                ExportFormat::Jpg => raster::render(&metadata, &assets, &chart),
                ExportFormat::Pdf => document::render(&metadata, assets.logo.as_ref(), &chart),
            }
        })
        .await
        .map_err(|e| FleetError::Export(e.to_string()))??;

        info!(?format, bytes = bytes.len(), "Report exported");
        Ok(bytes)
    }
}

fn decode_chart(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| FleetError::InvalidInput(format!("chart image could not be decoded: {e}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use image::{ImageOutputFormat, Rgb, RgbImage};

    /// A small PNG standing in for a captured chart.
    pub fn chart_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x % 10 == 0 { Rgb([200, 30, 30]) } else { Rgb([255, 255, 255]) }
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }
}
