//! Page geometry for the two report formats.
//!
//! Raster coordinates are CSS pixels on the base canvas (before scaling),
//! document coordinates are millimetres from the top-left corner.

/// Axis-aligned box, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Shrink by `by` on every side.
    pub fn inset(&self, by: f32) -> Rect {
        Rect::new(self.x + by, self.y + by, self.w - 2.0 * by, self.h - 2.0 * by)
    }

    /// Scale every coordinate by `factor`.
    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(self.x * factor, self.y * factor, self.w * factor, self.h * factor)
    }
}

/// Largest box with the source's aspect ratio that fits in `area`, centered.
pub fn fit_contain(src_w: f32, src_h: f32, area: Rect) -> Rect {
    if src_w <= 0.0 || src_h <= 0.0 {
        return Rect::new(area.x, area.y, 0.0, 0.0);
    }
    let scale = (area.w / src_w).min(area.h / src_h);
    let w = src_w * scale;
    let h = src_h * scale;
    Rect::new(area.x + (area.w - w) / 2.0, area.y + (area.h - h) / 2.0, w, h)
}

/// A line of text: left edge and baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnchor {
    pub x: f32,
    pub baseline: f32,
}

/// Placement of the header and metadata block shared by both formats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionLayout {
    pub logo: Rect,
    pub header: Rect,
    pub header_text: TextAnchor,
    pub header_font_size: f32,
    pub metadata: Rect,
    pub label_x: f32,
    pub value_x: f32,
    /// Baselines of the `Device`, `From Date` and `To Date` rows.
    pub metadata_baselines: [f32; 3],
    pub metadata_font_size: f32,
    pub chart: Rect,
}

// ============================================================================
// Raster (JPEG)
// ============================================================================

pub const RASTER_WIDTH: u32 = 1123;
pub const RASTER_HEIGHT: u32 = 794;
pub const RASTER_SCALE: u32 = 2;
pub const RASTER_MARGIN: f32 = 20.0;
pub const RASTER_CHART_PADDING: f32 = 2.0;
pub const RASTER_BORDER: [u8; 3] = [0x88, 0x88, 0x88];
pub const RASTER_TEXT: [u8; 3] = [0x34, 0x49, 0x5e];
pub const JPEG_QUALITY: u8 = 100;

pub fn raster_layout() -> SectionLayout {
    let margin = RASTER_MARGIN;
    let width = RASTER_WIDTH as f32 - 2.0 * margin;
    let header = Rect::new(margin, 90.0, width, 50.0);
    let metadata = Rect::new(margin, header.bottom(), width, 80.0);
    let chart_top = metadata.bottom();

    SectionLayout {
        logo: Rect::new(margin, margin, 200.0, 50.0),
        header,
        header_text: TextAnchor {
            x: 30.0,
            baseline: header.y + 33.0,
        },
        header_font_size: 20.0,
        metadata,
        label_x: 30.0,
        value_x: 130.0,
        metadata_baselines: [metadata.y + 20.0, metadata.y + 40.0, metadata.y + 60.0],
        metadata_font_size: 14.0,
        chart: Rect::new(margin, chart_top, width, RASTER_HEIGHT as f32 - margin - chart_top),
    }
}

// ============================================================================
// Document (PDF, A4 landscape)
// ============================================================================

pub const PAGE_WIDTH_MM: f32 = 297.0;
pub const PAGE_HEIGHT_MM: f32 = 210.0;
pub const PAGE_MARGIN_MM: f32 = 6.0;
pub const CHART_INSET_MM: f32 = 6.0;
pub const DOCUMENT_BORDER: [u8; 3] = [160, 160, 160];
pub const DOCUMENT_TEXT: [u8; 3] = [52, 73, 94];

pub fn document_layout() -> SectionLayout {
    let margin = PAGE_MARGIN_MM;
    let width = PAGE_WIDTH_MM - 2.0 * margin;
    let header = Rect::new(margin, 27.0, width, 14.0);
    let metadata = Rect::new(margin, header.bottom(), width, 25.2);
    let chart_top = metadata.bottom();

    SectionLayout {
        logo: Rect::new(margin, margin, 60.0, 15.0),
        header,
        header_text: TextAnchor {
            x: 10.0,
            baseline: header.y + 9.0,
        },
        header_font_size: 13.0,
        metadata,
        label_x: 10.0,
        value_x: 46.0,
        metadata_baselines: [metadata.y + 8.0, metadata.y + 15.0, metadata.y + 22.0],
        metadata_font_size: 12.0,
        chart: Rect::new(margin, chart_top, width, PAGE_HEIGHT_MM - margin - chart_top),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_raster_geometry() {
        let layout = raster_layout();

        assert_eq!(layout.logo, Rect::new(20.0, 20.0, 200.0, 50.0));
        assert_eq!(layout.header, Rect::new(20.0, 90.0, 1083.0, 50.0));
        assert_eq!(layout.header_text.baseline, 123.0);
        assert_eq!(layout.metadata.y, 140.0);
        assert_eq!(layout.metadata_baselines, [160.0, 180.0, 200.0]);
        assert_eq!(layout.chart, Rect::new(20.0, 220.0, 1083.0, 554.0));
    }

    #[test]
    fn test_document_geometry() {
        let layout = document_layout();

        assert_eq!(layout.logo, Rect::new(6.0, 6.0, 60.0, 15.0));
        assert_eq!(layout.header.w, 285.0);
        assert_eq!(layout.header_text.baseline, 36.0);
        assert!(close(layout.metadata.y, 41.0));
        assert!(close(layout.metadata_baselines[2], 63.0));
        assert!(close(layout.chart.y, 66.2));
        assert!(close(layout.chart.bottom(), 204.0));
    }

    #[test]
    fn test_fit_contain_preserves_aspect_and_centers() {
        let area = Rect::new(0.0, 0.0, 400.0, 100.0);
        let fitted = fit_contain(200.0, 100.0, area);

        assert_eq!(fitted, Rect::new(100.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn test_fit_contain_wide_source() {
        let area = Rect::new(10.0, 10.0, 100.0, 100.0);
        let fitted = fit_contain(400.0, 100.0, area);

        assert_eq!(fitted, Rect::new(10.0, 47.5, 100.0, 25.0));
    }

    #[test]
    fn test_inset_and_scale() {
        let r = Rect::new(20.0, 220.0, 1083.0, 554.0);
        assert_eq!(r.inset(2.0), Rect::new(22.0, 222.0, 1079.0, 550.0));
        assert_eq!(r.scaled(2.0), Rect::new(40.0, 440.0, 2166.0, 1108.0));
    }
}
