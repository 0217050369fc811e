//! PDF rendering of a report: one A4 landscape page.

use image::{DynamicImage, GenericImageView, Rgba, RgbImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Rgb,
};

use super::ReportMetadata;
use super::layout::{
    CHART_INSET_MM, DOCUMENT_BORDER, DOCUMENT_TEXT, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Rect,
    document_layout,
};
use crate::error::{FleetError, Result};

/// Face of the report-type bar.
const HEADER_FONT: BuiltinFont = BuiltinFont::HelveticaBold;

/// Face of the metadata block, labels and values alike.
const METADATA_FONT: BuiltinFont = BuiltinFont::Helvetica;

/// Resolution images are embedded at before scaling.
const IMAGE_DPI: f32 = 300.0;

fn pdf_error(e: impl std::fmt::Display) -> FleetError {
    FleetError::Export(e.to_string())
}

fn color([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

/// Render the report and return the PDF bytes.
pub fn render(metadata: &ReportMetadata, logo: Option<&DynamicImage>, chart: &DynamicImage) -> Result<Vec<u8>> {
    let layout = document_layout();
    let (doc, page, layer) = PdfDocument::new(
        metadata.header_text(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Report",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let header_font = doc.add_builtin_font(HEADER_FONT).map_err(pdf_error)?;
    let metadata_font = doc.add_builtin_font(METADATA_FONT).map_err(pdf_error)?;

    if let Some(logo) = logo {
        place_image(&layer, logo, layout.logo);
    }

    layer.set_outline_color(color(DOCUMENT_BORDER));
    layer.set_outline_thickness(0.5);
    for section in [layout.header, layout.metadata, layout.chart] {
        stroke(&layer, section);
    }

    layer.set_fill_color(color(DOCUMENT_TEXT));
    let header = layout.header_text;
    write(&layer, &metadata.header_text(), header.x, header.baseline, layout.header_font_size, &header_font);

    for ((label, value), baseline) in metadata.rows().iter().zip(layout.metadata_baselines) {
        write(&layer, label, layout.label_x, baseline, layout.metadata_font_size, &metadata_font);
        write(&layer, value, layout.value_x, baseline, layout.metadata_font_size, &metadata_font);
    }

    place_image(&layer, chart, layout.chart.inset(CHART_INSET_MM));

    doc.save_to_bytes().map_err(pdf_error)
}

/// Text with its baseline `baseline` mm below the top edge.
fn write(layer: &PdfLayerReference, text: &str, x: f32, baseline: f32, size: f32, font: &IndirectFontRef) {
    layer.use_text(text, size, Mm(x), Mm(PAGE_HEIGHT_MM - baseline), font);
}

fn stroke(layer: &PdfLayerReference, rect: Rect) {
    let top = PAGE_HEIGHT_MM - rect.y;
    let bottom = PAGE_HEIGHT_MM - rect.bottom();
    let right = rect.x + rect.w;
    let corners = [(rect.x, top), (right, top), (right, bottom), (rect.x, bottom)];

    layer.add_line(Line {
        points: corners
            .iter()
            .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
            .collect(),
        is_closed: true,
    });
}

/// Stretch `img` to fill `rect`.
fn place_image(layer: &PdfLayerReference, img: &DynamicImage, rect: Rect) {
    let (px_w, px_h) = img.dimensions();
    if px_w == 0 || px_h == 0 {
        return;
    }
    let native_w = px_w as f32 * 25.4 / IMAGE_DPI;
    let native_h = px_h as f32 * 25.4 / IMAGE_DPI;

    let flat = DynamicImage::ImageRgb8(flatten_on_white(img));
    Image::from_dynamic_image(&flat).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(rect.x)),
            translate_y: Some(Mm(PAGE_HEIGHT_MM - rect.bottom())),
            scale_x: Some(rect.w / native_w),
            scale_y: Some(rect.h / native_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

/// Composite transparent pixels onto white; PDF images here carry no alpha.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let blend = |c: u8| ((u16::from(c) * u16::from(a) + 255 * (255 - u16::from(a))) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::RgbaImage;

    fn metadata() -> ReportMetadata {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        ReportMetadata {
            report_name: "Temperature".to_string(),
            device: "TN-01".to_string(),
            from: day.and_hms_opt(0, 0, 0).unwrap(),
            to: day.and_hms_opt(12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_flatten_on_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgba([0, 0, 0, 0]) } else { Rgba([10, 20, 30, 255]) }
        }));
        let flat = flatten_on_white(&img);

        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_only_header_is_bold() {
        assert!(matches!(HEADER_FONT, BuiltinFont::HelveticaBold));
        assert!(matches!(METADATA_FONT, BuiltinFont::Helvetica));
    }

    #[test]
    fn test_render_with_logo() {
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 10, Rgba([0, 0, 0, 255])));
        let chart = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 30, image::Rgb([255, 0, 0])));

        let bytes = render(&metadata(), Some(&logo), &chart).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }
}
