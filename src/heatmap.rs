//! Heatmap rendering of a root comparison.
//!
//! The heatmap has one row per configuration and one column per geometry,
//! colored on a fixed 0–100 % scale (YlOrRd) with the weight annotated in
//! every cell, a colorbar on the right and a two-line title.
//!
//! Styling is passed in explicitly through [`HeatmapStyle`]. The image is
//! rendered into memory and only written once PNG encoding succeeded.
//!
//! Text is drawn with a TrueType font loaded at runtime: the configured
//! `font_path`, or the first common system font found when none is set.
//! Rendering fails with [`ReportError::Plot`] if no font can be loaded.

use crate::comparison::RootComparison;
use crate::labels::plain_text_label;
use crate::report::{format_float, GeometryNames, ReportError};
use image::{ImageFormat, RgbImage};
use lazy_static::lazy_static;
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle, FontTransform};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Largest accepted image width and row height, in pixels.
pub const MAX_DIMENSION: u32 = 10_000;

/// Lower end of the color scale (percent).
pub const WEIGHT_MIN: f64 = 0.0;
/// Upper end of the color scale (percent).
pub const WEIGHT_MAX: f64 = 100.0;

// ColorBrewer YlOrRd, light to dark
const YL_OR_RD: [(u8, u8, u8); 9] = [
    (255, 255, 204),
    (255, 237, 160),
    (254, 217, 118),
    (254, 178, 76),
    (253, 141, 60),
    (252, 78, 42),
    (227, 26, 28),
    (189, 0, 38),
    (128, 0, 38),
];

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

lazy_static! {
    // Font family name registered for each font file
    static ref REGISTERED_FONTS: Mutex<HashMap<PathBuf, &'static str>> = Mutex::new(HashMap::new());
}

const MARGIN: i32 = 20;
const COLORBAR_WIDTH: i32 = 30;
const COLORBAR_GAP: i32 = 30;
const TICK_LENGTH: i32 = 6;
const MIN_CELL_WIDTH: i32 = 80;

/// Explicit styling of the heatmap image.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapStyle {
    /// Image width in pixels
    pub width: u32,
    /// Height of one configuration row in pixels
    pub row_height: u32,
    /// Scale from font points to pixels
    pub pixels_per_point: f64,
    /// Title font size (points)
    pub title_font_size: f64,
    /// Row/column label font size (points)
    pub label_font_size: f64,
    /// Colorbar tick font size (points)
    pub tick_font_size: f64,
    /// Cell annotation font size (points)
    pub annotation_font_size: f64,
    /// TrueType font to use instead of the system font search
    pub font_path: Option<PathBuf>,
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            row_height: 60,
            pixels_per_point: 2.0,
            title_font_size: 14.0,
            label_font_size: 12.0,
            tick_font_size: 11.0,
            annotation_font_size: 11.0,
            font_path: None,
        }
    }
}

impl HeatmapStyle {
    fn px(&self, points: f64) -> f64 {
        points * self.pixels_per_point
    }
}

/// Pixel geometry of a heatmap image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapLayout {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Left edge of the cell grid
    pub grid_left: i32,
    /// Top edge of the cell grid
    pub grid_top: i32,
    /// Width of one cell
    pub cell_width: i32,
    /// Height of one cell
    pub cell_height: i32,
    /// Left edge of the colorbar
    pub colorbar_left: i32,
}

impl HeatmapLayout {
    /// Computes the layout for `labels.len()` rows and two geometry columns.
    pub fn compute(labels: &[String], style: &HeatmapStyle) -> Self {
        let title_px = style.px(style.title_font_size);
        let label_px = style.px(style.label_font_size);
        let tick_px = style.px(style.tick_font_size);

        let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let label_area = (longest as f64 * label_px * 0.6 + label_px * 1.5) as i32 + MARGIN;
        let grid_left = MARGIN + label_area.max(120);
        let grid_top = MARGIN + (title_px * 2.6) as i32 + 15;

        let right_area = COLORBAR_GAP
            + COLORBAR_WIDTH
            + TICK_LENGTH
            + (tick_px * 2.5) as i32
            + (label_px * 1.5) as i32
            + MARGIN;

        let available = style.width as i32 - grid_left - right_area;
        let cell_width = (available / 2).max(MIN_CELL_WIDTH);
        let cell_height = style.row_height.max(1) as i32;
        let width = (grid_left + 2 * cell_width + right_area) as u32;
        let bottom = (label_px * 2.0) as i32 + MARGIN;
        let height = (grid_top + labels.len() as i32 * cell_height + bottom) as u32;

        Self {
            width,
            height,
            grid_left,
            grid_top,
            cell_width,
            cell_height,
            colorbar_left: grid_left + 2 * cell_width + COLORBAR_GAP,
        }
    }

    fn grid_right(&self) -> i32 {
        self.grid_left + 2 * self.cell_width
    }

    fn grid_bottom(&self, rows: usize) -> i32 {
        self.grid_top + rows as i32 * self.cell_height
    }
}

/// Maps a weight in percent onto the YlOrRd color scale.
///
/// Values outside 0–100 are clamped.
pub fn weight_color(weight: f64) -> RGBColor {
    let fraction = (weight - WEIGHT_MIN) / (WEIGHT_MAX - WEIGHT_MIN);
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };

    let segments = (YL_OR_RD.len() - 1) as f64;
    let scaled = fraction * segments;
    let index = (scaled.floor() as usize).min(YL_OR_RD.len() - 2);
    let t = scaled - index as f64;

    let (r0, g0, b0) = YL_OR_RD[index];
    let (r1, g1, b1) = YL_OR_RD[index + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Picks black or white annotation text for the given cell color.
pub fn annotation_color(background: RGBColor) -> RGBColor {
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let luminance =
        0.2126 * linear(background.0) + 0.7152 * linear(background.1) + 0.0722 * linear(background.2);
    if luminance > 0.408 {
        BLACK
    } else {
        WHITE
    }
}

/// Renders the heatmap of one root into an in-memory image.
///
/// # Errors
///
/// Returns [`ReportError::Plot`] if the comparison has no rows, no font can
/// be loaded, or drawing fails.
pub fn render_heatmap(
    comparison: &RootComparison,
    threshold: f64,
    names: &GeometryNames,
    style: &HeatmapStyle,
) -> Result<RgbImage, ReportError> {
    if comparison.is_empty() {
        return Err(ReportError::Plot(format!(
            "no configurations to plot for root {}",
            comparison.root
        )));
    }

    if style.width > MAX_DIMENSION || style.row_height > MAX_DIMENSION {
        return Err(ReportError::Plot(format!(
            "heatmap size {}x{} per row exceeds {} pixels",
            style.width, style.row_height, MAX_DIMENSION
        )));
    }

    let labels: Vec<String> = comparison
        .rows
        .iter()
        .map(|row| plain_text_label(&row.label))
        .collect();
    let layout = HeatmapLayout::compute(&labels, style);
    let family = font_family(style)?;

    let mut buffer = vec![255u8; layout.width as usize * layout.height as usize * 3];
    {
        let area =
            BitMapBackend::with_buffer(&mut buffer, (layout.width, layout.height)).into_drawing_area();
        area.fill(&WHITE).map_err(plot_error)?;

        draw_cells(&area, comparison, &layout, style, family)?;
        draw_colorbar(&area, comparison.rows.len(), &layout, style, family)?;
        draw_text_labels(&area, comparison, threshold, names, &labels, &layout, style, family)?;

        area.present().map_err(plot_error)?;
    }

    RgbImage::from_raw(layout.width, layout.height, buffer)
        .ok_or_else(|| ReportError::Plot("heatmap buffer has unexpected size".to_string()))
}

/// Encodes `image` as PNG and writes it to `path`.
pub fn write_heatmap(path: &Path, image: &RgbImage) -> Result<(), ReportError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn plot_error<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Plot(err.to_string())
}

fn font(family: &'static str, size_px: f64) -> FontDesc<'static> {
    (family, size_px).into_font()
}

fn draw_cells(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    comparison: &RootComparison,
    layout: &HeatmapLayout,
    style: &HeatmapStyle,
    family: &'static str,
) -> Result<(), ReportError> {
    let annotation_font = font(family, style.px(style.annotation_font_size));

    for (row_index, row) in comparison.rows.iter().enumerate() {
        let y0 = layout.grid_top + row_index as i32 * layout.cell_height;
        let y1 = y0 + layout.cell_height;

        for (column, weight) in [row.reference, row.target].into_iter().enumerate() {
            let x0 = layout.grid_left + column as i32 * layout.cell_width;
            let x1 = x0 + layout.cell_width;
            let fill = weight_color(weight);

            area.draw(&Rectangle::new([(x0, y0), (x1, y1)], fill.filled()))
                .map_err(plot_error)?;
            area.draw(&Rectangle::new([(x0, y0), (x1, y1)], WHITE.stroke_width(1)))
                .map_err(plot_error)?;

            let text_style = annotation_font
                .color(&annotation_color(fill))
                .pos(Pos::new(HPos::Center, VPos::Center));
            area.draw(&Text::new(
                format!("{:.1}", weight),
                ((x0 + x1) / 2, (y0 + y1) / 2),
                text_style,
            ))
            .map_err(plot_error)?;
        }
    }

    Ok(())
}

fn draw_colorbar(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    rows: usize,
    layout: &HeatmapLayout,
    style: &HeatmapStyle,
    family: &'static str,
) -> Result<(), ReportError> {
    let top = layout.grid_top;
    let bottom = layout.grid_bottom(rows);
    let left = layout.colorbar_left;
    let right = left + COLORBAR_WIDTH;
    let span = (bottom - top).max(1);

    for y in top..bottom {
        let fraction = 1.0 - ((y - top) as f64 + 0.5) / span as f64;
        let value = WEIGHT_MIN + fraction * (WEIGHT_MAX - WEIGHT_MIN);
        area.draw(&Rectangle::new([(left, y), (right, y + 1)], weight_color(value).filled()))
            .map_err(plot_error)?;
    }
    area.draw(&Rectangle::new([(left, top), (right, bottom)], BLACK.stroke_width(1)))
        .map_err(plot_error)?;

    let tick_font = font(family, style.px(style.tick_font_size));
    for tick in (0..=100).step_by(20) {
        let fraction = (tick as f64 - WEIGHT_MIN) / (WEIGHT_MAX - WEIGHT_MIN);
        let y = bottom - (fraction * span as f64).round() as i32;
        area.draw(&PathElement::new(
            vec![(right, y), (right + TICK_LENGTH, y)],
            BLACK.stroke_width(1),
        ))
        .map_err(plot_error)?;

        let text_style = tick_font
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Center));
        area.draw(&Text::new(
            tick.to_string(),
            (right + TICK_LENGTH + 4, y),
            text_style,
        ))
        .map_err(plot_error)?;
    }

    let label_px = style.px(style.label_font_size);
    let x = right + TICK_LENGTH + (style.px(style.tick_font_size) * 2.5) as i32
        + (label_px * 0.75) as i32;
    let text_style = font(family, label_px)
        .transform(FontTransform::Rotate270)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new("Weight (%)", (x, (top + bottom) / 2), text_style))
        .map_err(plot_error)?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_text_labels(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    comparison: &RootComparison,
    threshold: f64,
    names: &GeometryNames,
    labels: &[String],
    layout: &HeatmapLayout,
    style: &HeatmapStyle,
    family: &'static str,
) -> Result<(), ReportError> {
    let title_px = style.px(style.title_font_size);
    let label_px = style.px(style.label_font_size);
    let grid_center_x = (layout.grid_left + layout.grid_right()) / 2;
    let grid_bottom = layout.grid_bottom(labels.len());

    let title_style = font(family, title_px)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let title_lines = [
        format!(
            "Configuration Weight Comparison - Root {}",
            comparison.root
        ),
        format!("(|c| ≥ {})", format_float(threshold)),
    ];
    for (i, line) in title_lines.into_iter().enumerate() {
        let y = MARGIN + (title_px * (0.65 + 1.3 * i as f64)) as i32;
        area.draw(&Text::new(line, (grid_center_x, y), title_style.clone()))
            .map_err(plot_error)?;
    }

    let row_style = font(family, label_px)
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (row_index, label) in labels.iter().enumerate() {
        let y = layout.grid_top + row_index as i32 * layout.cell_height + layout.cell_height / 2;
        area.draw(&Text::new(label.clone(), (layout.grid_left - 10, y), row_style.clone()))
            .map_err(plot_error)?;
    }

    let column_style = font(family, label_px)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let columns = [names.reference.clone(), names.target.clone()];
    for (column, name) in columns.into_iter().enumerate() {
        let x = layout.grid_left + column as i32 * layout.cell_width + layout.cell_width / 2;
        let y = grid_bottom + (label_px * 0.9) as i32;
        area.draw(&Text::new(name, (x, y), column_style.clone()))
            .map_err(plot_error)?;
    }

    let axis_style = font(family, label_px)
        .transform(FontTransform::Rotate270)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new(
        "Configuration",
        (MARGIN + (label_px * 0.6) as i32, (layout.grid_top + grid_bottom) / 2),
        axis_style,
    ))
    .map_err(plot_error)?;

    Ok(())
}

/// Font file used for heatmap text.
///
/// A configured `font_path` is used as is; otherwise the first existing file
/// of a list of common system fonts is picked.
pub fn find_font(style: &HeatmapStyle) -> Option<PathBuf> {
    match &style.font_path {
        Some(path) => path.is_file().then(|| path.clone()),
        None => FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file()),
    }
}

/// Registers the font of `style` with plotters, once per font file.
fn font_family(style: &HeatmapStyle) -> Result<&'static str, ReportError> {
    let path = find_font(style).ok_or_else(|| match &style.font_path {
        Some(path) => ReportError::Plot(format!("font file not found: {}", path.display())),
        None => ReportError::Plot(
            "no usable TrueType font found, set font_path in the [plot] section".to_string(),
        ),
    })?;

    let mut registered = REGISTERED_FONTS
        .lock()
        .map_err(|_| ReportError::Plot("font registry is unavailable".to_string()))?;
    if let Some(family) = registered.get(&path) {
        return Ok(*family);
    }

    let bytes: &'static [u8] = Box::leak(fs::read(&path)?.into_boxed_slice());
    let family: &'static str =
        Box::leak(format!("cimap-font-{}", registered.len()).into_boxed_str());
    register_font(family, FontStyle::Normal, bytes)
        .map_err(|_| ReportError::Plot(format!("invalid font file: {}", path.display())))?;

    debug!("Using font {} for heatmap text", path.display());
    registered.insert(path, family);
    Ok(family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::ComparisonRow;

    fn rgb(color: RGBColor) -> (u8, u8, u8) {
        (color.0, color.1, color.2)
    }

    fn comparison() -> RootComparison {
        RootComparison {
            root: 2,
            reference_energy: Some(-100.0),
            target_energy: None,
            rows: vec![
                ComparisonRow {
                    config: "22222220u00000".to_string(),
                    label: r"$\pi_2^*$".to_string(),
                    reference: 90.2,
                    target: 0.0,
                },
                ComparisonRow {
                    config: "2222222u000000".to_string(),
                    label: r"$\pi_1^*$".to_string(),
                    reference: 4.4,
                    target: 64.0,
                },
            ],
        }
    }

    #[test]
    fn test_weight_color_endpoints() {
        assert_eq!(rgb(weight_color(0.0)), YL_OR_RD[0]);
        assert_eq!(rgb(weight_color(100.0)), YL_OR_RD[8]);
        assert_eq!(rgb(weight_color(50.0)), YL_OR_RD[4]);
    }

    #[test]
    fn test_weight_color_clamps() {
        assert_eq!(rgb(weight_color(-5.0)), YL_OR_RD[0]);
        assert_eq!(rgb(weight_color(150.0)), YL_OR_RD[8]);
        assert_eq!(rgb(weight_color(f64::NAN)), YL_OR_RD[0]);
    }

    #[test]
    fn test_annotation_color_contrast() {
        assert_eq!(rgb(annotation_color(weight_color(0.0))), (0, 0, 0));
        assert_eq!(rgb(annotation_color(weight_color(100.0))), (255, 255, 255));
    }

    #[test]
    fn test_layout_grows_with_rows() {
        let style = HeatmapStyle::default();
        let one = HeatmapLayout::compute(&["a".to_string()], &style);
        let three = HeatmapLayout::compute(&["a".to_string(), "b".to_string(), "c".to_string()], &style);
        assert_eq!(three.height - one.height, 2 * style.row_height);
        assert_eq!(one.width, three.width);
        assert!(one.cell_width >= MIN_CELL_WIDTH);
    }

    #[test]
    fn test_render_heatmap_cells() {
        let style = HeatmapStyle::default();
        if find_font(&style).is_none() {
            // Text cannot be drawn without a system font
            return;
        }
        let comparison = comparison();
        let image = render_heatmap(&comparison, 0.2, &GeometryNames::default(), &style).unwrap();

        let labels: Vec<String> = comparison
            .rows
            .iter()
            .map(|row| plain_text_label(&row.label))
            .collect();
        let layout = HeatmapLayout::compute(&labels, &style);
        assert_eq!(image.dimensions(), (layout.width, layout.height));

        // Second row, target column
        let x = (layout.grid_left + layout.cell_width + 4) as u32;
        let y = (layout.grid_top + layout.cell_height + 4) as u32;
        let pixel = image.get_pixel(x, y).0;
        let expected = weight_color(64.0);
        assert_eq!((pixel[0], pixel[1], pixel[2]), rgb(expected));
    }

    #[test]
    fn test_render_empty_comparison_fails() {
        let mut empty = comparison();
        empty.rows.clear();
        let result = render_heatmap(&empty, 0.2, &GeometryNames::default(), &HeatmapStyle::default());
        assert!(matches!(result, Err(ReportError::Plot(_))));
    }

    #[test]
    fn test_missing_font_file_fails_render() {
        let style = HeatmapStyle {
            font_path: Some(PathBuf::from("/nonexistent/cimap/font.ttf")),
            ..HeatmapStyle::default()
        };
        assert_eq!(find_font(&style), None);

        let result = render_heatmap(&comparison(), 0.2, &GeometryNames::default(), &style);
        match result {
            Err(ReportError::Plot(message)) => assert!(message.contains("font file not found")),
            other => panic!("expected font error, got {:?}", other.map(|image| image.dimensions())),
        }
    }

    #[test]
    fn test_configured_font_is_not_replaced_by_earlier_one() {
        let Some(system_font) = find_font(&HeatmapStyle::default()) else {
            return;
        };
        let ok_style = HeatmapStyle {
            font_path: Some(system_font),
            ..HeatmapStyle::default()
        };
        assert!(render_heatmap(&comparison(), 0.2, &GeometryNames::default(), &ok_style).is_ok());

        let missing_style = HeatmapStyle {
            font_path: Some(PathBuf::from("/nonexistent/cimap/other.ttf")),
            ..HeatmapStyle::default()
        };
        assert!(render_heatmap(&comparison(), 0.2, &GeometryNames::default(), &missing_style).is_err());
    }

    #[test]
    fn test_oversized_style_rejected() {
        let style = HeatmapStyle {
            row_height: MAX_DIMENSION + 1,
            ..HeatmapStyle::default()
        };
        let result = render_heatmap(&comparison(), 0.2, &GeometryNames::default(), &style);
        assert!(matches!(result, Err(ReportError::Plot(_))));
    }

    #[test]
    fn test_write_heatmap_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.png");
        let image = RgbImage::from_pixel(4, 3, image::Rgb([255, 0, 0]));
        write_heatmap(&path, &image).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
