//! Single-page PDF report: fixed-coordinate layout and its serialization.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner of
//! an A4 page. The layout is computed first as a list of draw operations so
//! positions can be checked without parsing the written file.

use std::collections::HashMap;
use std::path::Path;

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};
use tracing::debug;

use super::fonts::{PdfFont, SYMBOL_LAMBDA};
use super::ReportContext;
use crate::domain::error::ReportError;
use crate::domain::models::{ArtifactKind, ParameterKey, ProgressState, ToleranceFlag};

pub const PAGE_WIDTH: f32 = 595.2756;
pub const PAGE_HEIGHT: f32 = 841.8898;

const LEGEND_NAME_X: f32 = 370.0;
const LEGEND_VALUE_RIGHT_X: f32 = 545.0;
const LEGEND_UNIT_X: f32 = 550.0;
const PSF_LEGEND_Y: [f32; 5] = [710.0, 693.0, 676.0, 659.0, 642.0];
const FIT_LEGEND_Y: [f32; 4] = [617.0, 600.0, 583.0, 566.0];

const STATUS_X: f32 = 395.0;
const STATUS_UPPER_Y: f32 = 355.0;
const STATUS_LOWER_Y: f32 = 340.0;

const CATALOG_NAME_X: f32 = 350.0;
const CATALOG_VALUE_X: f32 = 520.0;
const CATALOG_FIRST_Y: f32 = 265.0;
const CATALOG_ROW_STEP: f32 = 17.0;
/// Rendered width of `-0.00` at 10pt; values are right-aligned to it
const CATALOG_VALUE_WIDTH: f32 = 22.79;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y - %H:%M:%S ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Self = Self(0.0, 0.0, 0.0);
    pub const GREEN: Self = Self(0.22, 0.67, 0.15);
    pub const RED: Self = Self(0.9, 0.07, 0.07);

    /// Value color for a catalog entry; unclassified entries stay black
    pub const fn for_flag(flag: ToleranceFlag) -> Self {
        match flag {
            ToleranceFlag::Within => Self::GREEN,
            ToleranceFlag::Outside => Self::RED,
            ToleranceFlag::Unclassified => Self::BLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        font: PdfFont,
        size: f32,
        color: Rgb,
        text: String,
    },
    Image {
        kind: ArtifactKind,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Ordered draw operations of the report page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    ops: Vec<DrawOp>,
}

impl PageLayout {
    pub fn build(ctx: &ReportContext<'_>) -> Self {
        let mut page = Self::default();
        let file_name = ctx
            .source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        page.text(100.0, 790.0, PdfFont::HelveticaBold, 16.0, "Phase retrieval analysis");
        page.text(100.0, 760.0, PdfFont::HelveticaBold, 12.0, "PSF file: ");
        page.text(155.0, 760.0, PdfFont::Helvetica, 10.0, file_name);

        page.text(100.0, 730.0, PdfFont::HelveticaBold, 12.0, "PSF previews");
        page.text(370.0, 730.0, PdfFont::HelveticaBold, 12.0, "PSF & Fit parameters");

        let legend = ParameterKey::PSF
            .iter()
            .zip(PSF_LEGEND_Y)
            .chain(
                [
                    ParameterKey::MaxIterations,
                    ParameterKey::PupilTolerance,
                    ParameterKey::MseTolerance,
                    ParameterKey::PhaseTolerance,
                ]
                .iter()
                .zip(FIT_LEGEND_Y),
            );
        for (&key, y) in legend {
            page.legend_entry(y, key, ctx);
        }

        page.text(100.0, 710.0, PdfFont::Helvetica, 10.0, "PSF x/y");
        page.text(230.0, 710.0, PdfFont::Helvetica, 10.0, "PSF x/z");
        page.image(ArtifactKind::PsfXy, 100.0, 585.0, 120.0, 120.0);
        page.image(ArtifactKind::PsfXz, 230.0, 585.0, 120.0, 120.0);

        page.text(100.0, 550.0, PdfFont::HelveticaBold, 12.0, "Phase retrieval results");
        page.image(ArtifactKind::FitResult, 100.0, 390.0, 360.0, 150.0);
        page.image(ArtifactKind::Convergence, 100.0, 325.0, 288.0, 72.0);

        let max_iterations = ctx.parameters.max_iterations.unwrap_or_default();
        for (y, line) in status_block(ctx.progress, max_iterations) {
            page.text(STATUS_X, y, PdfFont::Helvetica, 8.0, line);
        }

        page.text(100.0, 310.0, PdfFont::HelveticaBold, 12.0, "Zernike decomposition results");
        page.image(ArtifactKind::Decomposition, 100.0, 60.0, 240.0, 240.0);
        page.text(CATALOG_NAME_X, 285.0, PdfFont::HelveticaBold, 10.0, "Zernike Polynomial");
        page.mixed_text(CATALOG_VALUE_X, 285.0, PdfFont::HelveticaBold, 10.0, Rgb::BLACK, "Value / λ");

        let mut y = CATALOG_FIRST_Y;
        for entry in ctx.catalog.entries() {
            let font = if entry.is_salient() {
                PdfFont::HelveticaBold
            } else {
                PdfFont::Helvetica
            };
            page.text(CATALOG_NAME_X, y, font, 10.0, entry.name);

            let value = format!("{:.2}", entry.value);
            let x = CATALOG_VALUE_X + CATALOG_VALUE_WIDTH - font.text_width(&value, 10.0);
            page.colored_text(x, y, font, 10.0, Rgb::for_flag(entry.tolerance_flag), value);
            y -= CATALOG_ROW_STEP;
        }

        let generated = ctx.generated_at.format(TIMESTAMP_FORMAT);
        page.text(
            100.0,
            10.0,
            PdfFont::Helvetica,
            10.0,
            format!("Report generated on: {generated}"),
        );

        page
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Every text op, as `(x, y, text)`
    pub fn texts(&self) -> impl Iterator<Item = (f32, f32, &str)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { x, y, text, .. } => Some((*x, *y, text.as_str())),
            DrawOp::Image { .. } => None,
        })
    }

    pub fn find_text(&self, needle: &str) -> Option<&DrawOp> {
        self.ops
            .iter()
            .find(|op| matches!(op, DrawOp::Text { text, .. } if text == needle))
    }

    /// Serialize into PDF bytes, embedding the artifacts present in `ctx`
    pub fn render(&self, ctx: &ReportContext<'_>) -> Result<Vec<u8>, ReportError> {
        PdfBuilder::new(self).render(ctx)
    }

    pub fn save(&self, ctx: &ReportContext<'_>, path: &Path) -> Result<(), ReportError> {
        let bytes = self.render(ctx)?;
        std::fs::write(path, bytes).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn legend_entry(&mut self, y: f32, key: ParameterKey, ctx: &ReportContext<'_>) {
        let value = ctx
            .parameters
            .value(key)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let width = PdfFont::Helvetica.text_width(&value, 10.0);

        self.text(LEGEND_NAME_X, y, PdfFont::Helvetica, 10.0, key.display_name());
        self.text(LEGEND_VALUE_RIGHT_X - width, y, PdfFont::Helvetica, 10.0, value);
        self.mixed_text(
            LEGEND_UNIT_X,
            y,
            PdfFont::Helvetica,
            10.0,
            Rgb::BLACK,
            key.unit().symbol(),
        );
    }

    fn text(&mut self, x: f32, y: f32, font: PdfFont, size: f32, text: impl Into<String>) {
        self.colored_text(x, y, font, size, Rgb::BLACK, text);
    }

    fn colored_text(
        &mut self,
        x: f32,
        y: f32,
        font: PdfFont,
        size: f32,
        color: Rgb,
        text: impl Into<String>,
    ) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x,
            y,
            font,
            size,
            color,
            text,
        });
    }

    /// Text that may contain a lambda; the lambda is drawn in the Symbol font
    fn mixed_text(&mut self, x: f32, y: f32, font: PdfFont, size: f32, color: Rgb, text: &str) {
        let mut x = x;
        for (i, run) in text.split('λ').enumerate() {
            if i > 0 {
                let lambda = SYMBOL_LAMBDA.to_string();
                let width = PdfFont::Symbol.text_width(&lambda, size);
                self.colored_text(x, y, PdfFont::Symbol, size, color, lambda);
                x += width;
            }
            let width = font.text_width(run, size);
            self.colored_text(x, y, font, size, color, run);
            x += width;
        }
    }

    fn image(&mut self, kind: ArtifactKind, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Image {
            kind,
            x,
            y,
            width,
            height,
        });
    }
}

/// Status lines and their baselines.
///
/// A finished run has one line and reads "<reason> after <n> iterations.".
/// A run still in progress has two lines; at the iteration limit they are
/// printed as-is, below it the first line is replaced by the iteration count.
pub fn status_block(progress: &ProgressState, max_iterations: u32) -> Vec<(f32, String)> {
    let lines = progress.status_lines();
    match lines.as_slice() {
        [line] => {
            let mut reason = line.clone();
            reason.pop();
            vec![(
                STATUS_LOWER_Y,
                format!("{reason} after {} iterations.", progress.iteration),
            )]
        }
        [first, second] if progress.iteration == max_iterations => vec![
            (STATUS_UPPER_Y, first.clone()),
            (STATUS_LOWER_Y, second.clone()),
        ],
        [_, second] if progress.iteration < max_iterations => vec![
            (
                STATUS_UPPER_Y,
                format!("During iteration {} / {} ", progress.iteration, max_iterations),
            ),
            (STATUS_LOWER_Y, second.clone()),
        ],
        _ => Vec::new(),
    }
}

/// Map text onto single-byte WinAnsi codes; unmappable characters become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        })
        .collect()
}

struct PdfBuilder<'a> {
    layout: &'a PageLayout,
    next_ref: i32,
}

impl<'a> PdfBuilder<'a> {
    const fn new(layout: &'a PageLayout) -> Self {
        Self {
            layout,
            next_ref: 1,
        }
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_ref);
        self.next_ref += 1;
        id
    }

    fn render(mut self, ctx: &ReportContext<'_>) -> Result<Vec<u8>, ReportError> {
        let layout = self.layout;
        let catalog_id = self.alloc();
        let page_tree_id = self.alloc();
        let page_id = self.alloc();
        let content_id = self.alloc();
        let font_ids: Vec<(PdfFont, Ref)> = PdfFont::ALL.iter().map(|&f| (f, self.alloc())).collect();

        let mut pdf = Pdf::new();

        // Decode each referenced artifact once
        let mut images: HashMap<ArtifactKind, (Ref, String)> = HashMap::new();
        for op in &layout.ops {
            let DrawOp::Image { kind, .. } = op else {
                continue;
            };
            if images.contains_key(kind) {
                continue;
            }
            let Some(bytes) = ctx.artifacts.get(*kind).filter(|b| !b.is_empty()) else {
                debug!(artifact = %kind, "Artifact missing, leaving its area blank");
                continue;
            };
            let id = self.alloc();
            embed_png(&mut pdf, id, *kind, &bytes)?;
            images.insert(*kind, (id, format!("Im{}", images.len() + 1)));
        }

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(page_tree_id);
        page.contents(content_id);
        let mut resources = page.resources();
        let mut fonts = resources.fonts();
        for (font, id) in &font_ids {
            fonts.pair(Name(font.resource_name()), *id);
        }
        fonts.finish();
        let mut x_objects = resources.x_objects();
        for (id, name) in images.values() {
            x_objects.pair(Name(name.as_bytes()), *id);
        }
        x_objects.finish();
        resources.finish();
        page.finish();

        for (font, id) in &font_ids {
            let mut type1 = pdf.type1_font(*id);
            type1.base_font(Name(font.base_font()));
            if *font != PdfFont::Symbol {
                type1.encoding_predefined(Name(b"WinAnsiEncoding"));
            }
        }

        let mut content = Content::new();
        for op in &layout.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    font,
                    size,
                    color,
                    text,
                } => {
                    content.set_fill_rgb(color.0, color.1, color.2);
                    content.begin_text();
                    content.set_font(Name(font.resource_name()), *size);
                    content.next_line(*x, *y);
                    content.show(Str(&encode_win_ansi(text)));
                    content.end_text();
                }
                DrawOp::Image {
                    kind,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let Some((_, name)) = images.get(kind) else {
                        continue;
                    };
                    content.save_state();
                    content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                    content.x_object(Name(name.as_bytes()));
                    content.restore_state();
                }
            }
        }
        pdf.stream(content_id, &content.finish());

        Ok(pdf.finish())
    }
}

fn embed_png(pdf: &mut Pdf, id: Ref, kind: ArtifactKind, bytes: &[u8]) -> Result<(), ReportError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| ReportError::Image(kind.to_string(), err))?
        .to_rgb8();

    let (width, height) = decoded.dimensions();
    let compressed = compress_to_vec_zlib(decoded.as_raw(), 6);
    let mut xobject = pdf.image_xobject(id, &compressed);
    xobject.filter(Filter::FlateDecode);
    xobject.width(width as i32);
    xobject.height(height as i32);
    xobject.color_space().device_rgb();
    xobject.bits_per_component(8);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TerminationReason;

    fn running(iteration: u32) -> ProgressState {
        ProgressState {
            iteration,
            pupil_diff: 0.01,
            mse_diff: 0.002,
            ..ProgressState::started(100)
        }
    }

    #[test]
    fn test_status_block_terminal() {
        let progress = running(37).stopped(TerminationReason::PupilConverged);
        assert_eq!(
            status_block(&progress, 100),
            vec![(340.0, "Pupil function converged after 37 iterations.".to_string())]
        );
    }

    #[test]
    fn test_status_block_in_progress_at_limit() {
        assert_eq!(
            status_block(&running(100), 100),
            vec![
                (355.0, "Phase retrieval running...".to_string()),
                (340.0, "Pupil diff 1.00E-02, MSE diff 2.00E-03".to_string()),
            ]
        );
    }

    #[test]
    fn test_status_block_in_progress_below_limit() {
        assert_eq!(
            status_block(&running(12), 100),
            vec![
                (355.0, "During iteration 12 / 100 ".to_string()),
                (340.0, "Pupil diff 1.00E-02, MSE diff 2.00E-03".to_string()),
            ]
        );
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("psf µm.tif"), b"psf \xB5m.tif".to_vec());
        assert_eq!(encode_win_ansi("λ"), b"?".to_vec());
    }
}
