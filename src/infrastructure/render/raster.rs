//! Minimal raster plots drawn straight into an RGB buffer.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::domain::error::RenderError;
use crate::domain::models::Plane;
use crate::domain::ports::{Plot, PlotRenderer};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const GRID: Rgb<u8> = Rgb([200, 200, 200]);
const PUPIL_LINE: Rgb<u8> = Rgb([31, 119, 180]);
const MSE_LINE: Rgb<u8> = Rgb([255, 127, 14]);
const WITHIN: Rgb<u8> = Rgb([56, 171, 38]);
const OUTSIDE: Rgb<u8> = Rgb([230, 18, 18]);

const INTENSITY_SIZE: u32 = 240;
const CONVERGENCE_SIZE: (u32, u32) = (576, 144);
const COEFFICIENTS_SIZE: u32 = 480;
const MARGIN: u32 = 12;

/// PNG plots rendered with the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterPlotRenderer;

impl RasterPlotRenderer {
    pub const fn new() -> Self {
        Self
    }

    fn intensity(plane: &Plane) -> Result<RgbImage, RenderError> {
        if plane.width == 0 || plane.height == 0 || plane.values.len() != plane.width * plane.height
        {
            return Err(RenderError::EmptySeries("intensity plane"));
        }
        let (lo, hi) = plane.value_range().unwrap_or((0.0, 0.0));
        let span = if hi > lo { hi - lo } else { 1.0 };

        let (width, height) = (dim(plane.width), dim(plane.height));
        let raw = RgbImage::from_fn(width, height, |x, y| {
            let value = plane.values[y as usize * plane.width + x as usize];
            let level = if value.is_finite() {
                ((value - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8
            } else {
                0
            };
            Rgb([level, level, level])
        });

        let scale = (INTENSITY_SIZE / width.max(height)).max(1);
        Ok(imageops::resize(
            &raw,
            width * scale,
            height * scale,
            FilterType::Nearest,
        ))
    }

    fn convergence(
        pupil_diffs: &[f64],
        mse_diffs: &[f64],
        max_iterations: u32,
    ) -> Result<RgbImage, RenderError> {
        if pupil_diffs.is_empty() && mse_diffs.is_empty() {
            return Err(RenderError::EmptySeries("convergence history"));
        }
        let (width, height) = CONVERGENCE_SIZE;
        let mut canvas = RgbImage::from_pixel(width, height, WHITE);

        // log10 y axis over the finite, positive samples
        let logs = |series: &[f64]| -> Vec<Option<f64>> {
            series
                .iter()
                .map(|&v| (v > 0.0 && v.is_finite()).then(|| v.log10()))
                .collect()
        };
        let (pupil, mse) = (logs(pupil_diffs), logs(mse_diffs));
        let (lo, hi) = pupil
            .iter()
            .chain(&mse)
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (lo, hi) = if lo.is_finite() { (lo.floor(), hi.ceil().max(lo.floor() + 1.0)) } else { (-1.0, 0.0) };

        let plot_w = f64::from(width - 2 * MARGIN);
        let plot_h = f64::from(height - 2 * MARGIN);
        let samples = pupil_diffs.len().max(mse_diffs.len());
        let x_span = f64::from(max_iterations).max(samples as f64).max(2.0) - 1.0;
        let to_px = |index: usize, log: f64| -> (i64, i64) {
            let x = f64::from(MARGIN) + index as f64 / x_span * plot_w;
            let y = f64::from(MARGIN) + (hi - log) / (hi - lo) * plot_h;
            (x.round() as i64, y.round() as i64)
        };

        let mut decade = lo;
        while decade <= hi {
            let (_, y) = to_px(0, decade);
            draw_line(&mut canvas, (i64::from(MARGIN), y), (i64::from(width - MARGIN), y), GRID);
            decade += 1.0;
        }
        draw_axes(&mut canvas, width, height);

        for (series, color) in [(&pupil, PUPIL_LINE), (&mse, MSE_LINE)] {
            let points: Vec<(i64, i64)> = series
                .iter()
                .enumerate()
                .filter_map(|(i, log)| log.map(|l| to_px(i, l)))
                .collect();
            for pair in points.windows(2) {
                draw_line(&mut canvas, pair[0], pair[1], color);
            }
            if let [single] = points.as_slice() {
                put(&mut canvas, single.0, single.1, color);
            }
        }
        Ok(canvas)
    }

    fn coefficients(values: &[f64], salient: &[bool], tolerance: f64) -> Result<RgbImage, RenderError> {
        if values.is_empty() {
            return Err(RenderError::EmptySeries("coefficients"));
        }
        let size = COEFFICIENTS_SIZE;
        let mut canvas = RgbImage::from_pixel(size, size, WHITE);

        let extent = values
            .iter()
            .map(|v| v.abs())
            .filter(|v| v.is_finite())
            .fold(tolerance.abs(), f64::max)
            .max(f64::EPSILON);
        let plot = f64::from(size - 2 * MARGIN);
        let mid = f64::from(size) / 2.0;
        let to_y = |v: f64| (mid - v / extent * plot / 2.0).round() as i64;

        for limit in [tolerance, -tolerance] {
            let y = to_y(limit);
            draw_line(&mut canvas, (i64::from(MARGIN), y), (i64::from(size - MARGIN), y), GRID);
        }
        draw_line(
            &mut canvas,
            (i64::from(MARGIN), to_y(0.0)),
            (i64::from(size - MARGIN), to_y(0.0)),
            AXIS,
        );

        let slot = plot / values.len() as f64;
        for (i, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                continue;
            }
            let color = if value.abs() < tolerance { WITHIN } else { OUTSIDE };
            let fill = if salient.get(i).copied().unwrap_or(false) { 0.8 } else { 0.5 };
            let center = f64::from(MARGIN) + slot * (i as f64 + 0.5);
            let half = (slot * fill / 2.0).max(0.5);
            let (x0, x1) = ((center - half).round() as i64, (center + half).round() as i64);
            let (y0, y1) = (to_y(0.0).min(to_y(value)), to_y(0.0).max(to_y(value)));
            for x in x0..x1 {
                for y in y0..=y1 {
                    put(&mut canvas, x, y, color);
                }
            }
        }
        Ok(canvas)
    }
}

impl PlotRenderer for RasterPlotRenderer {
    fn render(&self, plot: &Plot) -> Result<Vec<u8>, RenderError> {
        let canvas = match plot {
            Plot::Intensity(plane) => Self::intensity(plane)?,
            Plot::Convergence {
                pupil_diffs,
                mse_diffs,
                max_iterations,
            } => Self::convergence(pupil_diffs, mse_diffs, *max_iterations)?,
            Plot::Coefficients {
                values,
                salient,
                tolerance,
            } => Self::coefficients(values, salient, *tolerance)?,
        };
        encode_png(canvas)
    }
}

fn encode_png(canvas: RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn dim(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
        if x < canvas.width() && y < canvas.height() {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Bresenham line, clipped to the canvas
fn draw_line(canvas: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(canvas, x, y, color);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_axes(canvas: &mut RgbImage, width: u32, height: u32) {
    let (left, bottom) = (i64::from(MARGIN), i64::from(height - MARGIN));
    draw_line(canvas, (left, i64::from(MARGIN)), (left, bottom), AXIS);
    draw_line(canvas, (left, bottom), (i64::from(width - MARGIN), bottom), AXIS);
}
