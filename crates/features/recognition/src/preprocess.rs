//! Turns an uploaded image into the model input plane.
//!
//! BT.601 grayscale, area-resized to 256x64, scaled to `[0, 1]`, then rotated 90 degrees
//! clockwise so that the image width runs along the first spatial axis.
//!
//! Intermediate planes are quantized to whole 8-bit levels, as the model saw them in
//! training. Shrinking averages box footprints; when either axis grows, both axes switch
//! to the two-tap area interpolation instead.

use crate::error::RecognitionError;

/// Width the image is resized to before rotation.
pub const TARGET_WIDTH: usize = 256;
/// Height the image is resized to before rotation.
pub const TARGET_HEIGHT: usize = 64;

/// Row-major `[TARGET_WIDTH, TARGET_HEIGHT]` plane ready for the network.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPlane {
    pub data: Vec<f32>,
}

impl InputPlane {
    /// `(rows, cols)` of the rotated plane.
    pub const SHAPE: (usize, usize) = (TARGET_WIDTH, TARGET_HEIGHT);

    #[must_use]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.data[row * Self::SHAPE.1 + col]
    }
}

/// Decodes `bytes` (PNG or JPEG) and runs the full preprocessing chain.
///
/// # Errors
/// [`RecognitionError::Image`] if the bytes are not a decodable image.
pub fn prepare(bytes: &[u8]) -> Result<InputPlane, RecognitionError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    if width == 0 || height == 0 {
        return Err(RecognitionError::InvalidImage { message: "Empty image".into(), context: None });
    }

    let pixels: Vec<f32> = rgb.pixels().map(|p| quantize(luminance(p.0))).collect();
    let resized = area_resize(&pixels, width, height, TARGET_WIDTH, TARGET_HEIGHT);
    let scaled: Vec<f32> = resized.into_iter().map(|p| quantize(p) / 255.0).collect();

    Ok(InputPlane { data: rotate_clockwise(&scaled, TARGET_WIDTH, TARGET_HEIGHT) })
}

/// ITU-R BT.601 luma, the weighting the model was trained with.
fn luminance([r, g, b]: [u8; 3]) -> f32 {
    0.299f32.mul_add(f32::from(r), 0.587f32.mul_add(f32::from(g), 0.114 * f32::from(b)))
}

/// Rounds to the nearest 8-bit level, ties to even.
fn quantize(value: f32) -> f32 {
    value.round_ties_even().clamp(0.0, 255.0)
}

/// Per destination index, the source indices it covers and their overlap weights.
fn box_weights(src: usize, dst: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = src as f64 / dst as f64;

    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src);

            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 1e-9).then_some((s, overlap))
                })
                .collect()
        })
        .collect()
}

/// Two taps per destination index, the area-mode interpolation used once an axis grows.
/// On an enlarged axis the fraction is non-zero only where a destination cell straddles
/// a source boundary, so pixels keep hard edges apart from a one-pixel blend.
fn linear_weights(src: usize, dst: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = src as f64 / dst as f64;
    let inv = dst as f64 / src as f64;

    (0..dst)
        .map(|d| {
            let sx = (d as f64 * scale).floor();
            let fx = (d as f64 + 1.0) - (sx + 1.0) * inv;
            let fx = if fx <= 0.0 { 0.0 } else { fx - fx.floor() };
            let sx = sx as usize;

            if sx + 1 >= src {
                vec![(src - 1, 1.0)]
            } else {
                vec![(sx, 1.0 - fx), (sx + 1, fx)]
            }
        })
        .collect()
}

/// Area resize of a row-major `sh x sw` plane to `dh x dw`.
///
/// When neither axis grows, every output pixel is the area-weighted mean of the source
/// pixels its footprint covers. Otherwise both axes use two-tap area interpolation.
#[must_use]
pub fn area_resize(src: &[f32], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<f32> {
    let weights: fn(usize, usize) -> Vec<Vec<(usize, f64)>> =
        if sw >= dw && sh >= dh { box_weights } else { linear_weights };
    let xs = weights(sw, dw);
    let ys = weights(sh, dh);
    let mut out = Vec::with_capacity(dw * dh);

    for row in &ys {
        for col in &xs {
            let mut sum = 0.0;
            let mut area = 0.0;
            for &(y, wy) in row {
                for &(x, wx) in col {
                    let w = wy * wx;
                    sum += f64::from(src[y * sw + x]) * w;
                    area += w;
                }
            }
            out.push(if area > 0.0 { (sum / area) as f32 } else { 0.0 });
        }
    }

    out
}

/// Rotates a row-major `height x width` plane 90 degrees clockwise.
///
/// The result has `width` rows and `height` columns, with
/// `out[i][j] = src[height - 1 - j][i]`.
#[must_use]
pub fn rotate_clockwise(src: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(src.len());
    for i in 0..width {
        for j in 0..height {
            out.push(src[(height - 1 - j) * width + i]);
        }
    }
    out
}
