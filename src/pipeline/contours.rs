//! Foreground segmentation used to estimate how much of the frame is covered
//! by distinct, clean surfaces.
//!
//! The grayscale image is smoothed with a small Gaussian, binarized against a
//! Gaussian-weighted local mean, and the outer contours of the resulting
//! regions are measured. Regions below a fraction of the frame are noise.
//!
//! Convolution is done here rather than with `imageproc::filter`: its clamped
//! borders and sigma-derived kernels shift the thresholded areas away from the
//! reflect-101 borders and fixed 5-tap table these measurements are tuned to.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

/// How samples outside the image are synthesized during convolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Border {
    /// `dcb|abcd|cba`: mirror without repeating the edge sample.
    Reflect101,
    /// `aaa|abcd|ddd`
    Replicate,
}

impl Border {
    fn index(self, i: isize, len: usize) -> usize {
        let n = len as isize;
        if n == 1 {
            return 0;
        }
        let mapped = match self {
            Border::Replicate => i.clamp(0, n - 1),
            Border::Reflect101 => {
                let mut i = i;
                while i < 0 || i >= n {
                    i = if i < 0 { -i } else { 2 * n - 2 - i };
                }
                i
            }
        };
        mapped as usize
    }
}

/// Normalized 1-D Gaussian taps for an odd kernel `size`, with sigma derived
/// from the size. Sizes up to 7 use the usual binomial-style tables.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
            let center = (size / 2) as f64;
            let taps: Vec<f64> = (0..size)
                .map(|i| {
                    let d = i as f64 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let sum: f64 = taps.iter().sum();
            taps.into_iter().map(|t| (t / sum) as f32).collect()
        }
    }
}

/// Separable convolution of `gray` with `kernel` in both directions.
fn separable_filter(gray: &GrayImage, kernel: &[f32], border: Border) -> Vec<f32> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let radius = (kernel.len() / 2) as isize;
    let src = gray.as_raw();

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = border.index(x as isize + k as isize - radius, w);
                acc += weight * row[sx] as f32;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = border.index(y as isize + k as isize - radius, h);
                acc += weight * horizontal[sy * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

fn to_gray(width: u32, height: u32, values: Vec<f32>) -> GrayImage {
    let raw = values
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(width, height, raw).unwrap_or_else(|| GrayImage::new(width, height))
}

pub fn gaussian_blur(gray: &GrayImage, kernel_size: usize) -> GrayImage {
    let kernel = gaussian_kernel(kernel_size);
    let blurred = separable_filter(gray, &kernel, Border::Reflect101);
    to_gray(gray.width(), gray.height(), blurred)
}

/// Binarize against a Gaussian-weighted local mean over `block_size` pixels:
/// a pixel is foreground (255) when it exceeds `mean - offset`.
pub fn adaptive_threshold(gray: &GrayImage, block_size: usize, offset: f64) -> GrayImage {
    let kernel = gaussian_kernel(block_size);
    let mean = to_gray(
        gray.width(),
        gray.height(),
        separable_filter(gray, &kernel, Border::Replicate),
    );
    let margin = offset.ceil() as i32;

    let mut binary = GrayImage::new(gray.width(), gray.height());
    for (out, (src, local)) in binary
        .pixels_mut()
        .zip(gray.pixels().zip(mean.pixels()))
    {
        let diff = src[0] as i32 - local[0] as i32;
        *out = Luma([if diff > -margin { 255 } else { 0 }]);
    }
    binary
}

/// Area enclosed by a closed contour through pixel centers (shoelace formula).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

fn is_external(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// Sum of the areas of the external contours in `binary` larger than `min_area`.
pub fn significant_contour_area(binary: &GrayImage, min_area: f64) -> f64 {
    find_contours::<i32>(binary)
        .iter()
        .filter(|contour| is_external(contour))
        .map(|contour| contour_area(&contour.points))
        .filter(|&area| area > min_area)
        .sum()
}
