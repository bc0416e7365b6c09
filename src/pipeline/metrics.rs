use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use serde::Serialize;
use tracing::debug;

use super::contours::{adaptive_threshold, gaussian_blur, significant_contour_area};
use crate::error::ExtractionError;

/// Scalar quality and geometry signals derived from a single photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageMetrics {
    pub width: u32,
    pub height: u32,
    /// Mean grayscale intensity, 0..=255.
    pub brightness: f64,
    /// Standard deviation of grayscale intensity.
    pub contrast: f64,
    /// Variance of the Laplacian response.
    pub sharpness: f64,
    pub total_area: u64,
    pub significant_contour_area: f64,
}

impl ImageMetrics {
    pub fn megapixels(&self) -> f64 {
        self.total_area as f64 / 1_000_000.0
    }

    /// Fraction of the frame covered by significant regions, as a percentage.
    pub fn coverage_percent(&self) -> f64 {
        if self.total_area == 0 {
            return 0.0;
        }
        self.significant_contour_area / self.total_area as f64 * 100.0
    }

    pub fn dimensions_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Tunable parameters for the segmentation half of the extractor.
#[derive(Debug, Clone)]
pub struct ExtractionParams {
    pub blur_kernel: usize,
    pub threshold_block: usize,
    pub threshold_offset: f64,
    /// Regions smaller than this fraction of the frame are discarded.
    pub min_region_fraction: f64,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            blur_kernel: 5,
            threshold_block: 11,
            threshold_offset: 2.0,
            min_region_fraction: 0.005,
        }
    }
}

impl ExtractionParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err("Blur kernel must be a positive odd size".to_string());
        }

        if self.threshold_block < 3 || self.threshold_block % 2 == 0 {
            return Err("Threshold block must be an odd size of at least 3".to_string());
        }

        if !(0.0..1.0).contains(&self.min_region_fraction) {
            return Err("Minimum region fraction must be in [0.0, 1.0)".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageMetricsExtractor {
    params: ExtractionParams,
}

impl ImageMetricsExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: ExtractionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ExtractionParams {
        &self.params
    }

    pub fn extract(&self, image: &DynamicImage) -> Result<ImageMetrics, ExtractionError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ExtractionError::EmptyImage { width, height });
        }

        let gray = to_grayscale(image);
        let (brightness, contrast) = mean_and_std_dev(&gray);
        let sharpness = laplacian_variance(&gray);

        let total_area = width as u64 * height as u64;
        let blurred = gaussian_blur(&gray, self.params.blur_kernel);
        let binary = adaptive_threshold(
            &blurred,
            self.params.threshold_block,
            self.params.threshold_offset,
        );
        let min_area = total_area as f64 * self.params.min_region_fraction;
        let significant_contour_area =
            significant_contour_area(&binary, min_area).min(total_area as f64);

        debug!(
            width,
            height, brightness, contrast, sharpness, significant_contour_area, "extracted image metrics"
        );

        Ok(ImageMetrics {
            width,
            height,
            brightness,
            contrast,
            sharpness,
            total_area,
            significant_contour_area,
        })
    }
}

/// BT.601 luma in 14-bit fixed point, rounded.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << 13)) >> 14) as u8
}

pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }

    let rgb = image.to_rgb8();
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (out, px) in gray.pixels_mut().zip(rgb.pixels()) {
        *out = Luma([luma(px[0], px[1], px[2])]);
    }
    gray
}

/// Population mean and standard deviation of the intensities.
pub fn mean_and_std_dev(gray: &GrayImage) -> (f64, f64) {
    let count = gray.as_raw().len();
    if count == 0 {
        return (0.0, 0.0);
    }

    let sum: f64 = gray.as_raw().iter().map(|&v| v as f64).sum();
    let mean = sum / count as f64;
    let squares: f64 = gray
        .as_raw()
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum();
    (mean, (squares / count as f64).sqrt())
}

/// Variance of the 4-neighbour Laplacian `[0,1,0; 1,-4,1; 0,1,0]` over every
/// pixel, mirroring across the image edges.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let count = w * h;
    if count == 0 {
        return 0.0;
    }

    let src = gray.as_raw();
    let reflect = |i: isize, n: usize| -> usize {
        let n = n as isize;
        if n == 1 {
            0
        } else if i < 0 {
            (-i) as usize
        } else if i >= n {
            (2 * n - 2 - i) as usize
        } else {
            i as usize
        }
    };

    let mut responses = Vec::with_capacity(count);
    for y in 0..h as isize {
        let up = reflect(y - 1, h) * w;
        let row = y as usize * w;
        let down = reflect(y + 1, h) * w;
        for x in 0..w as isize {
            let left = reflect(x - 1, w);
            let right = reflect(x + 1, w);
            let center = src[row + x as usize] as f64;
            let response = src[up + x as usize] as f64
                + src[down + x as usize] as f64
                + src[row + left] as f64
                + src[row + right] as f64
                - 4.0 * center;
            responses.push(response);
        }
    }

    let mean = responses.iter().sum::<f64>() / count as f64;
    responses
        .iter()
        .map(|r| {
            let d = r - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn checkerboard(width: u32, height: u32, dark: u8, light: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            let v = if (x + y) % 2 == 0 { dark } else { light };
            Rgb([v, v, v])
        }))
    }

    #[test]
    fn luma_matches_reference_weights() {
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn uniform_gray_has_no_texture() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 100, Luma([128])));
        let metrics = ImageMetricsExtractor::new().extract(&image).unwrap();

        assert_eq!(metrics.brightness, 128.0);
        assert_eq!(metrics.contrast, 0.0);
        assert_eq!(metrics.sharpness, 0.0);
        assert_eq!(metrics.total_area, 10_000);
        assert_eq!(metrics.significant_contour_area, 99.0 * 99.0);
        assert_eq!(metrics.dimensions_label(), "100x100");
    }

    #[test]
    fn checkerboard_is_maximally_sharp() {
        let metrics = ImageMetricsExtractor::new()
            .extract(&checkerboard(64, 48, 0, 255))
            .unwrap();

        assert_eq!(metrics.brightness, 127.5);
        assert_eq!(metrics.contrast, 127.5);
        // Every response is +/-1020 with zero mean.
        assert!((metrics.sharpness - 1020.0 * 1020.0).abs() < 1e-6);
    }

    #[test]
    fn contour_area_stays_within_frame() {
        let metrics = ImageMetricsExtractor::new()
            .extract(&checkerboard(40, 30, 30, 220))
            .unwrap();
        assert!(metrics.significant_contour_area >= 0.0);
        assert!(metrics.significant_contour_area <= metrics.total_area as f64);
        assert!(metrics.coverage_percent() <= 100.0);
    }

    #[test]
    fn single_pixel_image_is_supported() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([42])));
        let metrics = ImageMetricsExtractor::new().extract(&image).unwrap();
        assert_eq!(metrics.brightness, 42.0);
        assert_eq!(metrics.sharpness, 0.0);
    }

    #[test]
    fn empty_image_is_an_extraction_error() {
        let err = ImageMetricsExtractor::new()
            .extract(&DynamicImage::new_luma8(0, 0))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyImage { .. }));
    }

    #[test]
    fn params_validation() {
        assert!(ExtractionParams::default().validate().is_ok());
        let even = ExtractionParams {
            threshold_block: 10,
            ..ExtractionParams::default()
        };
        assert!(even.validate().is_err());
    }
}
