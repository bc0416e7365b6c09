use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ExtractionError;

/// A decoded rooftop photo together with the encoded bytes it came from.
///
/// The pixels feed the metrics pipeline; the bytes are what a vision backend
/// receives. Both are shared, so cloning is cheap.
#[derive(Clone)]
pub struct RoofImage {
    id: Uuid,
    bytes: Arc<[u8]>,
    pixels: Arc<DynamicImage>,
    received_at: DateTime<Utc>,
}

impl RoofImage {
    pub fn decode(bytes: impl Into<Vec<u8>>) -> Result<Self, ExtractionError> {
        let bytes = bytes.into();
        let pixels = image::load_from_memory(&bytes).map_err(ExtractionError::Decode)?;
        Self::check_dimensions(&pixels)?;

        Ok(Self {
            id: Uuid::new_v4(),
            bytes: Arc::from(bytes),
            pixels: Arc::new(pixels),
            received_at: Utc::now(),
        })
    }

    /// Wrap an already-decoded buffer, re-encoding it as PNG for the byte view.
    pub fn from_image(pixels: DynamicImage) -> Result<Self, ExtractionError> {
        Self::check_dimensions(&pixels)?;

        let mut encoded = Cursor::new(Vec::new());
        pixels
            .write_to(&mut encoded, ImageFormat::Png)
            .map_err(ExtractionError::Encode)?;

        Ok(Self {
            id: Uuid::new_v4(),
            bytes: Arc::from(encoded.into_inner()),
            pixels: Arc::new(pixels),
            received_at: Utc::now(),
        })
    }

    fn check_dimensions(pixels: &DynamicImage) -> Result<(), ExtractionError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(ExtractionError::EmptyImage { width, height });
        }
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn pixels(&self) -> Arc<DynamicImage> {
        Arc::clone(&self.pixels)
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// MIME type of the encoded bytes, falling back to JPEG when unknown.
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/jpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
            width,
            height,
            Rgb([120, 130, 140]),
        ))
    }

    #[test]
    fn cloning_shares_pixel_buffer() {
        let image = RoofImage::from_image(solid(16, 16)).unwrap();
        let copy = image.clone();
        assert!(Arc::ptr_eq(&image.pixels, &copy.pixels));
        assert_eq!(image.id(), copy.id());
    }

    #[test]
    fn from_image_round_trips_through_png() {
        let image = RoofImage::from_image(solid(8, 4)).unwrap();
        assert_eq!(image.mime_type(), "image/png");

        let decoded = RoofImage::decode(image.bytes().to_vec()).unwrap();
        assert_eq!(decoded.pixels().dimensions(), (8, 4));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = RoofImage::decode(vec![0u8, 1, 2, 3, 4, 5]).err().unwrap();
        assert!(matches!(err, ExtractionError::Decode(_)));
    }

    #[test]
    fn rejects_empty_buffer() {
        let err = RoofImage::from_image(DynamicImage::new_rgb8(0, 10))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ExtractionError::EmptyImage {
                width: 0,
                height: 10
            }
        ));
    }
}
