//! Image collaborator
//!
//! The composer and exporters only talk to [`ImageCodec`]. [`RasterCodec`]
//! implements it with the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage, buffer::ConvertBuffer};
use std::io::Cursor;

use crate::constants::IMAGE_JPEG_QUALITY;
use crate::types::{CodecError, ImageFormat, Rotation};

/// A pixel-aligned rectangle. The origin may lie outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of an image
    pub fn full(image: &RgbaImage) -> Self {
        Self::new(0, 0, image.width(), image.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Decode, draw and encode raster images
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, CodecError>;

    fn encode(&self, image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, CodecError>;

    /// Draw the `crop` region of `source` onto `canvas`, scaled to fill
    /// `target` and rotated by `rotation`. Parts outside the canvas are clipped.
    fn draw(
        &self,
        source: &RgbaImage,
        canvas: &mut RgbaImage,
        target: PixelRect,
        rotation: Rotation,
        crop: PixelRect,
    ) -> Result<(), CodecError>;
}

/// [`ImageCodec`] built on the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    jpeg_quality: u8,
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self {
            jpeg_quality: IMAGE_JPEG_QUALITY,
        }
    }
}

impl RasterCodec {
    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, CodecError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(image.to_rgba8())
    }

    fn encode(&self, image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>, CodecError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CodecError::Encode("image has no pixels".to_string()));
        }
        let mut buf = Vec::new();
        match format {
            ImageFormat::Png => image
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| CodecError::Encode(e.to_string()))?,
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb: RgbImage = image.convert();
                JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality)
                    .write_image(
                        rgb.as_raw(),
                        rgb.width(),
                        rgb.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .map_err(|e| CodecError::Encode(e.to_string()))?
            }
        }
        Ok(buf)
    }

    fn draw(
        &self,
        source: &RgbaImage,
        canvas: &mut RgbaImage,
        target: PixelRect,
        rotation: Rotation,
        crop: PixelRect,
    ) -> Result<(), CodecError> {
        if target.is_empty() {
            return Err(CodecError::InvalidRegion(format!(
                "empty target {}x{}",
                target.width, target.height
            )));
        }
        let inside = crop.x >= 0
            && crop.y >= 0
            && crop.x + crop.width as i64 <= source.width() as i64
            && crop.y + crop.height as i64 <= source.height() as i64;
        if crop.is_empty() || !inside {
            return Err(CodecError::InvalidRegion(format!(
                "crop {}x{}+{}+{} outside {}x{} image",
                crop.width,
                crop.height,
                crop.x,
                crop.y,
                source.width(),
                source.height()
            )));
        }

        let cropped =
            imageops::crop_imm(source, crop.x as u32, crop.y as u32, crop.width, crop.height)
                .to_image();
        let mut scaled = if (cropped.width(), cropped.height()) == (target.width, target.height) {
            cropped
        } else {
            imageops::resize(&cropped, target.width, target.height, FilterType::Lanczos3)
        };
        if rotation == Rotation::Half {
            imageops::rotate180_in_place(&mut scaled);
        }
        imageops::overlay(canvas, &scaled, target.x, target.y);
        Ok(())
    }
}

/// Scale an image to the given width, keeping its aspect ratio
pub fn resize_to_width(image: &RgbaImage, width: u32) -> RgbaImage {
    if image.width() == width || image.width() == 0 {
        return image.clone();
    }
    let height = ((image.height() as u64 * width as u64) as f64 / image.width() as f64)
        .round()
        .max(1.0) as u32;
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_png_round_trip() {
        let codec = RasterCodec::default();
        let image = solid(4, 3, [10, 20, 30, 255]);
        let bytes = codec.encode(&image, ImageFormat::Png).unwrap();
        assert_eq!(ImageFormat::sniff(&bytes), Some(ImageFormat::Png));
        assert_eq!(codec.decode(&bytes).unwrap(), image);
    }

    #[test]
    fn test_jpeg_encode() {
        let codec = RasterCodec::default();
        let bytes = codec
            .encode(&solid(16, 16, [200, 0, 0, 255]), ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(ImageFormat::sniff(&bytes), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = RasterCodec::default();
        assert!(matches!(
            codec.decode(b"definitely not an image"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_draw_rotated_half() {
        let codec = RasterCodec::default();
        // Left half red, right half blue
        let mut source = solid(2, 1, [255, 0, 0, 255]);
        source.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let mut canvas = solid(4, 1, [255, 255, 255, 255]);
        codec
            .draw(
                &source,
                &mut canvas,
                PixelRect::new(1, 0, 2, 1),
                Rotation::Half,
                PixelRect::full(&source),
            )
            .unwrap();
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(2, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_draw_rejects_crop_outside_source() {
        let codec = RasterCodec::default();
        let source = solid(4, 4, [0, 0, 0, 255]);
        let mut canvas = solid(8, 8, [255, 255, 255, 255]);
        let result = codec.draw(
            &source,
            &mut canvas,
            PixelRect::new(0, 0, 4, 4),
            Rotation::None,
            PixelRect::new(2, 2, 4, 4),
        );
        assert!(matches!(result, Err(CodecError::InvalidRegion(_))));
    }

    #[test]
    fn test_draw_clips_to_canvas() {
        let codec = RasterCodec::default();
        let source = solid(4, 4, [0, 0, 0, 255]);
        let mut canvas = solid(4, 4, [255, 255, 255, 255]);
        codec
            .draw(
                &source,
                &mut canvas,
                PixelRect::new(-2, -2, 4, 4),
                Rotation::None,
                PixelRect::full(&source),
            )
            .unwrap();
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }
}
