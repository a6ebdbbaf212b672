//! Image preprocessing for the floor-plan detection model

use anyhow::Result;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb};
use ndarray::Array4;

/// Mean pixel values subtracted before inference (RGB order), matching the
/// preprocessing the detection model was trained with.
pub const MEAN_PIXEL: [f32; 3] = [123.7, 116.8, 103.9];

/// Preprocess a decoded floor plan for the detection model.
///
/// Letterboxes the image into a square `input_size` canvas and produces a
/// mean-centered NCHW batch of one.
pub fn preprocess_for_detection(image: &DynamicImage, input_size: u32) -> Array4<f32> {
    let resized = resize_with_padding(image, input_size, input_size);
    image_to_nchw(&resized)
}

/// Resize with aspect ratio preservation, centering the result on a black
/// canvas of the target size.
fn resize_with_padding(image: &DynamicImage, target_w: u32, target_h: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();

    let scale = f32::min(
        target_w as f32 / orig_w as f32,
        target_h as f32 / orig_h as f32,
    );

    let new_w = (orig_w as f32 * scale) as u32;
    let new_h = (orig_h as f32 * scale) as u32;

    let resized = image.resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3);

    let mut padded = ImageBuffer::from_pixel(target_w, target_h, Rgb([0u8, 0, 0]));

    let offset_x = (target_w - new_w) / 2;
    let offset_y = (target_h - new_h) / 2;

    let rgb_image = resized.to_rgb8();
    for y in 0..new_h {
        for x in 0..new_w {
            let pixel = rgb_image.get_pixel(x, y);
            padded.put_pixel(x + offset_x, y + offset_y, *pixel);
        }
    }

    DynamicImage::ImageRgb8(padded)
}

/// Convert an image to a mean-centered NCHW tensor, RGB channel order.
fn image_to_nchw(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for y in 0..height {
        for x in 0..width {
            let pixel = rgb.get_pixel(x, y);
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 - MEAN_PIXEL[c];
            }
        }
    }

    tensor
}

/// Decode image bytes with EXIF orientation handling.
///
/// Conversion to RGB downstream drops any alpha channel and expands
/// grayscale, so callers see a uniform 3-channel view of the plan.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data)?;
    Ok(apply_exif_orientation(data, image))
}

/// Scanned plans photographed with a phone often carry an EXIF orientation
/// tag instead of rotated pixels.
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1) as u8,
        Err(_) => 1,
    };

    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Bookkeeping for mapping detections from model-input coordinates back to
/// the original image space.
pub struct ResizeInfo {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl ResizeInfo {
    pub fn new(original: (u32, u32), target: (u32, u32)) -> Self {
        let (orig_w, orig_h) = original;
        let (target_w, target_h) = target;

        let scale = f32::min(
            target_w as f32 / orig_w as f32,
            target_h as f32 / orig_h as f32,
        );

        let new_w = (orig_w as f32 * scale) as u32;
        let new_h = (orig_h as f32 * scale) as u32;

        Self {
            scale,
            offset_x: (target_w - new_w) / 2,
            offset_y: (target_h - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Convert model-input coordinates back to original image space.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let x = (x - self.offset_x as f32) / self.scale;
        let y = (y - self.offset_y as f32) / self.scale;
        (x, y)
    }
}
