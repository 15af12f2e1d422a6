use image::RgbImage;
use ndarray::Array5;

use crate::error::ChartError;

/// Stacks frames into a `[1, T, 3, H, W]` batch with channel-first pixels
/// scaled to `[0, 1]`.
pub fn images_to_tensor(images: &[RgbImage]) -> Result<Array5<f32>, ChartError> {
    let Some(first) = images.first() else {
        return Err(ChartError::InvalidConfig("no frames to stack".into()));
    };
    let (width, height) = first.dimensions();

    let mut tensor = Array5::<f32>::zeros((1, images.len(), 3, height as usize, width as usize));
    for (t, img) in images.iter().enumerate() {
        if img.dimensions() != (width, height) {
            return Err(ChartError::ShapeMismatch {
                index: t,
                width: img.width(),
                height: img.height(),
                expected_width: width,
                expected_height: height,
            });
        }
        for (x, y, pixel) in img.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, t, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
    }
    Ok(tensor)
}
