use crate::data::idx::LabeledImage;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Digit classes 0-9.
pub const NUM_CLASSES: usize = 10;

/// Flattens an image into a `1 × (rows * cols)` row vector in pixel order.
/// With `normalize`, each byte is divided by 255.
pub fn image_to_row_matrix(image: &LabeledImage, normalize: bool) -> Matrix {
    let data = image.pixels().iter()
        .map(|&px| if normalize { px as f32 / 255.0 } else { px as f32 })
        .collect();
    Matrix::row_vector(data)
}

/// `1 × num_classes` row with a single `1.0` at `label`.
pub fn label_to_one_hot(label: usize, num_classes: usize) -> Result<Matrix> {
    if label >= num_classes {
        return Err(Error::InvalidLabel { label, num_classes });
    }
    Ok(Matrix::from_fn(1, num_classes, |_, c| if c == label { 1.0 } else { 0.0 }))
}
