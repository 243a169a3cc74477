pub mod encoding;
pub mod idx;

pub use encoding::{image_to_row_matrix, label_to_one_hot, NUM_CLASSES};
pub use idx::{decode, Dataset, LabeledImage};
