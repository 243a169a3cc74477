//! Decoding of the IDX image/label file pair used by MNIST.
//!
//! # Image file layout
//! ```text
//! bytes  0-3:   magic       (conventionally 0x00000803, not enforced)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # Label file layout
//! ```text
//! bytes  0-3:   magic       (conventionally 0x00000801, not enforced)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a digit in [0, 9]
//! ```
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};

use crate::data::encoding::{self, NUM_CLASSES};
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_MAGIC: u32 = 0x0000_0801;

const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

/// One decoded image and its digit label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledImage {
    rows: usize,
    cols: usize,
    pixels: Vec<u8>,
    label: u8,
}

impl LabeledImage {
    pub fn new(rows: usize, cols: usize, pixels: Vec<u8>, label: u8) -> Result<LabeledImage> {
        if pixels.len() != rows * cols {
            return Err(Error::MalformedDataset(format!(
                "image of {}x{} pixels needs {} bytes, got {}",
                rows, cols, rows * cols, pixels.len()
            )));
        }
        if label as usize >= NUM_CLASSES {
            return Err(Error::InvalidLabel { label: label as usize, num_classes: NUM_CLASSES });
        }
        Ok(LabeledImage { rows, cols, pixels, label })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Raw intensities, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn label(&self) -> u8 {
        self.label
    }

    /// Intensity at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if `x >= cols` or `y >= rows`.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        assert!(
            x < self.cols && y < self.rows,
            "pixel ({}, {}) out of bounds for {}x{} image",
            x, y, self.cols, self.rows
        );
        self.pixels[x + y * self.cols]
    }

    pub fn to_matrix(&self, normalize: bool) -> Matrix {
        encoding::image_to_row_matrix(self, normalize)
    }
}

/// Decoded dataset. Every image shares `image_rows × image_cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    image_magic: u32,
    label_magic: u32,
    image_rows: usize,
    image_cols: usize,
    images: Vec<LabeledImage>,
}

impl Dataset {
    /// Assembles a dataset from already-decoded samples, stamping the
    /// conventional magic numbers.
    pub fn new(image_rows: usize, image_cols: usize, images: Vec<LabeledImage>) -> Result<Dataset> {
        if let Some(bad) = images.iter().find(|img| img.rows != image_rows || img.cols != image_cols) {
            return Err(Error::MalformedDataset(format!(
                "image of {}x{} in a {}x{} dataset",
                bad.rows, bad.cols, image_rows, image_cols
            )));
        }
        Ok(Dataset {
            image_magic: IMAGE_MAGIC,
            label_magic: LABEL_MAGIC,
            image_rows,
            image_cols,
            images,
        })
    }

    pub fn image_rows(&self) -> usize {
        self.image_rows
    }

    pub fn image_cols(&self) -> usize {
        self.image_cols
    }

    pub fn image_magic(&self) -> u32 {
        self.image_magic
    }

    pub fn label_magic(&self) -> u32 {
        self.label_magic
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LabeledImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledImage> {
        self.images.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a LabeledImage;
    type IntoIter = std::slice::Iter<'a, LabeledImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

/// Decodes an image buffer and a label buffer into a `Dataset`.
///
/// Fails with `MalformedDataset` when either buffer is shorter than its
/// header declares, when the two counts disagree, or when a label is not a
/// digit. No partial dataset is ever returned.
pub fn decode(image_bytes: &[u8], label_bytes: &[u8]) -> Result<Dataset> {
    // ── Image header ───────────────────────────────────────────────────────

    let mut cursor = Cursor::new(image_bytes);
    let image_magic = read_be_u32(&mut cursor, "image", "magic number")?;
    let n_items = read_be_u32(&mut cursor, "image", "image count")? as usize;
    let rows = read_be_u32(&mut cursor, "image", "row count")? as usize;
    let cols = read_be_u32(&mut cursor, "image", "column count")? as usize;

    if image_magic != IMAGE_MAGIC {
        warn!("image file magic is {:#010x}, expected {:#010x}; decoding anyway", image_magic, IMAGE_MAGIC);
    }
    debug!("image header: magic={:#010x} count={} rows={} cols={}", image_magic, n_items, rows, cols);

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        Error::MalformedDataset(format!("rows * cols overflows (rows={}, cols={})", rows, cols))
    })?;
    let required_image_len = n_items
        .checked_mul(n_pixels)
        .and_then(|n| n.checked_add(IMAGE_HEADER_LEN))
        .ok_or_else(|| {
            Error::MalformedDataset(format!(
                "image data length overflows (count={}, pixels={})",
                n_items, n_pixels
            ))
        })?;

    if image_bytes.len() < required_image_len {
        return Err(Error::MalformedDataset(format!(
            "image file too short: header declares {} images of {}x{} pixels \
             ({} bytes needed), but buffer is only {} bytes",
            n_items, rows, cols, required_image_len, image_bytes.len()
        )));
    }

    // ── Label header ───────────────────────────────────────────────────────

    let mut cursor = Cursor::new(label_bytes);
    let label_magic = read_be_u32(&mut cursor, "label", "magic number")?;
    let label_count = read_be_u32(&mut cursor, "label", "item count")? as usize;

    if label_magic != LABEL_MAGIC {
        warn!("label file magic is {:#010x}, expected {:#010x}; decoding anyway", label_magic, LABEL_MAGIC);
    }
    debug!("label header: magic={:#010x} count={}", label_magic, label_count);

    if label_count != n_items {
        return Err(Error::MalformedDataset(format!(
            "image file declares {} items but label file declares {}",
            n_items, label_count
        )));
    }

    let required_label_len = LABEL_HEADER_LEN + n_items;
    if label_bytes.len() < required_label_len {
        return Err(Error::MalformedDataset(format!(
            "label file too short: header declares {} labels ({} bytes needed), \
             but buffer is only {} bytes",
            n_items, required_label_len, label_bytes.len()
        )));
    }

    // ── Records ────────────────────────────────────────────────────────────

    let pixel_data = &image_bytes[IMAGE_HEADER_LEN..required_image_len];
    let label_data = &label_bytes[LABEL_HEADER_LEN..required_label_len];

    let mut images = Vec::with_capacity(n_items);
    for (i, &label) in label_data.iter().enumerate() {
        if label as usize >= NUM_CLASSES {
            return Err(Error::MalformedDataset(format!(
                "label at index {} is {}, expected a digit in [0, 9]",
                i, label
            )));
        }
        let pixels = pixel_data[i * n_pixels..(i + 1) * n_pixels].to_vec();
        images.push(LabeledImage { rows, cols, pixels, label });
    }

    Ok(Dataset {
        image_magic,
        label_magic,
        image_rows: rows,
        image_cols: cols,
        images,
    })
}

fn read_be_u32(cursor: &mut Cursor<&[u8]>, file: &str, field: &str) -> Result<u32> {
    cursor.read_u32::<BigEndian>().map_err(|_| {
        Error::MalformedDataset(format!(
            "{} file too short: header ends before the {} field ({} bytes)",
            file, field, cursor.get_ref().len()
        ))
    })
}
