use rand::Rng;
use std::f32::consts::PI;
use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};

/// Dense 2-D matrix of `f32` stored row-major in one flat buffer.
///
/// Element `(r, c)` lives at `data[c + r * cols]`. Every operation returns a
/// fresh matrix; nothing mutates `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Wraps an existing row-major buffer. Fails with `DimensionMismatch`
    /// unless `data.len() == rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Matrix> {
        if data.len() != rows * cols {
            return Err(Error::DimensionMismatch {
                op: "new",
                left: (rows, cols),
                right: (1, data.len()),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix by evaluating `init(row, col)` at every position.
    pub fn from_fn<F>(rows: usize, cols: usize, init: F) -> Matrix
    where
        F: Fn(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(init(r, c));
            }
        }
        Matrix { rows, cols, data }
    }

    /// A `1 × data.len()` row vector.
    pub fn row_vector(data: Vec<f32>) -> Matrix {
        Matrix { rows: 1, cols: data.len(), data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix { rows, cols, data: vec![0.0; rows * cols] }
    }

    pub fn identity(size: usize) -> Matrix {
        Matrix::from_fn(size, size, |r, c| if r == c { 1.0 } else { 0.0 })
    }

    /// Uniform samples from `[0, 1)`.
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::zeros(rows, cols).map_with_rng(rng, |rng| rng.gen::<f32>())
    }

    /// He initialization: samples from N(0, sqrt(2 / rows)).
    ///
    /// The weight matrices here are `fan_in × fan_out`, so `rows` is the
    /// fan-in.
    pub fn he<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let std_dev = (2.0 / rows.max(1) as f32).sqrt();
        Matrix::zeros(rows, cols)
            .map_with_rng(rng, |rng| Matrix::sample_standard_normal(rng) * std_dev)
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng>(rng: &mut R) -> f32 {
        // (0, 1] so the log never sees zero.
        let u1: f32 = 1.0 - rng.gen::<f32>();
        let u2: f32 = 1.0 - rng.gen::<f32>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn map_with_rng<R, F>(mut self, rng: &mut R, mut sample: F) -> Matrix
    where
        R: Rng,
        F: FnMut(&mut R) -> f32,
    {
        for value in self.data.iter_mut() {
            *value = sample(rng);
        }
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The row-major backing buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// # Panics
    /// Panics if `row >= rows` or `col >= cols`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row, col, self.rows, self.cols
        );
        self.data[col + row * self.cols]
    }

    /// Combines two same-shape matrices element by element.
    pub fn elementwise<F>(&self, other: &Matrix, op: F) -> Result<Matrix>
    where
        F: Fn(f32, f32) -> f32,
    {
        self.zip_with(other, "elementwise", op)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    fn zip_with<F>(&self, other: &Matrix, op_name: &'static str, op: F) -> Result<Matrix>
    where
        F: Fn(f32, f32) -> f32,
    {
        if self.shape() != other.shape() {
            return Err(Error::DimensionMismatch {
                op: op_name,
                left: self.shape(),
                right: other.shape(),
            });
        }
        let data = self.data.iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| op(a, b))
            .collect();
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }

    pub fn scale(&self, scalar: f32) -> Matrix {
        self.map(|x| x * scalar)
    }

    /// Matrix product. Requires `self.cols == other.rows`; the result is
    /// `self.rows × other.cols`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::DimensionMismatch {
                op: "multiply",
                left: self.shape(),
                right: other.shape(),
            });
        }

        let mut data = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.data[k + i * self.cols] * other.data[j + k * other.cols];
                }
                data[j + i * other.cols] = sum;
            }
        }

        Ok(Matrix { rows: self.rows, cols: other.cols, data })
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::from_fn(self.cols, self.rows, |r, c| self.data[r + c * self.cols])
    }

    pub fn map<F>(&self, f: F) -> Matrix
    where
        F: Fn(f32) -> f32,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Like `map`, but `f` also receives `(row, col)`.
    pub fn map_indexed<F>(&self, f: F) -> Matrix
    where
        F: Fn(usize, usize, f32) -> f32,
    {
        Matrix::from_fn(self.rows, self.cols, |r, c| f(r, c, self.data[c + r * self.cols]))
    }

    /// Determinant by cofactor expansion along the first row.
    ///
    /// Runs in factorial time; fine up to roughly 6x6 and unusable beyond.
    pub fn determinant(&self) -> Result<f32> {
        self.require_square("determinant")?;
        Ok(self.cofactor_determinant())
    }

    /// Inverse via the adjugate. Fails with `Singular` when the determinant
    /// is exactly zero. Same complexity ceiling as `determinant`.
    pub fn inverse(&self) -> Result<Matrix> {
        self.require_square("inverse")?;
        let det = self.cofactor_determinant();
        if det == 0.0 {
            return Err(Error::Singular);
        }

        match self.rows {
            1 => Ok(Matrix::row_vector(vec![1.0 / det])),
            2 => {
                let (a, b, c, d) = (self.data[0], self.data[1], self.data[2], self.data[3]);
                Ok(Matrix {
                    rows: 2,
                    cols: 2,
                    data: vec![d / det, -b / det, -c / det, a / det],
                })
            }
            n => {
                let cofactors = Matrix::from_fn(n, n, |r, c| self.cofactor(r, c));
                Ok(cofactors.transpose().scale(1.0 / det))
            }
        }
    }

    fn require_square(&self, op: &'static str) -> Result<()> {
        if self.rows != self.cols {
            return Err(Error::DimensionMismatch {
                op,
                left: self.shape(),
                right: (self.rows, self.rows),
            });
        }
        Ok(())
    }

    fn cofactor_determinant(&self) -> f32 {
        match self.rows {
            0 => 1.0,
            1 => self.data[0],
            2 => self.data[0] * self.data[3] - self.data[1] * self.data[2],
            _ => (0..self.cols)
                .map(|col| self.data[col] * self.cofactor(0, col))
                .sum(),
        }
    }

    fn cofactor(&self, row: usize, col: usize) -> f32 {
        let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.minor(row, col).cofactor_determinant()
    }

    /// `self` with `row` and `col` removed.
    fn minor(&self, row: usize, col: usize) -> Matrix {
        let data = (0..self.rows)
            .filter(|&r| r != row)
            .flat_map(|r| {
                (0..self.cols)
                    .filter(move |&c| c != col)
                    .map(move |c| self.data[c + r * self.cols])
            })
            .collect();
        Matrix { rows: self.rows - 1, cols: self.cols - 1, data }
    }

    /// Normalizes a row vector by its plain sum: `x[i] / Σx`.
    ///
    /// No exponential is applied, so this is not textbook softmax. A row
    /// summing to exactly zero yields the uniform row `1 / cols`.
    pub fn softmax(&self) -> Result<Matrix> {
        if self.rows != 1 {
            return Err(Error::DimensionMismatch {
                op: "softmax",
                left: self.shape(),
                right: (1, self.cols),
            });
        }

        let total: f32 = self.data.iter().sum();
        if total == 0.0 {
            let uniform = 1.0 / self.cols as f32;
            return Ok(self.map(|_| uniform));
        }
        Ok(self.map(|x| x / total))
    }

    /// Sum of the absolute values of every element.
    pub fn absolute(&self) -> f32 {
        self.data.iter().map(|x| x.abs()).sum()
    }

    /// Flat index of the largest element; the first one wins on ties.
    pub fn argmax(&self) -> Option<usize> {
        self.data.iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &x)| match best {
                Some((_, b)) if b >= x => best,
                _ => Some((i, x)),
            })
            .map(|(i, _)| i)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::zeros(0, 0)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[col + row * self.cols]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:6.2}", self.data[c + r * self.cols])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
