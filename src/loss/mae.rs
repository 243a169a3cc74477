use crate::{error::Result, math::matrix::Matrix};

pub struct MaeLoss;

impl MaeLoss {
    /// Σ|expected - predicted| over one sample's output row.
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> Result<f32> {
        Ok(expected.subtract(predicted)?.absolute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn sums_absolute_differences() {
        let predicted = Matrix::row_vector(vec![0.25, 0.5, 0.25]);
        let expected = Matrix::row_vector(vec![0.0, 1.0, 0.0]);
        assert_eq!(MaeLoss::loss(&predicted, &expected).unwrap(), 1.0);
    }

    #[test]
    fn rejects_mismatched_rows() {
        let err = MaeLoss::loss(&Matrix::zeros(1, 3), &Matrix::zeros(1, 10)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
