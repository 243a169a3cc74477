use crate::{activation::activation::ActivationFunction, error::{Error, Result}, math::matrix::Matrix};

/// Fully connected layer: `a = f(x · W + b)` for a row vector `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    weights: Matrix,
    biases: Matrix,
    activator: ActivationFunction,
}

impl Layer {
    /// `weights` is `input_size × size`, `biases` must be `1 × size`.
    pub fn new(weights: Matrix, biases: Matrix, activation: ActivationFunction) -> Result<Layer> {
        if biases.shape() != (1, weights.cols()) {
            return Err(Error::DimensionMismatch {
                op: "layer biases",
                left: weights.shape(),
                right: biases.shape(),
            });
        }
        Ok(Layer { weights, biases, activator: activation })
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    pub fn size(&self) -> usize {
        self.weights.cols()
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    /// Returns `(z, a)`: the pre-activation and the activation.
    pub fn feed(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        let z = input.multiply(&self.weights)?.add(&self.biases)?;
        let mut a = z.map(|x| self.activator.function(x));
        if self.activator.normalizes() {
            a = a.softmax()?;
        }
        Ok((z, a))
    }

    /// Computes `(weights_grad, biases_grad)` for one sample.
    ///
    /// `delta` is the error in this layer's activation space, `z` the
    /// pre-activation stored by `feed`, `inputs` the row fed into the layer.
    pub fn compute_gradients(
        &self,
        delta: &Matrix,
        z: &Matrix,
        inputs: &Matrix,
    ) -> Result<(Matrix, Matrix)> {
        if delta.shape() != z.shape() {
            return Err(Error::DimensionMismatch {
                op: "layer delta",
                left: delta.shape(),
                right: z.shape(),
            });
        }
        // δ = error ⊙ f'(z)
        let layer_delta = delta.map_indexed(|r, c, v| v * self.activator.derivative(z.get(r, c)));

        let weights_grad = inputs.transpose().multiply(&layer_delta)?;
        Ok((weights_grad, layer_delta))
    }

    /// `W += dW · lr`, `b += db · lr`.
    pub fn apply_gradients(&mut self, weights_grad: &Matrix, biases_grad: &Matrix, lr: f32) -> Result<()> {
        let weights = self.weights.add(&weights_grad.scale(lr))?;
        let biases = self.biases.add(&biases_grad.scale(lr))?;
        self.weights = weights;
        self.biases = biases;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(activation: ActivationFunction) -> Layer {
        let weights = Matrix::new(2, 2, vec![1.0, -1.0, 2.0, 1.0]).unwrap();
        let biases = Matrix::new(1, 2, vec![0.5, 0.0]).unwrap();
        Layer::new(weights, biases, activation).unwrap()
    }

    #[test]
    fn feed_applies_affine_then_relu() {
        let input = Matrix::row_vector(vec![1.0, 1.0]);
        let (z, a) = layer(ActivationFunction::ReLU).feed(&input).unwrap();
        assert_eq!(z.data(), &[3.5, 0.0]);
        assert_eq!(a.data(), &[3.5, 0.0]);

        let input = Matrix::row_vector(vec![1.0, -1.0]);
        let (z, a) = layer(ActivationFunction::ReLU).feed(&input).unwrap();
        assert_eq!(z.data(), &[-0.5, -2.0]);
        assert_eq!(a.data(), &[0.0, 0.0]);
    }

    #[test]
    fn feed_normalizes_output_layer() {
        let input = Matrix::row_vector(vec![1.0, 2.0]);
        let (_, a) = layer(ActivationFunction::NormalizedReLU).feed(&input).unwrap();
        // z = [5.5, 1.0]
        assert_eq!(a.data(), &[5.5 / 6.5, 1.0 / 6.5]);
    }

    #[test]
    fn feed_rejects_wrong_input_width() {
        let input = Matrix::row_vector(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            layer(ActivationFunction::ReLU).feed(&input),
            Err(Error::DimensionMismatch { op: "multiply", .. })
        ));
    }

    #[test]
    fn new_rejects_mismatched_biases() {
        let err = Layer::new(Matrix::zeros(3, 2), Matrix::zeros(1, 3), ActivationFunction::ReLU);
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn apply_gradients_adds_scaled_step() {
        let mut l = layer(ActivationFunction::ReLU);
        let ones = Matrix::from_fn(2, 2, |_, _| 1.0);
        l.apply_gradients(&ones, &Matrix::row_vector(vec![2.0, 2.0]), 0.5).unwrap();
        assert_eq!(l.weights().data(), &[1.5, -0.5, 2.5, 1.5]);
        assert_eq!(l.biases().data(), &[1.5, 1.0]);
    }
}
