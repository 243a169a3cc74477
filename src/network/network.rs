use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    data::{encoding::{label_to_one_hot, NUM_CLASSES}, idx::Dataset},
    error::{Error, Result},
    layers::dense::Layer,
    loss::mae::MaeLoss,
    math::matrix::Matrix,
    train::{self, EpochStats, TrainConfig},
};

/// 28×28 pixels.
pub const INPUT_SIZE: usize = 784;
pub const DEFAULT_HIDDEN_SIZE: usize = 150;
pub const OUTPUT_SIZE: usize = NUM_CLASSES;
pub const DEFAULT_LEARNING_RATE: f32 = 0.0005;

/// How fresh parameters are drawn. `Uniform` samples weights and biases
/// from `[0, 1)`; `He` samples He-normal weights and zeroes the biases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    Uniform,
    He,
}

/// Everything the backward pass needs from a forward pass.
///
/// `z_values[i]` is layer `i`'s pre-activation, `activations[0]` is the
/// input and `activations[i + 1]` layer `i`'s output.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    pub z_values: Vec<Matrix>,
    pub activations: Vec<Matrix>,
}

impl ForwardPass {
    /// The normalized output row.
    pub fn prediction(&self) -> &Matrix {
        &self.activations[self.activations.len() - 1]
    }
}

/// Per-layer gradients, index-aligned with the network's layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub weights: Vec<Matrix>,
    pub biases: Vec<Matrix>,
}

/// input → hidden (ReLU) → output (ReLU, then sum-normalized).
///
/// The only long-lived mutable state in the crate. Training takes
/// `&mut self`, evaluation `&self`, so the borrow checker keeps an
/// evaluation from observing a half-finished epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedforwardNetwork {
    layers: [Layer; 2],
}

impl FeedforwardNetwork {
    /// Random uniform `[0, 1)` weights and biases from the thread RNG.
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> FeedforwardNetwork {
        FeedforwardNetwork::with_rng(
            input_size,
            hidden_size,
            output_size,
            Initialization::Uniform,
            &mut rand::thread_rng(),
        )
    }

    pub fn with_rng<R: Rng>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        init: Initialization,
        rng: &mut R,
    ) -> FeedforwardNetwork {
        let mut draw = |rows: usize, cols: usize, bias: bool| match init {
            Initialization::Uniform => Matrix::random(rows, cols, &mut *rng),
            Initialization::He if bias => Matrix::zeros(rows, cols),
            Initialization::He => Matrix::he(rows, cols, &mut *rng),
        };
        let weights = [
            draw(input_size, hidden_size, false),
            draw(hidden_size, output_size, false),
        ];
        let biases = [draw(1, hidden_size, true), draw(1, output_size, true)];
        FeedforwardNetwork::assemble(weights, biases)
    }

    /// All parameters zero. Every output is then `1 / output_size`.
    pub fn zeroed(input_size: usize, hidden_size: usize, output_size: usize) -> FeedforwardNetwork {
        FeedforwardNetwork::assemble(
            [Matrix::zeros(input_size, hidden_size), Matrix::zeros(hidden_size, output_size)],
            [Matrix::zeros(1, hidden_size), Matrix::zeros(1, output_size)],
        )
    }

    /// Builds a network from explicit parameters, checking
    /// `weights[0].cols == weights[1].rows` and `biases[i] == 1 × weights[i].cols`.
    pub fn from_parameters(weights: [Matrix; 2], biases: [Matrix; 2]) -> Result<FeedforwardNetwork> {
        let [w0, w1] = weights;
        let [b0, b1] = biases;
        if w0.cols() != w1.rows() {
            return Err(Error::DimensionMismatch {
                op: "hidden layer",
                left: w0.shape(),
                right: w1.shape(),
            });
        }
        Ok(FeedforwardNetwork {
            layers: [
                Layer::new(w0, b0, ActivationFunction::ReLU)?,
                Layer::new(w1, b1, ActivationFunction::NormalizedReLU)?,
            ],
        })
    }

    /// Shapes are correct by construction here.
    fn assemble(weights: [Matrix; 2], biases: [Matrix; 2]) -> FeedforwardNetwork {
        match FeedforwardNetwork::from_parameters(weights, biases) {
            Ok(network) => network,
            Err(e) => unreachable!("generated parameters have consistent shapes: {}", e),
        }
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn hidden_size(&self) -> usize {
        self.layers[0].size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[1].size()
    }

    pub fn weights(&self) -> [&Matrix; 2] {
        [self.layers[0].weights(), self.layers[1].weights()]
    }

    pub fn biases(&self) -> [&Matrix; 2] {
        [self.layers[0].biases(), self.layers[1].biases()]
    }

    /// Forward pass for a `1 × input_size` row.
    pub fn forward(&self, input: &Matrix) -> Result<ForwardPass> {
        if input.shape() != (1, self.input_size()) {
            return Err(Error::DimensionMismatch {
                op: "forward",
                left: input.shape(),
                right: (1, self.input_size()),
            });
        }

        let mut z_values = Vec::with_capacity(self.layers.len());
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.clone());
        for layer in &self.layers {
            let (z, a) = layer.feed(&activations[activations.len() - 1])?;
            z_values.push(z);
            activations.push(a);
        }
        Ok(ForwardPass { z_values, activations })
    }

    /// Backpropagation for one sample.
    ///
    /// The output delta is taken as `prediction - label` directly; the
    /// normalization's Jacobian is not applied.
    pub fn backward(&self, pass: &ForwardPass, label: &Matrix) -> Result<Gradients> {
        let n = self.layers.len();
        if pass.z_values.len() != n || pass.activations.len() != n + 1 {
            return Err(Error::DimensionMismatch {
                op: "backward",
                left: (pass.z_values.len(), pass.activations.len()),
                right: (n, n + 1),
            });
        }

        let mut weights = Vec::with_capacity(n);
        let mut biases = Vec::with_capacity(n);

        // ∂L/∂a of the output layer
        let mut delta = pass.prediction().subtract(label)?;
        for i in (0..n).rev() {
            let (w_grad, b_grad) = self.layers[i].compute_gradients(
                &delta,
                &pass.z_values[i],
                &pass.activations[i],
            )?;

            if i > 0 {
                delta = b_grad.multiply(&self.layers[i].weights().transpose())?;
            }

            weights.push(w_grad);
            biases.push(b_grad);
        }

        weights.reverse();
        biases.reverse();
        Ok(Gradients { weights, biases })
    }

    /// `weights[i] += dWeights[i] * learning_rate`, likewise for biases.
    pub fn update(&mut self, gradients: &Gradients, learning_rate: f32) -> Result<()> {
        let n = self.layers.len();
        if gradients.weights.len() != n || gradients.biases.len() != n {
            return Err(Error::DimensionMismatch {
                op: "update",
                left: (gradients.weights.len(), gradients.biases.len()),
                right: (n, n),
            });
        }
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.apply_gradients(&gradients.weights[i], &gradients.biases[i], learning_rate)?;
        }
        Ok(())
    }

    /// Forward, backward and update on one sample. Returns the prediction
    /// made before the update.
    pub fn train_one_sample(&mut self, image: &Matrix, label: &Matrix, learning_rate: f32) -> Result<Matrix> {
        let pass = self.forward(image)?;
        let gradients = self.backward(&pass, label)?;
        self.update(&gradients, learning_rate)?;
        let ForwardPass { mut activations, .. } = pass;
        Ok(activations.pop().unwrap_or_default())
    }

    /// Index of the most likely digit.
    pub fn predict(&self, image: &Matrix) -> Result<usize> {
        let pass = self.forward(image)?;
        Ok(pass.prediction().argmax().unwrap_or(0))
    }

    /// One pass over `dataset` in stored order; see `train::run_epoch`.
    pub fn run_epoch<P>(&mut self, dataset: &Dataset, config: &TrainConfig, progress: P) -> Result<EpochStats>
    where
        P: FnMut(f32),
    {
        train::run_epoch(self, dataset, config, progress)
    }

    /// `config.epochs` epochs; see `train::train`.
    pub fn train<P, F>(
        &mut self,
        dataset: &Dataset,
        config: &TrainConfig,
        progress: P,
        epoch_finish: F,
    ) -> Result<Vec<EpochStats>>
    where
        P: FnMut(f32),
        F: FnMut(usize),
    {
        train::train(self, dataset, config, progress, epoch_finish)
    }

    /// Mean over the dataset of `Σ|one_hot(label) - prediction|`, forward
    /// only. An empty dataset scores `0.0`.
    ///
    /// `normalize` must match the encoding the network was trained with
    /// (`TrainConfig::normalize`).
    pub fn evaluate_mean_absolute_error(&self, dataset: &Dataset, normalize: bool) -> Result<f32> {
        if dataset.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for sample in dataset {
            let pass = self.forward(&sample.to_matrix(normalize))?;
            let label = label_to_one_hot(sample.label() as usize, self.output_size())?;
            total += MaeLoss::loss(pass.prediction(), &label)?;
        }
        Ok(total / dataset.len() as f32)
    }

    /// Fraction of samples whose argmax matches the label. `normalize` as
    /// in `evaluate_mean_absolute_error`.
    pub fn accuracy(&self, dataset: &Dataset, normalize: bool) -> Result<f32> {
        if dataset.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for sample in dataset {
            if self.predict(&sample.to_matrix(normalize))? == sample.label() as usize {
                correct += 1;
            }
        }
        Ok(correct as f32 / dataset.len() as f32)
    }
}
