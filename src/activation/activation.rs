#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFunction {
    ReLU,
    /// ReLU followed by dividing the whole row by its sum. The normalization
    /// is vector-valued, so `Layer::feed()` applies it after the element-wise
    /// ReLU.
    NormalizedReLU,
}

impl ActivationFunction {
    /// Element-wise part of the activation.
    pub fn function(&self, x: f32) -> f32 {
        if x > 0.0 { x } else { 0.0 }
    }

    /// Element-wise derivative w.r.t. the pre-activation.
    ///
    /// For `NormalizedReLU` the output delta is already `prediction - label`
    /// (computed by the network), so `1.0` passes it through unchanged.
    /// ReLU's derivative at exactly zero is zero.
    pub fn derivative(&self, x: f32) -> f32 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::NormalizedReLU => 1.0,
        }
    }

    /// Whether the layer should sum-normalize its output row.
    pub fn normalizes(&self) -> bool {
        matches!(self, ActivationFunction::NormalizedReLU)
    }
}
