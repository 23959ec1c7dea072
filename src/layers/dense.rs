use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::parameter::Parameter;
use crate::math::matrix::Matrix;

/// Fully connected layer over a batch: `a = act(X·W + b)`.
#[derive(Debug, Clone)]
pub struct Dense {
    pub weights: Parameter,
    pub biases: Parameter,
    pub activator: ActivationFunction,
    input: Option<Matrix>,
    // pre-activation values (z = XW + b) needed for the derivative
    pre_activation: Option<Matrix>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        name: &str,
        input_size: usize,
        size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        Dense {
            weights: Parameter::new(format!("{name}.weight"), Matrix::xavier(input_size, size, rng)),
            biases: Parameter::new(format!("{name}.bias"), Matrix::zeros(1, size)),
            activator: activation,
            input: None,
            pre_activation: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.value.rows
    }

    pub fn size(&self) -> usize {
        self.weights.value.cols
    }

    /// Forward pass; keeps the input and `z` for `backward`.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        if input.cols != self.input_size() {
            return Err(Error::Shape(format!(
                "{} expects {} input features, got {}",
                self.weights.name,
                self.input_size(),
                input.cols
            )));
        }
        let z = (input * &self.weights.value).add_row_broadcast(&self.biases.value);
        let a = z.map(|x| self.activator.function(x));
        self.input = Some(input.clone());
        self.pre_activation = Some(z);
        Ok(a)
    }

    /// Accumulates parameter gradients from `d_out` (∂L/∂a) and returns ∂L/∂X.
    pub fn backward(&mut self, d_out: &Matrix) -> Result<Matrix> {
        let (input, z) = match (self.input.take(), self.pre_activation.take()) {
            (Some(input), Some(z)) => (input, z),
            _ => {
                return Err(Error::Model(format!(
                    "{}: backward called without a preceding forward",
                    self.weights.name
                )))
            }
        };
        // δ = error ⊙ σ'(z)
        let delta = d_out.hadamard(&z.map(|x| self.activator.derivative(x)));

        self.weights.grad += &(&input.transpose() * &delta);
        self.biases.grad += &delta.column_sums();

        Ok(&delta * &self.weights.value.transpose())
    }

    pub fn parameters(&self) -> [&Parameter; 2] {
        [&self.weights, &self.biases]
    }

    pub fn parameters_mut(&mut self) -> [&mut Parameter; 2] {
        [&mut self.weights, &mut self.biases]
    }
}
