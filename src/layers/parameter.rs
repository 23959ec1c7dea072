use crate::math::matrix::Matrix;

/// A trainable tensor together with its accumulated gradient.
///
/// `group` indexes into the optimizer's parameter groups; every group carries
/// its own learning rate.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub value: Matrix,
    pub grad: Matrix,
    pub group: usize,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Matrix) -> Parameter {
        let grad = Matrix::zeros(value.rows, value.cols);
        Parameter {
            name: name.into(),
            value,
            grad,
            group: 0,
        }
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }
}
