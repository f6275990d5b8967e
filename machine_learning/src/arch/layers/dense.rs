use ndarray::{linalg, prelude::*};

use crate::{Result, arch::activations::ActFn};

/// A fully connected layer acting on a single sample.
///
/// Its parameters are a contiguous slice holding the `(n, m)` weights in row major order followed
/// by the `m` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output sizes of the layer.
    /// * `act_fn` - An optional activation function applied to the output.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Computes the layer's output for `x`.
    ///
    /// # Arguments
    /// * `params` - The layer's parameters.
    /// * `x` - The input sample.
    ///
    /// # Returns
    /// The pre-activation `z` and the activated output `a`.
    pub fn forward(
        &self,
        params: &[f32],
        x: ArrayView1<f32>,
    ) -> Result<(Array1<f32>, Array1<f32>)> {
        let (w, b) = self.view_params(params)?;
        let z = x.dot(&w) + &b;

        let a = match self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        Ok((z, a))
    }

    /// Backpropagates the delta of the output through the layer.
    ///
    /// The gradient of the parameters is **accumulated** into `grad`.
    ///
    /// # Arguments
    /// * `params` - The layer's parameters.
    /// * `grad` - The layer's gradient slice.
    /// * `x` - The input used on the forward pass.
    /// * `z` - The pre-activation computed on the forward pass.
    /// * `d` - The derivative of the loss with respect to the layer's output.
    ///
    /// # Returns
    /// The derivative of the loss with respect to the layer's input.
    pub fn backward(
        &self,
        params: &[f32],
        grad: &mut [f32],
        x: ArrayView1<f32>,
        z: ArrayView1<f32>,
        mut d: Array1<f32>,
    ) -> Result<Array1<f32>> {
        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        let x_col = x.insert_axis(Axis(1));
        let d_row = d.view().insert_axis(Axis(0));
        linalg::general_mat_mul(1.0, &x_col, &d_row, 1.0, &mut dw);
        db += &d;

        let (w, _) = self.view_params(params)?;
        Ok(w.dot(&d))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size.min(grad.len()));
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size.min(params.len()));
        let weights = ArrayView2::from_shape(self.dim, w_raw)?;
        let biases = ArrayView1::from_shape(self.dim.1, b_raw)?;
        Ok((weights, biases))
    }
}
