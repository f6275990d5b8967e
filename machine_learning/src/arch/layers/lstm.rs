use ndarray::{concatenate, linalg, prelude::*};

use crate::{
    Result,
    arch::activations::{Sigmoid, Tanh},
};

/// Everything a single `LstmCell::forward` call needs to remember for its backward pass.
#[derive(Debug, Clone)]
pub struct LstmCache {
    x: Array1<f32>,
    h_prev: Array1<f32>,
    c_prev: Array1<f32>,
    i: Array1<f32>,
    f: Array1<f32>,
    g: Array1<f32>,
    o: Array1<f32>,
    tanh_c: Array1<f32>,
}

/// A long short-term memory cell.
///
/// The parameters are a contiguous slice with the `(n, 4h)` input weights, the `(h, 4h)`
/// recurrent weights and the `4h` biases. The gates are stacked in input, forget, cell, output
/// order.
#[derive(Debug, Clone)]
pub struct LstmCell {
    input: usize,
    hidden: usize,
    size: usize,
}

impl LstmCell {
    /// Creates a new `LstmCell`.
    ///
    /// # Arguments
    /// * `input` - The size of the input vector.
    /// * `hidden` - The size of the hidden and cell states.
    ///
    /// # Returns
    /// A new `LstmCell` instance.
    pub fn new(input: usize, hidden: usize) -> Self {
        Self {
            input,
            hidden,
            size: (input + hidden + 1) * 4 * hidden,
        }
    }

    /// Returns the amount of parameters this cell has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    /// Advances the cell one step.
    ///
    /// # Arguments
    /// * `params` - The cell's parameters.
    /// * `x` - The input vector.
    /// * `h` - The previous hidden state.
    /// * `c` - The previous cell state.
    ///
    /// # Returns
    /// The new hidden state, the new cell state and the cache for the backward pass.
    pub fn forward(
        &self,
        params: &[f32],
        x: ArrayView1<f32>,
        h: ArrayView1<f32>,
        c: ArrayView1<f32>,
    ) -> Result<(Array1<f32>, Array1<f32>, LstmCache)> {
        let (w_ih, w_hh, b) = self.view_params(params)?;
        let n = self.hidden;

        let z = x.dot(&w_ih) + h.dot(&w_hh) + &b;
        let i = z.slice(s![0..n]).mapv(|z| Sigmoid.f(z));
        let f = z.slice(s![n..2 * n]).mapv(|z| Sigmoid.f(z));
        let g = z.slice(s![2 * n..3 * n]).mapv(|z| Tanh.f(z));
        let o = z.slice(s![3 * n..4 * n]).mapv(|z| Sigmoid.f(z));

        let c_new = &f * &c + &i * &g;
        let tanh_c = c_new.mapv(f32::tanh);
        let h_new = &o * &tanh_c;

        let cache = LstmCache {
            x: x.to_owned(),
            h_prev: h.to_owned(),
            c_prev: c.to_owned(),
            i,
            f,
            g,
            o,
            tanh_c,
        };

        Ok((h_new, c_new, cache))
    }

    /// Backpropagates one step through the cell, **accumulating** into `grad`.
    ///
    /// # Arguments
    /// * `params` - The cell's parameters.
    /// * `grad` - The cell's gradient slice.
    /// * `cache` - The cache produced by the matching forward step.
    /// * `dh` - The derivative of the loss with respect to this step's hidden state.
    /// * `dc_next` - The derivative flowing back into this step's cell state from the next step.
    ///
    /// # Returns
    /// The derivatives with respect to the input, the previous hidden state and the previous
    /// cell state.
    pub fn backward(
        &self,
        params: &[f32],
        grad: &mut [f32],
        cache: &LstmCache,
        dh: ArrayView1<f32>,
        dc_next: ArrayView1<f32>,
    ) -> Result<(Array1<f32>, Array1<f32>, Array1<f32>)> {
        let LstmCache {
            x,
            h_prev,
            c_prev,
            i,
            f,
            g,
            o,
            tanh_c,
        } = cache;

        let dc = &dh * o * &tanh_c.mapv(|t| 1. - t * t) + &dc_next;
        let d_o = &dh * tanh_c;
        let d_i = &dc * g;
        let d_g = &dc * i;
        let d_f = &dc * c_prev;
        let dc_prev = &dc * f;

        let dz = concatenate(
            Axis(0),
            &[
                (&d_i * &i.mapv(|s| s * (1. - s))).view(),
                (&d_f * &f.mapv(|s| s * (1. - s))).view(),
                (&d_g * &g.mapv(|t| 1. - t * t)).view(),
                (&d_o * &o.mapv(|s| s * (1. - s))).view(),
            ],
        )?;

        let (mut dw_ih, mut dw_hh, mut db) = self.view_grad(grad)?;
        let dz_row = dz.view().insert_axis(Axis(0));
        linalg::general_mat_mul(1.0, &x.view().insert_axis(Axis(1)), &dz_row, 1.0, &mut dw_ih);
        linalg::general_mat_mul(
            1.0,
            &h_prev.view().insert_axis(Axis(1)),
            &dz_row,
            1.0,
            &mut dw_hh,
        );
        db += &dz;

        let (w_ih, w_hh, _) = self.view_params(params)?;
        Ok((w_ih.dot(&dz), w_hh.dot(&dz), dc_prev))
    }

    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let gates = 4 * self.hidden;
        let (w_ih, rest) = params.split_at((self.input * gates).min(params.len()));
        let (w_hh, b) = rest.split_at((self.hidden * gates).min(rest.len()));

        Ok((
            ArrayView2::from_shape((self.input, gates), w_ih)?,
            ArrayView2::from_shape((self.hidden, gates), w_hh)?,
            ArrayView1::from_shape(gates, b)?,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(
        ArrayViewMut2<'a, f32>,
        ArrayViewMut2<'a, f32>,
        ArrayViewMut1<'a, f32>,
    )> {
        let gates = 4 * self.hidden;
        let ih_len = (self.input * gates).min(grad.len());
        let (dw_ih, rest) = grad.split_at_mut(ih_len);
        let hh_len = (self.hidden * gates).min(rest.len());
        let (dw_hh, db) = rest.split_at_mut(hh_len);

        Ok((
            ArrayViewMut2::from_shape((self.input, gates), dw_ih)?,
            ArrayViewMut2::from_shape((self.hidden, gates), dw_hh)?,
            ArrayViewMut1::from_shape(gates, db)?,
        ))
    }
}
