/// Yields the initial values of a model's parameters, tensor after tensor in layout order.
pub trait ParamGen {
    /// Samples at most `n` parameters.
    ///
    /// # Arguments
    /// * `n` - The upper limit of samples to generate.
    ///
    /// # Returns
    /// The samples or `None` once the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;

    /// Samples a whole tensor of `n` parameters.
    ///
    /// # Returns
    /// The samples or `None` if the generator ran out before `n` of them.
    fn sample_exact(&mut self, n: usize) -> Option<Vec<f32>> {
        self.sample(n).filter(|sample| sample.len() == n)
    }
}
