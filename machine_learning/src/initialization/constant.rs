use super::ParamGen;

/// A parameter generator that always generates the same value.
///
/// Constant networks have hand-computable outputs, an all zero policy net predicts a uniform
/// policy and a zero value.
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    /// * `limit` - The maximum amount of times to generate that value.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }

    /// Creates a generator of `limit` zeros.
    pub fn zeros(limit: usize) -> Self {
        Self::new(0., limit)
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;
        Some(vec![self.value; n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial() {
        let mut param_gen = ConstParamGen::new(1., 10);

        let sample = param_gen.sample(7).unwrap();
        assert_eq!(sample, vec![1.; 7]);

        let sample = param_gen.sample(7).unwrap();
        assert_eq!(sample, vec![1.; 3]);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn exact_tensors() {
        let mut param_gen = ConstParamGen::zeros(5);

        assert_eq!(param_gen.sample_exact(3), Some(vec![0.; 3]));
        assert_eq!(param_gen.sample_exact(3), None);
    }
}
