/// Applies the reverse order exponential filter `y[t] = x[t] + decay * y[t + 1]`.
///
/// Equivalent to `y[t] = sum_k decay^k * x[t + k]` over the rest of the sequence.
///
/// # Arguments
/// * `xs` - The sequence to discount.
/// * `decay` - The discount factor.
///
/// # Returns
/// The discounted sequence, same length as `xs`.
pub fn discount(xs: &[f32], decay: f32) -> Vec<f32> {
    let mut out = vec![0.; xs.len()];
    let mut acc = 0.;

    for (y, &x) in out.iter_mut().zip(xs).rev() {
        acc = x + decay * acc;
        *y = acc;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_stay_zero() {
        for decay in [0., 0.5, 0.99, 1.] {
            for len in 1..8 {
                assert_eq!(discount(&vec![0.; len], decay), vec![0.; len]);
            }
        }
    }

    #[test]
    fn single_element_is_unchanged() {
        for decay in [0., 0.3, 0.99, 1., 2.] {
            assert_eq!(discount(&[-1.5], decay), [-1.5]);
        }
    }

    #[test]
    fn geometric_sum() {
        let ys = discount(&[1., 1., 1.], 0.5);
        assert_eq!(ys, [1.75, 1.5, 1.]);
    }

    #[test]
    fn empty() {
        assert!(discount(&[], 0.9).is_empty());
    }
}
