use ndarray::{Array1, Array2, Array3, ArrayView3, Axis, s};

/// Turns a raw environment observation into the network's flat input vector.
pub trait Preprocess<O> {
    /// Transforms a single observation.
    fn apply(&self, obs: &O) -> Array1<f32>;
}

/// Passes vector observations through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Preprocess<Array1<f32>> for Identity {
    fn apply(&self, obs: &Array1<f32>) -> Array1<f32> {
        obs.clone()
    }
}

impl Preprocess<Vec<f32>> for Identity {
    fn apply(&self, obs: &Vec<f32>) -> Array1<f32> {
        Array1::from(obs.clone())
    }
}

/// Crops, grays out, downsamples and normalizes `(height, width, channels)` `u8` frames.
#[derive(Debug, Clone, Copy)]
pub struct FramePreprocessor {
    top: usize,
    bottom: usize,
    out: (usize, usize),
}

impl Default for FramePreprocessor {
    /// Keeps rows `35..195` of the frame and resizes it to `80x80`.
    fn default() -> Self {
        Self::new(35, 195, (80, 80))
    }
}

impl FramePreprocessor {
    /// Creates a new `FramePreprocessor`.
    ///
    /// # Arguments
    /// * `top` - The first row kept.
    /// * `bottom` - One past the last row kept.
    /// * `out` - The `(rows, cols)` of the output image.
    ///
    /// # Returns
    /// A new `FramePreprocessor` instance.
    pub fn new(top: usize, bottom: usize, out: (usize, usize)) -> Self {
        Self { top, bottom, out }
    }

    /// The length of the flattened output.
    pub fn size(&self) -> usize {
        self.out.0 * self.out.1
    }

    /// Applies the transform to a borrowed frame.
    pub fn frame(&self, frame: ArrayView3<u8>) -> Array1<f32> {
        let (height, width, _) = frame.dim();
        let bottom = self.bottom.min(height);
        let top = self.top.min(bottom);

        let gray = frame
            .slice(s![top..bottom, .., ..])
            .mapv(f32::from)
            .mean_axis(Axis(2))
            .unwrap_or_else(|| Array2::zeros((bottom - top, width)));

        let resized = resize_bilinear(&gray, self.out);
        resized
            .into_shape_with_order(self.size())
            .map(|flat| flat / 255.)
            .unwrap_or_else(|_| Array1::zeros(self.size()))
    }
}

impl Preprocess<Array3<u8>> for FramePreprocessor {
    fn apply(&self, obs: &Array3<u8>) -> Array1<f32> {
        self.frame(obs.view())
    }
}

/// Resizes a single channel image with bilinear interpolation using half-pixel centers.
fn resize_bilinear(img: &Array2<f32>, (rows, cols): (usize, usize)) -> Array2<f32> {
    let (h, w) = img.dim();
    if h == 0 || w == 0 {
        return Array2::zeros((rows, cols));
    }

    let sample = |dst: usize, src_len: usize, dst_len: usize| {
        let scale = src_len as f32 / dst_len as f32;
        let x = ((dst as f32 + 0.5) * scale - 0.5).clamp(0., (src_len - 1) as f32);
        let lo = x.floor() as usize;
        let hi = (lo + 1).min(src_len - 1);
        (lo, hi, x - lo as f32)
    };

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let (r0, r1, dr) = sample(r, h, rows);
        let (c0, c1, dc) = sample(c, w, cols);

        let top = img[(r0, c0)] * (1. - dc) + img[(r0, c1)] * dc;
        let bottom = img[(r1, c0)] * (1. - dc) + img[(r1, c1)] * dc;
        top * (1. - dr) + bottom * dr
    })
}
