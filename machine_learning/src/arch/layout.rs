use std::ops::Range;

use crate::{MlErr, Result};

/// A named tensor living inside a flat parameter vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    name: String,
    shape: Vec<usize>,
    offset: usize,
}

impl TensorSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the amount of scalars in this tensor.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The range this tensor occupies in the flat parameter vector.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// The ordered list of tensors a model's flat parameter vector is made of.
///
/// Every shared structure keyed by parameter (gradient slots, optimizer moments, checkpoint
/// files) follows this ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamLayout {
    tensors: Vec<TensorSpec>,
    size: usize,
}

impl ParamLayout {
    /// Creates a new empty `ParamLayout`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tensor at the end of the layout.
    ///
    /// # Arguments
    /// * `name` - The unique name of the tensor.
    /// * `shape` - The tensor's dimensions.
    ///
    /// # Returns
    /// The range the tensor occupies in the flat parameter vector.
    pub fn push(&mut self, name: impl Into<String>, shape: &[usize]) -> Range<usize> {
        let spec = TensorSpec {
            name: name.into(),
            shape: shape.to_vec(),
            offset: self.size,
        };

        self.size += spec.len();
        let range = spec.range();
        self.tensors.push(spec);
        range
    }

    /// Returns the total amount of parameters.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn tensors(&self) -> &[TensorSpec] {
        &self.tensors
    }

    /// Looks up a tensor by name.
    pub fn get(&self, name: &str) -> Option<&TensorSpec> {
        self.tensors.iter().find(|t| t.name == name)
    }

    /// Splits a flat buffer into one slice per tensor.
    ///
    /// # Arguments
    /// * `flat` - A buffer the size of the layout.
    ///
    /// # Returns
    /// The per tensor slices or a size mismatch error.
    pub fn split<'a>(&self, flat: &'a [f32]) -> Result<Vec<&'a [f32]>> {
        self.check(flat.len())?;
        Ok(self.tensors.iter().map(|t| &flat[t.range()]).collect())
    }

    /// Splits a flat mutable buffer into one slice per tensor.
    pub fn split_mut<'a>(&self, mut flat: &'a mut [f32]) -> Result<Vec<&'a mut [f32]>> {
        self.check(flat.len())?;

        let mut chunks = Vec::with_capacity(self.tensors.len());
        for tensor in &self.tensors {
            let chunk;
            (chunk, flat) = flat.split_at_mut(tensor.len());
            chunks.push(chunk);
        }

        Ok(chunks)
    }

    fn check(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(MlErr::SizeMismatch {
                what: "parameter buffer",
                got: len,
                expected: self.size,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_insertion_order() {
        let mut layout = ParamLayout::new();
        assert_eq!(layout.push("a", &[2, 3]), 0..6);
        assert_eq!(layout.push("b", &[3]), 6..9);
        assert_eq!(layout.push("c", &[1, 1]), 9..10);

        assert_eq!(layout.size(), 10);
        assert_eq!(layout.get("b").unwrap().shape(), [3]);
        assert!(layout.get("d").is_none());
    }

    #[test]
    fn split_mut() {
        let mut layout = ParamLayout::new();
        layout.push("a", &[2]);
        layout.push("b", &[3]);

        let mut flat: Vec<f32> = (0..5).map(|i| i as f32).collect();
        let chunks = layout.split_mut(&mut flat).unwrap();

        assert_eq!(chunks[0], [0., 1.]);
        assert_eq!(chunks[1], [2., 3., 4.]);
    }

    #[test]
    fn split_size_mismatch() {
        let mut layout = ParamLayout::new();
        layout.push("a", &[2]);

        let flat = [0.; 3];
        assert!(layout.split(&flat).is_err());
    }
}
