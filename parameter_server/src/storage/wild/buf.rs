use std::sync::atomic::{AtomicU32, Ordering};

use crate::storage::{Result, SizeMismatchErr};

/// A fixed size `f32` buffer shared by every worker without locks.
///
/// Each value lives in its own relaxed atomic cell, so concurrent readers and writers never tear
/// a single float, but sequences of reads and writes from different threads interleave freely.
/// Read-modify-write updates done through `get` and `set` may lose each other's progress, this
/// buffer embraces those race conditions.
#[derive(Debug)]
pub struct WildBuf {
    cells: Box<[AtomicU32]>,
}

impl WildBuf {
    /// Creates a new `WildBuf` holding `values`.
    pub fn new(values: &[f32]) -> Self {
        Self {
            cells: values.iter().map(|x| AtomicU32::new(x.to_bits())).collect(),
        }
    }

    /// Creates a new all zero `WildBuf`.
    pub fn zeros(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicU32::new(0f32.to_bits())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        f32::from_bits(self.cells[i].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, i: usize, value: f32) {
        self.cells[i].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Copies the buffer's values into `out`.
    ///
    /// # Arguments
    /// * `out` - A mutable slice where the values will be copied.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `out` isn't the same size as this buffer.
    pub fn read_into(&self, out: &mut [f32]) -> Result<()> {
        SizeMismatchErr::check(out.len(), self.len())?;

        for (o, cell) in out.iter_mut().zip(&self.cells) {
            *o = f32::from_bits(cell.load(Ordering::Relaxed));
        }

        Ok(())
    }

    /// Overwrites the buffer with the values of `src`.
    ///
    /// # Returns
    /// A `SizeMismatchErr` if `src` isn't the same size as this buffer.
    pub fn write_from(&self, src: &[f32]) -> Result<()> {
        SizeMismatchErr::check(src.len(), self.len())?;

        for (x, cell) in src.iter().zip(&self.cells) {
            cell.store(x.to_bits(), Ordering::Relaxed);
        }

        Ok(())
    }

    pub fn fill(&self, value: f32) {
        for cell in &self.cells {
            cell.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.cells
            .iter()
            .map(|cell| f32::from_bits(cell.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn read_write() {
        let buf = WildBuf::new(&[1., -2.5, 3.]);
        buf.set(1, 7.);

        let mut out = [0.; 3];
        buf.read_into(&mut out).unwrap();
        assert_eq!(out, [1., 7., 3.]);

        buf.write_from(&[0.5; 3]).unwrap();
        assert_eq!(buf.to_vec(), [0.5; 3]);
        assert_eq!(
            buf.write_from(&[1.; 2]),
            Err(SizeMismatchErr {
                got: 2,
                expected: 3
            })
        );
    }

    #[test]
    fn concurrent_writers_never_tear() {
        let buf = Arc::new(WildBuf::zeros(64));
        let values = [1.25f32, -3.5];

        let handles: Vec<_> = values
            .iter()
            .map(|&v| {
                let buf = Arc::clone(&buf);
                thread::spawn(move || {
                    for _ in 0..200 {
                        buf.fill(v);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(buf.to_vec().iter().all(|x| values.contains(x)));
    }
}
