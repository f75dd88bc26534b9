use std::marker::PhantomData;
use std::ops::Range;

/// A row-major output buffer shared by several workers at once.
///
/// The view performs no synchronization. Writers must only request
/// segments of blocks they own; the blocked kernel guarantees this by
/// deriving every request from a [`StaticPartition`] assignment.
///
/// [`StaticPartition`]: crate::partition::StaticPartition
pub struct SharedOutput<'a> {
    ptr: *mut f32,
    rows: usize,
    cols: usize,
    _marker: PhantomData<&'a mut [f32]>,
}

// SAFETY: the view only hands out disjoint segments (see `segment_mut`),
// and the borrowed buffer outlives the view.
unsafe impl Send for SharedOutput<'_> {}
unsafe impl Sync for SharedOutput<'_> {}

impl<'a> SharedOutput<'a> {
    /// Wrap an exclusively borrowed `rows x cols` buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn new(data: &'a mut [f32], rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "output length {} does not match {}x{}",
            data.len(),
            rows,
            cols
        );
        SharedOutput {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            _marker: PhantomData,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Mutable access to `row[cols]`.
    ///
    /// # Safety
    /// No other reference to any element of the segment may be alive while
    /// the returned slice is in use, on this or any other thread.
    ///
    /// # Panics
    /// Panics if the segment lies outside the buffer.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn segment_mut(&self, row: usize, cols: Range<usize>) -> &mut [f32] {
        assert!(
            row < self.rows && cols.start <= cols.end && cols.end <= self.cols,
            "segment row {} cols {:?} outside {}x{} output",
            row,
            cols,
            self.rows,
            self.cols
        );
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.add(row * self.cols + cols.start), cols.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_writers() {
        let mut data = vec![0.0f32; 4 * 6];
        {
            let out = SharedOutput::new(&mut data, 4, 6);
            std::thread::scope(|s| {
                for half in 0..2 {
                    let out = &out;
                    s.spawn(move || {
                        let cols = half * 3..half * 3 + 3;
                        for row in 0..4 {
                            let seg = unsafe { out.segment_mut(row, cols.clone()) };
                            for (i, v) in seg.iter_mut().enumerate() {
                                *v = (row * 6 + cols.start + i) as f32;
                            }
                        }
                    });
                }
            });
        }
        let expected: Vec<f32> = (0..24).map(|i| i as f32).collect();
        assert_eq!(data, expected);
    }

    #[test]
    #[should_panic]
    fn test_segment_out_of_bounds() {
        let mut data = vec![0.0f32; 4];
        let out = SharedOutput::new(&mut data, 2, 2);
        let _ = unsafe { out.segment_mut(1, 1..3) };
    }

    #[test]
    #[should_panic]
    fn test_length_mismatch() {
        let mut data = vec![0.0f32; 5];
        let _ = SharedOutput::new(&mut data, 2, 2);
    }
}
