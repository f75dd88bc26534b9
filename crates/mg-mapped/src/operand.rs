use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use mg_kernel::MatrixDims;

use crate::error::{MatmulError, Result};

/// A read-only operand matrix backed by a memory-mapped file.
///
/// The file is headerless: `rows * cols` host-endian f32 values in
/// row-major order, and nothing else. The file handle is closed as soon as
/// the mapping exists; the mapping itself is released on drop.
pub struct MappedOperand {
    path: PathBuf,
    dims: MatrixDims,
    mmap: Mmap,
}

impl MappedOperand {
    /// Open and map `path` as a `dims` matrix.
    ///
    /// Fails with `InputAccess` if the file cannot be opened or mapped, or if
    /// its length is not exactly `rows * cols * 4` bytes.
    pub fn open(path: &Path, dims: MatrixDims) -> Result<MappedOperand> {
        let input_err = |source: io::Error| MatmulError::InputAccess {
            path: path.to_path_buf(),
            source,
        };

        let expected = dims.byte_len()?;
        let file = File::open(path).map_err(input_err)?;
        let actual = file.metadata().map_err(input_err)?.len();
        if actual != expected as u64 {
            return Err(input_err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "file holds {} bytes, expected {} for a {} f32 matrix",
                    actual, expected, dims
                ),
            )));
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(input_err)?;
        if mmap.as_ptr().align_offset(std::mem::align_of::<f32>()) != 0 {
            return Err(input_err(io::Error::new(
                io::ErrorKind::InvalidData,
                "mapping is not aligned for f32",
            )));
        }

        Ok(MappedOperand {
            path: path.to_path_buf(),
            dims,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dims(&self) -> MatrixDims {
        self.dims
    }

    /// The mapped values.
    pub fn as_slice(&self) -> &[f32] {
        let len = self.mmap.len() / std::mem::size_of::<f32>();
        // SAFETY: `open` checked that the mapping is f32-aligned and exactly
        // `len * 4` bytes long; the mapping lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.mmap.as_ptr().cast::<f32>(), len) }
    }
}
