use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use mg_kernel::MatrixDims;
use tempfile::NamedTempFile;

use crate::error::{MatmulError, Result};

/// Filename prefix of uniquely named result files.
pub const RESULT_PREFIX: &str = "mg-result-";
/// Filename suffix of uniquely named result files.
pub const RESULT_SUFFIX: &str = ".dat";

/// Where the product matrix is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A fresh file with a random name inside the directory. The file is
    /// removed again if the multiplication fails.
    UniqueIn(PathBuf),
    /// A caller-chosen path, created or truncated. Left in place on failure.
    Path(PathBuf),
}

impl Default for Destination {
    /// A unique file in the system temporary directory.
    fn default() -> Self {
        Destination::UniqueIn(std::env::temp_dir())
    }
}

impl Destination {
    /// Fail if writing here would overwrite one of `operands`.
    ///
    /// Only a fixed path can alias an input; a unique destination is always
    /// a new file. Aliasing is detected through the file identity, so
    /// symlinks and hard links to an operand are refused too.
    pub fn ensure_distinct(&self, operands: &[&Path]) -> Result<()> {
        let target = match self {
            Destination::UniqueIn(_) => return Ok(()),
            Destination::Path(path) => path,
        };
        for operand in operands {
            if same_file(target, operand) {
                return Err(MatmulError::Storage {
                    path: target.clone(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "destination is the same file as operand {}",
                            operand.display()
                        ),
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Whether both paths name an existing, identical file.
fn same_file(a: &Path, b: &Path) -> bool {
    let (Ok(ma), Ok(mb)) = (std::fs::metadata(a), std::fs::metadata(b)) else {
        return false;
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        ma.dev() == mb.dev() && ma.ino() == mb.ino()
    }
    #[cfg(not(unix))]
    {
        let _ = (ma, mb);
        matches!(
            (std::fs::canonicalize(a), std::fs::canonicalize(b)),
            (Ok(ca), Ok(cb)) if ca == cb
        )
    }
}

enum Handle {
    Temp(NamedTempFile),
    Fixed(File),
}

impl Handle {
    fn file(&self) -> &File {
        match self {
            Handle::Temp(tmp) => tmp.as_file(),
            Handle::Fixed(file) => file,
        }
    }
}

/// A zero-filled, writable, memory-mapped result file.
pub struct OutputFile {
    // Field order is drop order: unmap before the file is closed or removed.
    mmap: MmapMut,
    handle: Handle,
    path: PathBuf,
}

impl OutputFile {
    /// Create the destination sized for a `dims` matrix and map it.
    ///
    /// The file is created or truncated to exactly `rows * cols * 4` bytes,
    /// so the mapping reads as all zeros.
    pub fn create(destination: &Destination, dims: MatrixDims) -> Result<OutputFile> {
        let byte_len = dims.byte_len()?;

        let (path, handle) = match destination {
            Destination::UniqueIn(dir) => {
                let tmp = tempfile::Builder::new()
                    .prefix(RESULT_PREFIX)
                    .suffix(RESULT_SUFFIX)
                    .tempfile_in(dir)
                    .map_err(|source| MatmulError::Storage {
                        path: dir.clone(),
                        source,
                    })?;
                (tmp.path().to_path_buf(), Handle::Temp(tmp))
            }
            Destination::Path(path) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .map_err(|source| MatmulError::Storage {
                        path: path.clone(),
                        source,
                    })?;
                (path.clone(), Handle::Fixed(file))
            }
        };

        handle
            .file()
            .set_len(byte_len as u64)
            .map_err(|source| MatmulError::Storage {
                path: path.clone(),
                source,
            })?;

        let mapping_err = |source: io::Error| MatmulError::Mapping {
            path: path.clone(),
            source,
        };
        let mmap = unsafe { MmapMut::map_mut(handle.file()) }.map_err(mapping_err)?;
        if mmap.len() != byte_len {
            return Err(mapping_err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("mapped {} bytes, expected {}", mmap.len(), byte_len),
            )));
        }
        if mmap.as_ptr().align_offset(std::mem::align_of::<f32>()) != 0 {
            return Err(mapping_err(io::Error::new(
                io::ErrorKind::InvalidData,
                "mapping is not aligned for f32",
            )));
        }

        Ok(OutputFile { mmap, handle, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mapped output values.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        let len = self.mmap.len() / std::mem::size_of::<f32>();
        // SAFETY: `create` checked alignment and length; the mapping is
        // exclusively borrowed through `self`.
        unsafe { std::slice::from_raw_parts_mut(self.mmap.as_mut_ptr().cast::<f32>(), len) }
    }

    /// Flush and unmap the output, close the file and return its path.
    ///
    /// Uniquely named files are kept on disk from this point on.
    pub fn finish(self) -> Result<PathBuf> {
        let OutputFile { mmap, handle, path } = self;

        mmap.flush().map_err(|source| MatmulError::Storage {
            path: path.clone(),
            source,
        })?;
        drop(mmap);

        match handle {
            Handle::Temp(tmp) => {
                let (_file, kept) = tmp.keep().map_err(|e| MatmulError::Storage {
                    path: path.clone(),
                    source: e.error,
                })?;
                Ok(kept)
            }
            Handle::Fixed(_file) => Ok(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_output_is_zeroed_and_sized() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Destination::UniqueIn(dir.path().to_path_buf());
        let mut out = OutputFile::create(&dest, MatrixDims::new(3, 5)).unwrap();
        assert!(out.as_mut_slice().iter().all(|&v| v == 0.0));
        assert_eq!(out.as_mut_slice().len(), 15);

        let name = out.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(RESULT_PREFIX));
        assert!(name.ends_with(RESULT_SUFFIX));

        out.as_mut_slice()[4] = 2.5;
        let path = out.finish().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 60);
        assert_eq!(&bytes[16..20], &2.5f32.to_ne_bytes());
    }

    #[test]
    fn test_unique_output_removed_when_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Destination::UniqueIn(dir.path().to_path_buf());
        let out = OutputFile::create(&dest, MatrixDims::new(2, 2)).unwrap();
        let path = out.path().to_path_buf();
        assert!(path.exists());
        drop(out);
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_names_differ() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Destination::UniqueIn(dir.path().to_path_buf());
        let a = OutputFile::create(&dest, MatrixDims::new(1, 1)).unwrap();
        let b = OutputFile::create(&dest, MatrixDims::new(1, 1)).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_fixed_path_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");
        std::fs::write(&path, vec![0xFFu8; 64]).unwrap();

        let mut out =
            OutputFile::create(&Destination::Path(path.clone()), MatrixDims::new(2, 2)).unwrap();
        assert!(out.as_mut_slice().iter().all(|&v| v == 0.0));
        assert_eq!(out.finish().unwrap(), path);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);
    }

    #[test]
    fn test_fixed_path_aliasing_operand_refused() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dat");
        let b = dir.path().join("b.dat");
        std::fs::write(&a, [0u8; 4]).unwrap();
        std::fs::write(&b, [0u8; 4]).unwrap();

        let same = Destination::Path(dir.path().join(".").join("a.dat"));
        let err = same.ensure_distinct(&[a.as_path(), b.as_path()]).err().unwrap();
        match err {
            MatmulError::Storage { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput)
            }
            other => panic!("unexpected error: {}", other),
        }

        let fresh = Destination::Path(dir.path().join("c.dat"));
        assert!(fresh.ensure_distinct(&[a.as_path(), b.as_path()]).is_ok());
        let unique = Destination::UniqueIn(dir.path().to_path_buf());
        assert!(unique.ensure_distinct(&[a.as_path(), b.as_path()]).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_hard_link_to_operand_refused() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dat");
        std::fs::write(&a, [0u8; 4]).unwrap();
        let link = dir.path().join("link.dat");
        std::fs::hard_link(&a, &link).unwrap();

        let err = Destination::Path(link).ensure_distinct(&[a.as_path()]).err().unwrap();
        assert!(matches!(err, MatmulError::Storage { .. }));
    }

    #[test]
    fn test_missing_directory_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Destination::UniqueIn(dir.path().join("does-not-exist"));
        let err = OutputFile::create(&dest, MatrixDims::new(1, 1)).err().unwrap();
        assert!(matches!(err, MatmulError::Storage { .. }));
        assert_eq!(err.step(), "create destination");
    }
}
