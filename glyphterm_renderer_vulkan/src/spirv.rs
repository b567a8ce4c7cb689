//! Memory-mapped SPIR-V shader binaries
//!
//! Shader modules are created straight from a read-only memory mapping of the
//! `.spv` file, so the binary is never copied into an intermediate Vec.

use glyphterm_engine::{term_err, Error, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A SPIR-V binary mapped from disk.
///
/// The mapping stays alive for the lifetime of this value; [`SpirvFile::words`]
/// borrows from it, so the file must outlive shader module creation.
#[derive(Debug)]
pub struct SpirvFile {
    path: String,
    map: Mmap,
}

impl SpirvFile {
    /// Map a `.spv` file from disk.
    ///
    /// Returns [`Error::ShaderNotFound`] when the file cannot be opened, and a
    /// backend error when the content is not a whole number of 32-bit words.
    pub fn open(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let file = File::open(path)
            .map_err(|_| Error::ShaderNotFound(display.clone()))?;

        // Safety: the mapping is read-only and private to this process; we
        // never hand out mutable access to the underlying bytes.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| term_err!("glyphterm::spirv", "Failed to map {}: {}", display, e))?;

        if map.len() == 0 || map.len() % 4 != 0 {
            return Err(term_err!(
                "glyphterm::spirv",
                "Invalid SPIR-V binary {}: {} bytes is not a positive multiple of 4",
                display,
                map.len()
            ));
        }

        Ok(Self { path: display, map })
    }

    /// The SPIR-V code as 32-bit words, as required by shader module creation.
    pub fn words(&self) -> Result<&[u32]> {
        bytemuck::try_cast_slice(&self.map).map_err(|e| {
            term_err!(
                "glyphterm::spirv",
                "SPIR-V binary {} is not 4-byte aligned: {}",
                self.path,
                e
            )
        })
    }

    /// Number of 32-bit words in the binary.
    pub fn word_count(&self) -> usize {
        self.map.len() / 4
    }

    /// Path this binary was mapped from.
    pub fn path(&self) -> &str {
        &self.path
    }
}
