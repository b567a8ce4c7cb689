//! Error types for the glyphterm engine
//!
//! This module defines the error taxonomy shared by the core crate and the
//! renderer backends: fatal initialization failures, recoverable per-frame
//! conditions, and resource-exhaustion guards.

use std::fmt;

/// Result type for glyphterm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Glyphterm errors
#[derive(Debug, Clone)]
pub enum Error {
    /// GPU object creation failed during startup (unrecoverable)
    InitializationFailed(String),

    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// The distinct-character count does not fit in one atlas strip
    AtlasCapacityExceeded {
        /// Number of distinct characters in the grid
        distinct: usize,
        /// Maximum number of atlas cells the device supports
        capacity: usize,
    },

    /// The presentation surface is stale; the swapchain must be rebuilt
    SurfaceOutOfDate,

    /// A fence or acquire wait exceeded its configured bound
    Timeout(String),

    /// A SPIR-V shader file could not be opened
    ShaderNotFound(String),
}

impl Error {
    /// Reclassify a backend failure raised while the renderer is still
    /// under construction, where nothing is recoverable.
    pub fn into_init(self) -> Self {
        match self {
            Error::BackendError(msg) => Error::InitializationFailed(msg),
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::AtlasCapacityExceeded { distinct, capacity } => write!(
                f,
                "Atlas capacity exceeded: {} distinct characters, capacity {}",
                distinct, capacity
            ),
            Error::SurfaceOutOfDate => write!(f, "Presentation surface is out of date"),
            Error::Timeout(msg) => write!(f, "Timed out: {}", msg),
            Error::ShaderNotFound(path) => write!(f, "Shader file not found: {}", path),
        }
    }
}

impl std::error::Error for Error {}
