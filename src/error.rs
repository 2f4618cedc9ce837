//! Errors surfaced across the mount / open / read / dir / label boundary.

use thiserror::Error;

/// Everything this driver can fail with, generic over the block device's
/// own error type so a [`Device`](FatError::Device) failure keeps the
/// host's original error attached instead of flattening it away.
#[derive(Debug, Error)]
pub enum FatError<E> {
    /// The boot sector failed a sanity check (signature, geometry, or FAT
    /// sizing) and this volume cannot be mounted as FAT.
    #[error("not a fat filesystem")]
    BadFs,

    /// A path component named a file where a directory was expected.
    #[error("not a directory")]
    BadFileType,

    /// Path resolution reached a directory with no entry of the requested
    /// name.
    #[error("file not found")]
    FileNotFound,

    /// A cluster number read from the FAT, or from a directory entry, is
    /// out of range for this volume.
    #[error("invalid cluster {0}")]
    Corrupt(u32),

    /// The underlying block device reported a failure.
    #[error("device error")]
    Device(E),
}

impl<E> FatError<E> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FatError::FileNotFound)
    }
}

pub type FatResult<T, E> = Result<T, FatError<E>>;
