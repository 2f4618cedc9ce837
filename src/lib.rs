#![cfg_attr(not(test), no_std)]
//! Read-only FAT12/16/32 driver.
//!
//! Mounts a volume from a raw block device, resolves paths, enumerates
//! directories, and streams file bytes. There is no write path: no file
//! creation, no metadata updates, no free-space tracking, no caching. A
//! host embeds this driver by implementing [`device::BlockDevice`] and
//! calling the five operations below - [`open`], [`FileHandle::read`],
//! [`FileHandle::close`] (via `Drop`), [`dir`], and [`label`] - the way it
//! would wire up any other filesystem under the name `"fat"` in its own
//! registry; building that registry is the host's job, not this crate's.

extern crate alloc;

pub mod bpb;
pub mod device;
pub mod entry;
pub mod error;
pub mod fat;
pub mod path;
pub mod reader;

#[cfg(test)]
mod test_support;

use core::convert::TryInto;

use crate::bpb::Geometry;
use crate::device::{BlockDevice, ReadHook};
use crate::reader::{read_data, EntryState};

pub use crate::entry::ScannedEntry;
pub use crate::error::{FatError, FatResult};

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

pub const DIRENT_SIZE: usize = 32;

pub const MAX_CLUSTER_FAT12: usize = 4085;
pub const MAX_CLUSTER_FAT16: usize = 65525;

pub(crate) fn read_le_u16(input: &[u8]) -> u16 {
    let (int_bytes, _) = input.split_at(core::mem::size_of::<u16>());
    u16::from_le_bytes(int_bytes.try_into().unwrap())
}

pub(crate) fn read_le_u32(input: &[u8]) -> u32 {
    let (int_bytes, _) = input.split_at(core::mem::size_of::<u32>());
    u32::from_le_bytes(int_bytes.try_into().unwrap())
}

/// A file opened by [`open`]. Owns the mounted [`Geometry`] outright: there
/// is no shared, process-global volume table. Dropping (or [`close`]ing)
/// the handle is the only release step needed - there is nothing else to
/// reference-count, since nothing else on the volume was ever touched.
pub struct FileHandle<'d, D: BlockDevice> {
    device: &'d D,
    geometry: Geometry,
    state: EntryState,
}

impl<'d, D: BlockDevice> core::fmt::Debug for FileHandle<'d, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileHandle")
            .field("geometry", &self.geometry)
            .field("state", &self.state)
            .finish()
    }
}

impl<'d, D: BlockDevice> FileHandle<'d, D> {
    /// Mount `device` and resolve `path` to a regular file.
    pub fn open(device: &'d D, path: &str) -> Result<Self, FatError<D::Error>> {
        let geometry = bpb::mount(device)?;
        let state = path::resolve(&geometry, device, path)?;
        if state.is_directory() {
            log::debug!("fat: open() refused directory path");
            return Err(FatError::BadFileType);
        }
        Ok(FileHandle { device, geometry, state })
    }

    /// Read up to `buf.len()` bytes starting at `offset`, installing `hook`
    /// around each physical device read this call performs. Returns fewer
    /// bytes than requested only at end of file, which is not an error.
    pub fn read<H: ReadHook>(
        &mut self,
        hook: &mut H,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, FatError<D::Error>> {
        read_data(&self.geometry, self.device, hook, &mut self.state, offset, buf)
    }

    pub fn file_size(&self) -> Option<u32> {
        self.state.file_size
    }

    /// Releases the handle. Equivalent to dropping it; spelled out because
    /// the host's registry dispatches to a named `close` operation.
    pub fn close(self) {}
}

/// Mount `device`, resolve `path` to a directory, and invoke `visit` for
/// every live entry in it (VFAT long names already reassembled).
pub fn dir<D: BlockDevice, H: ReadHook, F: FnMut(&ScannedEntry)>(
    device: &D,
    path: &str,
    hook: &mut H,
    visit: F,
) -> Result<(), FatError<D::Error>> {
    let geometry = bpb::mount(device)?;
    path::resolve_dir_list(&geometry, device, path, hook, visit)
}

/// Mount `device` and return the volume label: the raw 11-byte name field
/// of the root directory's `ATTR_VOLUME_ID` entry if one exists, otherwise
/// the label recorded in the boot sector's BPB. Neither is trimmed - a
/// label of `"MY VOLUME  "` is returned exactly as stored, trailing spaces
/// included; this driver does not second-guess how a formatter chose to
/// pad it. VFAT long-name entries are ignored entirely: a volume label
/// is matched by its literal `attr == ATTR_VOLUME_ID`, not by attribute
/// bits, so an `ATTR_LONG_NAME` slot (which also has the volume-id bit
/// set) never matches.
pub fn label<D: BlockDevice>(device: &D) -> Result<[u8; 11], FatError<D::Error>> {
    let geometry = bpb::mount(device)?;
    let mut state = EntryState::root(&geometry);
    let mut hook = ();
    let mut offset = 0u32;

    loop {
        let mut raw = [0u8; DIRENT_SIZE];
        let n = read_data(&geometry, device, &mut hook, &mut state, offset, &mut raw)?;
        if n < DIRENT_SIZE || raw[0] == 0x00 {
            return Ok(geometry.volume_label);
        }
        offset += DIRENT_SIZE as u32;

        if raw[0] != 0xE5 && raw[11] == ATTR_VOLUME_ID {
            let mut name = [0u8; 11];
            name.copy_from_slice(&raw[0..11]);
            return Ok(name);
        }
    }
}
