//! Positional reader.
//!
//! Serves arbitrary byte ranges of either the fixed FAT12/16 root
//! directory area or a cluster chain, one cluster's worth of device I/O at
//! a time. Callers that read forward through a file (the common case: the
//! directory scanner, and any client streaming file bytes) get their
//! cluster lookups memoized in a one-slot cursor instead of re-walking the
//! chain from the start on every call; a backward seek invalidates the
//! cursor and forces a cold restart from the first cluster.

use crate::bpb::{Geometry, RootLocation};
use crate::device::{BlockDevice, ReadHook};
use crate::error::FatError;
use crate::fat::{next_cluster, NextCluster};

/// Where a file's (or directory's) data begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCluster {
    /// The FAT12/16 fixed root directory area - not cluster-addressed.
    Root,
    Cluster(u32),
}

/// Memoized position within a cluster chain. `Invalid` means the next read
/// must walk the chain from its first cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Invalid,
    At { logical: u32, physical: u32 },
}

/// Everything needed to keep reading from one open file or directory.
#[derive(Debug, Clone, Copy)]
pub struct EntryState {
    pub attr: u8,
    /// `None` for directories: a FAT directory entry's `file_size` field is
    /// meaningless for ATTR_DIRECTORY, so directory reads run until the
    /// chain hits end-of-chain rather than until a byte count.
    pub file_size: Option<u32>,
    pub file_cluster: FileCluster,
    pub cursor: Cursor,
}

impl EntryState {
    pub fn root(geometry: &Geometry) -> Self {
        let file_cluster = match geometry.root {
            RootLocation::Fixed { .. } => FileCluster::Root,
            RootLocation::Cluster(c) => FileCluster::Cluster(c),
        };
        EntryState {
            attr: crate::ATTR_DIRECTORY,
            file_size: None,
            file_cluster,
            cursor: Cursor::Invalid,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attr & crate::ATTR_DIRECTORY != 0
    }
}

fn hooked_read<D: BlockDevice, H: ReadHook>(
    device: &D,
    hook: &mut H,
    offset: usize,
    buf: &mut [u8],
) -> Result<(), FatError<D::Error>> {
    device.read_at(offset, buf).map_err(FatError::Device)?;
    hook.on_read(offset, buf.len());
    Ok(())
}

/// Advance `state.cursor` so it names the cluster containing logical
/// cluster index `target`, walking forward from either the cached cursor
/// (if it is at or before `target`) or from the chain's first cluster
/// (cold restart, e.g. after a backward seek).
fn seek_cluster<D: BlockDevice>(
    geometry: &Geometry,
    device: &D,
    state: &mut EntryState,
    start: u32,
    target: u32,
) -> Result<Option<u32>, FatError<D::Error>> {
    let (mut logical, mut physical) = match state.cursor {
        Cursor::At { logical, physical } if logical <= target => (logical, physical),
        _ => (0, start),
    };

    while logical < target {
        match next_cluster(geometry, device, physical)? {
            NextCluster::Continue(next) => {
                physical = next;
                logical += 1;
            }
            NextCluster::EndOfChain => {
                state.cursor = Cursor::Invalid;
                return Ok(None);
            }
        }
    }

    state.cursor = Cursor::At { logical, physical };
    Ok(Some(physical))
}

/// Read up to `buf.len()` bytes starting at byte `offset` into `buf`.
/// Returns the number of bytes actually copied, which is less than
/// `buf.len()` only at true end-of-file/end-of-chain - that is not an
/// error.
pub fn read_data<D: BlockDevice, H: ReadHook>(
    geometry: &Geometry,
    device: &D,
    hook: &mut H,
    state: &mut EntryState,
    offset: u32,
    buf: &mut [u8],
) -> Result<usize, FatError<D::Error>> {
    let mut want = buf.len();
    if let Some(size) = state.file_size {
        if offset >= size {
            return Ok(0);
        }
        want = want.min((size - offset) as usize);
    }
    if want == 0 {
        return Ok(0);
    }

    match state.file_cluster {
        FileCluster::Root => {
            let RootLocation::Fixed { first_sector, sector_count } = geometry.root else {
                unreachable!("FileCluster::Root only occurs with a fixed root area");
            };
            let area_len = sector_count as u64 * geometry.bytes_per_sector as u64;
            if offset as u64 >= area_len {
                return Ok(0);
            }
            let want = want.min((area_len - offset as u64) as usize);
            let base = first_sector as u64 * geometry.bytes_per_sector as u64;
            hooked_read(device, hook, (base + offset as u64) as usize, &mut buf[..want])?;
            Ok(want)
        }
        FileCluster::Cluster(start) => {
            let cluster_size = geometry.cluster_size();
            let mut copied = 0usize;
            let mut offset = offset;
            let mut remaining = want;

            while remaining > 0 {
                let logical = offset / cluster_size;
                let physical = match seek_cluster(geometry, device, state, start, logical)? {
                    Some(p) => p,
                    None => break,
                };
                let intra = (offset % cluster_size) as usize;
                let chunk = remaining.min(cluster_size as usize - intra);
                let device_offset = geometry.cluster_byte_offset(physical) as usize + intra;
                hooked_read(device, hook, device_offset, &mut buf[copied..copied + chunk])?;

                copied += chunk;
                offset += chunk as u32;
                remaining -= chunk;
            }
            Ok(copied)
        }
    }
}
