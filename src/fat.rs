//! FAT walker: given the current cluster, find the next one in the chain.
//!
//! This is the one piece of the driver that actually reads the File
//! Allocation Table itself (as opposed to the data region it maps). It
//! knows nothing about files, directories, or byte offsets within a
//! cluster - that is the positional reader's job, one layer up.

use crate::bpb::{FatType, Geometry};
use crate::device::BlockDevice;
use crate::error::FatError;
use crate::read_le_u16;

/// Result of stepping the FAT for one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextCluster {
    Continue(u32),
    EndOfChain,
}

/// Look up the FAT entry for `current` and interpret it for `geometry`'s
/// variant. Free (0) and reserved entries are treated as corruption: a
/// cluster chain should never reference either while being walked.
pub fn next_cluster<D: BlockDevice>(
    geometry: &Geometry,
    device: &D,
    current: u32,
) -> Result<NextCluster, FatError<D::Error>> {
    let (offset, width) = geometry.fat_entry_location(current);
    let mut buf = [0u8; 4];
    device
        .read_at(offset as usize, &mut buf[..width])
        .map_err(FatError::Device)?;

    let raw: u32 = match geometry.fat_type {
        FatType::Fat12 => {
            let window = read_le_u16(&buf);
            let entry = if current & 1 == 0 {
                window & 0x0FFF
            } else {
                (window >> 4) & 0x0FFF
            };
            entry as u32
        }
        FatType::Fat16 => read_le_u16(&buf) as u32,
        FatType::Fat32 => crate::read_le_u32(&buf) & 0x0FFF_FFFF,
    };

    if raw >= geometry.fat_type.eoc_threshold() {
        return Ok(NextCluster::EndOfChain);
    }
    if raw < 2 || raw >= geometry.num_clusters {
        log::warn!("fat: invalid cluster {} (FAT[{}])", raw, current);
        return Err(FatError::Corrupt(raw));
    }
    Ok(NextCluster::Continue(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpb::mount;
    use crate::test_support::fat12_device;

    #[test]
    fn free_fat_entry_is_corruption() {
        let device = fat12_device();
        let geometry = mount(&device).unwrap();

        // Cluster 2's FAT entry was never patched, so it reads back as 0 -
        // a chain should never reference a free cluster. The reported
        // value is the invalid entry read (0), not the cluster that named
        // it.
        let err = next_cluster(&geometry, &device, 2).unwrap_err();
        assert!(matches!(err, FatError::Corrupt(0)));
    }

    #[test]
    fn cluster_beyond_volume_is_corruption() {
        let device = fat12_device();
        let geometry = mount(&device).unwrap();

        let mut fat = [0u8; 512];
        crate::test_support::set_fat12_entry(&mut fat, 0, 0x0FF8);
        crate::test_support::set_fat12_entry(&mut fat, 1, 0x0FFF);
        // num_clusters for this 10-cluster image is 12; 4000 is well
        // below the FAT12 EOC threshold but far past the last valid index.
        crate::test_support::set_fat12_entry(&mut fat, 2, 4000);
        device.patch(512, &fat);

        let err = next_cluster(&geometry, &device, 2).unwrap_err();
        assert!(matches!(err, FatError::Corrupt(4000)));
    }

    #[test]
    fn single_cluster_chain_ends_immediately() {
        let device = fat12_device();
        let geometry = mount(&device).unwrap();

        let mut fat = [0u8; 512];
        crate::test_support::set_fat12_entry(&mut fat, 0, 0x0FF8);
        crate::test_support::set_fat12_entry(&mut fat, 1, 0x0FFF);
        crate::test_support::set_fat12_entry(&mut fat, 2, 0x0FFF);
        device.patch(512, &fat);

        assert_eq!(next_cluster(&geometry, &device, 2).unwrap(), NextCluster::EndOfChain);
    }
}
