//! Directory entry scanning and VFAT long file name reassembly.
//!
//! A FAT directory is just a file whose bytes are packed 32-byte records.
//! This module reads those records through the positional reader and
//! turns them into [`ScannedEntry`] values: an 8.3 short entry, optionally
//! preceded by one or more VFAT long-name slots that this module
//! reassembles and validates against the short entry's checksum before
//! trusting the long name over the short one.

use alloc::string::String;
use alloc::vec::Vec;

use crate::bpb::Geometry;
use crate::device::{BlockDevice, ReadHook};
use crate::error::FatError;
use crate::reader::{read_data, EntryState};
use crate::{read_le_u16, read_le_u32, DIRENT_SIZE};

const NAME_FREE: u8 = 0x00;
const NAME_DELETED: u8 = 0xE5;
const NAME_ESCAPED_E5: u8 = 0x05;
const ATTR_LONG_NAME: u8 = 0x0F;
const LAST_LONG_ENTRY: u8 = 0x40;

/// One resolved directory entry: a short name entry, with its long name
/// substituted in if a validated VFAT sequence preceded it.
#[derive(Debug, Clone)]
pub struct ScannedEntry {
    pub name: String,
    pub attr: u8,
    pub first_cluster: u32,
    pub file_size: u32,
}

impl ScannedEntry {
    pub fn is_directory(&self) -> bool {
        self.attr & crate::ATTR_DIRECTORY != 0
    }

    pub fn into_state(self) -> EntryState {
        use crate::reader::FileCluster;
        EntryState {
            attr: self.attr,
            file_size: if self.is_directory() { None } else { Some(self.file_size) },
            file_cluster: FileCluster::Cluster(self.first_cluster),
            cursor: crate::reader::Cursor::Invalid,
        }
    }
}

/// Accumulates VFAT long-name slots until a short entry either confirms or
/// discards them.
struct LfnAssembler {
    slots: Vec<Option<[u16; 13]>>,
    checksum: u8,
}

impl LfnAssembler {
    fn new() -> Self {
        LfnAssembler { slots: Vec::new(), checksum: 0 }
    }

    fn reset(&mut self) {
        self.slots.clear();
    }

    fn push(&mut self, raw: &[u8; DIRENT_SIZE]) {
        let id = raw[0];
        let checksum = raw[13];
        let index = (id & 0x3F) as usize;
        if index == 0 {
            return;
        }
        if id & LAST_LONG_ENTRY != 0 {
            self.slots.clear();
            self.slots.resize(index, None);
            self.checksum = checksum;
        } else if self.slots.is_empty() || checksum != self.checksum {
            // an LFN slot with no preceding "last" slot, or a checksum
            // that doesn't match the run in progress: the run is corrupt
            // or orphaned, nothing useful to keep.
            log::debug!("fat: discarding orphaned or mismatched LFN slot (id=0x{:02x})", id);
            return;
        }
        if index == 0 || index > self.slots.len() {
            return;
        }

        let mut units = [0u16; 13];
        for i in 0..5 {
            units[i] = read_le_u16(&raw[1 + i * 2..]);
        }
        for i in 0..6 {
            units[5 + i] = read_le_u16(&raw[14 + i * 2..]);
        }
        for i in 0..2 {
            units[11 + i] = read_le_u16(&raw[28 + i * 2..]);
        }
        self.slots[index - 1] = Some(units);
    }

    /// Reassemble the accumulated slots into a name, if the checksum
    /// matches the short entry's raw 11-byte name and every slot is
    /// present.
    fn finish(&mut self, short_checksum: u8) -> Option<String> {
        if self.slots.is_empty() {
            return None;
        }
        if self.checksum != short_checksum {
            log::debug!(
                "fat: LFN checksum mismatch (group 0x{:02x}, short 0x{:02x}), falling back to short name",
                self.checksum,
                short_checksum
            );
            self.reset();
            return None;
        }
        if self.slots.iter().any(|s| s.is_none()) {
            self.reset();
            return None;
        }

        let mut units: Vec<u16> = Vec::with_capacity(self.slots.len() * 13);
        'outer: for slot in self.slots.drain(..) {
            for unit in slot.unwrap() {
                if unit == 0x0000 {
                    break 'outer;
                }
                units.push(unit);
            }
        }
        self.reset();
        Some(String::from_utf16_lossy(&units))
    }
}

/// GRUB2-style checksum over the raw (non-dot-joined) 11-byte short name,
/// used to bind a run of VFAT long-name entries to the short entry that
/// follows them.
pub(crate) fn sum_8dot3(name11: &[u8; 11]) -> u8 {
    let mut sum: u8 = 0;
    for &b in name11 {
        sum = sum.rotate_right(1).wrapping_add(b);
    }
    sum
}

fn short_name_to_string(raw: &[u8; 11]) -> String {
    let mut fixed = *raw;
    if fixed[0] == NAME_ESCAPED_E5 {
        fixed[0] = NAME_DELETED;
    }

    let base = core::str::from_utf8(&fixed[0..8]).unwrap_or("").trim_end();
    let ext = core::str::from_utf8(&fixed[8..11]).unwrap_or("").trim_end();

    // Short names are stored upper-case on disk; the produced name is
    // case-folded to lowercase (long names are not).
    let mut out = String::with_capacity(12);
    out.push_str(&base.to_ascii_lowercase());
    if !ext.is_empty() {
        out.push('.');
        out.push_str(&ext.to_ascii_lowercase());
    }
    out
}

fn decode_short_entry(raw: &[u8; DIRENT_SIZE]) -> ScannedEntry {
    let attr = raw[11];
    let hi = read_le_u16(&raw[20..]) as u32;
    let lo = read_le_u16(&raw[26..]) as u32;
    let file_size = read_le_u32(&raw[28..]);
    let mut name11 = [0u8; 11];
    name11.copy_from_slice(&raw[0..11]);
    ScannedEntry {
        name: short_name_to_string(&name11),
        attr,
        first_cluster: (hi << 16) | lo,
        file_size,
    }
}

/// Pulls [`ScannedEntry`] values one at a time out of a directory's data,
/// reassembling VFAT long names as it goes.
pub struct DirScanner<'d, D: BlockDevice> {
    geometry: &'d Geometry,
    device: &'d D,
    state: EntryState,
    offset: u32,
    lfn: LfnAssembler,
}

impl<'d, D: BlockDevice> DirScanner<'d, D> {
    pub fn new(geometry: &'d Geometry, device: &'d D, state: EntryState) -> Self {
        DirScanner { geometry, device, state, offset: 0, lfn: LfnAssembler::new() }
    }

    /// Return the next live entry, or `None` at the end of the directory.
    pub fn next_entry<H: ReadHook>(
        &mut self,
        hook: &mut H,
    ) -> Result<Option<ScannedEntry>, FatError<D::Error>> {
        loop {
            let mut raw = [0u8; DIRENT_SIZE];
            let n = read_data(
                self.geometry,
                self.device,
                hook,
                &mut self.state,
                self.offset,
                &mut raw,
            )?;
            if n < DIRENT_SIZE {
                return Ok(None);
            }
            self.offset += DIRENT_SIZE as u32;

            match raw[0] {
                NAME_FREE => return Ok(None),
                NAME_DELETED => {
                    self.lfn.reset();
                    continue;
                }
                _ => {}
            }

            if raw[11] & ATTR_LONG_NAME == ATTR_LONG_NAME {
                self.lfn.push(&raw);
                continue;
            }

            if raw[11] & crate::ATTR_VOLUME_ID != 0 {
                self.lfn.reset();
                continue;
            }

            let mut short_name_raw = [0u8; 11];
            short_name_raw.copy_from_slice(&raw[0..11]);
            let checksum = sum_8dot3(&short_name_raw);
            let mut entry = decode_short_entry(&raw);
            if let Some(long_name) = self.lfn.finish(checksum) {
                entry.name = long_name;
            } else {
                self.lfn.reset();
            }
            return Ok(Some(entry));
        }
    }

    /// Scan the whole directory, calling `visit` for each live entry.
    pub fn for_each<H: ReadHook, F: FnMut(&ScannedEntry)>(
        &mut self,
        hook: &mut H,
        mut visit: F,
    ) -> Result<(), FatError<D::Error>> {
        while let Some(entry) = self.next_entry(hook)? {
            visit(&entry);
        }
        Ok(())
    }

    /// Scan the directory looking for exactly one entry whose produced
    /// name matches `target` by exact UTF-8 comparison. Short names are
    /// already case-folded to lowercase by the time they reach here; this
    /// does not itself fold case, matching the byte-exact `strcmp` the
    /// produced name is compared with.
    pub fn find<H: ReadHook>(
        &mut self,
        hook: &mut H,
        target: &str,
    ) -> Result<Option<ScannedEntry>, FatError<D::Error>> {
        while let Some(entry) = self.next_entry(hook)? {
            if entry.name == target {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpb::mount;
    use crate::test_support::{build_boot_sector, long_entry, short_entry, BootParams, MemDevice};

    /// A FAT32 root directory (cluster 2) holding one file, "a long file
    /// name.txt" (20 chars, two VFAT slots) plus its short entry.
    #[test]
    fn reassembles_a_two_slot_long_name() {
        let mut params = BootParams::default();
        params.sectors_per_fat_16 = 0;
        params.sectors_per_fat_32 = 548;
        params.root_entry_count = 0;
        params.root_cluster = 2;
        params.total_sectors_32 = 70549;

        let device = MemDevice::new(512);
        device.patch(0, &build_boot_sector(&params));

        // FAT[0] sanity entry only; the root directory fits in its first
        // cluster so no chain continuation is ever read.
        let mut fat0 = [0u8; 4];
        fat0.copy_from_slice(&0x0FFF_FFF8u32.to_le_bytes());
        device.patch(512, &fat0);

        let geometry = mount(&device).expect("valid FAT32 image should mount");
        let root_offset = geometry.cluster_byte_offset(2) as usize;

        let short_name: [u8; 11] = *b"LONGFI~1TXT";
        let checksum = sum_8dot3(&short_name);

        // "a long file name.txt" split 13 + 7 across two slots.
        let slot1: [u16; 13] = [
            'a' as u16, ' ' as u16, 'l' as u16, 'o' as u16, 'n' as u16, 'g' as u16, ' ' as u16,
            'f' as u16, 'i' as u16, 'l' as u16, 'e' as u16, ' ' as u16, 'n' as u16,
        ];
        let slot2: [u16; 13] = [
            'a' as u16, 'm' as u16, 'e' as u16, '.' as u16, 't' as u16, 'x' as u16, 't' as u16,
            0x0000, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF,
        ];

        // Slots are stored in descending order: the "last" slot (bit 0x40
        // set) comes first on disk, then the rest down to slot 1.
        device.patch(root_offset, &long_entry(0x42, checksum, &slot2));
        device.patch(root_offset + 32, &long_entry(0x01, checksum, &slot1));
        device.patch(root_offset + 64, &short_entry(&short_name, crate::ATTR_ARCHIVE, 5, 1234));

        let state = EntryState::root(&geometry);
        let mut scanner = DirScanner::new(&geometry, &device, state);
        let found = scanner
            .find(&mut (), "a long file name.txt")
            .unwrap()
            .expect("long name should be found");

        assert_eq!(found.name, "a long file name.txt");
        assert_eq!(found.attr, crate::ATTR_ARCHIVE);
        assert_eq!(found.first_cluster, 5);
        assert_eq!(found.file_size, 1234);
    }

    #[test]
    fn checksum_mismatch_falls_back_to_short_name() {
        let mut params = BootParams::default();
        params.sectors_per_fat_16 = 0;
        params.sectors_per_fat_32 = 548;
        params.root_entry_count = 0;
        params.root_cluster = 2;
        params.total_sectors_32 = 70549;

        let device = MemDevice::new(512);
        device.patch(0, &build_boot_sector(&params));
        let mut fat0 = [0u8; 4];
        fat0.copy_from_slice(&0x0FFF_FFF8u32.to_le_bytes());
        device.patch(512, &fat0);

        let geometry = mount(&device).unwrap();
        let root_offset = geometry.cluster_byte_offset(2) as usize;

        let short_name: [u8; 11] = *b"HELLO   TXT";
        let slot: [u16; 13] = [
            'w' as u16, 'r' as u16, 'o' as u16, 'n' as u16, 'g' as u16, 0x0000, 0xFFFF, 0xFFFF,
            0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF,
        ];
        // Deliberately wrong checksum: the short entry should win.
        device.patch(root_offset, &long_entry(0x41, 0xAB, &slot));
        device.patch(root_offset + 32, &short_entry(&short_name, crate::ATTR_ARCHIVE, 2, 4));

        let state = EntryState::root(&geometry);
        let mut scanner = DirScanner::new(&geometry, &device, state);
        let found = scanner.find(&mut (), "hello.txt").unwrap().expect("short name should match");
        assert_eq!(found.name, "hello.txt");
    }
}
