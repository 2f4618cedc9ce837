//! Block device interface (external collaborator)
//!
//! This driver does not own a device implementation; the host supplies one.
//! The only two things the host owes this driver are: (1) sector-addressed
//! reads, and (2) the ability to install a single observation hook around
//! one physical read at a time (used by the positional reader to report
//! cluster-to-byte-range progress without this driver linking against a
//! logging or metrics system itself).
//!
//! FAT12 entries are 12 bits wide and can straddle a sector boundary; a
//! `BlockDevice` implementation must be able to serve a `read_at` whose
//! byte range crosses a sector edge, not just whole-sector reads.

use core::any::Any;

/// Observes one physical read performed through a [`BlockDevice`].
///
/// Installed for the duration of a single [`BlockDevice::read_at`] call by
/// the positional reader (see `reader` module), then removed. A driver
/// never holds more than one hook active at a time.
pub trait ReadHook {
    fn on_read(&mut self, device_offset: usize, len: usize);
}

/// A no-op hook, used when the caller does not care to observe reads.
impl ReadHook for () {
    fn on_read(&mut self, _device_offset: usize, _len: usize) {}
}

/// Sector-addressed storage backing a mounted volume.
///
/// Implementations are expected to be cheap to read from repeatedly; this
/// driver performs no caching of its own (see crate-level docs).
pub trait BlockDevice: Send + Sync + Any {
    type Error;

    /// Number of bytes in one physical sector. Must be a power of two.
    fn sector_size(&self) -> usize;

    /// Read `buf.len()` bytes starting at byte offset `offset` from the
    /// start of the device. `offset` and `buf.len()` need not be aligned
    /// to `sector_size()` — a FAT12 entry fetch may require a read that
    /// starts or ends mid-sector.
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error>;
}
