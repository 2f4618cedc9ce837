//! Path resolution.
//!
//! Splits a slash-delimited path into components, collapsing leading and
//! repeated slashes, and descends one directory at a time from the root,
//! using the directory scanner to find each component.

use crate::bpb::Geometry;
use crate::device::{BlockDevice, ReadHook};
use crate::entry::{DirScanner, ScannedEntry};
use crate::error::FatError;
use crate::reader::EntryState;

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Resolve `path` from the volume root, returning the [`EntryState`] for
/// whatever it names (file or directory).
pub fn resolve<D: BlockDevice>(
    geometry: &Geometry,
    device: &D,
    path: &str,
) -> Result<EntryState, FatError<D::Error>> {
    let mut state = EntryState::root(geometry);
    let mut parts = components(path).peekable();

    while let Some(name) = parts.next() {
        if !state.is_directory() {
            return Err(FatError::BadFileType);
        }
        let mut scanner = DirScanner::new(geometry, device, state);
        let found = scanner
            .find(&mut (), name)?
            .ok_or(FatError::FileNotFound)?;
        if parts.peek().is_some() && !found.is_directory() {
            return Err(FatError::BadFileType);
        }
        state = found.into_state();
    }

    Ok(state)
}

/// Resolve `path` as a directory and invoke `visit` for every live entry
/// in it, reassembling long names as it scans.
pub fn resolve_dir_list<D: BlockDevice, H: ReadHook, F: FnMut(&ScannedEntry)>(
    geometry: &Geometry,
    device: &D,
    path: &str,
    hook: &mut H,
    visit: F,
) -> Result<(), FatError<D::Error>> {
    let mut state = EntryState::root(geometry);
    for name in components(path) {
        if !state.is_directory() {
            return Err(FatError::BadFileType);
        }
        let mut scanner = DirScanner::new(geometry, device, state);
        let found = scanner
            .find(&mut (), name)?
            .ok_or(FatError::FileNotFound)?;
        state = found.into_state();
    }
    if !state.is_directory() {
        return Err(FatError::BadFileType);
    }

    let mut scanner = DirScanner::new(geometry, device, state);
    scanner.for_each(hook, visit)
}
