//! Format-specific readers
//!
//! Each reader turns one stream into an [`AtomSetCollection`]. Shared
//! frame plumbing lives here: the symmetry hand-off every
//! crystallographic reader performs when it closes a frame.

pub mod cif;
pub mod mol;
pub mod mol2;
pub mod pdb;
pub mod shelx;
pub mod xyz;

use std::io::BufRead;

use crate::options::LoadOptions;
use xmol_mol::AtomSetCollection;
use xmol_sym::apply_symmetry;

/// Hand the current frame to the symmetry engine when either the caller
/// asked for expansion or the frame's coordinates are fractional and
/// must be converted to Cartesian. A failed expansion never fails the
/// load; the frame is left as parsed.
pub(crate) fn apply_frame_symmetry(col: &mut AtomSetCollection, options: &LoadOptions) {
    if col.atom_count() == 0 {
        return;
    }
    if !options.requests_symmetry() && !col.coordinates_are_fractional {
        // Cartesian frame, no expansion asked for; keep the declared
        // cell and operators as plain metadata.
        return;
    }
    if let Err(e) = apply_symmetry(col, &options.symmetry_request()) {
        log::warn!("symmetry expansion skipped: {e}");
    }
}

/// Pull the next line from the stream. A mid-stream I/O failure is
/// recorded on the collection as its error message and reported as end
/// of input, so everything parsed before the failure survives.
pub(crate) fn read_line_or_flag(
    input: &mut dyn BufRead,
    buf: &mut String,
    col: &mut AtomSetCollection,
) -> usize {
    buf.clear();
    match input.read_line(buf) {
        Ok(n) => n,
        Err(err) => {
            if col.error_message.is_none() {
                col.error_message = Some(format!("read interrupted: {err}"));
            }
            0
        }
    }
}
