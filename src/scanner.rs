//! Block-mode scanning
//!
//! The engine reports matches through a C callback. [`scan`] adapts that
//! protocol to a Rust closure; the closure lives on the caller's stack and
//! is only reachable for the duration of the native call.

use std::any::Any;
use std::os::raw::{c_char, c_int, c_uint, c_ulonglong, c_void};
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use crate::database::Database;
use crate::error::{Error, Result, Status};
use crate::ffi;
use crate::scratch::Scratch;

/// One match reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchEvent {
    pub id: u32,
    /// Start offset; only meaningful for patterns compiled with
    /// `HS_FLAG_SOM_LEFTMOST`, zero otherwise.
    pub from: u64,
    pub to: u64,
    pub flags: u32,
}

/// What the engine should do after a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matching {
    Continue,
    Terminate,
}

struct Context<F> {
    on_match: F,
    panic: Option<Box<dyn Any + Send>>,
}

unsafe extern "C" fn trampoline<F>(
    id: c_uint,
    from: c_ulonglong,
    to: c_ulonglong,
    flags: c_uint,
    context: *mut c_void,
) -> c_int
where
    F: FnMut(MatchEvent) -> Matching,
{
    let context = &mut *(context as *mut Context<F>);
    let event = MatchEvent { id, from, to, flags };

    // Unwinding into the engine's frames is undefined; park the panic and
    // stop the scan instead.
    match panic::catch_unwind(AssertUnwindSafe(|| (context.on_match)(event))) {
        Ok(Matching::Continue) => 0,
        Ok(Matching::Terminate) => 1,
        Err(payload) => {
            context.panic = Some(payload);
            1
        }
    }
}

/// Scan `data`, calling `on_match` for every match in engine order.
///
/// Returns `true` if `on_match` stopped the scan early.
pub fn scan<F>(db: &Database, data: &[u8], scratch: &mut Scratch, on_match: F) -> Result<bool>
where
    F: FnMut(MatchEvent) -> Matching,
{
    let length = c_uint::try_from(data.len()).map_err(|_| Error::BufferTooLarge(data.len()))?;
    let scratch = scratch.as_mut_ptr()?;
    let mut context = Context { on_match, panic: None };

    let code = unsafe {
        ffi::hs_scan(
            db.as_ptr(),
            data.as_ptr() as *const c_char,
            length,
            0,
            scratch,
            Some(trampoline::<F>),
            &mut context as *mut Context<F> as *mut c_void,
        )
    };

    if let Some(payload) = context.panic.take() {
        panic::resume_unwind(payload);
    }

    match Status::from_code(code) {
        Status::Success => Ok(false),
        Status::ScanTerminated => Ok(true),
        status => Err(Error::Native(status)),
    }
}

/// Whether any pattern matches `data`. Stops at the first match.
pub fn scan_matched(db: &Database, data: &[u8], scratch: &mut Scratch) -> Result<bool> {
    scan(db, data, scratch, |_| Matching::Terminate)
}

/// Ids of every match in `data`, in the order the engine reported them.
///
/// That order follows the engine's discovery, not necessarily ascending
/// offsets.
pub fn scan_ids(db: &Database, data: &[u8], scratch: &mut Scratch) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    scan(db, data, scratch, |event| {
        ids.push(event.id);
        Matching::Continue
    })?;
    Ok(ids)
}

/// Every match event in `data`, in engine order.
pub fn scan_events(db: &Database, data: &[u8], scratch: &mut Scratch) -> Result<Vec<MatchEvent>> {
    let mut events = Vec::new();
    scan(db, data, scratch, |event| {
        events.push(event);
        Matching::Continue
    })?;
    Ok(events)
}

/// Scan many buffers in parallel.
///
/// Each rayon worker scans with its own clone of `scratch`; the template
/// itself is only read. Results line up with `buffers`.
pub fn scan_ids_batch<B>(db: &Database, buffers: &[B], scratch: &Scratch) -> Result<Vec<Vec<u32>>>
where
    B: AsRef<[u8]> + Sync,
{
    buffers
        .par_iter()
        .map_init(
            || scratch.try_clone(),
            |worker_scratch, buffer| match worker_scratch {
                Ok(s) => scan_ids(db, (*buffer).as_ref(), s),
                Err(e) => Err(e.clone()),
            },
        )
        .collect()
}
