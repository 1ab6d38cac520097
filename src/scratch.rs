//! Per-scan scratch space
//!
//! A scratch region is the engine's mutable working memory. Scans borrow it
//! mutably, so one `Scratch` can never serve two scans at once; concurrent
//! scans each need their own, obtained with [`Scratch::try_clone`].

use std::ptr::{self, NonNull};

use crate::database::Database;
use crate::error::{check, Error, Result, Status};
use crate::ffi;

pub struct Scratch {
    /// `None` after a failed grow: the engine released the region.
    ptr: Option<NonNull<ffi::hs_scratch_t>>,
}

unsafe impl Send for Scratch {}
// Shared references only reach `hs_scratch_size` and `hs_clone_scratch`,
// which read the region. Scanning and growing need `&mut`.
unsafe impl Sync for Scratch {}

impl Scratch {
    /// Allocate scratch large enough for `db`.
    pub fn alloc(db: &Database) -> Result<Scratch> {
        let mut scratch = ptr::null_mut();
        check(unsafe { ffi::hs_alloc_scratch(db.as_ptr(), &mut scratch) })?;
        Scratch::from_raw(scratch)
    }

    fn from_raw(scratch: *mut ffi::hs_scratch_t) -> Result<Scratch> {
        NonNull::new(scratch)
            .map(|ptr| Scratch { ptr: Some(ptr) })
            .ok_or(Error::Native(Status::Invalid))
    }

    fn region(&self) -> Result<NonNull<ffi::hs_scratch_t>> {
        self.ptr.ok_or(Error::Native(Status::Invalid))
    }

    /// Grow this scratch so it also fits `db`. Never shrinks; a no-op when
    /// the current capacity already suffices.
    ///
    /// If the engine cannot allocate the larger region it has already
    /// freed the old one. The scratch is then empty: other calls fail with
    /// `HS_INVALID` until a later `grow` succeeds.
    pub fn grow(&mut self, db: &Database) -> Result<()> {
        let mut scratch = self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr);
        let code = unsafe { ffi::hs_alloc_scratch(db.as_ptr(), &mut scratch) };
        // The out-pointer is authoritative on failure too.
        self.ptr = NonNull::new(scratch);
        check(code)
    }

    /// Independent scratch with the same capacity, for use on another thread.
    pub fn try_clone(&self) -> Result<Scratch> {
        let src = self.region()?;
        let mut scratch = ptr::null_mut();
        check(unsafe { ffi::hs_clone_scratch(src.as_ptr(), &mut scratch) })?;
        Scratch::from_raw(scratch)
    }

    /// Bytes currently allocated for this scratch.
    pub fn size(&self) -> Result<usize> {
        let region = self.region()?;
        let mut size = 0;
        check(unsafe { ffi::hs_scratch_size(region.as_ptr(), &mut size) })?;
        Ok(size as usize)
    }

    pub(crate) fn as_mut_ptr(&mut self) -> Result<*mut ffi::hs_scratch_t> {
        self.region().map(NonNull::as_ptr)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            return;
        };
        if let Err(e) = check(unsafe { ffi::hs_free_scratch(ptr.as_ptr()) }) {
            log::warn!("hs_free_scratch failed: {e}");
        }
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch").field("ptr", &self.ptr).finish()
    }
}
