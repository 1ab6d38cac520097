//! Ownership guards for memory the engine hands back to us.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;

use crate::error::check;
use crate::ffi;

/// A buffer allocated by the engine's misc allocator (`malloc` unless the
/// host installed another one), released with `free` on drop.
pub(crate) struct EngineAlloc<T> {
    ptr: *mut T,
}

impl<T> EngineAlloc<T> {
    pub(crate) fn null() -> Self {
        EngineAlloc { ptr: ptr::null_mut() }
    }

    /// Out-pointer for the engine to fill.
    pub(crate) fn as_out(&mut self) -> *mut *mut T {
        &mut self.ptr
    }

    pub(crate) fn as_ptr(&self) -> *const T {
        self.ptr
    }

    pub(crate) fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl EngineAlloc<c_char> {
    /// Copy a NUL-terminated engine string into an owned `String`.
    pub(crate) fn to_string_lossy(&self) -> String {
        if self.ptr.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(self.ptr) }.to_string_lossy().into_owned()
    }

    /// Copy `len` bytes of an engine buffer into an owned `Vec`.
    pub(crate) fn to_vec(&self, len: usize) -> Vec<u8> {
        if self.ptr.is_null() || len == 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(self.ptr as *const u8, len) }.to_vec()
    }
}

impl<T> Drop for EngineAlloc<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { libc::free(self.ptr as *mut c_void) };
        }
    }
}

/// Holds an `hs_compile_error_t` until it has been converted, then frees it
/// through the engine.
pub(crate) struct CompileErrorGuard {
    ptr: *mut ffi::hs_compile_error_t,
}

impl CompileErrorGuard {
    pub(crate) fn null() -> Self {
        CompileErrorGuard { ptr: ptr::null_mut() }
    }

    pub(crate) fn as_out(&mut self) -> *mut *mut ffi::hs_compile_error_t {
        &mut self.ptr
    }

    /// Message and expression index, copied out of engine memory.
    pub(crate) fn read(&self) -> Option<(String, i32)> {
        if self.ptr.is_null() {
            return None;
        }
        let err = unsafe { &*self.ptr };
        let message = if err.message.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(err.message) }
                .to_string_lossy()
                .into_owned()
        };
        Some((message, err.expression))
    }
}

impl Drop for CompileErrorGuard {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        if let Err(e) = check(unsafe { ffi::hs_free_compile_error(self.ptr) }) {
            log::warn!("hs_free_compile_error failed: {e}");
        }
    }
}
