//! Host platform descriptor
//!
//! A [`Platform`] records the CPU tuning and feature bits a database is
//! compiled for. Passing `None` to the compiler means "whatever the engine
//! detects at runtime".

use std::ffi::CStr;
use std::os::raw::c_int;

use crate::error::{check, Result, Status};
use crate::ffi;

/// Owned platform descriptor, populated from the current host.
pub struct Platform {
    info: Box<ffi::hs_platform_info_t>,
}

/// Plain copy of a platform descriptor's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub tune: u32,
    pub cpu_features: u64,
    pub reserved1: u64,
    pub reserved2: u64,
}

impl Platform {
    /// Describe the CPU this process is running on.
    pub fn populate() -> Result<Platform> {
        // Plain C struct of integers; all-zero is a valid value.
        let mut info = Box::new(unsafe { std::mem::zeroed::<ffi::hs_platform_info_t>() });
        check(unsafe { ffi::hs_populate_platform(&mut *info) })?;
        Ok(Platform { info })
    }

    pub fn descriptor(&self) -> PlatformDescriptor {
        PlatformDescriptor {
            tune: self.info.tune,
            cpu_features: self.info.cpu_features,
            reserved1: self.info.reserved1,
            reserved2: self.info.reserved2,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::hs_platform_info_t {
        &*self.info
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Platform").field(&self.descriptor()).finish()
    }
}

/// Pointer for an optional platform; null selects runtime defaults.
pub(crate) fn platform_ptr(platform: Option<&Platform>) -> *const ffi::hs_platform_info_t {
    platform.map_or(std::ptr::null(), Platform::as_ptr)
}

/// Whether the engine supports this CPU.
///
/// An unsupported architecture is an answer, not a failure.
pub fn valid_platform() -> Result<bool> {
    platform_status(unsafe { ffi::hs_valid_platform() })
}

fn platform_status(code: c_int) -> Result<bool> {
    match Status::from_code(code) {
        Status::Success => Ok(true),
        Status::UnsupportedArchitecture => Ok(false),
        status => Err(status.into()),
    }
}

/// Engine release string, e.g. `"5.4.2 2023-08-17"`.
pub fn version() -> &'static str {
    // The engine returns a pointer to static storage.
    unsafe { CStr::from_ptr(ffi::hs_version()) }
        .to_str()
        .unwrap_or("unknown")
}
