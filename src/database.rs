//! Compiled pattern databases
//!
//! A [`Database`] exclusively owns one engine automaton and frees it when
//! dropped. It is never mutated after compilation, so it can be shared
//! between threads that each bring their own [`Scratch`](crate::Scratch).

use std::os::raw::c_char;
use std::ptr::{self, NonNull};

use crate::error::{check, Error, Result, Status};
use crate::ffi;
use crate::native::EngineAlloc;

pub struct Database {
    ptr: NonNull<ffi::hs_database_t>,
}

// The engine only reads a database during scans.
unsafe impl Send for Database {}
unsafe impl Sync for Database {}

impl Database {
    /// Take ownership of a database the engine just produced.
    pub(crate) fn from_raw(ptr: *mut ffi::hs_database_t) -> Result<Database> {
        NonNull::new(ptr)
            .map(|ptr| Database { ptr })
            .ok_or(Error::Native(Status::Invalid))
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::hs_database_t {
        self.ptr.as_ptr()
    }

    /// Encode the database into the engine's portable byte format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = EngineAlloc::<c_char>::null();
        let mut length = 0;
        check(unsafe { ffi::hs_serialize_database(self.as_ptr(), bytes.as_out(), &mut length) })?;
        Ok(bytes.to_vec(length as usize))
    }

    /// Rebuild a database from bytes produced by [`Database::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Database> {
        let mut db = ptr::null_mut();
        check(unsafe {
            ffi::hs_deserialize_database(bytes.as_ptr() as *const c_char, bytes.len() as _, &mut db)
        })?;
        Database::from_raw(db)
    }

    /// Bytes of memory the compiled automaton occupies.
    pub fn size(&self) -> Result<usize> {
        let mut size = 0;
        check(unsafe { ffi::hs_database_size(self.as_ptr(), &mut size) })?;
        Ok(size as usize)
    }

    /// Free-form description of the database (version, platform, mode).
    pub fn info(&self) -> Result<String> {
        let mut info = EngineAlloc::<c_char>::null();
        check(unsafe { ffi::hs_database_info(self.as_ptr(), info.as_out()) })?;
        Ok(info.to_string_lossy())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = check(unsafe { ffi::hs_free_database(self.ptr.as_ptr()) }) {
            log::warn!("hs_free_database failed: {e}");
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("ptr", &self.ptr).finish()
    }
}

/// Size a serialized database will need once deserialized.
pub fn serialized_size(bytes: &[u8]) -> Result<usize> {
    let mut size = 0;
    check(unsafe {
        ffi::hs_serialized_database_size(bytes.as_ptr() as *const c_char, bytes.len() as _, &mut size)
    })?;
    Ok(size as usize)
}

/// Describe a serialized database without deserializing it.
pub fn serialized_info(bytes: &[u8]) -> Result<String> {
    let mut info = EngineAlloc::<c_char>::null();
    check(unsafe {
        ffi::hs_serialized_database_info(bytes.as_ptr() as *const c_char, bytes.len() as _, info.as_out())
    })?;
    Ok(info.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::ffi::{HS_FLAG_CASELESS, HS_MODE_BLOCK, HS_MODE_STREAM};

    fn block_db(expr: &str) -> Database {
        compile(expr.as_bytes(), 0, HS_MODE_BLOCK, None).unwrap()
    }

    #[test]
    fn test_size_and_info() {
        let db = block_db("foo[0-9]+bar");
        assert!(db.size().unwrap() > 0);
        let info = db.info().unwrap();
        assert!(info.contains("Version"), "unexpected info: {info}");
        assert!(info.contains("BLOCK"), "unexpected info: {info}");
    }

    #[test]
    fn test_streaming_info() {
        let db = compile(b"abc", 0, HS_MODE_STREAM, None).unwrap();
        assert!(db.info().unwrap().contains("STREAM"));
    }

    #[test]
    fn test_serialize_roundtrip_preserves_size() {
        let db = compile(b"hello.*world", HS_FLAG_CASELESS, HS_MODE_BLOCK, None).unwrap();
        let bytes = db.serialize().unwrap();
        assert!(!bytes.is_empty());

        let restored = Database::deserialize(&bytes).unwrap();
        assert_eq!(restored.size().unwrap(), db.size().unwrap());
        assert_eq!(restored.info().unwrap(), db.info().unwrap());
    }

    #[test]
    fn test_serialized_introspection() {
        let db = block_db("a+b");
        let bytes = db.serialize().unwrap();
        assert_eq!(serialized_size(&bytes).unwrap(), db.size().unwrap());
        assert_eq!(serialized_info(&bytes).unwrap(), db.info().unwrap());
    }

    #[test]
    fn test_deserialize_garbage() {
        assert!(matches!(
            Database::deserialize(b"definitely not a database"),
            Err(Error::Native(_))
        ));
        assert!(Database::deserialize(&[]).is_err());
    }

    #[test]
    fn test_database_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }
}
