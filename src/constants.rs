//! Name lookup for compile flags and modes
//!
//! Names are the engine's own macro names (`HS_FLAG_CASELESS`,
//! `HS_MODE_BLOCK`, ...). Unknown names are an error, never a default.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::ffi;

static FLAGS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("HS_FLAG_CASELESS", ffi::HS_FLAG_CASELESS),
        ("HS_FLAG_DOTALL", ffi::HS_FLAG_DOTALL),
        ("HS_FLAG_MULTILINE", ffi::HS_FLAG_MULTILINE),
        ("HS_FLAG_SINGLEMATCH", ffi::HS_FLAG_SINGLEMATCH),
        ("HS_FLAG_ALLOWEMPTY", ffi::HS_FLAG_ALLOWEMPTY),
        ("HS_FLAG_UTF8", ffi::HS_FLAG_UTF8),
        ("HS_FLAG_UCP", ffi::HS_FLAG_UCP),
        ("HS_FLAG_PREFILTER", ffi::HS_FLAG_PREFILTER),
        ("HS_FLAG_SOM_LEFTMOST", ffi::HS_FLAG_SOM_LEFTMOST),
        ("HS_FLAG_COMBINATION", ffi::HS_FLAG_COMBINATION),
        ("HS_FLAG_QUIET", ffi::HS_FLAG_QUIET),
    ])
});

static MODES: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("HS_MODE_BLOCK", ffi::HS_MODE_BLOCK),
        ("HS_MODE_NOSTREAM", ffi::HS_MODE_NOSTREAM),
        ("HS_MODE_STREAM", ffi::HS_MODE_STREAM),
        ("HS_MODE_VECTORED", ffi::HS_MODE_VECTORED),
        ("HS_MODE_SOM_HORIZON_LARGE", ffi::HS_MODE_SOM_HORIZON_LARGE),
        ("HS_MODE_SOM_HORIZON_MEDIUM", ffi::HS_MODE_SOM_HORIZON_MEDIUM),
        ("HS_MODE_SOM_HORIZON_SMALL", ffi::HS_MODE_SOM_HORIZON_SMALL),
    ])
});

/// Resolve a single compile flag by name.
pub fn flag(name: &str) -> Result<u32> {
    FLAGS
        .get(name)
        .copied()
        .ok_or_else(|| Error::UnknownFlag(name.to_string()))
}

/// Resolve and OR together a list of flag names.
pub fn flags<S: AsRef<str>>(names: &[S]) -> Result<u32> {
    names
        .iter()
        .try_fold(0, |acc, name| Ok(acc | flag(name.as_ref())?))
}

/// Resolve a mode by name.
pub fn mode(name: &str) -> Result<u32> {
    MODES
        .get(name)
        .copied()
        .ok_or_else(|| Error::UnknownMode(name.to_string()))
}

/// All recognised flag names, sorted.
pub fn flag_names() -> Vec<&'static str> {
    let mut names: Vec<_> = FLAGS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// All recognised mode names, sorted.
pub fn mode_names() -> Vec<&'static str> {
    let mut names: Vec<_> = MODES.keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_lookup() {
        assert_eq!(flag("HS_FLAG_CASELESS"), Ok(1));
        assert_eq!(flag("HS_FLAG_SOM_LEFTMOST"), Ok(256));
        assert_eq!(flag("HS_FLAG_QUIET"), Ok(1024));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert_eq!(flag("HS_FLAG_NOPE"), Err(Error::UnknownFlag("HS_FLAG_NOPE".into())));
        // Lookup is exact, not case-folded.
        assert!(flag("hs_flag_caseless").is_err());
        assert!(flag("").is_err());
    }

    #[test]
    fn test_flags_combine() {
        assert_eq!(flags(&["HS_FLAG_CASELESS", "HS_FLAG_DOTALL"]), Ok(3));
        assert_eq!(flags::<&str>(&[]), Ok(0));
        assert!(flags(&["HS_FLAG_UTF8", "HS_FLAG_BOGUS"]).is_err());
    }

    #[test]
    fn test_mode_lookup() {
        assert_eq!(mode("HS_MODE_BLOCK"), Ok(1));
        assert_eq!(mode("HS_MODE_NOSTREAM"), mode("HS_MODE_BLOCK"));
        assert_eq!(mode("HS_MODE_STREAM"), Ok(2));
        assert_eq!(mode("HS_MODE_SOM_HORIZON_SMALL"), Ok(1 << 26));
        assert_eq!(mode("HS_MODE_BLOCKED"), Err(Error::UnknownMode("HS_MODE_BLOCKED".into())));
    }

    #[test]
    fn test_name_listings() {
        assert_eq!(flag_names().len(), 11);
        assert_eq!(mode_names().len(), 7);
        assert!(mode_names().contains(&"HS_MODE_VECTORED"));
    }
}
