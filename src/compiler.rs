//! Pattern compilation
//!
//! Every entry point copies the caller's pattern bytes into a private
//! NUL-terminated buffer before the engine sees them. Compiler diagnostics
//! come back as [`Error::Compile`]; the engine's error object is released
//! before the function returns, whichever way it returns.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;

use crate::database::Database;
use crate::error::{CompileError, Error, Result, Status};
use crate::ffi;
use crate::native::{CompileErrorGuard, EngineAlloc};
use crate::platform::{platform_ptr, Platform};

/// Static properties of a single expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionInfo {
    pub min_width: u32,
    /// `u32::MAX` when the expression can match arbitrarily long input.
    pub max_width: u32,
    pub unordered_matches: bool,
    pub matches_at_eod: bool,
    pub matches_only_at_eod: bool,
}

fn to_cstring(expression: &[u8], index: usize) -> Result<CString> {
    CString::new(expression).map_err(|_| Error::InteriorNul { index })
}

/// Turn the status of a compile-family call into a `Result`, consuming
/// the compile error when there is one.
fn finish(code: c_int, compile_error: CompileErrorGuard) -> Result<()> {
    match Status::from_code(code) {
        Status::Success => Ok(()),
        Status::CompilerError => {
            let (message, expression) = compile_error
                .read()
                .unwrap_or_else(|| (String::from("unknown compile error"), -1));
            Err(Error::Compile(CompileError { message, expression }))
        }
        status => Err(Error::Native(status)),
    }
}

/// Compile one expression into a database.
pub fn compile(
    expression: &[u8],
    flags: u32,
    mode: u32,
    platform: Option<&Platform>,
) -> Result<Database> {
    let expression = to_cstring(expression, 0)?;
    let mut db = ptr::null_mut();
    let mut compile_error = CompileErrorGuard::null();

    let code = unsafe {
        ffi::hs_compile(
            expression.as_ptr(),
            flags,
            mode,
            platform_ptr(platform),
            &mut db,
            compile_error.as_out(),
        )
    };
    finish(code, compile_error)?;
    Database::from_raw(db)
}

/// Compile several expressions into one database.
///
/// `flags[i]` and `ids[i]` belong to `expressions[i]`; the ids are what
/// scans report and need not be unique.
pub fn compile_multi<P: AsRef<[u8]>>(
    expressions: &[P],
    flags: &[u32],
    ids: &[u32],
    mode: u32,
    platform: Option<&Platform>,
) -> Result<Database> {
    if expressions.len() != flags.len() || expressions.len() != ids.len() {
        return Err(Error::LengthMismatch {
            expressions: expressions.len(),
            flags: flags.len(),
            ids: ids.len(),
        });
    }
    let elements = u32::try_from(expressions.len()).map_err(|_| Error::Native(Status::Invalid))?;

    // Owns every copied pattern until after the engine call returns.
    let owned = expressions
        .iter()
        .enumerate()
        .map(|(index, expression)| to_cstring(expression.as_ref(), index))
        .collect::<Result<Vec<_>>>()?;
    let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();

    let mut db = ptr::null_mut();
    let mut compile_error = CompileErrorGuard::null();

    let code = unsafe {
        ffi::hs_compile_multi(
            pointers.as_ptr(),
            flags.as_ptr(),
            ids.as_ptr(),
            elements,
            mode,
            platform_ptr(platform),
            &mut db,
            compile_error.as_out(),
        )
    };
    finish(code, compile_error)?;
    Database::from_raw(db)
}

/// Analyse an expression without building a database.
pub fn expression_info(expression: &[u8], flags: u32) -> Result<ExpressionInfo> {
    let expression = to_cstring(expression, 0)?;
    let mut info = EngineAlloc::<ffi::hs_expr_info_t>::null();
    let mut compile_error = CompileErrorGuard::null();

    let code = unsafe {
        ffi::hs_expression_info(expression.as_ptr(), flags, info.as_out(), compile_error.as_out())
    };
    finish(code, compile_error)?;

    if info.is_null() {
        return Err(Error::Native(Status::Invalid));
    }
    let raw = unsafe { &*info.as_ptr() };
    Ok(ExpressionInfo {
        min_width: raw.min_width,
        max_width: raw.max_width,
        unordered_matches: raw.unordered_matches != 0,
        matches_at_eod: raw.matches_at_eod != 0,
        matches_only_at_eod: raw.matches_only_at_eod != 0,
    })
}
