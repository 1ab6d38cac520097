//! Python handle types
//!
//! Each class owns one native resource. CPython's refcounting drops the
//! Rust value when the last Python reference goes away, which frees the
//! engine object exactly once.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};

use crate::compiler::ExpressionInfo;
use crate::database::Database;
use crate::error::Error;
use crate::platform::Platform;
use crate::scanner::MatchEvent;
use crate::scratch::Scratch;

create_exception!(
    _rust,
    HyperscanError,
    PyException,
    "The engine returned a non-success status; args[0] is its name."
);
create_exception!(
    _rust,
    CompileError,
    HyperscanError,
    "The engine's compiler rejected a pattern; args are (message, expression index)."
);

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        match err {
            Error::Native(status) => HyperscanError::new_err(status.name()),
            Error::Compile(e) => CompileError::new_err((e.message, e.expression)),
            malformed => PyValueError::new_err(malformed.to_string()),
        }
    }
}

/// A pattern as Python hands it over: `str` is taken as UTF-8.
#[derive(FromPyObject)]
pub enum Expression {
    #[pyo3(transparent)]
    Text(String),
    #[pyo3(transparent)]
    Bytes(Vec<u8>),
}

impl AsRef<[u8]> for Expression {
    fn as_ref(&self) -> &[u8] {
        match self {
            Expression::Text(s) => s.as_bytes(),
            Expression::Bytes(b) => b,
        }
    }
}

/// Platform descriptor of the current host
#[pyclass(name = "Platform", module = "hyperscan_native._rust", frozen)]
pub struct PyPlatform {
    pub(crate) inner: Platform,
}

#[pymethods]
impl PyPlatform {
    /// Fields as a dict: tune, cpu_features, reserved1, reserved2
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let d = self.inner.descriptor();
        let dict = PyDict::new_bound(py);
        dict.set_item("tune", d.tune)?;
        dict.set_item("cpu_features", d.cpu_features)?;
        dict.set_item("reserved1", d.reserved1)?;
        dict.set_item("reserved2", d.reserved2)?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        let d = self.inner.descriptor();
        format!("Platform(tune={}, cpu_features={:#x})", d.tune, d.cpu_features)
    }
}

/// Compiled pattern database
#[pyclass(name = "Database", module = "hyperscan_native._rust", frozen)]
pub struct PyDatabase {
    pub(crate) inner: Database,
}

#[pymethods]
impl PyDatabase {
    /// Version, platform features and mode the database was built for
    fn info(&self) -> PyResult<String> {
        Ok(self.inner.info()?)
    }

    /// Bytes of memory used by the compiled database
    fn size(&self) -> PyResult<usize> {
        Ok(self.inner.size()?)
    }

    /// Portable encoding, accepted by `deserialize_database`
    fn serialize<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let bytes = self.inner.serialize()?;
        Ok(PyBytes::new_bound(py, &bytes))
    }
}

/// Scan scratch space. Scans holding it are serialised by the lock.
#[pyclass(name = "Scratch", module = "hyperscan_native._rust", frozen)]
pub struct PyScratch {
    inner: Mutex<Scratch>,
}

impl PyScratch {
    pub(crate) fn new(scratch: Scratch) -> Self {
        PyScratch {
            inner: Mutex::new(scratch),
        }
    }

    /// A scan that panicked cannot leave the scratch half-written: the
    /// engine call has already returned by then.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Scratch> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[pymethods]
impl PyScratch {
    /// Bytes currently allocated
    pub(crate) fn size(&self, py: Python<'_>) -> PyResult<usize> {
        Ok(py.allow_threads(|| self.lock().size())?)
    }
}

/// Static properties of one expression
#[pyclass(name = "ExpressionInfo", module = "hyperscan_native._rust", frozen, get_all)]
pub struct PyExpressionInfo {
    min_width: u32,
    max_width: u32,
    unordered_matches: bool,
    matches_at_eod: bool,
    matches_only_at_eod: bool,
}

impl From<ExpressionInfo> for PyExpressionInfo {
    fn from(info: ExpressionInfo) -> Self {
        PyExpressionInfo {
            min_width: info.min_width,
            max_width: info.max_width,
            unordered_matches: info.unordered_matches,
            matches_at_eod: info.matches_at_eod,
            matches_only_at_eod: info.matches_only_at_eod,
        }
    }
}

#[pymethods]
impl PyExpressionInfo {
    fn __repr__(&self) -> String {
        format!(
            "ExpressionInfo(min_width={}, max_width={}, unordered_matches={}, matches_at_eod={}, matches_only_at_eod={})",
            self.min_width,
            self.max_width,
            self.unordered_matches,
            self.matches_at_eod,
            self.matches_only_at_eod
        )
    }
}

/// A single match: pattern id and the matched byte range
#[pyclass(name = "MatchEvent", module = "hyperscan_native._rust", frozen, get_all)]
pub struct PyMatchEvent {
    id: u32,
    start: u64,
    end: u64,
    flags: u32,
}

impl From<MatchEvent> for PyMatchEvent {
    fn from(event: MatchEvent) -> Self {
        PyMatchEvent {
            id: event.id,
            start: event.from,
            end: event.to,
            flags: event.flags,
        }
    }
}

#[pymethods]
impl PyMatchEvent {
    fn __repr__(&self) -> String {
        format!("MatchEvent(id={}, start={}, end={})", self.id, self.start, self.end)
    }
}
