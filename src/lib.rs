//! Hyperscan Native Rust Extension
//!
//! Exposes the Hyperscan multi-pattern regex engine to Python.
//! Releases the GIL while compiling and scanning; each thread scanning
//! concurrently must bring its own scratch (see `clone_scratch`).
//!
//! The safe Rust layer underneath ([`compile`], [`Database`], [`Scratch`],
//! [`scan`], ...) is usable on its own.

use hyperscan_sys as ffi;
use pyo3::prelude::*;

mod compiler;
mod constants;
mod database;
mod error;
mod handles;
mod native;
mod platform;
mod scanner;
mod scratch;

pub use compiler::{compile, compile_multi, expression_info, ExpressionInfo};
pub use constants::{flag, flag_names, flags, mode, mode_names};
pub use database::{serialized_info, serialized_size, Database};
pub use error::{CompileError, Error, Result, Status};
pub use platform::{valid_platform, version, Platform, PlatformDescriptor};
pub use scanner::{scan, scan_events, scan_ids, scan_ids_batch, scan_matched, MatchEvent, Matching};
pub use scratch::Scratch;

use handles::{
    Expression, PyDatabase, PyExpressionInfo, PyMatchEvent, PyPlatform, PyScratch,
};

/// Hyperscan native extension module
#[pymodule]
fn _rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPlatform>()?;
    m.add_class::<PyDatabase>()?;
    m.add_class::<PyScratch>()?;
    m.add_class::<PyExpressionInfo>()?;
    m.add_class::<PyMatchEvent>()?;
    m.add("HyperscanError", m.py().get_type_bound::<handles::HyperscanError>())?;
    m.add("CompileError", m.py().get_type_bound::<handles::CompileError>())?;

    // Platform
    m.add_function(wrap_pyfunction!(populate_platform, m)?)?;
    m.add_function(wrap_pyfunction!(py_valid_platform, m)?)?;
    m.add_function(wrap_pyfunction!(py_version, m)?)?;

    // Constants
    m.add_function(wrap_pyfunction!(py_flag, m)?)?;
    m.add_function(wrap_pyfunction!(py_flags, m)?)?;
    m.add_function(wrap_pyfunction!(py_mode, m)?)?;

    // Compilation
    m.add_function(wrap_pyfunction!(py_compile, m)?)?;
    m.add_function(wrap_pyfunction!(py_compile_multi, m)?)?;
    m.add_function(wrap_pyfunction!(py_expression_info, m)?)?;
    m.add_function(wrap_pyfunction!(deserialize_database, m)?)?;

    // Scratch
    m.add_function(wrap_pyfunction!(alloc_scratch, m)?)?;
    m.add_function(wrap_pyfunction!(realloc_scratch, m)?)?;
    m.add_function(wrap_pyfunction!(clone_scratch, m)?)?;

    // Scanning
    m.add_function(wrap_pyfunction!(py_match, m)?)?;
    m.add_function(wrap_pyfunction!(match_multi, m)?)?;
    m.add_function(wrap_pyfunction!(match_events, m)?)?;
    m.add_function(wrap_pyfunction!(match_multi_batch, m)?)?;
    Ok(())
}

/// Describe the CPU this process runs on
#[pyfunction]
fn populate_platform() -> PyResult<PyPlatform> {
    Ok(PyPlatform {
        inner: Platform::populate()?,
    })
}

/// Whether the engine supports this CPU
#[pyfunction]
#[pyo3(name = "valid_platform")]
fn py_valid_platform() -> PyResult<bool> {
    Ok(valid_platform()?)
}

/// Engine version string
#[pyfunction]
#[pyo3(name = "version")]
fn py_version() -> &'static str {
    version()
}

/// Value of a compile flag, by its engine name (e.g. "HS_FLAG_CASELESS")
#[pyfunction]
#[pyo3(name = "flag")]
fn py_flag(name: &str) -> PyResult<u32> {
    Ok(flag(name)?)
}

/// OR of several compile flags, by name
#[pyfunction]
#[pyo3(name = "flags")]
fn py_flags(names: Vec<String>) -> PyResult<u32> {
    Ok(flags(&names)?)
}

/// Value of a compile mode, by its engine name (e.g. "HS_MODE_BLOCK")
#[pyfunction]
#[pyo3(name = "mode")]
fn py_mode(name: &str) -> PyResult<u32> {
    Ok(mode(name)?)
}

/// Compile one expression
#[pyfunction]
#[pyo3(name = "compile", signature = (expression, flags, mode, platform=None))]
fn py_compile(
    py: Python<'_>,
    expression: Expression,
    flags: u32,
    mode: u32,
    platform: Option<PyRef<'_, PyPlatform>>,
) -> PyResult<PyDatabase> {
    let platform = platform.as_deref().map(|p| &p.inner);
    let db = py.allow_threads(|| compile(expression.as_ref(), flags, mode, platform))?;
    Ok(PyDatabase { inner: db })
}

/// Compile several expressions into one database
///
/// `expressions`, `flags` and `ids` are parallel lists of equal length.
#[pyfunction]
#[pyo3(name = "compile_multi", signature = (expressions, flags, ids, mode, platform=None))]
fn py_compile_multi(
    py: Python<'_>,
    expressions: Vec<Expression>,
    flags: Vec<u32>,
    ids: Vec<u32>,
    mode: u32,
    platform: Option<PyRef<'_, PyPlatform>>,
) -> PyResult<PyDatabase> {
    let platform = platform.as_deref().map(|p| &p.inner);
    let db = py.allow_threads(|| compile_multi(&expressions, &flags, &ids, mode, platform))?;
    log::debug!("compiled database from {} expressions", expressions.len());
    Ok(PyDatabase { inner: db })
}

/// Analyse an expression without compiling a database
#[pyfunction]
#[pyo3(name = "expression_info")]
fn py_expression_info(expression: Expression, flags: u32) -> PyResult<PyExpressionInfo> {
    Ok(expression_info(expression.as_ref(), flags)?.into())
}

/// Rebuild a database from `Database.serialize()` output
#[pyfunction]
fn deserialize_database(py: Python<'_>, data: &[u8]) -> PyResult<PyDatabase> {
    let db = py.allow_threads(|| Database::deserialize(data))?;
    Ok(PyDatabase { inner: db })
}

/// Allocate scratch space for `db`
#[pyfunction]
fn alloc_scratch(db: &PyDatabase) -> PyResult<PyScratch> {
    Ok(PyScratch::new(Scratch::alloc(&db.inner)?))
}

/// Grow `scratch` so it can also be used with `db`
#[pyfunction]
fn realloc_scratch(py: Python<'_>, db: &PyDatabase, scratch: &PyScratch) -> PyResult<()> {
    Ok(py.allow_threads(|| scratch.lock().grow(&db.inner))?)
}

/// Independent copy of `scratch`, for another thread
#[pyfunction]
fn clone_scratch(py: Python<'_>, scratch: &PyScratch) -> PyResult<PyScratch> {
    let cloned = py.allow_threads(|| scratch.lock().try_clone())?;
    Ok(PyScratch::new(cloned))
}

/// True if any pattern in `db` matches `data`
#[pyfunction]
#[pyo3(name = "match")]
fn py_match(py: Python<'_>, db: &PyDatabase, data: &[u8], scratch: &PyScratch) -> PyResult<bool> {
    let matched = py.allow_threads(|| scan_matched(&db.inner, data, &mut scratch.lock()))?;
    Ok(matched)
}

/// Ids of every match of `db` in `data`, in engine report order
#[pyfunction]
fn match_multi(py: Python<'_>, db: &PyDatabase, data: &[u8], scratch: &PyScratch) -> PyResult<Vec<u32>> {
    Ok(py.allow_threads(|| scan_ids(&db.inner, data, &mut scratch.lock()))?)
}

/// Every match of `db` in `data` with its offsets
#[pyfunction]
fn match_events(
    py: Python<'_>,
    db: &PyDatabase,
    data: &[u8],
    scratch: &PyScratch,
) -> PyResult<Vec<PyMatchEvent>> {
    let events = py.allow_threads(|| scan_events(&db.inner, data, &mut scratch.lock()))?;
    Ok(events.into_iter().map(PyMatchEvent::from).collect())
}

/// `match_multi` over many buffers in parallel, one cloned scratch per worker
#[pyfunction]
fn match_multi_batch(
    py: Python<'_>,
    db: &PyDatabase,
    buffers: Vec<Vec<u8>>,
    scratch: &PyScratch,
) -> PyResult<Vec<Vec<u32>>> {
    Ok(py.allow_threads(|| scan_ids_batch(&db.inner, &buffers, &scratch.lock()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    fn with_py<F: FnOnce(Python<'_>)>(f: F) {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(f);
    }

    #[test]
    fn test_compile_and_match() {
        with_py(|py| {
            let block = mode("HS_MODE_BLOCK").unwrap();
            let db = py_compile(py, Expression::Text("he(l+)o".into()), 0, block, None).unwrap();
            let scratch = alloc_scratch(&db).unwrap();
            assert!(py_match(py, &db, b"well hello there", &scratch).unwrap());
            assert!(!py_match(py, &db, b"goodbye", &scratch).unwrap());
        });
    }

    #[test]
    fn test_compile_multi_and_match_multi() {
        with_py(|py| {
            let exprs = vec![Expression::Text("a".into()), Expression::Bytes(b"b".to_vec())];
            let db = py_compile_multi(py, exprs, vec![0, 0], vec![1, 2], 1, None).unwrap();
            let scratch = alloc_scratch(&db).unwrap();
            let mut ids = match_multi(py, &db, b"ab", &scratch).unwrap();
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 2]);
        });
    }

    #[test]
    fn test_compile_multi_mismatch_raises_value_error() {
        with_py(|py| {
            let exprs = vec![Expression::Text("a".into())];
            let err = py_compile_multi(py, exprs, vec![0, 0], vec![1], 1, None).err().unwrap();
            assert!(err.is_instance_of::<pyo3::exceptions::PyValueError>(py));
        });
    }

    #[test]
    fn test_compile_error_raises() {
        with_py(|py| {
            let err = py_compile(py, Expression::Text("(".into()), 0, 1, None).err().unwrap();
            assert!(err.is_instance_of::<handles::CompileError>(py));
        });
    }

    #[test]
    fn test_scratch_functions() {
        with_py(|py| {
            let small = py_compile(py, Expression::Text("a".into()), 0, 1, None).unwrap();
            let big = py_compile(py, Expression::Text("foo[a-z]{2,30}bar".into()), 0, 1, None).unwrap();
            let scratch = alloc_scratch(&small).unwrap();
            realloc_scratch(py, &big, &scratch).unwrap();
            let cloned = clone_scratch(py, &scratch).unwrap();
            assert_eq!(scratch.lock().size().unwrap(), cloned.lock().size().unwrap());
            assert!(py_match(py, &big, b"fooxyzbar", &cloned).unwrap());
        });
    }

    #[test]
    fn test_match_multi_batch() {
        with_py(|py| {
            let exprs = vec![Expression::Text("x".into()), Expression::Text("y".into())];
            let db = py_compile_multi(py, exprs, vec![0, 0], vec![10, 20], 1, None).unwrap();
            let scratch = alloc_scratch(&db).unwrap();
            let buffers = vec![b"x".to_vec(), b"nothing".to_vec(), b"y".to_vec()];
            let results = match_multi_batch(py, &db, buffers, &scratch).unwrap();
            assert_eq!(results, vec![vec![10], vec![], vec![20]]);
        });
    }

    #[test]
    fn test_deserialize_roundtrip() {
        with_py(|py| {
            let db = py_compile(py, Expression::Text("abc".into()), 0, 1, None).unwrap();
            let bytes = db.inner.serialize().unwrap();
            let restored = deserialize_database(py, &bytes).unwrap();
            let scratch = alloc_scratch(&restored).unwrap();
            assert!(py_match(py, &restored, b"xxabcxx", &scratch).unwrap());
        });
    }

    /// Run `call` on a Python thread while another thread holds the scratch
    /// lock, and check that the interpreter stays available meanwhile.
    fn assert_waits_without_gil<F>(py: Python<'_>, scratch: &PyScratch, call: F)
    where
        F: Fn(Python<'_>) -> PyResult<()> + Send + Sync,
    {
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let call = &call;

        py.allow_threads(move || {
            thread::scope(|s| {
                // Stands in for a long scan on the same handle.
                s.spawn(move || {
                    let _guard = scratch.lock();
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
                locked_rx.recv().unwrap();

                let waiter = s.spawn(move || Python::with_gil(|py| call(py)));
                // Blocks forever if the waiter kept the GIL while queued on the lock.
                Python::with_gil(|_| ());
                release_tx.send(()).unwrap();
                waiter.join().unwrap().unwrap();
            });
        });
    }

    #[test]
    fn test_scratch_calls_release_gil_while_waiting() {
        with_py(|py| {
            let db = py_compile(py, Expression::Text("abc".into()), 0, 1, None).unwrap();
            let scratch = alloc_scratch(&db).unwrap();

            assert_waits_without_gil(py, &scratch, |py| clone_scratch(py, &scratch).map(drop));
            assert_waits_without_gil(py, &scratch, |py| realloc_scratch(py, &db, &scratch));
            assert_waits_without_gil(py, &scratch, |py| scratch.size(py).map(drop));
        });
    }
}
