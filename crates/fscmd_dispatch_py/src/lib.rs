use std::collections::BTreeMap;

use fscmd_dispatch::{
    DispatchError, EnumFolderOutcome, ReportDispatch, SpecDispatchContext, SpecDispatchOptions,
    SystemFsPrimitives, dispatch,
};
use pyo3::exceptions::{PyMemoryError, PyOSError, PyValueError};
use pyo3::prelude::*;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "fscmd.dispatch.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "FolderOutcome")]
#[derive(Debug, Clone)]
struct PyFolderOutcome {
    #[pyo3(get)]
    path: String,
    #[pyo3(get)]
    if_skipped: bool,
    #[pyo3(get)]
    n_attempts: usize,
    #[pyo3(get)]
    n_failures: usize,
}

impl From<EnumFolderOutcome> for PyFolderOutcome {
    fn from(outcome: EnumFolderOutcome) -> Self {
        match outcome {
            EnumFolderOutcome::Skipped { path_operand } => Self {
                path: path_operand.to_string_lossy().to_string(),
                if_skipped: true,
                n_attempts: 0,
                n_failures: 0,
            },
            EnumFolderOutcome::Attempted {
                path_dir,
                n_attempts,
                n_failures,
            } => Self {
                path: path_dir.to_string_lossy().to_string(),
                if_skipped: false,
                n_attempts,
                n_failures,
            },
        }
    }
}

#[pyclass(name = "ReportDispatch")]
#[derive(Debug, Clone)]
struct PyReportDispatch {
    #[pyo3(get)]
    operation: String,
    #[pyo3(get)]
    path_source: Option<String>,
    #[pyo3(get)]
    path_destination: Option<String>,
    #[pyo3(get)]
    folders: Vec<PyFolderOutcome>,
    #[pyo3(get)]
    cnt_primitive_calls: u64,
    #[pyo3(get)]
    cnt_skipped: u64,
    summary: String,
    dict_counts: BTreeMap<String, u64>,
}

impl From<ReportDispatch> for PyReportDispatch {
    fn from(report_dispatch: ReportDispatch) -> Self {
        let summary = report_dispatch.to_string();
        let dict_counts = report_dispatch.to_dict();
        Self {
            operation: report_dispatch.operation.keyword().to_string(),
            path_source: report_dispatch
                .path_source
                .map(|p| p.to_string_lossy().to_string()),
            path_destination: report_dispatch
                .path_destination
                .map(|p| p.to_string_lossy().to_string()),
            folders: report_dispatch
                .folders
                .into_iter()
                .map(PyFolderOutcome::from)
                .collect(),
            cnt_primitive_calls: report_dispatch.cnt_primitive_calls,
            cnt_skipped: report_dispatch.cnt_skipped,
            summary,
            dict_counts,
        }
    }
}

#[pymethods]
impl PyReportDispatch {
    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.dict_counts.clone()
    }

    fn __str__(&self) -> String {
        self.summary.clone()
    }
}

fn map_dispatch_error(exception: DispatchError) -> PyErr {
    match exception {
        DispatchError::Parse(e) => PyValueError::new_err(format!("Failed to parse command: {e}")),
        DispatchError::Allocation { n_units } => PyMemoryError::new_err(format!(
            "Failed to allocate a path buffer of {n_units} units"
        )),
        e @ (DispatchError::Resolution(_) | DispatchError::Primitive { .. }) => {
            PyOSError::new_err(e.to_string())
        }
    }
}

/// Fire-and-forget execution; never raises.
#[pyfunction(name = "execute")]
#[pyo3(signature = (command = None))]
fn execute_py(py: Python<'_>, command: Option<String>) {
    py.allow_threads(|| fscmd_dispatch::execute(command.as_deref()));
}

/// Execute and return the report; raises on any failure.
#[pyfunction(name = "dispatch")]
#[pyo3(signature = (command, cwd = None))]
fn dispatch_py(
    py: Python<'_>,
    command: String,
    cwd: Option<String>,
) -> PyResult<PyReportDispatch> {
    let spec_ctx = match cwd {
        Some(c_cwd) => SpecDispatchContext::with_cwd(c_cwd),
        None => SpecDispatchContext::from_process(),
    };
    let report_dispatch = py.allow_threads(|| {
        dispatch(
            Some(command.as_str()),
            &spec_ctx,
            &SpecDispatchOptions::default(),
            &SystemFsPrimitives::default(),
        )
    });
    let report_dispatch = report_dispatch.map_err(map_dispatch_error)?;
    Ok(PyReportDispatch::from(report_dispatch))
}

#[pymodule]
fn _fscmd_dispatch_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyFolderOutcome>()?;
    module.add_class::<PyReportDispatch>()?;
    module.add_function(wrap_pyfunction!(execute_py, module)?)?;
    module.add_function(wrap_pyfunction!(dispatch_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
