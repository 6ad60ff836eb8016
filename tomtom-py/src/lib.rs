use numpy::{IntoPyArray, PyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use tomtom_core::{Pwm, Strand, TomtomConfig, TomtomError};

fn to_pyerr(err: TomtomError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Converts a `4 x L` row-major array (row order A, C, G, T, per
/// `tomtom_core`'s convention) into a [`Pwm`].
fn pwm_from_array(arr: PyReadonlyArray2<'_, f32>) -> PyResult<Pwm> {
    let view = arr.as_array();
    let (rows, cols) = (view.shape()[0], view.shape()[1]);
    if rows != tomtom_core::ALPHABET_SIZE {
        return Err(PyValueError::new_err(format!(
            "expected a {}xL array, got {rows}x{cols}",
            tomtom_core::ALPHABET_SIZE
        )));
    }
    let mut data = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            data.push(view[[r, c]]);
        }
    }
    Pwm::new(data, cols).map_err(to_pyerr)
}

/// Result of one `tomtom()` call, exposed to Python as flat `numpy` arrays.
#[pyclass(frozen)]
pub struct TomtomResult {
    p_values: Py<PyArray1<f64>>,
    scores: Py<PyArray1<i64>>,
    offsets: Py<PyArray1<i64>>,
    overlaps: Py<PyArray1<i64>>,
    reverse_strand: Py<PyArray1<bool>>,
    target_indices: Py<PyArray1<i64>>,
    n_queries: usize,
    n_targets: usize,
    stride: usize,
    warnings: Vec<String>,
}

#[pymethods]
impl TomtomResult {
    #[getter]
    fn p_values(&self, py: Python<'_>) -> Py<PyArray1<f64>> {
        self.p_values.clone_ref(py)
    }

    #[getter]
    fn scores(&self, py: Python<'_>) -> Py<PyArray1<i64>> {
        self.scores.clone_ref(py)
    }

    #[getter]
    fn offsets(&self, py: Python<'_>) -> Py<PyArray1<i64>> {
        self.offsets.clone_ref(py)
    }

    #[getter]
    fn overlaps(&self, py: Python<'_>) -> Py<PyArray1<i64>> {
        self.overlaps.clone_ref(py)
    }

    /// Boolean array: `true` where the best alignment used the query's
    /// reverse complement.
    #[getter]
    fn reverse_strand(&self, py: Python<'_>) -> Py<PyArray1<bool>> {
        self.reverse_strand.clone_ref(py)
    }

    /// Target index per result entry. Empty when every query was scored
    /// against every target (target index is then `i % stride`).
    #[getter]
    fn target_indices(&self, py: Python<'_>) -> Py<PyArray1<i64>> {
        self.target_indices.clone_ref(py)
    }

    #[getter]
    fn n_queries(&self) -> usize {
        self.n_queries
    }

    #[getter]
    fn n_targets(&self) -> usize {
        self.n_targets
    }

    #[getter]
    fn stride(&self) -> usize {
        self.stride
    }

    #[getter]
    fn warnings(&self) -> Vec<String> {
        self.warnings.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "TomtomResult(n_queries={}, n_targets={}, stride={})",
            self.n_queries, self.n_targets, self.stride
        )
    }
}

#[pyfunction]
#[pyo3(signature = (
    queries,
    targets,
    n_nearest=None,
    n_score_bins=100,
    n_median_bins=1000,
    n_target_bins=100,
    n_cache=100,
    reverse_complement=true,
    n_jobs=-1,
))]
#[allow(clippy::too_many_arguments)]
fn tomtom(
    py: Python<'_>,
    queries: Vec<PyReadonlyArray2<'_, f32>>,
    targets: Vec<PyReadonlyArray2<'_, f32>>,
    n_nearest: Option<usize>,
    n_score_bins: u32,
    n_median_bins: u32,
    n_target_bins: u32,
    n_cache: usize,
    reverse_complement: bool,
    n_jobs: i64,
) -> PyResult<TomtomResult> {
    let queries: Vec<Pwm> = queries
        .into_iter()
        .map(pwm_from_array)
        .collect::<PyResult<_>>()?;
    let targets: Vec<Pwm> = targets
        .into_iter()
        .map(pwm_from_array)
        .collect::<PyResult<_>>()?;

    let config = TomtomConfig::new(
        n_nearest,
        n_score_bins,
        n_median_bins,
        n_target_bins,
        n_cache,
        reverse_complement,
        n_jobs,
    )
    .map_err(to_pyerr)?;

    let (output, diagnostics) =
        py.allow_threads(|| tomtom_core::tomtom(&queries, &targets, &config))
            .map_err(to_pyerr)?;

    let overlaps: Vec<i64> = output.overlaps().iter().map(|&o| o as i64).collect();
    let reverse_strand: Vec<bool> = output
        .strands()
        .iter()
        .map(|&s| s == Strand::Reverse)
        .collect();
    let target_indices: Vec<i64> = output
        .target_indices()
        .iter()
        .map(|&t| t as i64)
        .collect();

    Ok(TomtomResult {
        p_values: output.p_values().to_vec().into_pyarray_bound(py).unbind(),
        scores: output.scores().to_vec().into_pyarray_bound(py).unbind(),
        offsets: output.offsets().to_vec().into_pyarray_bound(py).unbind(),
        overlaps: overlaps.into_pyarray_bound(py).unbind(),
        reverse_strand: reverse_strand.into_pyarray_bound(py).unbind(),
        target_indices: target_indices.into_pyarray_bound(py).unbind(),
        n_queries: output.n_queries(),
        n_targets: output.n_targets(),
        stride: output.stride(),
        warnings: diagnostics.warnings().to_vec(),
    })
}

#[pymodule]
fn _native(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<TomtomResult>()?;
    m.add_function(wrap_pyfunction!(tomtom, m)?)?;
    Ok(())
}
