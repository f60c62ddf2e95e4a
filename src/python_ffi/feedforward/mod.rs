pub mod net;
pub mod trainer;

use pyo3::{prelude::*, wrap_pymodule};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{DataError, Samples};
use crate::feedforward::{self as ff, Matrix, MatrixError};
use crate::Impl_to_PyErr;

#[pymodule]
fn feedforward(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<net::Net>()?;
    m.add_class::<trainer::Trainer>()?;
    Ok(())
}

pub fn construct_module(m: &PyModule) -> PyResult<()> {
    m.add_wrapped(wrap_pymodule!(feedforward))?;
    Ok(())
}

pub(super) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub(super) fn to_samples(images: Vec<Vec<f64>>, labels: Vec<usize>) -> PyResult<Samples> {
    let images = images
        .into_iter()
        .map(Matrix::row_vector)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Samples::new(images, labels)?)
}

pub(super) fn feed_forward(net: &ff::Net, inputs: Vec<f64>) -> PyResult<Vec<f64>> {
    let outputs = net.feed_forward(&Matrix::row_vector(inputs)?)?;
    Ok(outputs.as_slice().to_vec())
}

pub(super) fn predict(net: &ff::Net, inputs: Vec<f64>) -> PyResult<usize> {
    Ok(ff::predict(net, &Matrix::row_vector(inputs)?)?)
}

pub(super) fn accuracy(net: &ff::Net, images: Vec<Vec<f64>>, labels: Vec<usize>) -> PyResult<f64> {
    Ok(ff::accuracy(net, &to_samples(images, labels)?)?)
}

Impl_to_PyErr!(for MatrixError, DataError);
