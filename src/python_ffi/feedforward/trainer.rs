use pyo3::prelude::*;
use rand::rngs::StdRng;

use super::net::{ConsumableNet, Net};
use crate::feedforward::{Matrix, TrainError, Trainer as InnerTrainer};
use crate::{Impl_to_PyErr, MakeConsumable};

MakeConsumable!(ConsumableTrainer, InnerTrainer, Trainer);

#[pyclass]
pub struct Trainer {
    pub(super) trainer: ConsumableTrainer,
    pub(super) rng: StdRng,
}

#[pymethods]
impl Trainer {
    pub fn geometry(&self) -> PyResult<Vec<usize>> {
        Ok(self.trainer.get_ref()?.net_ref().geometry().to_vec())
    }

    pub fn feed_forward(&self, inputs: Vec<f64>) -> PyResult<Vec<f64>> {
        super::feed_forward(self.trainer.get_ref()?.net_ref(), inputs)
    }

    pub fn predict(&self, inputs: Vec<f64>) -> PyResult<usize> {
        super::predict(self.trainer.get_ref()?.net_ref(), inputs)
    }

    pub fn accuracy(&self, images: Vec<Vec<f64>>, labels: Vec<usize>) -> PyResult<f64> {
        super::accuracy(self.trainer.get_ref()?.net_ref(), images, labels)
    }

    pub fn backprop_one(&mut self, image: Vec<f64>, correct_label: usize) -> PyResult<f64> {
        let image = Matrix::row_vector(image)?;
        Ok(self
            .trainer
            .get_ref_mut()?
            .backprop_one(&image, correct_label)?)
    }

    pub fn apply_training(&mut self) -> PyResult<()> {
        Ok(self.trainer.get_ref_mut()?.apply_training()?)
    }

    pub fn train_batch(&mut self, images: Vec<Vec<f64>>, labels: Vec<usize>) -> PyResult<f64> {
        let (images, labels) = super::to_samples(images, labels)?.into_parts();
        Ok(self.trainer.get_ref_mut()?.train_batch(&images, &labels)?)
    }

    /// Returns mean cost of every epoch.
    pub fn train(&mut self, images: Vec<Vec<f64>>, labels: Vec<usize>) -> PyResult<Vec<f64>> {
        let mut samples = super::to_samples(images, labels)?;
        let reports = self
            .trainer
            .get_ref_mut()?
            .train(&mut samples, &mut self.rng)?;
        Ok(reports.iter().map(|r| r.mean_cost).collect())
    }

    pub fn teardown(&mut self) -> PyResult<Net> {
        Ok(Net {
            net: ConsumableNet::acquire(self.trainer.release()?.teardown()),
            rng: self.rng.clone(),
        })
    }
}

Impl_to_PyErr!(for TrainError);
