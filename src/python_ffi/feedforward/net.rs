use pyo3::prelude::*;
use rand::rngs::StdRng;

use super::trainer::{ConsumableTrainer, Trainer};
use crate::config::{NetConfig, TrainConfig};
use crate::feedforward::{Net as InnerNet, NewNetError};
use crate::{Impl_to_PyErr, MakeConsumable};

MakeConsumable!(ConsumableNet, InnerNet, Net);

#[pyclass]
pub struct Net {
    pub(super) net: ConsumableNet,
    /// Handed over to the trainer for shuffling.
    pub(super) rng: StdRng,
}

#[pymethods]
impl Net {
    #[new]
    pub fn new(
        input_features: usize,
        output_classes: usize,
        hidden_layers: usize,
        neurons_per_hidden_layer: usize,
        seed: Option<u64>,
    ) -> Result<Self, NewNetError> {
        let config = NetConfig {
            input_features,
            output_classes,
            hidden_layers,
            neurons_per_hidden_layer,
        };
        let mut rng = super::seeded_rng(seed);
        let net = InnerNet::new(&config, &mut rng)?;

        Ok(Self {
            net: ConsumableNet::acquire(net),
            rng,
        })
    }

    pub fn geometry(&self) -> PyResult<Vec<usize>> {
        Ok(self.net.get_ref()?.geometry().to_vec())
    }

    pub fn feed_forward(&self, inputs: Vec<f64>) -> PyResult<Vec<f64>> {
        super::feed_forward(self.net.get_ref()?, inputs)
    }

    pub fn predict(&self, inputs: Vec<f64>) -> PyResult<usize> {
        super::predict(self.net.get_ref()?, inputs)
    }

    pub fn accuracy(&self, images: Vec<Vec<f64>>, labels: Vec<usize>) -> PyResult<f64> {
        super::accuracy(self.net.get_ref()?, images, labels)
    }

    pub fn build_trainer(
        &mut self,
        batch_size: usize,
        epochs: usize,
        learning_rate: f64,
    ) -> PyResult<Trainer> {
        let config = TrainConfig {
            batch_size,
            epochs,
            learning_rate,
            seed: None,
        };
        // Checked up front so a bad config doesn't consume this object
        config.validate()?;

        Ok(Trainer {
            trainer: ConsumableTrainer::acquire(self.net.release()?.build_trainer(config)?),
            rng: self.rng.clone(),
        })
    }

    #[staticmethod]
    pub fn calc_cost(outputs: Vec<f64>, correct_label: usize) -> f64 {
        InnerNet::calc_cost(&outputs, correct_label)
    }
}

Impl_to_PyErr!(for NewNetError);
