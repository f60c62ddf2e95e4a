use log::{debug, info};
use rand::Rng;
use std::{error, fmt};

use super::matrix::{Matrix, MatrixError};
use super::net::{Net, SizeMismatch};
use crate::config::TrainConfig;
use crate::data::Samples;

/// Net trainer structure.
///
/// To train Net, gradient accumulators are needed. We will contain them in this structure.
/// Training procedure will look like this:
/// * One allocates accumulators by calling `Net::build_trainer`, which will consume `Net`
/// and return `Trainer` object.
/// (Consuming `Net` is needed to make the trainer the only writer of its parameters.)
/// * Training data is processed via `Trainer::backprop_one` and `Trainer::apply_training`,
/// or in bulk via `Trainer::train_batch` and `Trainer::train`.
/// Also, at any time one can call `Trainer::net_ref` to run inference.
/// * Once finished training, one can use `Trainer::teardown` to drop the accumulators
/// and get `Net` object back.
pub struct Trainer {
    pub(crate) net: Net,

    pub(crate) config: TrainConfig,

    /// Summed cost gradients with respect to each layer's weights, shaped like
    /// `Layer::weights`.
    pub(crate) weight_changes: Box<[Matrix]>,

    /// Summed cost gradients with respect to each layer's biases, shaped like
    /// `Layer::biases`.
    pub(crate) bias_changes: Box<[Matrix]>,

    // Samples counter for mean gradient
    pub(crate) gradient_counter: usize,
}

/// Summary of one pass over the training set
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean per-sample cost over the epoch.
    pub mean_cost: f64,
    pub batches: usize,
}

impl Trainer {
    /// Consumes `Net` and builds `Trainer` object containing it.
    pub(super) fn build(net: Net, config: TrainConfig) -> Result<Trainer, TrainError> {
        config.validate()?;

        let mut weight_changes = Vec::with_capacity(net.layers.len());
        let mut bias_changes = Vec::with_capacity(net.layers.len());
        for layer in net.layers.iter() {
            let (rows, cols) = layer.weights.shape();
            weight_changes.push(Matrix::new(rows, cols)?);
            bias_changes.push(Matrix::new(1, cols)?);
        }

        Ok(Trainer {
            net,
            config,
            weight_changes: weight_changes.into_boxed_slice(),
            bias_changes: bias_changes.into_boxed_slice(),
            gradient_counter: 0,
        })
    }

    /// Returns reference to contained `Net`, allowing the use of `Net::feed_forward`.
    pub fn net_ref(&self) -> &Net {
        &self.net
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Accumulated weight gradients, one matrix per layer.
    pub fn weight_changes(&self) -> &[Matrix] {
        &self.weight_changes
    }

    /// Accumulated bias gradients, one matrix per layer.
    pub fn bias_changes(&self) -> &[Matrix] {
        &self.bias_changes
    }

    /// Number of samples accumulated since the last `Trainer::apply_training`.
    pub fn pending_samples(&self) -> usize {
        self.gradient_counter
    }

    /// Derivative of `Net::calc_cost` with respect to each output activation:
    /// `2 * (a_i - 1)` for the correct label, `2 * a_i` for the others.
    fn output_gradient(outputs: &Matrix, correct_label: usize) -> Matrix {
        let mut gradient = outputs.clone();
        for (i, g) in gradient.as_mut_slice().iter_mut().enumerate() {
            let target = if i == correct_label { 1.0 } else { 0.0 };
            *g = 2.0 * (*g - target);
        }
        gradient
    }

    /// Performs backpropagation on a given sample, updating `Trainer`'s gradient accumulators.
    /// Note that parameter updates are not done by this method, allowing one to use stochastic
    /// gradient descent over many samples. (`Trainer::train_batch` does this.)
    /// To finally apply changes, call `Trainer::apply_training`.
    ///
    /// # Arguments
    /// * `image` - `1 x input_width` matrix of input activations;
    /// * `correct_label` - index of the output neuron that should fire.
    ///
    /// # Returns
    /// * The cost function of the network output against the one-hot target;
    /// * `Err(TrainError::BadLabel)` if `correct_label` is not below the output width;
    /// * `Err(TrainError::Matrix)` if `image` has a wrong shape.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::config::TrainConfig;
    /// # use digitnet::feedforward::{Matrix, Net};
    /// let net = Net::with_geometry(&[10, 20, 20, 3], &mut rand::thread_rng()).unwrap();
    /// let mut trainer = net.build_trainer(TrainConfig::default()).unwrap();
    /// let image = Matrix::row_vector(vec![1.0; 10]).unwrap();
    /// let cost = trainer.backprop_one(&image, 2).unwrap();
    /// assert!(cost > 0.0);
    /// assert_eq!(trainer.pending_samples(), 1);
    /// ```
    pub fn backprop_one(&mut self, image: &Matrix, correct_label: usize) -> Result<f64, TrainError> {
        let classes = self.net.output_width();
        if correct_label >= classes {
            return Err(TrainError::BadLabel {
                label: correct_label,
                classes,
            });
        }

        let activations = self.net.feed_forward_caching(image)?;
        let outputs = &activations[activations.len() - 1];
        let cost = Net::calc_cost(outputs.as_slice(), correct_label);

        // Gradient of cost with respect to the activations of layer `k + 1`
        let mut gradient = Trainer::output_gradient(outputs, correct_label);

        for k in (0..self.net.layers.len()).rev() {
            let current = &activations[k + 1];
            let previous = &activations[k];

            // Through sigmoid: gradient with respect to the pre-activation sums
            for (g, &s) in gradient
                .as_mut_slice()
                .iter_mut()
                .zip(current.as_slice().iter())
            {
                *g *= Net::sigmoid_der_s(s);
            }

            self.bias_changes[k].add_in_place(&gradient, false)?;
            self.weight_changes[k].add_outer_product(previous.as_slice(), gradient.as_slice())?;

            // Input layer has no parameters, nothing to propagate into
            if k > 0 {
                gradient = gradient.multiply_transposed(&self.net.layers[k].weights)?;
            }
        }

        self.gradient_counter += 1;

        Ok(cost)
    }

    /// Applies training, previously done by `Trainer::backprop_one`.
    ///
    /// Accumulated gradients are averaged over the samples seen, scaled by the
    /// learning rate, subtracted from the parameters, and reset to zero.
    pub fn apply_training(&mut self) -> Result<(), TrainError> {
        if self.gradient_counter == 0 {
            return Ok(());
        }

        let factor = -self.config.learning_rate / self.gradient_counter as f64;
        for ((layer, wc), bc) in self
            .net
            .layers
            .iter_mut()
            .zip(self.weight_changes.iter_mut())
            .zip(self.bias_changes.iter_mut())
        {
            wc.scale(factor);
            layer.weights.add_in_place(wc, false)?;
            wc.scale(0.0);

            bc.scale(factor);
            layer.biases.add_in_place(bc, false)?;
            bc.scale(0.0);
        }
        self.gradient_counter = 0;

        Ok(())
    }

    /// Drops accumulated gradients without applying them.
    pub fn reset_gradients(&mut self) {
        for m in self
            .weight_changes
            .iter_mut()
            .chain(self.bias_changes.iter_mut())
        {
            m.scale(0.0);
        }
        self.gradient_counter = 0;
    }

    /// Performs training for every data sample in a given batch, then applies.
    /// Gradients left over from earlier `Trainer::backprop_one` calls are
    /// discarded first, so only this batch contributes to the update.
    /// (It is equivalent to calling `Trainer::reset_gradients`, then
    /// `Trainer::backprop_one` for every sample, and then `Trainer::apply_training`.)
    ///
    /// # Returns
    /// * The average value of cost function over the batch;
    /// * `Err(TrainError::BadSamples)` if `images` and `labels` differ in length.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::config::TrainConfig;
    /// # use digitnet::feedforward::{Matrix, Net};
    /// let net = Net::with_geometry(&[2, 10, 10, 2], &mut rand::thread_rng()).unwrap();
    /// let mut trainer = net.build_trainer(TrainConfig::default()).unwrap();
    /// let images = vec![
    ///     Matrix::row_vector(vec![0.0, 0.0]).unwrap(),
    ///     Matrix::row_vector(vec![1.0, 1.0]).unwrap(),
    /// ];
    /// let cost = trainer.train_batch(&images, &[0, 1]).unwrap();
    /// assert_eq!(trainer.pending_samples(), 0);
    /// ```
    pub fn train_batch(&mut self, images: &[Matrix], labels: &[usize]) -> Result<f64, TrainError> {
        if images.len() != labels.len() {
            return Err(TrainError::BadSamples(SizeMismatch {
                expected: images.len(),
                got: labels.len(),
            }));
        }
        if images.is_empty() {
            return Ok(0.0);
        }

        self.reset_gradients();

        let mut costs_sum = 0.0;
        for (image, &label) in images.iter().zip(labels.iter()) {
            costs_sum += self.backprop_one(image, label)?;
        }

        self.apply_training()?;

        Ok(costs_sum / images.len() as f64)
    }

    /// Shuffles `samples`, then trains on consecutive batches of
    /// `TrainConfig::batch_size` covering the whole set. The last batch holds
    /// the remainder when the set doesn't divide evenly.
    pub fn train_epoch<R: Rng + ?Sized>(
        &mut self,
        epoch: usize,
        samples: &mut Samples,
        rng: &mut R,
    ) -> Result<EpochReport, TrainError> {
        samples.shuffle(rng);

        let mut costs_sum = 0.0;
        let mut batches = 0;
        for (images, labels) in samples.batches(self.config.batch_size) {
            let cost = self.train_batch(images, labels)?;
            debug!("epoch {} batch {}: cost {:.6}", epoch, batches, cost);
            costs_sum += cost * images.len() as f64;
            batches += 1;
        }

        let mean_cost = if samples.is_empty() {
            0.0
        } else {
            costs_sum / samples.len() as f64
        };

        Ok(EpochReport {
            epoch,
            mean_cost,
            batches,
        })
    }

    /// Runs `TrainConfig::epochs` epochs over `samples`.
    ///
    /// # Returns
    /// One `EpochReport` per epoch, in order.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::config::TrainConfig;
    /// # use digitnet::data::Samples;
    /// # use digitnet::feedforward::{Matrix, Net};
    /// # use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let net = Net::with_geometry(&[1, 4, 2], &mut rng).unwrap();
    /// let config = TrainConfig { batch_size: 2, epochs: 3, ..TrainConfig::default() };
    /// let mut trainer = net.build_trainer(config).unwrap();
    ///
    /// let images = vec![0.0, 0.1, 0.9, 1.0]
    ///     .into_iter()
    ///     .map(|x| Matrix::row_vector(vec![x]).unwrap())
    ///     .collect();
    /// let mut samples = Samples::new(images, vec![0, 0, 1, 1]).unwrap();
    /// let reports = trainer.train(&mut samples, &mut rng).unwrap();
    /// assert_eq!(reports.len(), 3);
    /// assert_eq!(reports[0].batches, 2);
    /// ```
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        samples: &mut Samples,
        rng: &mut R,
    ) -> Result<Vec<EpochReport>, TrainError> {
        self.train_with(samples, rng, |_, _| Ok(()))
    }

    /// Same as `Trainer::train`, calling `on_epoch` with the network after every epoch.
    /// An error returned by `on_epoch` stops training.
    pub fn train_with<R, F>(
        &mut self,
        samples: &mut Samples,
        rng: &mut R,
        mut on_epoch: F,
    ) -> Result<Vec<EpochReport>, TrainError>
    where
        R: Rng + ?Sized,
        F: FnMut(&Net, &EpochReport) -> Result<(), TrainError>,
    {
        if !samples.is_empty() && samples.feature_count() != self.net.input_width() {
            return Err(TrainError::BadSamples(SizeMismatch {
                expected: self.net.input_width(),
                got: samples.feature_count(),
            }));
        }

        let mut reports = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            info!(
                "starting epoch {}/{} over {} samples",
                epoch + 1,
                self.config.epochs,
                samples.len()
            );
            let report = self.train_epoch(epoch, samples, rng)?;
            info!(
                "epoch {} done: mean cost {:.6} over {} batches",
                epoch + 1,
                report.mean_cost,
                report.batches
            );
            on_epoch(&self.net, &report)?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Frees training buffers, consuming `Trainer` object, and returns contained `Net` back.
    /// Note that all unapplied training, done by `Trainer::backprop_one` will be lost,
    /// so don't forget to call `Trainer::apply_training` before!
    pub fn teardown(self) -> Net {
        self.net
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainError {
    /// Names the parameter that was out of range.
    InvalidConfiguration(&'static str),
    BadLabel { label: usize, classes: usize },
    BadSamples(SizeMismatch),
    Matrix(MatrixError),
}

impl From<MatrixError> for TrainError {
    fn from(err: MatrixError) -> Self {
        TrainError::Matrix(err)
    }
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            TrainError::InvalidConfiguration(what) => {
                write!(f, "Trainer must have a positive {}!", what)
            }
            TrainError::BadLabel { label, classes } => write!(
                f,
                "Label must be from 0 to {}, but got {}!",
                classes - 1,
                label
            ),
            TrainError::BadSamples(SizeMismatch { expected, got }) => {
                write!(f, "Expected {} sample value(s), but got {}!", expected, got)
            }
            TrainError::Matrix(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for TrainError {}
