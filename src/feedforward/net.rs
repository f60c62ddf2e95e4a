use rand::Rng;
use std::{error, fmt};

use super::matrix::{Matrix, MatrixError};
use super::trainer::{TrainError, Trainer};
use crate::config::{NetConfig, TrainConfig};

/// One fully-connected layer: `sigmoid(input * weights + biases)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// `input_width x output_width`
    pub(super) weights: Matrix,
    /// `1 x output_width`
    pub(super) biases: Matrix,
}

impl Layer {
    /// Pairs weights with biases.
    ///
    /// # Returns
    /// * `Ok(Layer)` if `biases` is `1 x weights.cols()`;
    /// * `Err(NewNetError::BadBiases)` otherwise.
    pub fn new(weights: Matrix, biases: Matrix) -> Result<Layer, NewNetError> {
        if biases.shape() != (1, weights.cols()) {
            return Err(NewNetError::BadBiases {
                expected: (1, weights.cols()),
                got: biases.shape(),
            });
        }
        Ok(Layer { weights, biases })
    }

    fn random<R: Rng + ?Sized>(
        input_width: usize,
        output_width: usize,
        rng: &mut R,
    ) -> Result<Layer, MatrixError> {
        Ok(Layer {
            weights: Matrix::random(input_width, output_width, rng)?,
            biases: Matrix::random(1, output_width, rng)?,
        })
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    pub fn input_width(&self) -> usize {
        self.weights.rows()
    }

    pub fn output_width(&self) -> usize {
        self.weights.cols()
    }

    /// Splits layer back into `(weights, biases)`.
    pub fn into_parts(self) -> (Matrix, Matrix) {
        (self.weights, self.biases)
    }

    fn forward(&self, input: &Matrix) -> Result<Matrix, MatrixError> {
        let mut activations = input.multiply(&self.weights)?;
        activations.add_in_place(&self.biases, true)?;
        Ok(activations)
    }
}

/// Neural network structure
#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    /// The number of neurons in each layer, input layer included.
    pub(super) geometry: Box<[usize]>,

    /// Layers in feeding order. The input layer has no parameters, so
    /// `layers.len() == geometry.len() - 1`.
    pub(super) layers: Box<[Layer]>,
}

impl Net {
    /// Returns network with `config.hidden_layers` hidden layers of
    /// `config.neurons_per_hidden_layer` neurons each.
    /// It will have random weights and biases from range [-1,1).
    ///
    /// # Returns
    /// * `Ok(Net)` if every count in `config` is positive;
    /// * `Err(NewNetError::InvalidConfiguration)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::config::NetConfig;
    /// # use digitnet::feedforward::Net;
    /// # use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let net = Net::new(&NetConfig::default(), &mut rng).unwrap();
    /// assert_eq!(net.geometry(), &[784, 16, 16, 10]);
    /// ```
    pub fn new<R: Rng + ?Sized>(config: &NetConfig, rng: &mut R) -> Result<Net, NewNetError> {
        config.validate()?;

        let mut geometry = Vec::with_capacity(config.hidden_layers + 2);
        geometry.push(config.input_features);
        geometry.extend((0..config.hidden_layers).map(|_| config.neurons_per_hidden_layer));
        geometry.push(config.output_classes);

        Net::with_geometry(&geometry, rng)
    }

    /// Returns network for given geometry.
    ///
    /// # Arguments
    /// * `geometry` - a number slice that holds a desired number of neurons in each layer,
    /// input layer first;
    /// * `rng` - source of the initial weights and biases.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::Net;
    /// let net = Net::with_geometry(&[2, 3, 2], &mut rand::thread_rng()).unwrap();
    /// assert_eq!(net.layer_count(), 2);
    /// ```
    pub fn with_geometry<R: Rng + ?Sized>(
        geometry: &[usize],
        rng: &mut R,
    ) -> Result<Net, NewNetError> {
        if geometry.len() < 2 {
            return Err(NewNetError::InvalidConfiguration("geometry length"));
        }
        if geometry.contains(&0) {
            return Err(NewNetError::InvalidConfiguration("layer width"));
        }

        let mut layers = Vec::with_capacity(geometry.len() - 1);
        for pair in geometry.windows(2) {
            layers.push(Layer::random(pair[0], pair[1], rng)?);
        }

        Ok(Net {
            geometry: geometry.to_owned().into_boxed_slice(),
            layers: layers.into_boxed_slice(),
        })
    }

    /// Builds network out of given layers.
    ///
    /// # Returns
    /// * `Err(NewNetError::InvalidConfiguration)` if `layers` is empty;
    /// * `Err(NewNetError::BadLayer)` if some layer's input width differs from
    /// the previous layer's output width;
    /// * `Ok(Net)` otherwise.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Net, NewNetError> {
        let first = match layers.first() {
            Some(layer) => layer,
            None => return Err(NewNetError::InvalidConfiguration("layer count")),
        };

        let mut geometry = Vec::with_capacity(layers.len() + 1);
        geometry.push(first.input_width());
        for (index, layer) in layers.iter().enumerate() {
            let width = geometry[geometry.len() - 1];
            if layer.input_width() != width {
                return Err(NewNetError::BadLayer {
                    index,
                    expected: (width, layer.output_width()),
                    got: layer.weights.shape(),
                });
            }
            if layer.biases.shape() != (1, layer.output_width()) {
                return Err(NewNetError::BadLayer {
                    index,
                    expected: (1, layer.output_width()),
                    got: layer.biases.shape(),
                });
            }
            geometry.push(layer.output_width());
        }

        Ok(Net {
            geometry: geometry.into_boxed_slice(),
            layers: layers.into_boxed_slice(),
        })
    }

    pub fn geometry(&self) -> &[usize] {
        &self.geometry
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of parameterized layers (hidden layers + output layer).
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn input_width(&self) -> usize {
        self.geometry[0]
    }

    pub fn output_width(&self) -> usize {
        self.geometry[self.geometry.len() - 1]
    }

    /// Sigmoid function.
    /// Implements the formula:
    /// `1 / (1 + exp(-x))`.
    pub fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Sigmoid derivative function, expressed in terms of sigmoid itself.
    /// Implements the formula:
    /// `s * (1 - s)`.
    pub fn sigmoid_der_s(s: f64) -> f64 {
        s * (1.0 - s)
    }

    /// Calculates network output for a `1 x input_width` input.
    ///
    /// # Returns
    /// * `Ok(Matrix)` of shape `1 x output_width`;
    /// * `Err(MatrixError::DimensionMismatch)` if `input` has a wrong shape.
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::{Matrix, Net};
    /// let net = Net::with_geometry(&[10, 20, 20, 3], &mut rand::thread_rng()).unwrap();
    /// let input = Matrix::row_vector(vec![1.0; 10]).unwrap();
    /// let output = net.feed_forward(&input).unwrap();
    /// assert_eq!(output.shape(), (1, 3));
    /// ```
    pub fn feed_forward(&self, input: &Matrix) -> Result<Matrix, MatrixError> {
        let mut activations = input.clone();
        for layer in self.layers.iter() {
            activations = layer.forward(&activations)?;
        }
        Ok(activations)
    }

    /// Same as `Net::feed_forward`, but keeps every layer's activations.
    ///
    /// # Returns
    /// `layer_count() + 1` matrices: `input` itself, then the output of each layer.
    pub fn feed_forward_caching(&self, input: &Matrix) -> Result<Vec<Matrix>, MatrixError> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.clone());

        for layer in self.layers.iter() {
            let next = layer.forward(&activations[activations.len() - 1])?;
            activations.push(next);
        }
        Ok(activations)
    }

    /// Calculates cost function of output values against the one-hot target
    /// of `correct_label`.
    /// Implements the formula:
    /// `sum((outputs[i] - target[i])^2)`
    ///
    /// # Examples
    /// ```
    /// # use digitnet::feedforward::Net;
    /// let cost = Net::calc_cost(&[0.5, 0.5, 0.0], 1);
    /// assert_eq!(cost, 0.5);
    /// ```
    pub fn calc_cost(outputs: &[f64], correct_label: usize) -> f64 {
        outputs
            .iter()
            .enumerate()
            .map(|(i, &a)| {
                let diff = if i == correct_label { a - 1.0 } else { a };
                diff * diff
            })
            .sum()
    }

    /// Consumes `Net` and builds `Trainer` object containing it.
    /// See `Trainer`'s documentation for details.
    pub fn build_trainer(self, config: TrainConfig) -> Result<Trainer, TrainError> {
        Trainer::build(self, config)
    }
}

/// Error structure for `Net` construction
#[derive(Debug, Clone, PartialEq)]
pub enum NewNetError {
    /// Names the parameter that was zero.
    InvalidConfiguration(&'static str),
    BadLayer {
        index: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// Biases of a standalone layer don't fit its weights.
    BadBiases {
        expected: (usize, usize),
        got: (usize, usize),
    },
    Matrix(MatrixError),
}

impl From<MatrixError> for NewNetError {
    fn from(err: MatrixError) -> Self {
        NewNetError::Matrix(err)
    }
}

impl fmt::Display for NewNetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            NewNetError::InvalidConfiguration(what) => {
                write!(f, "Net must have a positive {}!", what)
            }
            NewNetError::BadLayer {
                index,
                expected,
                got,
            } => write!(
                f,
                "Layer {} expected {}x{} parameters, but got {}x{}!",
                index, expected.0, expected.1, got.0, got.1
            ),
            NewNetError::BadBiases { expected, got } => write!(
                f,
                "Layer biases must be {}x{}, but got {}x{}!",
                expected.0, expected.1, got.0, got.1
            ),
            NewNetError::Matrix(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for NewNetError {}

/// Error structure for collections size mismatch
#[derive(Debug, Clone, PartialEq)]
pub struct SizeMismatch {
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Expected {} values, but got {}!",
            self.expected, self.got
        )
    }
}

impl error::Error for SizeMismatch {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn small_config() -> NetConfig {
        NetConfig {
            input_features: 4,
            output_classes: 3,
            hidden_layers: 2,
            neurons_per_hidden_layer: 5,
        }
    }

    #[test]
    fn new_rejects_zero_counts() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut config = small_config();
        config.hidden_layers = 0;
        assert!(matches!(
            Net::new(&config, &mut rng),
            Err(NewNetError::InvalidConfiguration(_))
        ));

        let mut config = small_config();
        config.neurons_per_hidden_layer = 0;
        assert!(matches!(
            Net::new(&config, &mut rng),
            Err(NewNetError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn layer_shapes_follow_geometry() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = Net::new(&small_config(), &mut rng).unwrap();
        assert_eq!(net.geometry(), &[4, 5, 5, 3]);
        assert_eq!(net.layer_count(), 3);

        let shapes: Vec<_> = net
            .layers()
            .iter()
            .map(|l| (l.weights().shape(), l.biases().shape()))
            .collect();
        assert_eq!(
            shapes,
            vec![((4, 5), (1, 5)), ((5, 5), (1, 5)), ((5, 3), (1, 3))]
        );
        for layer in net.layers() {
            assert!(layer.biases().as_slice().iter().all(|&b| (-1.0..1.0).contains(&b)));
        }
    }

    #[test]
    fn same_seed_same_parameters() {
        let a = Net::new(&small_config(), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = Net::new(&small_config(), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn with_geometry_rejects_short_or_empty_layers() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Net::with_geometry(&[3], &mut rng).is_err());
        assert!(Net::with_geometry(&[3, 0, 2], &mut rng).is_err());
    }

    #[test]
    fn feed_forward_is_repeatable() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = Net::new(&small_config(), &mut rng).unwrap();
        let input = Matrix::row_vector(vec![0.1, 0.9, 0.4, 0.0]).unwrap();

        let first = net.feed_forward(&input).unwrap();
        let second = net.feed_forward(&input).unwrap();
        assert_eq!(first.shape(), (1, 3));
        assert_eq!(
            first.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>(),
            second.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>()
        );
        assert!(first.as_slice().iter().all(|&x| x > 0.0 && x < 1.0));
    }

    #[test]
    fn caching_matches_plain_forward() {
        let mut rng = StdRng::seed_from_u64(6);
        let net = Net::new(&small_config(), &mut rng).unwrap();
        let input = Matrix::row_vector(vec![0.3, 0.2, 0.7, 1.0]).unwrap();

        let cache = net.feed_forward_caching(&input).unwrap();
        assert_eq!(cache.len(), net.layer_count() + 1);
        assert_eq!(cache[0], input);
        assert_eq!(cache[cache.len() - 1], net.feed_forward(&input).unwrap());
        for (activation, &width) in cache.iter().zip(net.geometry()) {
            assert_eq!(activation.shape(), (1, width));
        }
    }

    #[test]
    fn feed_forward_rejects_wrong_input_width() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = Net::new(&small_config(), &mut rng).unwrap();
        let input = Matrix::row_vector(vec![0.5; 3]).unwrap();
        assert!(matches!(
            net.feed_forward(&input),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn from_layers_checks_chaining() {
        let l1 = Layer::new(Matrix::new(2, 3).unwrap(), Matrix::new(1, 3).unwrap()).unwrap();
        let l2 = Layer::new(Matrix::new(4, 2).unwrap(), Matrix::new(1, 2).unwrap()).unwrap();
        assert!(matches!(
            Net::from_layers(vec![l1.clone(), l2]),
            Err(NewNetError::BadLayer { index: 1, .. })
        ));
        assert!(Net::from_layers(vec![]).is_err());

        let l2 = Layer::new(Matrix::new(3, 2).unwrap(), Matrix::new(1, 2).unwrap()).unwrap();
        let net = Net::from_layers(vec![l1, l2]).unwrap();
        assert_eq!(net.geometry(), &[2, 3, 2]);
    }

    #[test]
    fn layer_rejects_bad_bias_shape() {
        assert_eq!(
            Layer::new(Matrix::new(2, 3).unwrap(), Matrix::new(1, 2).unwrap()),
            Err(NewNetError::BadBiases {
                expected: (1, 3),
                got: (1, 2)
            })
        );
    }

    #[test]
    fn zero_parameters_give_half_activations() {
        let layer = Layer::new(Matrix::new(2, 2).unwrap(), Matrix::new(1, 2).unwrap()).unwrap();
        let net = Net::from_layers(vec![layer]).unwrap();
        let out = net
            .feed_forward(&Matrix::row_vector(vec![3.0, -7.0]).unwrap())
            .unwrap();
        assert_eq!(out.as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn cost_uses_one_hot_target() {
        assert_eq!(Net::calc_cost(&[0.0, 1.0], 1), 0.0);
        assert_eq!(Net::calc_cost(&[1.0, 0.0], 1), 2.0);
    }
}
