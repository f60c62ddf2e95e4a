use super::matrix::{Matrix, MatrixError};
use super::net::Net;
use crate::data::Samples;

/// Index of the largest value. On ties the first maximum wins.
///
/// # Examples
/// ```
/// # use digitnet::feedforward::argmax;
/// assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), 1);
/// ```
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Predicted class of `image`.
pub fn predict(net: &Net, image: &Matrix) -> Result<usize, MatrixError> {
    Ok(argmax(net.feed_forward(image)?.as_slice()))
}

/// Fraction of `samples` whose predicted class equals the label, in [0,1].
/// An empty set scores 0.
///
/// # Examples
/// ```
/// # use digitnet::data::Samples;
/// # use digitnet::feedforward::{accuracy, Matrix, Net};
/// let net = Net::with_geometry(&[2, 3, 2], &mut rand::thread_rng()).unwrap();
/// let images = vec![Matrix::row_vector(vec![0.0, 1.0]).unwrap()];
/// let samples = Samples::new(images, vec![1]).unwrap();
/// let score = accuracy(&net, &samples).unwrap();
/// assert!(score == 0.0 || score == 1.0);
/// ```
pub fn accuracy(net: &Net, samples: &Samples) -> Result<f64, MatrixError> {
    if samples.is_empty() {
        return Ok(0.0);
    }

    let mut correct = 0;
    for (image, label) in samples.iter() {
        if predict(net, image)? == label {
            correct += 1;
        }
    }
    Ok(correct as f64 / samples.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedforward::Layer;

    #[test]
    fn argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.9, 0.3, 0.9, 0.9]), 1);
        assert_eq!(argmax(&[0.0, 0.0, 0.0]), 0);
        assert_eq!(argmax(&[0.2, 0.1, 0.3]), 2);
    }

    /// Two outputs that copy the sign of the single input.
    fn sign_net() -> Net {
        let weights = Matrix::from_vec(1, 2, vec![-10.0, 10.0]).unwrap();
        let biases = Matrix::new(1, 2).unwrap();
        Net::from_layers(vec![Layer::new(weights, biases).unwrap()]).unwrap()
    }

    #[test]
    fn accuracy_counts_matches() {
        let net = sign_net();
        let images = vec![-1.0, 2.0, 0.5, -0.3]
            .into_iter()
            .map(|x| Matrix::row_vector(vec![x]).unwrap())
            .collect();
        // Last label is wrong on purpose
        let samples = Samples::new(images, vec![0, 1, 1, 1]).unwrap();
        assert_eq!(accuracy(&net, &samples).unwrap(), 0.75);
    }

    #[test]
    fn zero_input_ties_to_first_class() {
        let net = sign_net();
        let image = Matrix::row_vector(vec![0.0]).unwrap();
        assert_eq!(predict(&net, &image).unwrap(), 0);
    }

    #[test]
    fn empty_set_scores_zero() {
        let samples = Samples::new(vec![], vec![]).unwrap();
        assert_eq!(accuracy(&sign_net(), &samples).unwrap(), 0.0);
    }

    #[test]
    fn wrong_input_width_is_an_error() {
        let images = vec![Matrix::row_vector(vec![1.0, 2.0]).unwrap()];
        let samples = Samples::new(images, vec![0]).unwrap();
        assert!(accuracy(&sign_net(), &samples).is_err());
    }
}
