// Compares backprop gradients against centered finite differences of the cost.

use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, SeedableRng};

use digitnet::config::TrainConfig;
use digitnet::feedforward::{Layer, Matrix, Net};

const EPSILON: f64 = 1e-5;
const TOLERANCE: f64 = 1e-4;

fn cost(net: &Net, image: &Matrix, label: usize) -> f64 {
    Net::calc_cost(net.feed_forward(image).unwrap().as_slice(), label)
}

/// Copy of `net` with one parameter shifted by `delta`.
fn perturbed(net: &Net, layer: usize, is_weight: bool, index: usize, delta: f64) -> Net {
    let layers = net
        .layers()
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, l)| {
            let (mut weights, mut biases) = l.into_parts();
            if i == layer {
                let target = if is_weight { &mut weights } else { &mut biases };
                target.as_mut_slice()[index] += delta;
            }
            Layer::new(weights, biases).unwrap()
        })
        .collect();
    Net::from_layers(layers).unwrap()
}

fn check_gradients(geometry: &[usize], image: Vec<f64>, label: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let net = Net::with_geometry(geometry, &mut rng).unwrap();
    let image = Matrix::row_vector(image).unwrap();

    let mut trainer = net.clone().build_trainer(TrainConfig::default()).unwrap();
    let analytic_cost = trainer.backprop_one(&image, label).unwrap();
    assert_abs_diff_eq!(analytic_cost, cost(&net, &image, label), epsilon = 1e-12);

    let mut checked = 0;
    for layer in 0..net.layer_count() {
        for &is_weight in &[true, false] {
            let analytic = if is_weight {
                &trainer.weight_changes()[layer]
            } else {
                &trainer.bias_changes()[layer]
            };

            for (index, &grad) in analytic.as_slice().iter().enumerate() {
                let plus = cost(&perturbed(&net, layer, is_weight, index, EPSILON), &image, label);
                let minus = cost(&perturbed(&net, layer, is_weight, index, -EPSILON), &image, label);
                let numeric = (plus - minus) / (2.0 * EPSILON);

                assert_abs_diff_eq!(grad, numeric, epsilon = TOLERANCE);
                checked += 1;
            }
        }
    }

    let expected: usize = geometry.windows(2).map(|w| (w[0] + 1) * w[1]).sum();
    assert_eq!(checked, expected);
}

#[test]
fn test_gradients_single_hidden_layer() {
    check_gradients(&[2, 3, 2], vec![0.3, 0.8], 1, 42);
}

#[test]
fn test_gradients_other_label() {
    check_gradients(&[2, 3, 2], vec![0.9, 0.1], 0, 7);
}

#[test]
fn test_gradients_two_hidden_layers() {
    check_gradients(&[4, 5, 3, 3], vec![0.0, 0.25, 0.5, 1.0], 2, 1234);
}

#[test]
fn test_gradients_without_hidden_layer() {
    check_gradients(&[3, 4], vec![0.2, 0.4, 0.6], 3, 99);
}

#[test]
fn test_gradients_accumulate_across_samples() {
    let mut rng = StdRng::seed_from_u64(5);
    let net = Net::with_geometry(&[2, 3, 2], &mut rng).unwrap();
    let a = Matrix::row_vector(vec![0.1, 0.4]).unwrap();
    let b = Matrix::row_vector(vec![0.7, 0.2]).unwrap();

    let mut separate_a = net.clone().build_trainer(TrainConfig::default()).unwrap();
    separate_a.backprop_one(&a, 0).unwrap();
    let mut separate_b = net.clone().build_trainer(TrainConfig::default()).unwrap();
    separate_b.backprop_one(&b, 1).unwrap();

    let mut both = net.build_trainer(TrainConfig::default()).unwrap();
    both.backprop_one(&a, 0).unwrap();
    both.backprop_one(&b, 1).unwrap();
    assert_eq!(both.pending_samples(), 2);

    for layer in 0..2 {
        let sum = separate_a.weight_changes()[layer]
            .as_slice()
            .iter()
            .zip(separate_b.weight_changes()[layer].as_slice());
        for ((x, y), &z) in sum.zip(both.weight_changes()[layer].as_slice()) {
            assert_abs_diff_eq!(x + y, z, epsilon = 1e-12);
        }
    }
}
