// Loading CSV sample files from disk, then training and scoring on them.

use std::io::Write;

use rand::{rngs::StdRng, SeedableRng};
use tempfile::NamedTempFile;

use digitnet::config::{load_config, TrainConfig};
use digitnet::data::{load_csv, DataError, LoadOptions};
use digitnet::feedforward::{accuracy, Net};

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn options(pixels: usize) -> LoadOptions {
    LoadOptions {
        pixels,
        ..LoadOptions::default()
    }
}

#[test]
fn test_load_csv_normalizes_pixels() {
    let file = write_file("0,0,0,0,255\n1,255,255,0,0\n2,102,51,0,255\n");
    let samples = load_csv(file.path(), &options(4)).unwrap();

    assert_eq!(samples.len(), 3);
    assert_eq!(samples.labels(), &[0, 1, 2]);
    assert_eq!(samples.feature_count(), 4);
    assert_eq!(samples.images()[2].as_slice(), &[0.4, 0.2, 0.0, 1.0]);
}

#[test]
fn test_load_csv_reports_malformed_line() {
    let file = write_file("0,0,0\n1,0,zero\n");
    match load_csv(file.path(), &options(2)) {
        Err(DataError::MalformedRecord { line, reason }) => {
            assert_eq!(line, 2);
            assert!(reason.to_string().contains("zero"));
        }
        other => panic!("expected malformed record, got {:?}", other),
    }
}

#[test]
fn test_load_csv_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_csv(dir.path().join("absent.csv"), &options(2));
    assert!(matches!(result, Err(DataError::Io(_))));
}

#[test]
fn test_train_and_score_from_files() {
    // Bright left half is class 0, bright right half is class 1
    let mut rows = String::new();
    for i in 0..60 {
        let level = 200 + (i % 5) * 10;
        if i % 2 == 0 {
            rows.push_str(&format!("0,{0},{0},0,0\n", level));
        } else {
            rows.push_str(&format!("1,0,0,{0},{0}\n", level));
        }
    }
    let file = write_file(&rows);
    let mut samples = load_csv(file.path(), &options(4)).unwrap();
    let held_out = samples.clone();

    let mut rng = StdRng::seed_from_u64(8);
    let net = Net::with_geometry(&[4, 8, 2], &mut rng).unwrap();
    let config = TrainConfig {
        batch_size: 6,
        epochs: 60,
        learning_rate: 2.0,
        seed: None,
    };
    let mut trainer = net.build_trainer(config).unwrap();
    trainer.train(&mut samples, &mut rng).unwrap();

    assert!(accuracy(trainer.net_ref(), &held_out).unwrap() > 0.9);
}

#[test]
fn test_load_config_file() {
    let file = write_file(
        r#"{
            "network": { "input_features": 4, "output_classes": 2, "hidden_layers": 1 },
            "training": { "epochs": 5, "learning_rate": 0.5 }
        }"#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.network.input_features, 4);
    assert_eq!(config.network.neurons_per_hidden_layer, 16);
    assert_eq!(config.training.epochs, 5);

    let mut rng = StdRng::seed_from_u64(0);
    let net = Net::new(&config.network, &mut rng).unwrap();
    assert_eq!(net.geometry(), &[4, 16, 2]);
}

#[test]
fn test_load_config_rejects_invalid_file() {
    let file = write_file(r#"{ "training": { "batch_size": 0 } }"#);
    assert!(load_config(file.path()).is_err());

    let file = write_file("not json");
    assert!(load_config(file.path()).is_err());
}
