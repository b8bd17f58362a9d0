//! `train_network` always checkpoints to `neural_network_save` in the working
//! directory. This file holds a single test so changing the directory
//! cannot race with anything else in the process.

use digitnet::trainer::DEFAULT_CHECKPOINT;
use digitnet::Network;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::fs;

#[test]
fn train_network_uses_defaults() {
    let dir = env::temp_dir().join(format!("digitnet-defaults-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    env::set_current_dir(&dir).unwrap();

    let inputs: Vec<Vec<f32>> = (0..70)
        .map(|i| {
            if i % 2 == 0 {
                vec![1.0, 0.0, 0.0, 0.0]
            } else {
                vec![0.0, 0.0, 0.0, 1.0]
            }
        })
        .collect();
    let targets: Vec<Vec<f32>> = (0..70)
        .map(|i| if i % 2 == 0 { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
        .collect();

    let mut network = Network::with_rng(4, 3, 2, &mut StdRng::seed_from_u64(21)).unwrap();
    let report = network.train_network(&inputs, &targets, 0.5, 3).unwrap();
    assert_eq!(report.epochs, 3);
    assert_eq!(report.total_epochs, 3);
    assert_eq!(report.batches, 3 * 2);
    assert_eq!(network.epoch(), 3);

    let checkpoint = dir.join(DEFAULT_CHECKPOINT);
    assert!(checkpoint.is_file());

    let mut restored = Network::with_rng(4, 3, 2, &mut StdRng::seed_from_u64(22)).unwrap();
    restored.load(&checkpoint).unwrap();
    assert_eq!(restored.epoch(), 3);
    assert_eq!(restored.w1(), network.w1());
    assert_eq!(restored.w2(), network.w2());
    assert_eq!(restored.b1(), network.b1());
    assert_eq!(restored.b2(), network.b2());

    network.train_network(&inputs, &targets, 0.5, 2).unwrap();
    assert_eq!(network.epoch(), 5);
    restored.load(&checkpoint).unwrap();
    assert_eq!(restored.epoch(), 5);

    fs::remove_dir_all(&dir).unwrap();
}
