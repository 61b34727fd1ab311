//! End-to-end training scenarios.

use digit_mlp::{Batch, Error, Network};

/// Ten copies each of two orthogonal inputs, one per class.
fn toy_batch() -> Batch {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for _ in 0..10 {
        xs.push(vec![1.0, 0.0, 0.0, 0.0]);
        ys.push(vec![1.0, 0.0]);
    }
    for _ in 0..10 {
        xs.push(vec![0.0, 0.0, 0.0, 1.0]);
        ys.push(vec![0.0, 1.0]);
    }
    Batch::from_rows(&xs, &ys).unwrap()
}

#[test]
fn toy_two_class_problem_reaches_full_accuracy() {
    let mut net = Network::new_with_seed(&[4, 4, 2], 7).unwrap();
    // Four-dim inputs with a single hot entry would trip the blank-drawing
    // guard that is tuned for 28x28 images.
    net.set_min_active_inputs(0);

    let batch = toy_batch();
    for _ in 0..200 {
        net.train(&batch, 0.1).unwrap();
    }

    assert_eq!(net.evaluate(&batch).unwrap(), 1.0);

    let pred = net.predict(&[1.0, 0.0, 0.0, 0.0]).unwrap();
    assert_eq!(pred.class, 0);
    assert!(pred.confidences[0] > 0.9);

    let pred = net.predict(&[0.0, 0.0, 0.0, 1.0]).unwrap();
    assert_eq!(pred.class, 1);
}

#[test]
fn repeated_training_on_one_example_collapses_its_loss() {
    let mut net = Network::new_with_seed(&[6, 8, 3], 21).unwrap();
    let input = [0.2_f32, 0.4, 0.6, 0.8, 1.0, 0.5];
    let target = [0.0_f32, 1.0, 0.0];

    let initial = net.backward(&input, &target, 0.1).unwrap();
    let mut previous = initial;
    for _ in 0..49 {
        let loss = net.backward(&input, &target, 0.1).unwrap();
        // Non-strictly monotone within float noise.
        assert!(loss <= previous + 1e-5);
        previous = loss;
    }

    assert!(previous < initial / 10.0);
}

#[test]
fn confidences_are_always_a_distribution() {
    let net = Network::new_with_seed(&[12, 16, 10], 3).unwrap();

    let inputs = [
        vec![0.3_f32; 12],
        (0..12).map(|i| (i as f32) / 12.0).collect::<Vec<_>>(),
        vec![1.0_f32; 12],
    ];
    for input in &inputs {
        let pred = net.predict(input).unwrap();
        assert_eq!(pred.confidences.len(), 10);
        assert!(pred.confidences.iter().all(|&p| (0.0..=1.0).contains(&p)));
        let sum: f32 = pred.confidences.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}

#[test]
fn predict_rejects_off_by_one_input_lengths() {
    let net = Network::new_with_seed(&[10, 6, 4], 0).unwrap();

    for len in [9, 11] {
        let err = net.predict(&vec![0.5; len]).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 10,
                actual: len
            }
        );
    }
}

#[test]
fn evaluate_is_exact_on_all_correct_and_all_wrong_batches() {
    let mut net = Network::new_with_seed(&[4, 4, 2], 7).unwrap();
    net.set_min_active_inputs(0);

    let batch = toy_batch();
    for _ in 0..200 {
        net.train(&batch, 0.1).unwrap();
    }
    assert_eq!(net.evaluate(&batch).unwrap(), 1.0);

    // Same inputs with every label flipped: nothing matches.
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..batch.len() {
        xs.push(batch.input(i).to_vec());
        let mut flipped = batch.target(i).to_vec();
        flipped.reverse();
        ys.push(flipped);
    }
    let wrong = Batch::from_rows(&xs, &ys).unwrap();
    assert_eq!(net.evaluate(&wrong).unwrap(), 0.0);
}

#[test]
fn reset_restores_fresh_distributional_behavior() {
    let mut net = Network::new_with_seed(&[8, 6, 4], 5).unwrap();
    net.set_min_active_inputs(0);

    // Drive the model into confident predictions.
    let input = vec![0.5_f32; 8];
    let target = [0.0_f32, 0.0, 1.0, 0.0];
    for _ in 0..200 {
        net.backward(&input, &target, 0.2).unwrap();
    }
    assert!(net.predict(&input).unwrap().confidences[2] > 0.9);

    // After reset, a neutral all-zero input must not be dominated by any
    // class: zero activations flow through zeroed biases to near-uniform
    // confidence.
    net.reset_with_seed(123);
    let pred = net.predict(&vec![0.0_f32; 8]).unwrap();
    assert!(pred.confidences.iter().all(|&p| p < 0.5));
    let sum: f32 = pred.confidences.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
}
