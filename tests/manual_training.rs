//! The draw-label-train workflow around the linear classifier.

use rand::rngs::StdRng;
use rand::SeedableRng;

use digit_mlp::{ExampleStore, LinearClassifier, TeachConfig};

/// A crude 4x4 "drawing" for a class: the class-th row lit up.
fn drawing(class: usize) -> Vec<f32> {
    let mut pixels = vec![0.0_f32; 16];
    for col in 0..4 {
        pixels[class * 4 + col] = 0.9;
    }
    // A faint smudge elsewhere so every drawing clears the five-pixel bar.
    pixels[(class * 4 + 7) % 16] = 0.3;
    pixels[(class * 4 + 11) % 16] = 0.2;
    pixels
}

#[test]
fn five_hundred_iterations_on_one_example_nail_it() {
    let mut model = LinearClassifier::new_with_seed(16, 10, 0).unwrap();
    let input = drawing(3);

    let mut loss = f32::MAX;
    for _ in 0..500 {
        loss = model.train(&input, 3).unwrap();
    }

    assert!(loss < 0.01);
    assert_eq!(model.predict(&input).unwrap().class, 3);
}

#[test]
fn teach_learns_a_handful_of_classes() {
    let mut store = ExampleStore::new(16, 4).unwrap();
    for class in 0..4 {
        for _ in 0..3 {
            store.push(&drawing(class), class).unwrap();
        }
    }
    assert_eq!(store.class_counts(), vec![3, 3, 3, 3]);

    let mut model = LinearClassifier::new_with_seed(16, 4, 9).unwrap();
    let mut rng = StdRng::seed_from_u64(9);

    let mut losses = Vec::new();
    let report = model
        .teach_with(&store, &TeachConfig::default(), &mut rng, |e| {
            losses.push(e.loss);
        })
        .unwrap();

    assert_eq!(losses.len(), 50);
    assert!(report.final_loss() < losses[0]);
    assert!(report.final_loss() < 0.05);

    for class in 0..4 {
        assert_eq!(model.predict(&drawing(class)).unwrap().class, class);
    }
}

#[test]
fn store_and_model_lifecycles_are_independent() {
    let mut store = ExampleStore::new(16, 4).unwrap();
    store.push(&drawing(1), 1).unwrap();

    let mut model = LinearClassifier::new_with_seed(16, 4, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    model.teach(&store, &TeachConfig::default(), &mut rng).unwrap();

    // Resetting the model leaves the examples alone.
    model.reset_with_seed(1);
    assert_eq!(store.len(), 1);

    // Clearing the examples leaves the (reset) model usable.
    store.clear();
    assert!(store.is_empty());
    assert!(model.predict(&drawing(1)).is_ok());
}

#[test]
fn teach_applies_the_configured_learning_rate() {
    let mut store = ExampleStore::new(16, 4).unwrap();
    store.push(&drawing(2), 2).unwrap();

    let mut model = LinearClassifier::new_with_seed(16, 4, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let cfg = TeachConfig {
        epochs: 1,
        learning_rate: 0.02,
    };
    model.teach(&store, &cfg, &mut rng).unwrap();

    assert_eq!(model.learning_rate(), 0.02);
}
