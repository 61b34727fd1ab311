//! Trains the MLP on three synthetic 2-D blobs and prints the per-epoch
//! history, the same loop an interactive host would drive.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use digit_mlp::{Batch, FitConfig, MemoryDataset, Network};

fn blobs(rng: &mut StdRng, per_class: usize) -> Batch {
    let centers = [[-1.0_f32, -1.0], [1.0, -1.0], [0.0, 1.0]];

    let mut xs = Vec::with_capacity(3 * per_class);
    let mut ys = Vec::with_capacity(3 * per_class);
    for (class, center) in centers.iter().enumerate() {
        for _ in 0..per_class {
            let x0 = center[0] + rng.gen_range(-0.3..0.3);
            let x1 = center[1] + rng.gen_range(-0.3..0.3);
            xs.push(vec![x0, x1]);

            let mut one_hot = vec![0.0_f32; 3];
            one_hot[class] = 1.0;
            ys.push(one_hot);
        }
    }
    Batch::from_rows(&xs, &ys).expect("generated rows are uniform")
}

fn main() -> digit_mlp::Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let train = blobs(&mut rng, 128);
    let test = blobs(&mut rng, 32);
    let mut data = MemoryDataset::new(train, test, 0)?;

    let mut net = Network::new_with_seed(&[2, 16, 3], 0)?;
    // Two-dim points would trip the blank-drawing guard meant for 28x28
    // canvases, so switch it off for this demo.
    net.set_min_active_inputs(0);

    let cfg = FitConfig {
        epochs: 30,
        batches_per_epoch: 8,
        batch_size: 32,
        eval_batch_size: 96,
        base_learning_rate: 0.05,
        lr_decay: 0.95,
        eval_every: 2,
    };

    let report = net.fit_with(&mut data, &cfg, |e| {
        println!(
            "epoch {:2}/{}: loss={:.4} accuracy={:5.1}% lr={:.4}",
            e.epoch,
            cfg.epochs,
            e.loss,
            e.accuracy * 100.0,
            e.learning_rate
        );
    })?;

    println!(
        "final: loss={:.4} accuracy={:.1}%",
        report.final_loss(),
        report.final_accuracy() * 100.0
    );
    Ok(())
}
