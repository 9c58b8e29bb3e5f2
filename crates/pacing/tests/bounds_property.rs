//! Randomized checks of the rate-bound invariants.

use gsync_pacing::FrameRateController;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_invariants(c: &FrameRateController, step: usize) {
    assert!(
        c.floor() <= c.min() && c.min() <= c.max(),
        "step {step}: floor {} min {} max {}",
        c.floor(),
        c.min(),
        c.max()
    );
}

#[test]
fn random_adjustments_keep_bounds_ordered() {
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let hint = rng.gen_range(0.0..240.0);
        let mut c = FrameRateController::new(hint);

        for step in 0..500 {
            let by = rng.gen_range(0..400u32);
            match rng.gen_range(0..6u8) {
                0 => c.raise_min(by),
                1 => c.lower_min(by),
                2 => c.raise_max(by),
                3 => c.lower_max(by),
                4 => c.adjust_min(rng.gen_range(-400..400)),
                _ => c.adjust_max(rng.gen_range(-400..400)),
            }
            assert_invariants(&c, step);
        }
    }
}

#[test]
fn simulated_rate_stays_within_effective_bounds() {
    let mut rng = StdRng::seed_from_u64(0x6705);
    let mut c = FrameRateController::new(144.0);

    for _ in 0..200 {
        c.adjust_min(rng.gen_range(-50..50));
        c.adjust_max(rng.gen_range(-50..50));

        let low = c.floor().max(c.min());
        let high = c.max();
        for _ in 0..50 {
            let t = rng.gen_range(0.0..10_000.0);
            c.compute_next_delay(t);
            let rate = c.current_simulated_rate();
            assert!(rate > 0.0);
            assert!(
                rate >= low - 1e-9 && rate <= high + 1e-9,
                "rate {rate} outside [{low}, {high}] at t={t}"
            );
            assert!((c.next_frame_delay_sec() - 1.0 / rate).abs() < 1e-12);
        }
    }
}
