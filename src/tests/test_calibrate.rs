use std::collections::HashMap;

use approx::assert_relative_eq;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::calibrate::{CalibrationParams, CalibrationTarget, Calibrator, OracleClaim};
use crate::distance::DistanceKind;
use crate::error::Error;
use crate::space::Bag;
use crate::vectorize::{Vectorizer, VectorizerBuilder};

use crate::tests::test_helpers::{bag, xyz_bags};
use crate::tests::FD_TOLERANCE;

fn target(
    distance: DistanceKind,
    pair: (Vec<Bag<String>>, Vec<Bag<String>>),
    interval: (f64, f64),
) -> CalibrationTarget<String> {
    CalibrationTarget {
        distance,
        claim: OracleClaim::new(pair, interval),
    }
}

fn one_round(speed: f64) -> Calibrator {
    Calibrator::new(CalibrationParams {
        speed,
        ratio_item_bag: 0.5,
        steps: 1,
    })
}

/// Total derivative of the claim distance with respect to one item weight,
/// summing the backpropagated gradients of both sides (the weights are
/// shared between them).
fn analytic_weight_gradients(
    v: &Vectorizer<String>,
    distance: DistanceKind,
    c0: &[Bag<String>],
    c1: &[Bag<String>],
) -> (Vec<f64>, Vec<f64>) {
    let v0 = v.project(c0).unwrap();
    let v1 = v.project(c1).unwrap();
    let g0 = distance.gradient_wrt_first(&v0, &v1).unwrap();
    let g1 = distance.gradient_wrt_second(&v0, &v1).unwrap();
    let (item_g0, bag_g0) = v.backpropagate(c0, &g0).unwrap();
    let (item_g1, bag_g1) = v.backpropagate(c1, &g1).unwrap();
    let item_grad = item_g0.iter().zip(item_g1.iter()).map(|(a, b)| a + b).collect();
    let bag_grad = bag_g0.iter().zip(bag_g1.iter()).map(|(a, b)| a + b).collect();
    (item_grad, bag_grad)
}

#[test]
fn backpropagation_matches_finite_differences() {
    let bags = xyz_bags();
    let v = VectorizerBuilder::new()
        .with_item_weights(
            [("x".to_string(), 1.5), ("y".to_string(), 0.7)]
                .into_iter()
                .collect(),
        )
        .build(&bags)
        .unwrap();
    let c0 = vec![bags[0].clone()];
    let c1 = vec![bags[1].clone(), bags[2].clone()];
    let distance = DistanceKind::Cosine;

    let (item_grad, bag_grad) = analytic_weight_gradients(&v, distance, &c0, &c1);

    let eval = |v: &Vectorizer<String>| {
        distance
            .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
            .unwrap()
    };
    let h = 1e-6;

    for (k, item) in v.items().iter().enumerate() {
        let mut plus = v.clone();
        let mut minus = v.clone();
        let mut weights: HashMap<String, f64> = v.get_item_weights();
        *weights.get_mut(item).unwrap() += h;
        plus.set_item_weights(&weights, true).unwrap();
        *weights.get_mut(item).unwrap() -= 2.0 * h;
        minus.set_item_weights(&weights, true).unwrap();
        let fd = (eval(&plus) - eval(&minus)) / (2.0 * h);
        assert_relative_eq!(item_grad[k], fd, max_relative = FD_TOLERANCE, epsilon = 1e-9);
    }

    for (j, b) in v.bags().iter().enumerate() {
        let mut plus = v.clone();
        let mut minus = v.clone();
        let mut weights: HashMap<Bag<String>, f64> = v.get_bag_weights();
        *weights.get_mut(b).unwrap() += h;
        plus.set_bag_weights(&weights, false).unwrap();
        *weights.get_mut(b).unwrap() -= 2.0 * h;
        minus.set_bag_weights(&weights, false).unwrap();
        let fd = (eval(&plus) - eval(&minus)) / (2.0 * h);
        assert_relative_eq!(bag_grad[j], fd, max_relative = FD_TOLERANCE, epsilon = 1e-9);
    }
}

#[test]
fn one_round_moves_the_distance_toward_the_interval() {
    let bags = xyz_bags();
    let mut v = VectorizerBuilder::new().build(&bags).unwrap();
    let c0 = vec![bags[0].clone()];
    let c1 = vec![bags[1].clone()];

    let before = DistanceKind::Cosine
        .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
        .unwrap();
    let interval = (0.1, 0.2);
    assert!(before > interval.1, "fixture must start outside the interval");

    let t = target(DistanceKind::Cosine, (c0.clone(), c1.clone()), interval);
    one_round(0.3).fit(&mut v, &[t]).unwrap();

    let after = DistanceKind::Cosine
        .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
        .unwrap();
    println!("cosine calibration: before={before:.6}, after={after:.6}");
    assert!(after < before);
    assert!((after - interval.1).abs() < (before - interval.1).abs());
}

#[test]
fn one_round_moves_jensen_shannon_too() {
    let bags = xyz_bags();
    let mut v = VectorizerBuilder::new().build(&bags).unwrap();
    let c0 = vec![bags[0].clone()];
    let c1 = vec![bags[1].clone()];

    let before = DistanceKind::JensenShannon
        .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
        .unwrap();
    let interval = (0.0, before * 0.5);

    let t = target(DistanceKind::JensenShannon, (c0.clone(), c1.clone()), interval);
    one_round(0.3).fit(&mut v, &[t]).unwrap();

    let after = DistanceKind::JensenShannon
        .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
        .unwrap();
    println!("jensen-shannon calibration: before={before:.6}, after={after:.6}");
    assert!(after < before);
}

/// Statistical monotonicity over randomized instances: one round with
/// speed 0.3 should move almost every claim strictly closer to its nearest
/// bound (clamping can stall individual instances).
#[test]
fn calibration_monotonicity_over_random_instances() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let alphabet = [
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l",
    ];
    let mut evaluated = 0usize;
    let mut improved = 0usize;

    for _ in 0..20 {
        let n_bags = rng.gen_range(4..=8);
        let bags: Vec<Bag<String>> = (0..n_bags)
            .map(|_| {
                let len = rng.gen_range(3..=6);
                (0..len)
                    .map(|_| alphabet[rng.gen_range(0..alphabet.len())].to_string())
                    .collect()
            })
            .collect();
        let mut v = match VectorizerBuilder::new().build(&bags) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let distinct = v.bags().to_vec();
        if distinct.len() < 2 {
            continue;
        }
        let half = distinct.len() / 2;
        let c0 = distinct[..half].to_vec();
        let c1 = distinct[half..].to_vec();

        let before = DistanceKind::Cosine
            .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
            .unwrap();
        if !(0.02..=0.98).contains(&before) {
            continue;
        }
        let interval = if before > 0.5 {
            (0.01, before - 0.1)
        } else {
            (before + 0.1, 0.99)
        };
        let bound = if before > interval.1 { interval.1 } else { interval.0 };

        let t = target(DistanceKind::Cosine, (c0.clone(), c1.clone()), interval);
        one_round(0.3).fit(&mut v, &[t]).unwrap();

        // A step can in principle zero out a whole projection; such an
        // instance is unusable rather than a regression.
        let Ok(after) =
            DistanceKind::Cosine.distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
        else {
            continue;
        };
        evaluated += 1;
        if (after - bound).abs() < (before - bound).abs() {
            improved += 1;
        }
    }

    println!("monotonicity: improved {improved} of {evaluated} instances");
    assert!(evaluated >= 5, "not enough usable random instances");
    assert!(improved * 10 >= evaluated * 8, "fewer than 80% improved");
}

#[test]
fn satisfied_claims_leave_weights_untouched() {
    let bags = xyz_bags();
    let mut v = VectorizerBuilder::new().build(&bags).unwrap();
    let c0 = vec![bags[0].clone()];
    let c1 = vec![bags[1].clone()];
    let d = DistanceKind::Cosine
        .distance(&v.project(&c0).unwrap(), &v.project(&c1).unwrap())
        .unwrap();

    let item_before = v.item_weights().to_vec();
    let bag_before = v.bag_weights().to_vec();

    let t = target(DistanceKind::Cosine, (c0, c1), (d - 0.05, d + 0.05));
    Calibrator::default().fit(&mut v, &[t]).unwrap();

    assert_eq!(v.item_weights(), item_before.as_slice());
    assert_eq!(v.bag_weights(), bag_before.as_slice());
}

#[test]
fn calibration_fails_fast_on_an_unknown_bag() {
    let bags = xyz_bags();
    let mut v = VectorizerBuilder::new().build(&bags).unwrap();
    let item_before = v.item_weights().to_vec();

    let good = target(
        DistanceKind::Cosine,
        (vec![bags[0].clone()], vec![bags[1].clone()]),
        (0.0, 0.1),
    );
    let broken = target(
        DistanceKind::Cosine,
        (vec![bag(&["ghost"])], vec![bags[1].clone()]),
        (0.0, 0.1),
    );

    let err = Calibrator::default().fit(&mut v, &[good, broken]).unwrap_err();
    assert!(matches!(err, Error::UnknownKey(_)));
    // The aborted round committed nothing.
    assert_eq!(v.item_weights(), item_before.as_slice());
}

#[test]
fn weights_stay_nonnegative_through_aggressive_fitting() {
    let bags = xyz_bags();
    let mut v = VectorizerBuilder::new().build(&bags).unwrap();
    let t = target(
        DistanceKind::Cosine,
        (vec![bags[0].clone()], vec![bags[1].clone()]),
        (0.95, 1.0),
    );
    let calibrator = Calibrator::new(CalibrationParams {
        speed: 1.0,
        ratio_item_bag: 0.5,
        steps: 12,
    });
    // Driving weights this hard may zero out a projection and abort the
    // fit; the committed weights must stay nonnegative either way.
    let _ = calibrator.fit(&mut v, &[t]);

    assert!(v.item_weights().iter().all(|&w| w >= 0.0));
    assert!(v.bag_weights().iter().all(|&w| w >= 0.0));
}
