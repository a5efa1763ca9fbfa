use idmatch::lowlevel::{knn_match, vote_for_uniqueness, VoteCell};
use idmatch::{DescriptorSet, Keypoint, MatchConfig, Matcher, Model};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: usize = 32;

fn random_model(rng: &mut StdRng, n: usize) -> Model {
    let keypoints = (0..n)
        .map(|_| {
            Keypoint::new(
                rng.random_range(0.0..200.0),
                rng.random_range(0.0..200.0),
                rng.random_range(4.0..24.0),
                rng.random_range(0.0..360.0),
            )
        })
        .collect();
    let codes = (0..n * WIDTH).map(|_| rng.random::<u8>()).collect();
    Model::new(keypoints, DescriptorSet::binary(codes, WIDTH).unwrap()).unwrap()
}

/// Flips `bits` random bits in every row and jitters positions.
fn perturbed(rng: &mut StdRng, model: &Model, bits: usize) -> Model {
    let mut codes = model.descriptors().as_binary().unwrap().to_vec();
    for row in codes.chunks_exact_mut(WIDTH) {
        for _ in 0..bits {
            let bit = rng.random_range(0..WIDTH * 8);
            row[bit / 8] ^= 1 << (bit % 8);
        }
    }
    let keypoints = model
        .keypoints()
        .iter()
        .map(|kp| {
            Keypoint::new(
                kp.x + rng.random_range(-1.0..1.0),
                kp.y + rng.random_range(-1.0..1.0),
                kp.size,
                kp.angle,
            )
        })
        .collect();
    Model::new(keypoints, DescriptorSet::binary(codes, WIDTH).unwrap()).unwrap()
}

#[test]
fn self_match_keeps_everything_in_the_identity_cell() {
    let mut rng = StdRng::seed_from_u64(7);
    let model = random_model(&mut rng, 50);
    let pair = Matcher::default().score(&model, &model).unwrap();

    assert_eq!(pair.unique, 50);
    assert_eq!(pair.score, 50);
    let vote = pair.vote.expect("vote ran");
    assert_eq!(
        vote.winner,
        Some(VoteCell {
            scale_bin: 0,
            rotation_bin: 0
        })
    );
}

#[test]
fn raising_the_ratio_never_loses_rows() {
    let mut rng = StdRng::seed_from_u64(11);
    let reference = random_model(&mut rng, 40);
    let model = random_model(&mut rng, 40);
    let query = perturbed(&mut rng, &model, 0);
    let cfg = MatchConfig::default();

    let base = knn_match(query.descriptors(), reference.descriptors(), &cfg).unwrap();
    let mut previous = 0;
    for ratio in [0.5f32, 0.7, 0.8, 0.9, 0.95, 1.0] {
        let mut result = base.clone();
        let alive = vote_for_uniqueness(&mut result, ratio, None);
        assert!(alive >= previous, "ratio {ratio}: {alive} < {previous}");
        previous = alive;
    }
}

#[test]
fn voting_only_removes_ratio_test_survivors() {
    let mut rng = StdRng::seed_from_u64(19);
    let reference = random_model(&mut rng, 60);
    let mut query = perturbed(&mut rng, &reference, 12);
    // Scramble the geometry of a third of the rows so voting has work to do.
    let keypoints: Vec<Keypoint> = query
        .keypoints()
        .iter()
        .enumerate()
        .map(|(i, kp)| {
            if i % 3 == 0 {
                Keypoint::new(kp.x, kp.y, kp.size * 4.0, kp.angle + 170.0)
            } else {
                *kp
            }
        })
        .collect();
    query = Model::new(keypoints, query.descriptors().clone()).unwrap();

    let cfg = MatchConfig::default();
    let mut unique = knn_match(query.descriptors(), reference.descriptors(), &cfg).unwrap();
    vote_for_uniqueness(&mut unique, cfg.uniqueness_ratio, cfg.max_distance);

    let pair = Matcher::new(cfg).unwrap().score(&query, &reference).unwrap();
    assert!(pair.voted());
    assert!(pair.score < pair.unique);
    for (row, &alive) in pair.result.alive().iter().enumerate() {
        if alive {
            assert!(unique.alive()[row], "row {row} revived by voting");
        }
    }
}

#[test]
fn float_descriptors_use_euclidean_distance() {
    let mut rng = StdRng::seed_from_u64(23);
    let n = 12;
    let keypoints: Vec<Keypoint> = (0..n)
        .map(|i| Keypoint::new(i as f32, 0.0, 10.0, 45.0))
        .collect();
    let values: Vec<f32> = (0..n * 64).map(|_| rng.random_range(-1.0..1.0)).collect();
    let reference = Model::new(
        keypoints.clone(),
        DescriptorSet::float(values.clone(), 64).unwrap(),
    )
    .unwrap();
    let noisy: Vec<f32> = values
        .iter()
        .map(|v| v + rng.random_range(-0.01..0.01))
        .collect();
    let query = Model::new(keypoints, DescriptorSet::float(noisy, 64).unwrap()).unwrap();

    let pair = Matcher::default().score(&query, &reference).unwrap();
    assert_eq!(pair.score, n);
    for row in 0..n {
        assert_eq!(pair.result.best(row).map(|(idx, _)| idx), Some(row));
    }
}

#[test]
fn empty_reference_scores_zero() {
    let mut rng = StdRng::seed_from_u64(29);
    let query = random_model(&mut rng, 10);
    let reference = Model::empty(query.spec()).unwrap();
    let pair = Matcher::default().score(&query, &reference).unwrap();
    assert_eq!(pair.score, 0);
    assert!(!pair.voted());
}
