#![cfg(feature = "rayon")]

use idmatch::{
    identify, Budget, CurateConfig, Curator, DecisionConfig, DescriptorSet, Gallery, Keypoint,
    MatchConfig, Matcher, Model,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_model(rng: &mut StdRng, n: usize, base: Option<&Model>) -> Model {
    let codes: Vec<u8> = match base {
        Some(base) => base
            .descriptors()
            .as_binary()
            .unwrap()
            .iter()
            .map(|&b| if rng.random_range(0..16) == 0 { b ^ 0x01 } else { b })
            .collect(),
        None => (0..n * 32).map(|_| rng.random::<u8>()).collect(),
    };
    let keypoints = match base {
        Some(base) => base.keypoints().to_vec(),
        None => (0..n)
            .map(|_| {
                Keypoint::new(
                    rng.random_range(0.0..100.0),
                    rng.random_range(0.0..100.0),
                    rng.random_range(5.0..15.0),
                    rng.random_range(0.0..360.0),
                )
            })
            .collect(),
    };
    Model::new(keypoints, DescriptorSet::binary(codes, 32).unwrap()).unwrap()
}

fn gallery(rng: &mut StdRng) -> Gallery {
    let mut gallery = Gallery::new();
    for subject in 1..=4u32 {
        let base = random_model(rng, 40, None);
        for _ in 0..3 {
            let photo = random_model(rng, 40, Some(&base));
            gallery.insert_model(subject, photo).unwrap();
        }
    }
    // Subjects 1 and 2 share a block of keypoints so curation has work to do.
    let shared = random_model(rng, 40, None);
    gallery.insert_model(1, shared.clone()).unwrap();
    gallery.insert_model(2, shared).unwrap();
    gallery
}

#[test]
fn parallel_identify_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(99);
    let gallery = gallery(&mut rng);
    let query = gallery.models(3).unwrap()[1].clone();

    let sequential = Matcher::new(MatchConfig::default()).unwrap();
    let parallel = Matcher::new(MatchConfig {
        parallel: true,
        ..MatchConfig::default()
    })
    .unwrap();
    let cfg = DecisionConfig::default();

    let seq = identify(&query, &gallery, &sequential, &cfg).unwrap();
    let par = identify(&query, &gallery, &parallel, &cfg).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn parallel_curation_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(3);
    let gallery = gallery(&mut rng);

    let sequential = Curator::new(CurateConfig::default()).unwrap();
    let parallel = Curator::new(CurateConfig {
        parallel: true,
        matching: MatchConfig {
            knn: 5,
            parallel: true,
            ..MatchConfig::default()
        },
    })
    .unwrap();

    let (seq_gallery, seq_report) = sequential
        .curate_gallery(&gallery, &Budget::unlimited())
        .unwrap();
    let (par_gallery, par_report) = parallel
        .curate_gallery(&gallery, &Budget::unlimited())
        .unwrap();
    assert_eq!(seq_gallery, par_gallery);
    assert_eq!(seq_report, par_report);
    assert!(seq_report.total_dropped() > 0);
}
