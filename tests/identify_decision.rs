use idmatch::{decide, Decision, DecisionConfig, IdentityAccumulator, TieBreak};

fn accumulator(subject: u32, scores: &[usize]) -> IdentityAccumulator {
    let mut acc = IdentityAccumulator::new(subject);
    for &score in scores {
        acc.add_comparison(score);
    }
    acc
}

fn permissive() -> DecisionConfig {
    DecisionConfig {
        min_confidence: None,
        ..DecisionConfig::default()
    }
}

#[test]
fn accumulator_averages_comparisons() {
    let acc = accumulator(4, &[10, 20]);
    assert_eq!(acc.mean(), Some(15.0));
    assert_eq!(acc.count(), 2);
    assert_eq!(acc.sum(), 30.0);
}

#[test]
fn ties_go_to_the_lowest_id_by_default() {
    let accs = [accumulator(7, &[10]), accumulator(3, &[10])];
    assert_eq!(decide(&accs, &permissive()), Decision::Match(3));

    let highest = DecisionConfig {
        tie_break: TieBreak::HighestId,
        ..permissive()
    };
    assert_eq!(decide(&accs, &highest), Decision::Match(7));
}

#[test]
fn weak_winner_is_rejected() {
    let accs = [accumulator(1, &[5]), accumulator(2, &[12])];
    assert_eq!(decide(&accs, &DecisionConfig::default()), Decision::NoMatch);
    assert_eq!(decide(&accs, &permissive()), Decision::Match(2));
}

#[test]
fn subjects_without_comparisons_are_excluded() {
    let accs = [accumulator(1, &[]), accumulator(2, &[0, 0])];
    assert_eq!(decide(&accs, &permissive()), Decision::Match(2));
    assert_eq!(accs[0].mean(), None);
}

#[test]
fn higher_mean_beats_more_comparisons() {
    let accs = [accumulator(1, &[40, 40, 0]), accumulator(2, &[36])];
    assert_eq!(decide(&accs, &DecisionConfig::default()), Decision::Match(2));
}
