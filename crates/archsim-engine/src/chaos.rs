//! Random chaos target selection.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

/// Pick up to `max_count` nodes to fail this round.
///
/// Candidates are `architecture_nodes` minus protected and already-failed
/// ids, shuffled, then accepted one by one with `probability`. If nothing
/// is accepted but there is a candidate and `max_count > 0`, the first
/// shuffled candidate is taken anyway so a round never does nothing.
pub fn select_random_targets<R: Rng>(
    rng: &mut R,
    architecture_nodes: &[String],
    probability: f64,
    max_count: usize,
    protected_ids: &BTreeSet<String>,
    already_failed_ids: &BTreeSet<String>,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut eligible: Vec<&String> = architecture_nodes
        .iter()
        .filter(|id| !protected_ids.contains(*id) && !already_failed_ids.contains(*id))
        .filter(|id| seen.insert(id.as_str()))
        .collect();
    if eligible.is_empty() || max_count == 0 {
        return Vec::new();
    }

    eligible.shuffle(rng);
    let probability = if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut selected = Vec::new();
    for candidate in &eligible {
        if selected.len() >= max_count {
            break;
        }
        if rng.gen_bool(probability) {
            selected.push((*candidate).clone());
        }
    }

    if selected.is_empty() {
        selected.push(eligible[0].clone());
    }

    trace!(
        eligible = eligible.len(),
        selected = selected.len(),
        probability,
        "chaos targets selected"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::round_rng;

    fn nodes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("n{i}")).collect()
    }

    #[test]
    fn test_certain_probability_fills_quota() {
        let mut rng = round_rng(1, 0);
        let picked = select_random_targets(
            &mut rng,
            &nodes(5),
            1.0,
            2,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0], picked[1]);
    }

    #[test]
    fn test_zero_probability_forces_one() {
        let mut rng = round_rng(1, 0);
        let picked = select_random_targets(
            &mut rng,
            &nodes(5),
            0.0,
            3,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn test_zero_quota_selects_nothing() {
        let mut rng = round_rng(1, 0);
        let picked = select_random_targets(
            &mut rng,
            &nodes(5),
            1.0,
            0,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert!(picked.is_empty());
    }

    #[test]
    fn test_protected_and_failed_are_excluded() {
        let protected: BTreeSet<String> = ["n0".to_string(), "n1".to_string()].into();
        let failed: BTreeSet<String> = ["n2".to_string()].into();
        for seed in 0..20 {
            let mut rng = round_rng(seed, 0);
            let picked = select_random_targets(&mut rng, &nodes(4), 1.0, 4, &protected, &failed);
            assert_eq!(picked, vec!["n3"]);
        }
    }

    #[test]
    fn test_everything_protected_returns_empty() {
        let protected: BTreeSet<String> = nodes(3).into_iter().collect();
        let mut rng = round_rng(9, 0);
        let picked =
            select_random_targets(&mut rng, &nodes(3), 1.0, 2, &protected, &BTreeSet::new());
        assert!(picked.is_empty());
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let mut rng = round_rng(3, 0);
        let picked = select_random_targets(
            &mut rng,
            &nodes(4),
            7.5,
            4,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert_eq!(picked.len(), 4);

        let picked = select_random_targets(
            &mut rng,
            &nodes(4),
            f64::NAN,
            4,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert_eq!(picked.len(), 1);
    }

    #[test]
    fn test_same_seed_same_targets() {
        let a = select_random_targets(
            &mut round_rng(11, 4),
            &nodes(10),
            0.5,
            3,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        let b = select_random_targets(
            &mut round_rng(11, 4),
            &nodes(10),
            0.5,
            3,
            &BTreeSet::new(),
            &BTreeSet::new(),
        );
        assert_eq!(a, b);
    }
}
