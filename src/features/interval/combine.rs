//! Reduction of raw interval candidates
//!
//! Two greedy passes shrink the raw candidate list:
//!
//! 1. **Merge**: candidates are visited in length order and absorbed into the
//!    current group while they stay similar to its shortest member, so every
//!    two members of a group are at least that similar
//! 2. **Combine**: pairs related by a small rational ratio are fused when the
//!    fusion explains enough additional onset pairs; the best pair is
//!    committed first and the search repeats on the reduced set
//!
//! The combine pass is greedy, not globally optimal.

use super::beat_interval::BeatInterval;
use std::cmp::Ordering;

/// Scores closer than this are treated as tied
const SCORE_EPSILON: f32 = 1e-6;

/// Order by explained count (most first), then by length (shortest first)
fn by_evidence(a: &BeatInterval, b: &BeatInterval) -> Ordering {
    b.explained()
        .len()
        .cmp(&a.explained().len())
        .then_with(|| a.length_seconds().total_cmp(&b.length_seconds()))
}

/// Greedily cluster similar candidates into representative groups
///
/// Candidates are visited shortest first. A candidate joins the current group
/// when it is at least `similarity` similar to the group's first member and
/// starts a new group otherwise.
///
/// # Arguments
///
/// * `intervals` - Raw candidates
/// * `similarity` - Minimum similarity (0.0-1.0) for a candidate to join a group
///
/// # Returns
///
/// Groups ordered by explained count (most first), ties by shorter length
pub fn merge_beat_intervals(intervals: &[BeatInterval], similarity: f32) -> Vec<BeatInterval> {
    let mut sorted: Vec<&BeatInterval> = intervals.iter().collect();
    sorted.sort_by(|a, b| a.length_seconds().total_cmp(&b.length_seconds()));

    let mut groups: Vec<BeatInterval> = Vec::new();
    let mut anchor: Option<&BeatInterval> = None;
    for candidate in sorted {
        let absorbed = match (anchor, groups.last_mut()) {
            (Some(first), Some(group)) if first.similarity_to(candidate) >= similarity => {
                group.merge_with(candidate, similarity)
            }
            _ => false,
        };
        if !absorbed {
            groups.push(candidate.clone());
            anchor = Some(candidate);
        }
    }

    groups.sort_by(by_evidence);

    log::debug!(
        "Merged {} interval candidates into {} groups (similarity >= {:.3})",
        intervals.len(),
        groups.len(),
        similarity
    );

    groups
}

/// Best pair found in one search round
struct PairChoice {
    first: usize,
    second: usize,
    score: f32,
    total_explained: usize,
    length: f32,
}

impl PairChoice {
    fn beats(&self, other: &PairChoice) -> bool {
        if (self.score - other.score).abs() > SCORE_EPSILON {
            return self.score > other.score;
        }
        if self.total_explained != other.total_explained {
            return self.total_explained > other.total_explained;
        }
        self.length < other.length
    }
}

/// Iteratively commit the best pairwise combination until none clears `margin`
///
/// A pair qualifies when its ratio error is at most `tolerance` and the
/// combination newly explains more than `margin` of the onset-pair domain.
/// Among qualifying pairs the largest `improvement - error` wins, then the
/// larger combined explained count, then the shorter product. The winning
/// pair is replaced by its product, which may combine again.
///
/// # Arguments
///
/// * `intervals` - Merged candidate groups
/// * `margin` - Minimum improvement (fraction of the domain)
/// * `tolerance` - Maximum relative ratio error
///
/// # Returns
///
/// The reduced set, ordered like [`merge_beat_intervals`] output
pub fn combine_beat_intervals(
    intervals: Vec<BeatInterval>,
    margin: f32,
    tolerance: f32,
) -> Vec<BeatInterval> {
    let mut set = intervals;
    let initial = set.len();
    let mut rounds = 0;

    loop {
        let mut best: Option<PairChoice> = None;

        for i in 0..set.len() {
            for j in (i + 1)..set.len() {
                // Evaluate from the operand with more evidence
                let (a, b) = if set[i].explained().len() >= set[j].explained().len() {
                    (&set[i], &set[j])
                } else {
                    (&set[j], &set[i])
                };

                let (improvement, error) = a.marginal_improvement_if_combined(b);
                if error > tolerance || improvement <= margin {
                    continue;
                }

                let choice = PairChoice {
                    first: i,
                    second: j,
                    score: improvement - error,
                    total_explained: a.items_explained_by_combination(b).len(),
                    length: a.combined_length(b),
                };
                if best.as_ref().map_or(true, |current| choice.beats(current)) {
                    best = Some(choice);
                }
            }
        }

        let Some(choice) = best else {
            break;
        };

        // second > first, so removing second first keeps first valid
        let mut b = set.remove(choice.second);
        let mut a = set.remove(choice.first);
        let relation = a.combine_with(&mut b);

        if let Some(product) = a.combined() {
            log::debug!(
                "Combined {:.3}s and {:.3}s (relation {}) into {}",
                a.length_seconds(),
                b.length_seconds(),
                relation,
                product
            );
            set.push(product.clone());
        }
        rounds += 1;
    }

    set.sort_by(by_evidence);

    log::debug!(
        "Combination reduced {} intervals to {} in {} rounds",
        initial,
        set.len(),
        rounds
    );

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::onset::{debounce_onsets, Onset};

    fn onsets_at(times: &[f64]) -> Vec<Onset> {
        times
            .iter()
            .map(|&time_seconds| Onset {
                time_seconds,
                peak_rms: 0.5,
                is_peak: true,
            })
            .collect()
    }

    #[test]
    fn test_merge_scenario_yields_half_second_group() {
        let onsets = debounce_onsets(&onsets_at(&[0.5, 1.0, 1.5, 2.0, 2.003, 3.0]), 0.05);
        assert_eq!(onsets.len(), 5);

        let candidates = BeatInterval::candidates_from_onsets(&onsets, 0.25, 2.0, 0.04);
        let groups = merge_beat_intervals(&candidates, 0.99);

        let best = &groups[0];
        assert!((best.length_seconds() - 0.5).abs() < 0.01);
        assert_eq!(best.explained().len(), 4);
        assert!(best.unexplained().is_empty());
        assert_eq!(best.raw_count(), 3);

        let lengths: Vec<f32> = groups.iter().map(|g| g.length_seconds()).collect();
        assert_eq!(groups.len(), 4, "groups: {:?}", lengths);
    }

    #[test]
    fn test_merge_keeps_dissimilar_candidates_apart() {
        let times = [0.0, 0.5, 1.0, 1.75];
        let candidates = vec![
            BeatInterval::from_onset_times(0.5, &times, 0.04),
            BeatInterval::from_onset_times(0.75, &times, 0.04),
            BeatInterval::from_onset_times(0.505, &times, 0.04),
        ];
        let groups = merge_beat_intervals(&candidates, 0.97);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].raw_count(), 2);
        assert_eq!(groups[1].raw_count(), 1);
    }

    #[test]
    fn test_merge_groups_stay_within_similarity_of_shortest_member() {
        // 0.50 and 0.52 are only 0.9615 similar although both neighbour 0.51
        let times = [0.0, 0.5, 1.01, 1.53];
        let candidates: Vec<BeatInterval> = [0.5, 0.51, 0.52]
            .iter()
            .map(|&length| BeatInterval::from_onset_times(length, &times, 0.04))
            .collect();
        let groups = merge_beat_intervals(&candidates, 0.97);
        assert_eq!(groups.len(), 2);

        for group in &groups {
            let raw = group.intervals();
            let shortest = raw.iter().copied().fold(f32::INFINITY, f32::min);
            let longest = raw.iter().copied().fold(0.0, f32::max);
            assert!(shortest / longest >= 0.97, "group {:?}", raw);
        }
    }

    #[test]
    fn test_reduction_scales_to_long_onset_lists() {
        // 2400 onsets at 8 per second with up to 0.5 ms jitter
        let onsets: Vec<Onset> = (0..2400usize)
            .map(|k| Onset {
                time_seconds: k as f64 * 0.125 + (((k * 37) % 5) as f64 - 2.0) * 0.00025,
                peak_rms: 0.5,
                is_peak: true,
            })
            .collect();

        let start = std::time::Instant::now();
        let candidates = BeatInterval::candidates_from_onsets(&onsets, 0.1, 2.0, 0.04);
        assert!(candidates.len() > 35_000);
        let merged = merge_beat_intervals(&candidates, 0.97);
        let reduced = combine_beat_intervals(merged, 0.05, 0.05);
        let elapsed = start.elapsed();

        assert!(elapsed.as_secs_f32() < 5.0, "took {:?}", elapsed);
        assert!((reduced[0].length_seconds() - 0.125).abs() < 0.002);
        assert!(reduced[0].percent_explained() >= 0.999);
    }

    #[test]
    fn test_combine_commits_dotted_pair() {
        // Gaps 0.5, 0.5, 0.75, 0.75
        let times = [0.0, 0.5, 1.0, 1.75, 2.5];
        let set = vec![
            BeatInterval::from_onset_times(0.5, &times, 0.04),
            BeatInterval::from_onset_times(0.75, &times, 0.04),
        ];
        let reduced = combine_beat_intervals(set, 0.05, 0.05);

        assert_eq!(reduced.len(), 1);
        assert!((reduced[0].length_seconds() - 0.25).abs() < 1e-6);
        assert_eq!(reduced[0].explained().len(), 4);
        assert_eq!(reduced[0].raw_count(), 2);
    }

    #[test]
    fn test_combine_stops_below_margin() {
        // 0.5 already explains every gap the 1.0 candidate explains
        let times = [0.0, 0.5, 1.0, 2.0];
        let set = vec![
            BeatInterval::from_onset_times(0.5, &times, 0.04),
            BeatInterval::from_onset_times(1.0, &times, 0.04),
        ];
        let reduced = combine_beat_intervals(set.clone(), 0.05, 0.05);
        assert_eq!(reduced, set);
    }

    #[test]
    fn test_combine_rejects_unrelated_ratio() {
        // 0.5 and 0.8 sit 6.7% away from a dotted relation
        let times = [0.0, 0.5, 1.0, 1.8, 2.6];
        let set = vec![
            BeatInterval::from_onset_times(0.5, &times, 0.04),
            BeatInterval::from_onset_times(0.8, &times, 0.04),
        ];
        assert_eq!(combine_beat_intervals(set, 0.05, 0.05).len(), 2);
    }

    #[test]
    fn test_combine_prefers_larger_improvement() {
        // Gaps 0.5 x4, 0.75 x2, 0.8
        let times = [0.0, 0.5, 1.0, 1.5, 2.0, 2.75, 3.5, 4.3];
        let set = vec![
            BeatInterval::from_onset_times(0.5, &times, 0.04),
            BeatInterval::from_onset_times(0.75, &times, 0.04),
            BeatInterval::from_onset_times(0.8, &times, 0.04),
        ];
        let reduced = combine_beat_intervals(set, 0.05, 0.05);

        assert_eq!(reduced.len(), 2);
        assert!((reduced[0].length_seconds() - 0.25).abs() < 1e-6);
        assert_eq!(reduced[0].explained().len(), 6);
    }
}
