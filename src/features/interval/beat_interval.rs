//! Beat interval hypotheses with explicit onset evidence
//!
//! A [`BeatInterval`] is a candidate beat period together with the set of
//! onset pairs it accounts for. The onset-pair domain is the consecutive
//! pairs `(k, k + 1)` of an onset list; every interval partitions that domain
//! into `explained` and `unexplained` pairs.
//!
//! An interval of length `L` explains a pair with gap `g` when `g` lies within
//! a relative tolerance of a positive whole multiple of `L`:
//!
//! ```text
//! m = round(g / L),  m >= 1,  |g - m * L| <= tolerance * m * L
//! ```
//!
//! A pair is explained when any raw duration the interval has absorbed
//! explains it. Candidates share one gap list and compute their evidence on
//! first use, so building and merging candidates never touches the domain.
//!
//! # Example
//!
//! ```
//! use tempo_tree::features::interval::BeatInterval;
//!
//! let times = [0.0, 0.5, 1.0, 2.0];
//! let half = BeatInterval::from_onset_times(0.5, &times, 0.04);
//! assert_eq!(half.explained().len(), 3);
//!
//! let whole = BeatInterval::from_onset_times(1.0, &times, 0.04);
//! assert_eq!(whole.explained().len(), 1);
//! assert!((half.similarity_to(&whole) - 0.5).abs() < 1e-6);
//! ```

use super::pair_set::PairSet;
use crate::features::onset::Onset;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Ratios two intervals may be combined at
pub const COMBINE_RELATIONS: [f32; 5] = [1.0, 1.5, 2.0, 3.0, 6.0];

/// Slack on the search band of [`explained_by_any`]
const BAND_SLACK: f64 = 1e-9;

/// True if `length` explains `gap` as a whole multiple within `tolerance`
pub fn explains_gap(length: f64, gap: f64, tolerance: f64) -> bool {
    if length <= 0.0 || gap <= 0.0 {
        return false;
    }
    let multiple = (gap / length).round();
    multiple >= 1.0 && (gap - multiple * length).abs() <= tolerance * multiple * length
}

/// True if any length of the ascending, positive slice explains `gap`
///
/// For each multiple `m` only lengths inside
/// `[g / (m (1 + tol)), g / (m (1 - tol))]` can explain the gap, so each
/// multiple costs one binary search.
fn explained_by_any(sorted: &[f32], gap: f64, tolerance: f64) -> bool {
    let (Some(&shortest), Some(&longest)) = (sorted.first(), sorted.last()) else {
        return false;
    };
    if gap <= 0.0 {
        return false;
    }

    let first = ((gap / longest as f64).floor() as usize).max(1);
    let last = (gap / shortest as f64).ceil() as usize;
    if last.saturating_sub(first) >= sorted.len() {
        return sorted.iter().any(|&l| explains_gap(l as f64, gap, tolerance));
    }

    (first..=last).any(|m| {
        let m = m as f64;
        let low = gap / (m * (1.0 + tolerance)) - BAND_SLACK;
        let high = if tolerance < 1.0 {
            gap / (m * (1.0 - tolerance)) + BAND_SLACK
        } else {
            f64::INFINITY
        };
        let start = sorted.partition_point(|&l| (l as f64) < low);
        let end = sorted.partition_point(|&l| (l as f64) <= high);
        sorted[start..end.max(start)]
            .iter()
            .any(|&l| explains_gap(l as f64, gap, tolerance))
    })
}

/// Consecutive gaps of an ascending time list
fn gaps_of(onset_times: &[f64]) -> Arc<[f64]> {
    onset_times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Nearest combine relation for two lengths and its relative error
///
/// Returns `(relation, error)` where `error = |longer / shorter - relation| / relation`.
pub fn nearest_relation(a: f32, b: f32) -> (f32, f32) {
    let (shorter, longer) = if a <= b { (a, b) } else { (b, a) };
    if shorter <= 0.0 {
        return (1.0, f32::INFINITY);
    }
    let ratio = longer / shorter;

    COMBINE_RELATIONS
        .iter()
        .map(|&r| (r, (ratio - r).abs() / r))
        .fold((1.0, f32::INFINITY), |best, candidate| {
            if candidate.1 < best.1 {
                candidate
            } else {
                best
            }
        })
}

/// Candidate beat period and the onset pairs it accounts for
///
/// Intervals that are merged or combined must be built over the same onset
/// list.
#[derive(Debug, Clone)]
pub struct BeatInterval {
    length_seconds: f32,

    /// Raw contributing durations, in the order they were absorbed
    intervals: Vec<f32>,

    /// Consecutive onset gaps, shared by every candidate of one onset list
    gaps: Arc<[f64]>,
    tolerance: f32,
    /// Pairs explained by any raw duration, filled on first use
    explained: OnceLock<PairSet>,

    /// Product of committing a combination with another interval
    combined: Option<Box<BeatInterval>>,
    /// Length of the product that absorbed this interval, if any
    combined_into: Option<f32>,
    /// Ratio of the committed combination (one of [`COMBINE_RELATIONS`])
    combine_relation: Option<f32>,
}

impl BeatInterval {
    /// Create an interval over the consecutive pairs of an onset list
    ///
    /// # Arguments
    ///
    /// * `length_seconds` - Candidate period
    /// * `onset_times` - Onset times in seconds, ascending
    /// * `tolerance` - Relative tolerance of the whole-multiple test
    pub fn from_onset_times(length_seconds: f32, onset_times: &[f64], tolerance: f32) -> Self {
        Self::over_gaps(length_seconds, gaps_of(onset_times), tolerance)
    }

    /// Create an interval over the gaps of an onset list
    pub fn from_onsets(length_seconds: f32, onsets: &[Onset], tolerance: f32) -> Self {
        let times: Vec<f64> = onsets.iter().map(|o| o.time_seconds).collect();
        Self::from_onset_times(length_seconds, &times, tolerance)
    }

    fn over_gaps(length_seconds: f32, gaps: Arc<[f64]>, tolerance: f32) -> Self {
        Self {
            length_seconds,
            intervals: vec![length_seconds],
            gaps,
            tolerance,
            explained: OnceLock::new(),
            combined: None,
            combined_into: None,
            combine_relation: None,
        }
    }

    /// One raw candidate per onset pair `i < j` whose gap lies in `[min_interval, max_interval]`
    ///
    /// Onsets must be in time order. All candidates share the onset list's
    /// gaps; evidence is computed when first asked for.
    pub fn candidates_from_onsets(
        onsets: &[Onset],
        min_interval: f32,
        max_interval: f32,
        tolerance: f32,
    ) -> Vec<BeatInterval> {
        let times: Vec<f64> = onsets.iter().map(|o| o.time_seconds).collect();
        let gaps = gaps_of(&times);
        let mut candidates = Vec::new();

        for i in 0..times.len() {
            for j in (i + 1)..times.len() {
                let gap = times[j] - times[i];
                if gap > max_interval as f64 {
                    break;
                }
                if gap >= min_interval as f64 {
                    candidates.push(Self::over_gaps(gap as f32, Arc::clone(&gaps), tolerance));
                }
            }
        }

        log::debug!(
            "Interval candidates: {} onsets, {} candidates in [{:.3}, {:.3}]s",
            times.len(),
            candidates.len(),
            min_interval,
            max_interval
        );

        candidates
    }

    /// Representative length in seconds
    pub fn length_seconds(&self) -> f32 {
        self.length_seconds
    }

    /// Raw contributing durations
    pub fn intervals(&self) -> &[f32] {
        &self.intervals
    }

    /// Number of raw contributing durations
    pub fn raw_count(&self) -> usize {
        self.intervals.len()
    }

    /// Onset pairs this interval accounts for
    pub fn explained(&self) -> &PairSet {
        self.explained.get_or_init(|| {
            let mut sorted: Vec<f32> = self.intervals.iter().copied().filter(|&l| l > 0.0).collect();
            sorted.sort_by(f32::total_cmp);
            sorted.dedup();
            let tolerance = self.tolerance as f64;
            PairSet::from_fn(self.gaps.len(), |k| {
                explained_by_any(&sorted, self.gaps[k], tolerance)
            })
        })
    }

    /// Onset pairs this interval does not account for
    pub fn unexplained(&self) -> PairSet {
        self.explained().complement()
    }

    /// Size of the onset-pair domain
    pub fn domain_len(&self) -> usize {
        self.gaps.len()
    }

    /// Fraction of the domain explained (0.0 for an empty domain)
    pub fn percent_explained(&self) -> f32 {
        fraction(self.explained().len(), self.domain_len())
    }

    /// Fraction explained by the committed combination, or by self if none
    pub fn percent_explained_by_combination(&self) -> f32 {
        match &self.combined {
            Some(product) => product.percent_explained(),
            None => self.percent_explained(),
        }
    }

    /// Owned product of a committed combination
    pub fn combined(&self) -> Option<&BeatInterval> {
        self.combined.as_deref()
    }

    /// Length of the product this interval was absorbed into
    pub fn combined_into(&self) -> Option<f32> {
        self.combined_into
    }

    /// Ratio of the committed combination
    pub fn combine_relation(&self) -> Option<f32> {
        self.combine_relation
    }

    /// Symmetric similarity in `[0, 1]`: `1 - |a - b| / max(a, b)`
    pub fn similarity_to(&self, other: &BeatInterval) -> f32 {
        let (a, b) = (self.length_seconds, other.length_seconds);
        let longest = a.max(b);
        if longest <= 0.0 {
            return 1.0;
        }
        (1.0 - (a - b).abs() / longest).clamp(0.0, 1.0)
    }

    /// Absorb `other` when it is at least `threshold` similar
    ///
    /// Raw durations are appended, explained sets are united and the
    /// representative length becomes the mean of all raw durations.
    ///
    /// # Returns
    ///
    /// `true` if `other` was absorbed (and is redundant from then on)
    pub fn merge_with(&mut self, other: &BeatInterval, threshold: f32) -> bool {
        if self.similarity_to(other) < threshold {
            return false;
        }

        self.intervals.extend_from_slice(&other.intervals);
        self.length_seconds = self.intervals.iter().sum::<f32>() / self.intervals.len() as f32;
        self.explained = evidence_cell(self.known_union(other));
        true
    }

    /// Evaluate a combination with `other` without committing it
    ///
    /// # Returns
    ///
    /// `(improvement, error)`: the fraction of the domain that `other` explains
    /// and `self` does not, and the relative distance of the length ratio from
    /// the nearest combine relation.
    pub fn marginal_improvement_if_combined(&self, other: &BeatInterval) -> (f32, f32) {
        let (_, error) = nearest_relation(self.length_seconds, other.length_seconds);
        let newly = other.explained().difference_len(self.explained());
        let domain = self.domain_len().max(other.domain_len());
        (fraction(newly, domain), error)
    }

    /// Onset pairs explained by either operand of a combination
    pub fn items_explained_by_combination(&self, other: &BeatInterval) -> PairSet {
        self.explained().union(other.explained())
    }

    /// Length of the product of combining with `other`
    ///
    /// Equal lengths average over all raw durations. Otherwise the shorter
    /// length, halved for a dotted-duple relation so that both operands are
    /// whole multiples of the product.
    pub fn combined_length(&self, other: &BeatInterval) -> f32 {
        let (relation, _) = nearest_relation(self.length_seconds, other.length_seconds);
        let shorter = self.length_seconds.min(other.length_seconds);
        if relation == 1.0 {
            let total: f32 = self.intervals.iter().chain(&other.intervals).sum();
            total / (self.intervals.len() + other.intervals.len()) as f32
        } else if relation == 1.5 {
            shorter / 2.0
        } else {
            shorter
        }
    }

    /// Commit a combination with `other`
    ///
    /// The product owns both operands' raw durations and the union of their
    /// explained pairs. `self` keeps the product in [`Self::combined`];
    /// `other` records the product's length in [`Self::combined_into`]. Both
    /// record the relation.
    ///
    /// # Returns
    ///
    /// The committed relation
    pub fn combine_with(&mut self, other: &mut BeatInterval) -> f32 {
        let (relation, _) = nearest_relation(self.length_seconds, other.length_seconds);
        let length = self.combined_length(other);

        let mut intervals = self.intervals.clone();
        intervals.extend_from_slice(&other.intervals);

        let product = BeatInterval {
            length_seconds: length,
            intervals,
            gaps: Arc::clone(&self.gaps),
            tolerance: self.tolerance,
            explained: evidence_cell(self.known_union(other)),
            combined: None,
            combined_into: None,
            combine_relation: None,
        };

        self.combined = Some(Box::new(product));
        self.combine_relation = Some(relation);
        other.combined_into = Some(length);
        other.combine_relation = Some(relation);
        relation
    }

    /// Union of both operands' evidence when both are already computed
    fn known_union(&self, other: &BeatInterval) -> Option<PairSet> {
        let (ours, theirs) = (self.explained.get()?, other.explained.get()?);
        let same_domain = Arc::ptr_eq(&self.gaps, &other.gaps) || self.gaps == other.gaps;
        (same_domain && self.tolerance == other.tolerance).then(|| ours.union(theirs))
    }
}

// Evidence is a cache over the other fields
impl PartialEq for BeatInterval {
    fn eq(&self, other: &Self) -> bool {
        self.length_seconds == other.length_seconds
            && self.intervals == other.intervals
            && self.tolerance == other.tolerance
            && self.gaps == other.gaps
            && self.combined == other.combined
            && self.combined_into == other.combined_into
            && self.combine_relation == other.combine_relation
    }
}

/// Cache preset with known evidence, or empty to compute on first use
fn evidence_cell(known: Option<PairSet>) -> OnceLock<PairSet> {
    match known {
        Some(set) => OnceLock::from(set),
        None => OnceLock::new(),
    }
}

fn fraction(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    }
}

impl fmt::Display for BeatInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}s ({} raw, {:.1}% explained)",
            self.length_seconds,
            self.intervals.len(),
            self.percent_explained() * 100.0
        )
    }
}
