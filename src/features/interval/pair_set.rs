//! Compact set of consecutive onset pairs
//!
//! Pair `(k, k + 1)` is stored as bit `k` of a `u64` word vector, so evidence
//! over a whole recording costs one bit per onset gap and unions are word-wise.

use std::fmt;

/// Index pair `(k, k + 1)` into a time-ordered onset list
pub type OnsetPair = (usize, usize);

const WORD_BITS: usize = u64::BITS as usize;

/// Subset of the consecutive-pair domain of an onset list
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PairSet {
    words: Vec<u64>,
    domain_len: usize,
}

impl PairSet {
    /// Empty set over a domain of `domain_len` pairs
    pub fn new(domain_len: usize) -> Self {
        Self {
            words: vec![0; domain_len.div_ceil(WORD_BITS)],
            domain_len,
        }
    }

    /// Set holding the pairs `k` for which `explains(k)` is true
    pub fn from_fn(domain_len: usize, mut explains: impl FnMut(usize) -> bool) -> Self {
        let mut set = Self::new(domain_len);
        for k in 0..domain_len {
            if explains(k) {
                set.words[k / WORD_BITS] |= 1u64 << (k % WORD_BITS);
            }
        }
        set
    }

    /// Number of pairs in the domain
    pub fn domain_len(&self) -> usize {
        self.domain_len
    }

    /// Number of pairs in the set
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if no pair is in the set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// True if `(k, k + 1)` is in the set
    pub fn contains(&self, pair: &OnsetPair) -> bool {
        let (k, next) = *pair;
        k.checked_add(1) == Some(next)
            && k < self.domain_len
            && self.words[k / WORD_BITS] & (1u64 << (k % WORD_BITS)) != 0
    }

    /// Add every pair of `other`, widening the domain if needed
    pub fn union_with(&mut self, other: &PairSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, &theirs) in self.words.iter_mut().zip(&other.words) {
            *word |= theirs;
        }
        self.domain_len = self.domain_len.max(other.domain_len);
    }

    /// Pairs in either set
    pub fn union(&self, other: &PairSet) -> PairSet {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    /// Number of pairs in `self` but not in `other`
    pub fn difference_len(&self, other: &PairSet) -> usize {
        self.words
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let theirs = other.words.get(i).copied().unwrap_or(0);
                (w & !theirs).count_ones() as usize
            })
            .sum()
    }

    /// Pairs of the domain missing from the set
    pub fn complement(&self) -> PairSet {
        let mut out = PairSet::new(self.domain_len);
        for (word, &ours) in out.words.iter_mut().zip(&self.words) {
            *word = !ours;
        }
        let tail = self.domain_len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = out.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        out
    }

    /// True if the sets share no pair
    pub fn is_disjoint(&self, other: &PairSet) -> bool {
        self.words.iter().zip(&other.words).all(|(a, b)| a & b == 0)
    }

    /// Pairs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = OnsetPair> + '_ {
        (0..self.domain_len)
            .filter(move |&k| self.words[k / WORD_BITS] & (1u64 << (k % WORD_BITS)) != 0)
            .map(|k| (k, k + 1))
    }
}

impl fmt::Debug for PairSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairSet({}/{}) ", self.len(), self.domain_len)?;
        f.debug_set().entries(self.iter()).finish()
    }
}
