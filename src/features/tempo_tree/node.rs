//! Tempo hypothesis node and ratio predicates

use crate::features::interval::BeatInterval;

/// Absolute slack added to every ratio band so exact boundaries hold under rounding
const RATIO_EPSILON: f32 = 1e-6;

/// Index of a node inside its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena position
    pub fn index(self) -> usize {
        self.0
    }
}

/// Rational relation between a child's interval and its parent's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Child is twice the parent
    Duple,
    /// Child is one and a half times the parent
    DottedDuple,
    /// Child is three times the parent
    Tuple,
    /// Child is six times the parent
    DoubleTuple,
}

impl RelationKind {
    /// All kinds in child-slot order
    pub const ALL: [RelationKind; 4] = [
        RelationKind::Duple,
        RelationKind::DottedDuple,
        RelationKind::Tuple,
        RelationKind::DoubleTuple,
    ];

    /// Order in which insertion tries the kinds
    pub const INSERT_ORDER: [RelationKind; 4] = [
        RelationKind::Duple,
        RelationKind::Tuple,
        RelationKind::DottedDuple,
        RelationKind::DoubleTuple,
    ];

    /// Target ratio child / parent
    pub fn ratio(self) -> f32 {
        match self {
            RelationKind::Duple => 2.0,
            RelationKind::DottedDuple => 1.5,
            RelationKind::Tuple => 3.0,
            RelationKind::DoubleTuple => 6.0,
        }
    }

    /// Child slot index
    pub fn slot(self) -> usize {
        match self {
            RelationKind::Duple => 0,
            RelationKind::DottedDuple => 1,
            RelationKind::Tuple => 2,
            RelationKind::DoubleTuple => 3,
        }
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            RelationKind::Duple => "duple",
            RelationKind::DottedDuple => "dotted-duple",
            RelationKind::Tuple => "tuple",
            RelationKind::DoubleTuple => "double-tuple",
        }
    }
}

/// True if `ratio` lies within `±tolerance` (relative) of `target`
pub fn ratio_within(ratio: f32, target: f32, tolerance: f32) -> bool {
    ratio >= target * (1.0 - tolerance) - RATIO_EPSILON
        && ratio <= target * (1.0 + tolerance) + RATIO_EPSILON
}

/// Beat period hypothesis with its corroboration count
///
/// Inside a [`TempoDetectionTree`](super::TempoDetectionTree) the parent is a
/// non-owning arena index and each of the four child slots holds at most one
/// child. A node outside a tree (an insertion candidate) has neither.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoDetectionNode {
    pub(crate) interval: f32,
    pub(crate) count: u32,
    pub(crate) tolerance: f32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: [Option<NodeId>; 4],
}

impl TempoDetectionNode {
    /// Create a detached node
    ///
    /// # Arguments
    ///
    /// * `interval` - Period in seconds
    /// * `count` - Number of corroborating observations
    /// * `tolerance` - Relative band applied to every ratio comparison
    pub fn new(interval: f32, count: u32, tolerance: f32) -> Self {
        Self {
            interval,
            count,
            tolerance,
            parent: None,
            children: [None; 4],
        }
    }

    /// Create a detached node from a reduced interval group
    ///
    /// The count is the number of raw durations the group absorbed.
    pub fn from_beat_interval(interval: &BeatInterval, tolerance: f32) -> Self {
        let count = u32::try_from(interval.raw_count()).unwrap_or(u32::MAX);
        Self::new(interval.length_seconds(), count, tolerance)
    }

    /// Period in seconds
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Corroboration count of this node alone
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Relative tolerance of ratio comparisons
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Parent index, `None` for a root or detached node
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child in the slot for `kind`
    pub fn child(&self, kind: RelationKind) -> Option<NodeId> {
        self.children[kind.slot()]
    }

    /// Occupied child slots with their kinds
    pub fn children(&self) -> impl Iterator<Item = (RelationKind, NodeId)> + '_ {
        RelationKind::ALL
            .iter()
            .filter_map(move |&kind| self.child(kind).map(|id| (kind, id)))
    }

    fn ratio_to(&self, other: &TempoDetectionNode) -> f32 {
        if other.interval <= 0.0 {
            return f32::INFINITY;
        }
        self.interval / other.interval
    }

    /// True if this node stands in `kind` relation to `other` (self ≈ ratio × other)
    pub fn is_kind_of(&self, kind: RelationKind, other: &TempoDetectionNode) -> bool {
        ratio_within(self.ratio_to(other), kind.ratio(), self.tolerance)
    }

    /// Same period within tolerance
    pub fn is_equivalent_to(&self, other: &TempoDetectionNode) -> bool {
        ratio_within(self.ratio_to(other), 1.0, self.tolerance)
    }

    /// Twice `other`'s period within tolerance
    pub fn is_duple_of(&self, other: &TempoDetectionNode) -> bool {
        self.is_kind_of(RelationKind::Duple, other)
    }

    /// One and a half times `other`'s period within tolerance
    pub fn is_dotted_duple_of(&self, other: &TempoDetectionNode) -> bool {
        self.is_kind_of(RelationKind::DottedDuple, other)
    }

    /// Three times `other`'s period within tolerance
    pub fn is_tuple_of(&self, other: &TempoDetectionNode) -> bool {
        self.is_kind_of(RelationKind::Tuple, other)
    }

    /// Six times `other`'s period within tolerance
    pub fn is_double_tuple_of(&self, other: &TempoDetectionNode) -> bool {
        self.is_kind_of(RelationKind::DoubleTuple, other)
    }

    /// Relation holds and `parent`'s slot for it is still free
    pub fn can_be_kind_of(&self, kind: RelationKind, parent: &TempoDetectionNode) -> bool {
        self.is_kind_of(kind, parent) && parent.child(kind).is_none()
    }

    /// [`Self::is_duple_of`] with a free duple slot
    pub fn can_be_duple_of(&self, parent: &TempoDetectionNode) -> bool {
        self.can_be_kind_of(RelationKind::Duple, parent)
    }

    /// [`Self::is_dotted_duple_of`] with a free dotted-duple slot
    pub fn can_be_dotted_duple_of(&self, parent: &TempoDetectionNode) -> bool {
        self.can_be_kind_of(RelationKind::DottedDuple, parent)
    }

    /// [`Self::is_tuple_of`] with a free tuple slot
    pub fn can_be_tuple_of(&self, parent: &TempoDetectionNode) -> bool {
        self.can_be_kind_of(RelationKind::Tuple, parent)
    }

    /// [`Self::is_double_tuple_of`] with a free double-tuple slot
    pub fn can_be_double_tuple_of(&self, parent: &TempoDetectionNode) -> bool {
        self.can_be_kind_of(RelationKind::DoubleTuple, parent)
    }

    /// Copy without tree links
    pub(crate) fn detached(&self) -> Self {
        Self::new(self.interval, self.count, self.tolerance)
    }
}
