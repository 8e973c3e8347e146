use std::fmt;

use crate::segment::SegmentId;

/// Stable arena index of a link within an `AssemblyGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct LinkId(pub u32);

impl LinkId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// How the overlap length on a link was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum OverlapType {
    /// No overlap information; overlap length is 0 until resolved.
    Unknown,
    /// Overlap length stated explicitly by the graph builder.
    ExactGiven,
    /// Overlap length found by the brute-force resolver.
    AutoDetermined,
}

/// Traversal direction relative to a link's orientation: forward walks
/// from → to, backward walks to → from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn flip(&self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// A directed overlap edge between two segments.
///
/// Every link has a reverse-complement partner connecting the paired
/// segments in the opposite order; `rc` points at it. A palindromic link
/// (where `to` is `from`'s own reverse complement in reverse order, so
/// the rc edge coincides with the edge itself) is its own partner.
#[derive(Debug, Clone)]
pub struct Link {
    pub from: SegmentId,
    pub to: SegmentId,
    pub overlap: usize,
    pub overlap_type: OverlapType,
    pub(crate) rc: LinkId,
}

impl Link {
    /// The paired reverse-complement link.
    pub fn rc(&self) -> LinkId {
        self.rc
    }

    /// The segment entered when traversing this link in `direction`.
    pub fn head(&self, direction: Direction) -> SegmentId {
        match direction {
            Direction::Forward => self.to,
            Direction::Backward => self.from,
        }
    }

    /// The segment left behind when traversing this link in `direction`.
    pub fn tail(&self, direction: Direction) -> SegmentId {
        match direction {
            Direction::Forward => self.from,
            Direction::Backward => self.to,
        }
    }

    pub fn is_self_rc(&self, own_id: LinkId) -> bool {
        self.rc == own_id
    }
}
