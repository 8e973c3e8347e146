use crate::graph::AssemblyGraph;
use crate::segment::SegmentId;

/// An ordered walk through connected segments.
///
/// Orientation is carried by the segment ids themselves: a walk through a
/// reverse strand lists the rc segment's id. `start_offset` is the first
/// included base of the first segment and `end_offset` the last included
/// base of the last segment, both 0-based and inclusive, so both always
/// lie in `[0, segment.length)`.
///
/// Paths are transient values built by the tracer and the reconciler;
/// two paths are equal when their segments, offsets and circular flag
/// match, identity never matters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Path {
    pub segments: Vec<SegmentId>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub circular: bool,
}

impl Path {
    pub fn new(segments: Vec<SegmentId>, start_offset: usize, end_offset: usize) -> Self {
        Path {
            segments,
            start_offset,
            end_offset,
            circular: false,
        }
    }

    pub fn circular(segments: Vec<SegmentId>, start_offset: usize, end_offset: usize) -> Self {
        Path {
            segments,
            start_offset,
            end_offset,
            circular: true,
        }
    }

    pub fn node_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of bases the path spans: segment lengths minus the overlaps
    /// consumed by each internal link, trimmed by the end offsets.
    pub fn length(&self, graph: &AssemblyGraph) -> usize {
        if self.segments.is_empty() {
            return 0;
        }
        let mut total: usize = 0;
        for &seg in &self.segments {
            total += graph.segment(seg).map(|s| s.length).unwrap_or(0);
        }
        for pair in self.segments.windows(2) {
            total = total.saturating_sub(self.overlap_between(graph, pair[0], pair[1]));
        }
        if self.circular {
            let first = self.segments[0];
            let last = self.segments[self.segments.len() - 1];
            total = total.saturating_sub(self.overlap_between(graph, last, first));
        }
        let last_len = graph
            .segment(self.segments[self.segments.len() - 1])
            .map(|s| s.length)
            .unwrap_or(0);
        total = total.saturating_sub(self.start_offset);
        total.saturating_sub(last_len.saturating_sub(self.end_offset + 1))
    }

    fn overlap_between(&self, graph: &AssemblyGraph, from: SegmentId, to: SegmentId) -> usize {
        graph
            .link_between(from, to)
            .and_then(|id| graph.link(id))
            .map(|l| l.overlap)
            .unwrap_or(0)
    }

    /// Extract the spelled-out bases, dropping each link's overlap from
    /// the entered segment. `None` if any segment's bases were not loaded.
    pub fn sequence(&self, graph: &AssemblyGraph) -> Option<Vec<u8>> {
        if self.segments.is_empty() {
            return Some(Vec::new());
        }
        let mut out: Vec<u8> = Vec::new();
        let last_index = self.segments.len() - 1;
        for (i, &seg_id) in self.segments.iter().enumerate() {
            let segment = graph.segment(seg_id)?;
            let seq = segment.sequence.as_deref()?;
            let mut from = if i == 0 {
                self.start_offset
            } else {
                self.overlap_between(graph, self.segments[i - 1], seg_id)
            };
            let to = if i == last_index {
                (self.end_offset + 1).min(seq.len())
            } else {
                seq.len()
            };
            if from > to {
                from = to;
            }
            out.extend_from_slice(&seq[from..to]);
        }
        Some(out)
    }

    /// Check the path against the graph: segments alive, consecutive
    /// segments linked, offsets in range. A circular path also needs the
    /// wrapping link.
    pub fn is_valid(&self, graph: &AssemblyGraph) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        for &seg in &self.segments {
            if !graph.contains_segment(seg) {
                return false;
            }
        }
        let first_len = graph.segment(self.segments[0]).map(|s| s.length).unwrap_or(0);
        let last_len = graph
            .segment(self.segments[self.segments.len() - 1])
            .map(|s| s.length)
            .unwrap_or(0);
        if self.start_offset >= first_len || self.end_offset >= last_len {
            return false;
        }
        for pair in self.segments.windows(2) {
            if graph.link_between(pair[0], pair[1]).is_none() {
                return false;
            }
        }
        if self.circular {
            let first = self.segments[0];
            let last = self.segments[self.segments.len() - 1];
            if graph.link_between(last, first).is_none() {
                return false;
            }
        }
        true
    }

    /// Human-readable form, e.g. `A+ -> B- -> C+ (2..5)`.
    pub fn describe(&self, graph: &AssemblyGraph) -> String {
        let names: Vec<String> = self
            .segments
            .iter()
            .map(|&id| {
                graph
                    .segment(id)
                    .map(|s| s.signed_name())
                    .unwrap_or_else(|| format!("{}", id))
            })
            .collect();
        let mut out = names.join(" -> ");
        if self.circular {
            out.push_str(" (circular)");
        }
        out.push_str(&format!(" ({}..{})", self.start_offset, self.end_offset));
        out
    }
}
