use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::link::{Direction, Link, LinkId, OverlapType};
use crate::segment::{reverse_complement, Segment, SegmentId, Strand};

/// Errors raised by graph mutation. Data-quality problems (unresolved
/// overlaps, hits naming unknown segments) are not errors; only a caller
/// passing ids this graph does not own gets one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    DuplicateSegment(String),
    UnknownSegment(SegmentId),
    UnknownLink(LinkId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateSegment(name) => {
                write!(f, "segment '{}' already exists in this graph", name)
            }
            GraphError::UnknownSegment(id) => {
                write!(f, "segment {} is not owned by this graph", id)
            }
            GraphError::UnknownLink(id) => {
                write!(f, "link {} is not owned by this graph", id)
            }
        }
    }
}

impl std::error::Error for GraphError {}

struct SegmentSlot {
    segment: Segment,
    outgoing: Vec<LinkId>,
    incoming: Vec<LinkId>,
}

/// The bidirected assembly graph: owner of all segments and links.
///
/// Segments and links live in arenas addressed by stable ids; the
/// reverse-complement pairing is kept consistent by always creating and
/// removing pairs together. All traversal algorithms take the graph as an
/// explicit argument, there is no shared global instance.
#[derive(Default)]
pub struct AssemblyGraph {
    segments: Vec<Option<SegmentSlot>>,
    links: Vec<Option<Link>>,
    names: HashMap<String, SegmentId>,
}

impl AssemblyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment and its reverse complement atomically. Returns the
    /// forward-strand id. The rc segment stores the reverse-complemented
    /// bases so sequence extraction never recomputes them.
    pub fn add_segment(
        &mut self,
        name: &str,
        sequence: Vec<u8>,
        depth: f64,
    ) -> Result<SegmentId, GraphError> {
        let length = sequence.len();
        let rc_seq = reverse_complement(&sequence);
        self.add_pair(name, length, Some(sequence), Some(rc_seq), depth)
    }

    /// Add a segment pair whose bases were not loaded; only the length is
    /// known. Such segments cannot take part in overlap resolution or
    /// sequence extraction, everything else works.
    pub fn add_segment_no_seq(
        &mut self,
        name: &str,
        length: usize,
        depth: f64,
    ) -> Result<SegmentId, GraphError> {
        self.add_pair(name, length, None, None, depth)
    }

    fn add_pair(
        &mut self,
        name: &str,
        length: usize,
        fwd_seq: Option<Vec<u8>>,
        rev_seq: Option<Vec<u8>>,
        depth: f64,
    ) -> Result<SegmentId, GraphError> {
        let fwd_name = format!("{}+", name);
        let rev_name = format!("{}-", name);
        if self.names.contains_key(&fwd_name) || self.names.contains_key(&rev_name) {
            return Err(GraphError::DuplicateSegment(name.to_string()));
        }

        let fwd_id = SegmentId(self.segments.len() as u32);
        let rev_id = SegmentId(self.segments.len() as u32 + 1);

        self.segments.push(Some(SegmentSlot {
            segment: Segment {
                name: name.to_string(),
                strand: Strand::Forward,
                length,
                sequence: fwd_seq,
                depth,
                rc: rev_id,
            },
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }));
        self.segments.push(Some(SegmentSlot {
            segment: Segment {
                name: name.to_string(),
                strand: Strand::Reverse,
                length,
                sequence: rev_seq,
                depth,
                rc: fwd_id,
            },
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }));

        self.names.insert(fwd_name, fwd_id);
        self.names.insert(rev_name, rev_id);
        Ok(fwd_id)
    }

    /// Add a link and its reverse complement atomically. Adding a link
    /// that already exists between the same two segments is a no-op
    /// returning the existing id.
    pub fn add_link(
        &mut self,
        from: SegmentId,
        to: SegmentId,
        overlap: usize,
        overlap_type: OverlapType,
    ) -> Result<LinkId, GraphError> {
        self.check_segment(from)?;
        self.check_segment(to)?;

        if let Some(existing) = self.find_link(from, to) {
            debug!("ignoring duplicate link {} -> {}", from, to);
            return Ok(existing);
        }

        let rc_from = self.segment_unchecked(to).rc;
        let rc_to = self.segment_unchecked(from).rc;

        let id = LinkId(self.links.len() as u32);
        // Palindromic link: the rc edge is the edge itself, keep one object.
        if rc_from == from && rc_to == to {
            self.links.push(Some(Link {
                from,
                to,
                overlap,
                overlap_type,
                rc: id,
            }));
            self.attach(id, from, to);
            return Ok(id);
        }

        let rc_id = LinkId(self.links.len() as u32 + 1);
        self.links.push(Some(Link {
            from,
            to,
            overlap,
            overlap_type,
            rc: rc_id,
        }));
        self.links.push(Some(Link {
            from: rc_from,
            to: rc_to,
            overlap,
            overlap_type,
            rc: id,
        }));
        self.attach(id, from, to);
        self.attach(rc_id, rc_from, rc_to);
        Ok(id)
    }

    fn attach(&mut self, id: LinkId, from: SegmentId, to: SegmentId) {
        self.slot_mut(from).outgoing.push(id);
        self.slot_mut(to).incoming.push(id);
    }

    fn detach(&mut self, id: LinkId, from: SegmentId, to: SegmentId) {
        if let Some(Some(slot)) = self.segments.get_mut(from.index()) {
            slot.outgoing.retain(|&l| l != id);
        }
        if let Some(Some(slot)) = self.segments.get_mut(to.index()) {
            slot.incoming.retain(|&l| l != id);
        }
    }

    /// Remove a link together with its reverse complement.
    pub fn remove_link_pair(&mut self, id: LinkId) -> Result<(), GraphError> {
        let link = self.link(id).ok_or(GraphError::UnknownLink(id))?.clone();
        let rc_id = link.rc;
        self.detach(id, link.from, link.to);
        self.links[id.index()] = None;
        if rc_id != id {
            if let Some(rc) = self.link(rc_id).cloned() {
                self.detach(rc_id, rc.from, rc.to);
                self.links[rc_id.index()] = None;
            }
        }
        Ok(())
    }

    /// Remove a segment, its reverse complement, and every link touching
    /// either. Ids stay retired, they are never reused.
    pub fn remove_segment_pair(&mut self, id: SegmentId) -> Result<(), GraphError> {
        let segment = self.segment(id).ok_or(GraphError::UnknownSegment(id))?;
        let rc_id = segment.rc;

        let mut touching: Vec<LinkId> = Vec::new();
        for seg in [id, rc_id] {
            if let Some(Some(slot)) = self.segments.get(seg.index()) {
                touching.extend_from_slice(&slot.outgoing);
                touching.extend_from_slice(&slot.incoming);
            }
        }
        touching.sort_unstable();
        touching.dedup();
        for link_id in touching {
            if self.link(link_id).is_some() {
                self.remove_link_pair(link_id)?;
            }
        }

        for seg in [id, rc_id] {
            if let Some(Some(slot)) = self.segments.get(seg.index()) {
                self.names.remove(&slot.segment.signed_name());
            }
            self.segments[seg.index()] = None;
        }
        debug!("removed segment pair {} / {}", id, rc_id);
        Ok(())
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments
            .get(id.index())
            .and_then(|s| s.as_ref())
            .map(|slot| &slot.segment)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.index()).and_then(|l| l.as_ref())
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.index()).and_then(|l| l.as_mut())
    }

    pub fn contains_segment(&self, id: SegmentId) -> bool {
        self.segment(id).is_some()
    }

    pub fn contains_link(&self, id: LinkId) -> bool {
        self.link(id).is_some()
    }

    /// Look up a segment by signed name (`utg1+`), falling back to the
    /// forward strand for an unsigned name (`utg1`).
    pub fn segment_by_name(&self, name: &str) -> Option<SegmentId> {
        if let Some(&id) = self.names.get(name) {
            return Some(id);
        }
        self.names.get(&format!("{}+", name)).copied()
    }

    pub fn outgoing_links(&self, id: SegmentId) -> &[LinkId] {
        self.segments
            .get(id.index())
            .and_then(|s| s.as_ref())
            .map(|slot| slot.outgoing.as_slice())
            .unwrap_or(&[])
    }

    pub fn incoming_links(&self, id: SegmentId) -> &[LinkId] {
        self.segments
            .get(id.index())
            .and_then(|s| s.as_ref())
            .map(|slot| slot.incoming.as_slice())
            .unwrap_or(&[])
    }

    /// The links leaving `id` when walking in `direction`.
    pub fn links_in_direction(&self, id: SegmentId, direction: Direction) -> &[LinkId] {
        match direction {
            Direction::Forward => self.outgoing_links(id),
            Direction::Backward => self.incoming_links(id),
        }
    }

    fn find_link(&self, from: SegmentId, to: SegmentId) -> Option<LinkId> {
        self.outgoing_links(from)
            .iter()
            .copied()
            .find(|&id| self.link(id).map(|l| l.to) == Some(to))
    }

    pub fn link_between(&self, from: SegmentId, to: SegmentId) -> Option<LinkId> {
        self.find_link(from, to)
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| SegmentId(i as u32))
    }

    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_some())
            .map(|(i, _)| LinkId(i as u32))
    }

    /// One segment per reverse-complement pair (the forward strand), for
    /// callers that must not draw or count a pair twice.
    pub fn positive_segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segment_ids()
            .filter(move |&id| self.segment_unchecked(id).is_positive())
    }

    /// One link per reverse-complement pair. Preference order: both
    /// endpoints forward-strand, then lexicographic on the endpoint signed
    /// names against the rc link's endpoints. Palindromic links are their
    /// own rc and always positive. Display-only; traversal never consults
    /// this.
    pub fn positive_link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.link_ids().filter(move |&id| self.link_is_positive(id))
    }

    pub fn link_is_positive(&self, id: LinkId) -> bool {
        let link = match self.link(id) {
            Some(l) => l,
            None => return false,
        };
        if link.rc == id {
            return true;
        }
        let from = self.segment_unchecked(link.from);
        let to = self.segment_unchecked(link.to);
        let both_forward = from.is_positive() && to.is_positive();
        let rc = self.link_unchecked(link.rc);
        let rc_from = self.segment_unchecked(rc.from);
        let rc_to = self.segment_unchecked(rc.to);
        let rc_both_forward = rc_from.is_positive() && rc_to.is_positive();
        if both_forward != rc_both_forward {
            return both_forward;
        }
        // Tie-break so exactly one of the pair is positive.
        (from.signed_name(), to.signed_name()) <= (rc_from.signed_name(), rc_to.signed_name())
    }

    pub fn segment_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_some()).count()
    }

    pub fn link_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    fn check_segment(&self, id: SegmentId) -> Result<(), GraphError> {
        if self.contains_segment(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownSegment(id))
        }
    }

    pub(crate) fn segment_unchecked(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()].as_ref().unwrap().segment
    }

    pub(crate) fn link_unchecked(&self, id: LinkId) -> &Link {
        self.links[id.index()].as_ref().unwrap()
    }

    fn slot_mut(&mut self, id: SegmentId) -> &mut SegmentSlot {
        self.segments[id.index()].as_mut().unwrap()
    }
}
