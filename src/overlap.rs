use log::debug;
use rand::Rng;

use crate::graph::AssemblyGraph;
use crate::link::OverlapType;
use crate::segment::SegmentId;

/// Search for an exact overlap between the end of `from` and the start of
/// `to`, trying every length in `[min_overlap, max_overlap]` clamped to the
/// shorter segment.
///
/// The scan starts at a random offset within the range and wraps, and the
/// first length that validates wins. When several lengths validate this
/// deliberately avoids a systematic bias toward the smallest or largest one;
/// callers that need reproducibility fix the RNG seed. `None` means no
/// overlap was found, which is not an error - the link just stays
/// unresolved.
pub fn resolve_overlap<R: Rng>(
    graph: &AssemblyGraph,
    from: SegmentId,
    to: SegmentId,
    min_overlap: usize,
    max_overlap: usize,
    rng: &mut R,
) -> Option<usize> {
    let from_segment = graph.segment(from)?;
    let to_segment = graph.segment(to)?;
    let from_seq = from_segment.sequence.as_deref()?;
    let to_seq = to_segment.sequence.as_deref()?;

    let bound = from_seq.len().min(to_seq.len());
    if bound < min_overlap {
        return None;
    }
    let lo = min_overlap.min(bound);
    let hi = max_overlap.min(bound);
    if lo > hi {
        return None;
    }

    let range = hi - lo + 1;
    let start = rng.gen_range(0..range);
    for step in 0..range {
        let candidate = lo + (start + step) % range;
        if from_seq[from_seq.len() - candidate..] == to_seq[..candidate] {
            return Some(candidate);
        }
    }
    None
}

/// Attempt to resolve every link whose overlap is still unknown. Each
/// success is written to the link and its reverse complement as
/// `AutoDetermined`. Returns how many link pairs were resolved.
pub fn resolve_graph_overlaps<R: Rng>(
    graph: &mut AssemblyGraph,
    min_overlap: usize,
    max_overlap: usize,
    rng: &mut R,
) -> usize {
    let unresolved: Vec<_> = graph
        .positive_link_ids()
        .filter(|&id| graph.link_unchecked(id).overlap_type == OverlapType::Unknown)
        .collect();

    let mut resolved = 0;
    for id in unresolved {
        let (from, to, rc_id) = {
            let link = graph.link_unchecked(id);
            (link.from, link.to, link.rc())
        };
        match resolve_overlap(graph, from, to, min_overlap, max_overlap, rng) {
            Some(overlap) => {
                for target in [id, rc_id] {
                    if let Some(link) = graph.link_mut(target) {
                        link.overlap = overlap;
                        link.overlap_type = OverlapType::AutoDetermined;
                    }
                }
                debug!("link {} resolved to overlap {}", id, overlap);
                resolved += 1;
            }
            None => debug!("link {} left unresolved", id),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_finds_unique_overlap() {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment("A", b"AATTCCGG".to_vec(), 1.0).unwrap();
        let b = graph.add_segment("B", b"CCGGTTAA".to_vec(), 1.0).unwrap();
        // Only length 4 validates ("CCGG"), so the random scan order
        // cannot change the answer.
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(resolve_overlap(&graph, a, b, 1, 8, &mut rng), Some(4));
        }
    }

    #[test]
    fn test_any_validating_length_is_acceptable() {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment("A", b"AAAACCCC".to_vec(), 1.0).unwrap();
        let b = graph.add_segment("B", b"CCCCGGGG".to_vec(), 1.0).unwrap();
        // Suffix/prefix agree at lengths 1 through 4; whichever the scan
        // hits first must still be an exact match within the range.
        let found = resolve_overlap(&graph, a, b, 1, 8, &mut rng()).unwrap();
        assert!((1..=4).contains(&found));
        let a_seq = graph.segment(a).unwrap().sequence.clone().unwrap();
        let b_seq = graph.segment(b).unwrap().sequence.clone().unwrap();
        assert_eq!(a_seq[a_seq.len() - found..], b_seq[..found]);
        // Length 4 is among the answers across seeds.
        let seen: Vec<usize> = (0..50)
            .filter_map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                resolve_overlap(&graph, a, b, 1, 8, &mut rng)
            })
            .collect();
        assert!(seen.contains(&4));
    }

    #[test]
    fn test_range_is_respected() {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment("A", b"AAAACCCC".to_vec(), 1.0).unwrap();
        let b = graph.add_segment("B", b"CCCCGGGG".to_vec(), 1.0).unwrap();
        // Lengths 3 and 4 both validate; the result must stay in range.
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let got = resolve_overlap(&graph, a, b, 3, 4, &mut rng).unwrap();
            assert!((3..=4).contains(&got));
        }
        // A minimum larger than the shorter segment fails outright.
        assert_eq!(resolve_overlap(&graph, a, b, 9, 20, &mut rng()), None);
        // No validating length in range.
        assert_eq!(resolve_overlap(&graph, a, b, 5, 8, &mut rng()), None);
    }

    #[test]
    fn test_missing_sequence_is_unresolved() {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment_no_seq("A", 8, 1.0).unwrap();
        let b = graph.add_segment("B", b"CCCCGGGG".to_vec(), 1.0).unwrap();
        assert_eq!(resolve_overlap(&graph, a, b, 1, 8, &mut rng()), None);
    }

    #[test]
    fn test_graph_wide_resolution_updates_both_strands() {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment("A", b"AATTCCGG".to_vec(), 1.0).unwrap();
        let b = graph.add_segment("B", b"CCGGTTAA".to_vec(), 1.0).unwrap();
        let l = graph.add_link(a, b, 0, OverlapType::Unknown).unwrap();
        let resolved = resolve_graph_overlaps(&mut graph, 1, 8, &mut rng());
        assert_eq!(resolved, 1);
        let link = graph.link(l).unwrap();
        assert_eq!(link.overlap, 4);
        assert_eq!(link.overlap_type, OverlapType::AutoDetermined);
        let rc = graph.link(link.rc()).unwrap();
        assert_eq!(rc.overlap, 4);
        assert_eq!(rc.overlap_type, OverlapType::AutoDetermined);
    }
}
