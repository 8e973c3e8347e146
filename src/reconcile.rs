use std::sync::atomic::{AtomicBool, Ordering};

use bitvec::prelude::*;
use log::debug;
use rayon::prelude::*;

use crate::evalue::SciNot;
use crate::graph::AssemblyGraph;
use crate::hits::AlignmentHit;
use crate::path::Path;
use crate::segment::SegmentId;
use crate::trace::all_paths_between;

/// User-facing hit filters. Each threshold is independently enable-able;
/// a `None` filter never excludes anything.
#[derive(Debug, Clone, Default)]
pub struct HitFilters {
    pub min_alignment_length: Option<usize>,
    /// Percent of the query one hit must cover.
    pub min_query_coverage: Option<f64>,
    pub min_identity: Option<f64>,
    pub max_e_value: Option<SciNot>,
    pub min_bit_score: Option<f64>,
}

impl HitFilters {
    pub fn accepts(&self, hit: &AlignmentHit, query_length: usize) -> bool {
        if let Some(min) = self.min_alignment_length {
            if hit.alignment_length < min {
                return false;
            }
        }
        if let Some(min) = self.min_query_coverage {
            if query_length == 0 {
                return false;
            }
            let coverage = 100.0 * hit.query_span() as f64 / query_length as f64;
            if coverage < min {
                return false;
            }
        }
        if let Some(min) = self.min_identity {
            if hit.percent_identity < min {
                return false;
            }
        }
        if let Some(max) = self.max_e_value {
            if hit.e_value > max {
                return false;
            }
        }
        if let Some(min) = self.min_bit_score {
            if hit.bit_score < min {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Node cap for the path search connecting two hits.
    pub max_path_nodes: usize,
    /// Fraction of the query a candidate path must explain.
    pub min_query_coverage: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        ReconcileSettings {
            max_path_nodes: 6,
            min_query_coverage: 0.5,
        }
    }
}

/// A user query: its hits, and after reconciliation its ranked candidate
/// paths.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Query {
    pub id: String,
    pub length: usize,
    pub hits: Vec<AlignmentHit>,
    pub paths: Vec<ScoredPath>,
}

impl Query {
    pub fn new(id: impl Into<String>, length: usize) -> Self {
        Query {
            id: id.into(),
            length,
            hits: Vec::new(),
            paths: Vec::new(),
        }
    }
}

/// A candidate path with its derived metrics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoredPath {
    pub path: Path,
    pub hit_count: usize,
    /// Fraction of the query spanned by the path's hits, start to end.
    pub query_coverage_by_path: f64,
    /// Fraction of query bases actually under a hit; never above the
    /// path coverage.
    pub query_coverage_by_hits: f64,
    /// Length-weighted mean percent identity across the path's hits.
    pub mean_hit_identity: f64,
    pub total_mismatches: u32,
    pub total_gap_opens: u32,
    /// Signed relative difference between the path length and the query
    /// span it is supposed to explain.
    pub length_discrepancy: f64,
    pub e_value_product: SciNot,
}

/// Which metric orders the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    EValueProduct,
    QueryCoverageByPath,
    QueryCoverageByHits,
    MeanHitIdentity,
    LengthDiscrepancy,
}

pub fn rank(paths: &mut [ScoredPath], by: RankBy) {
    use std::cmp::Ordering::Equal;
    match by {
        RankBy::EValueProduct => paths.sort_by(|a, b| {
            a.e_value_product
                .partial_cmp(&b.e_value_product)
                .unwrap_or(Equal)
        }),
        RankBy::QueryCoverageByPath => paths.sort_by(|a, b| {
            b.query_coverage_by_path
                .partial_cmp(&a.query_coverage_by_path)
                .unwrap_or(Equal)
        }),
        RankBy::QueryCoverageByHits => paths.sort_by(|a, b| {
            b.query_coverage_by_hits
                .partial_cmp(&a.query_coverage_by_hits)
                .unwrap_or(Equal)
        }),
        RankBy::MeanHitIdentity => paths.sort_by(|a, b| {
            b.mean_hit_identity
                .partial_cmp(&a.mean_hit_identity)
                .unwrap_or(Equal)
        }),
        RankBy::LengthDiscrepancy => paths.sort_by(|a, b| {
            a.length_discrepancy
                .abs()
                .partial_cmp(&b.length_discrepancy.abs())
                .unwrap_or(Equal)
        }),
    }
}

/// Ingestion outcome of one reconciliation pass, reported so the caller
/// can surface how much of the aligner output was actually used.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ReconcileStats {
    pub usable_hits: usize,
    pub reverse_strand: usize,
    pub filtered_out: usize,
    pub missing_segment: usize,
}

impl ReconcileStats {
    pub fn merge(&mut self, other: ReconcileStats) {
        self.usable_hits += other.usable_hits;
        self.reverse_strand += other.reverse_strand;
        self.filtered_out += other.filtered_out;
        self.missing_segment += other.missing_segment;
    }
}

/// Reconcile one query's hits against the graph: filter, locate each hit's
/// segment, chain hit pairs into candidate paths through the graph, score
/// and rank them. Cancellation aborts with an empty candidate list.
pub fn reconcile(
    query_id: &str,
    query_length: usize,
    hits: &[AlignmentHit],
    graph: &AssemblyGraph,
    settings: &ReconcileSettings,
    filters: &HitFilters,
    cancel: &AtomicBool,
) -> (Vec<ScoredPath>, ReconcileStats) {
    let mut stats = ReconcileStats::default();
    let mut located: Vec<(SegmentId, &AlignmentHit)> = Vec::new();
    for hit in hits {
        if !hit.is_forward_strand() {
            stats.reverse_strand += 1;
            continue;
        }
        // Coordinates are 1-based; a zero would underflow the offset
        // arithmetic below, so such hits are unusable.
        if hit.query_start == 0
            || hit.query_end == 0
            || hit.segment_start == 0
            || hit.segment_end == 0
        {
            debug!("query {}: dropping hit with zero coordinate", query_id);
            stats.filtered_out += 1;
            continue;
        }
        if !filters.accepts(hit, query_length) {
            stats.filtered_out += 1;
            continue;
        }
        match graph.segment_by_name(&hit.segment_name) {
            Some(segment) => located.push((segment, hit)),
            None => {
                // Stale aligner output naming a node we do not have.
                debug!(
                    "query {}: dropping hit on unknown segment '{}'",
                    query_id, hit.segment_name
                );
                stats.missing_segment += 1;
            }
        }
    }
    stats.usable_hits = located.len();

    let mut candidates: Vec<ScoredPath> = Vec::new();
    for &(start_segment, start_hit) in &located {
        for &(end_segment, end_hit) in &located {
            if cancel.load(Ordering::Relaxed) {
                return (Vec::new(), stats);
            }
            if end_hit.query_start < start_hit.query_start {
                continue;
            }
            let walks = all_paths_between(
                graph,
                start_segment,
                end_segment,
                settings.max_path_nodes,
                cancel,
            );
            for segments in walks {
                let start_offset = start_hit.segment_start - 1;
                let end_offset = end_hit.segment_end - 1;
                if segments.len() == 1 && end_offset < start_offset {
                    continue;
                }
                let first_len = graph
                    .segment(segments[0])
                    .map(|s| s.length)
                    .unwrap_or(0);
                let last_len = graph
                    .segment(segments[segments.len() - 1])
                    .map(|s| s.length)
                    .unwrap_or(0);
                if start_offset >= first_len || end_offset >= last_len {
                    continue;
                }
                let path = Path::new(segments, start_offset, end_offset);
                if candidates.iter().any(|c| c.path == path) {
                    continue;
                }
                let scored = score_path(path, &located, query_length, graph);
                if scored.query_coverage_by_path >= settings.min_query_coverage {
                    candidates.push(scored);
                }
            }
        }
    }

    rank(&mut candidates, RankBy::EValueProduct);
    debug!(
        "query {}: {} candidate path(s) from {} usable hit(s)",
        query_id,
        candidates.len(),
        stats.usable_hits
    );
    (candidates, stats)
}

fn score_path(
    path: Path,
    located: &[(SegmentId, &AlignmentHit)],
    query_length: usize,
    graph: &AssemblyGraph,
) -> ScoredPath {
    let on_path: Vec<&AlignmentHit> = located
        .iter()
        .filter(|(segment, _)| path.segments.contains(segment))
        .map(|&(_, hit)| hit)
        .collect();

    let first_start = on_path.iter().map(|h| h.query_start).min().unwrap_or(1);
    let last_end = on_path.iter().map(|h| h.query_end).max().unwrap_or(0);
    let covered_span = last_end.saturating_sub(first_start) + 1;

    let query_coverage_by_path = if query_length == 0 {
        0.0
    } else {
        covered_span as f64 / query_length as f64
    };

    let mut mask = bitvec![0; query_length];
    for hit in &on_path {
        let from = hit.query_start.saturating_sub(1).min(query_length);
        let to = hit.query_end.min(query_length);
        if from < to {
            mask[from..to].fill(true);
        }
    }
    let query_coverage_by_hits = if query_length == 0 {
        0.0
    } else {
        mask.count_ones() as f64 / query_length as f64
    };

    let weighted: f64 = on_path
        .iter()
        .map(|h| h.percent_identity * h.alignment_length as f64)
        .sum();
    let total_alignment: usize = on_path.iter().map(|h| h.alignment_length).sum();
    let mean_hit_identity = if total_alignment == 0 {
        0.0
    } else {
        weighted / total_alignment as f64
    };

    let path_length = path.length(graph);
    let length_discrepancy = if covered_span == 0 {
        0.0
    } else {
        (path_length as f64 - covered_span as f64) / covered_span as f64
    };

    ScoredPath {
        hit_count: on_path.len(),
        query_coverage_by_path,
        query_coverage_by_hits,
        mean_hit_identity,
        total_mismatches: on_path.iter().map(|h| h.mismatches).sum(),
        total_gap_opens: on_path.iter().map(|h| h.gap_opens).sum(),
        length_discrepancy,
        e_value_product: on_path.iter().map(|h| h.e_value).product(),
        path,
    }
}

/// Reconcile every query in parallel; the graph is read-only for the
/// whole pass. Returns the merged ingestion stats.
pub fn reconcile_all(
    queries: &mut [Query],
    graph: &AssemblyGraph,
    settings: &ReconcileSettings,
    filters: &HitFilters,
    cancel: &AtomicBool,
) -> ReconcileStats {
    let per_query: Vec<ReconcileStats> = queries
        .par_iter_mut()
        .map(|query| {
            let (paths, stats) = reconcile(
                &query.id,
                query.length,
                &query.hits,
                graph,
                settings,
                filters,
                cancel,
            );
            query.paths = paths;
            stats
        })
        .collect();
    let mut merged = ReconcileStats::default();
    for stats in per_query {
        merged.merge(stats);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::OverlapType;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    fn hit(
        segment: &str,
        identity: f64,
        qs: usize,
        qe: usize,
        ss: usize,
        se: usize,
        e_value: &str,
    ) -> AlignmentHit {
        AlignmentHit {
            query_id: "q".to_string(),
            segment_name: segment.to_string(),
            percent_identity: identity,
            alignment_length: qe - qs + 1,
            mismatches: 1,
            gap_opens: 0,
            query_start: qs,
            query_end: qe,
            segment_start: ss,
            segment_end: se,
            e_value: e_value.parse().unwrap(),
            bit_score: 50.0,
        }
    }

    fn chain_graph() -> (AssemblyGraph, Vec<SegmentId>) {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment_no_seq("A", 100, 1.0).unwrap();
        let b = graph.add_segment_no_seq("B", 100, 1.0).unwrap();
        let c = graph.add_segment_no_seq("C", 100, 1.0).unwrap();
        graph.add_link(a, b, 0, OverlapType::ExactGiven).unwrap();
        graph.add_link(b, c, 0, OverlapType::ExactGiven).unwrap();
        (graph, vec![a, b, c])
    }

    #[test]
    fn test_reconcile_chains_hits_across_segments() {
        let (graph, segs) = chain_graph();
        let hits = vec![
            hit("A", 95.0, 1, 100, 1, 100, "1e-50"),
            hit("B", 90.0, 101, 150, 1, 50, "1e-20"),
            hit("C", 98.0, 151, 250, 1, 100, "1e-40"),
        ];
        let (paths, stats) = reconcile(
            "q",
            250,
            &hits,
            &graph,
            &ReconcileSettings::default(),
            &HitFilters::default(),
            &no_cancel(),
        );
        assert_eq!(stats.usable_hits, 3);
        assert!(!paths.is_empty());
        // The full-span candidate carries all three hits and ranks first
        // by e-value product.
        let best = &paths[0];
        assert_eq!(best.path.segments, segs);
        assert_eq!(best.hit_count, 3);
        assert_eq!(best.query_coverage_by_path, 1.0);
        assert_eq!(best.query_coverage_by_hits, 1.0);
        assert_eq!(best.e_value_product, "1e-110".parse().unwrap());
        assert_eq!(best.total_mismatches, 3);
        // 300 path bases explaining a 250-base span.
        assert!((best.length_discrepancy - 0.2).abs() < 1e-9);
        let expected_identity = (95.0 * 100.0 + 90.0 * 50.0 + 98.0 * 100.0) / 250.0;
        assert!((best.mean_hit_identity - expected_identity).abs() < 1e-9);
    }

    #[test]
    fn test_zero_coordinate_hit_is_dropped() {
        let (graph, segs) = chain_graph();
        // Segment coordinates 0/0 pass the strand check but sit outside
        // the 1-based contract; the hit must be dropped, never chained.
        let hits = vec![
            hit("A", 99.0, 1, 100, 0, 0, "1e-50"),
            hit("A", 95.0, 1, 100, 1, 100, "1e-50"),
            hit("B", 90.0, 101, 150, 1, 50, "1e-20"),
            hit("C", 98.0, 151, 250, 1, 100, "1e-40"),
        ];
        let (paths, stats) = reconcile(
            "q",
            250,
            &hits,
            &graph,
            &ReconcileSettings::default(),
            &HitFilters::default(),
            &no_cancel(),
        );
        assert_eq!(stats.filtered_out, 1);
        assert_eq!(stats.usable_hits, 3);
        assert_eq!(paths[0].path.segments, segs);
    }

    #[test]
    fn test_coverage_threshold_is_enforced() {
        let (graph, _) = chain_graph();
        // A lone 100-base hit explains 40% of a 250-base query.
        let hits = vec![hit("A", 95.0, 1, 100, 1, 100, "1e-50")];
        let (paths, _) = reconcile(
            "q",
            250,
            &hits,
            &graph,
            &ReconcileSettings::default(),
            &HitFilters::default(),
            &no_cancel(),
        );
        assert!(paths.is_empty());
        for settings in [
            ReconcileSettings {
                min_query_coverage: 0.3,
                ..Default::default()
            },
        ] {
            let (paths, _) = reconcile(
                "q",
                250,
                &hits,
                &graph,
                &settings,
                &HitFilters::default(),
                &no_cancel(),
            );
            assert!(paths
                .iter()
                .all(|p| p.query_coverage_by_path >= settings.min_query_coverage));
            assert!(!paths.is_empty());
        }
    }

    #[test]
    fn test_reverse_strand_and_unknown_segments_dropped() {
        let (graph, _) = chain_graph();
        let hits = vec![
            hit("A", 95.0, 1, 100, 100, 1, "1e-50"), // reverse strand
            hit("Z", 95.0, 1, 100, 1, 100, "1e-50"), // not in graph
            hit("A", 95.0, 1, 200, 1, 100, "1e-50"),
        ];
        let (_, stats) = reconcile(
            "q",
            250,
            &hits,
            &graph,
            &ReconcileSettings::default(),
            &HitFilters::default(),
            &no_cancel(),
        );
        assert_eq!(stats.reverse_strand, 1);
        assert_eq!(stats.missing_segment, 1);
        assert_eq!(stats.usable_hits, 1);
    }

    #[test]
    fn test_filters_are_independent() {
        let h = hit("A", 90.0, 1, 50, 1, 50, "1e-10");
        let none = HitFilters::default();
        assert!(none.accepts(&h, 100));
        let identity = HitFilters {
            min_identity: Some(95.0),
            ..Default::default()
        };
        assert!(!identity.accepts(&h, 100));
        let e_value = HitFilters {
            max_e_value: Some("1e-20".parse().unwrap()),
            ..Default::default()
        };
        assert!(!e_value.accepts(&h, 100));
        let coverage = HitFilters {
            min_query_coverage: Some(40.0),
            ..Default::default()
        };
        assert!(coverage.accepts(&h, 100));
        let length = HitFilters {
            min_alignment_length: Some(60),
            ..Default::default()
        };
        assert!(!length.accepts(&h, 100));
        let bit_score = HitFilters {
            min_bit_score: Some(60.0),
            ..Default::default()
        };
        assert!(!bit_score.accepts(&h, 100));
    }

    #[test]
    fn test_cancelled_reconcile_returns_nothing() {
        let (graph, _) = chain_graph();
        let hits = vec![hit("A", 95.0, 1, 200, 1, 100, "1e-50")];
        let cancelled = AtomicBool::new(true);
        let (paths, _) = reconcile(
            "q",
            250,
            &hits,
            &graph,
            &ReconcileSettings::default(),
            &HitFilters::default(),
            &cancelled,
        );
        assert!(paths.is_empty());
    }

    #[test]
    fn test_rank_by_other_metrics() {
        let (_graph, segs) = chain_graph();
        let mk = |seg_list: Vec<SegmentId>, coverage: f64, identity: f64| ScoredPath {
            path: Path::new(seg_list, 0, 99),
            hit_count: 1,
            query_coverage_by_path: coverage,
            query_coverage_by_hits: coverage,
            mean_hit_identity: identity,
            total_mismatches: 0,
            total_gap_opens: 0,
            length_discrepancy: 0.0,
            e_value_product: SciNot::one(),
        };
        let mut paths = vec![
            mk(vec![segs[0]], 0.4, 99.0),
            mk(vec![segs[1]], 0.9, 91.0),
        ];
        rank(&mut paths, RankBy::QueryCoverageByPath);
        assert_eq!(paths[0].path.segments, vec![segs[1]]);
        rank(&mut paths, RankBy::MeanHitIdentity);
        assert_eq!(paths[0].path.segments, vec![segs[0]]);
    }
}
