use std::fmt;
use std::sync::atomic::AtomicBool;

use log::{debug, info};

use crate::graph::AssemblyGraph;
use crate::reconcile::{reconcile_all, HitFilters, Query, ReconcileSettings, ReconcileStats};

/// Where the search workflow currently stands. The aligner database build
/// and the aligner runs themselves happen elsewhere; this machine only
/// tracks their outcomes so the reconciler is invoked at the right times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    DbNotBuilt,
    DbBuiltNoQueries,
    ReadyForSearch,
    SearchInProgress,
    SearchComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotReady(pub SearchState);

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "search cannot run from state {:?}", self.0)
    }
}

impl std::error::Error for NotReady {}

/// Drives the build -> load queries -> search cycle around the
/// reconciler. Searches are idempotent: re-running from `SearchComplete`
/// recomputes every query's paths against the current graph.
pub struct SearchSession {
    state: SearchState,
    queries: Vec<Query>,
    last_stats: Option<ReconcileStats>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        SearchSession {
            state: SearchState::DbNotBuilt,
            queries: Vec::new(),
            last_stats: None,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn last_stats(&self) -> Option<ReconcileStats> {
        self.last_stats
    }

    pub fn db_build_succeeded(&mut self) {
        self.state = if self.queries.is_empty() {
            SearchState::DbBuiltNoQueries
        } else {
            SearchState::ReadyForSearch
        };
        debug!("database built, state now {:?}", self.state);
    }

    /// A failed build invalidates everything, whatever state we were in.
    pub fn db_build_failed(&mut self) {
        self.state = SearchState::DbNotBuilt;
        self.last_stats = None;
    }

    /// Replace the query set. A finished search drops back to
    /// `ReadyForSearch` so it can be re-run against the new queries.
    pub fn set_queries(&mut self, queries: Vec<Query>) {
        self.queries = queries;
        if self.state != SearchState::DbNotBuilt {
            self.state = if self.queries.is_empty() {
                SearchState::DbBuiltNoQueries
            } else {
                SearchState::ReadyForSearch
            };
        }
    }

    pub fn clear_queries(&mut self) {
        self.set_queries(Vec::new());
    }

    /// Run the reconciler over every query. Only legal from
    /// `ReadyForSearch` or `SearchComplete`; repeatable at will.
    pub fn run(
        &mut self,
        graph: &AssemblyGraph,
        settings: &ReconcileSettings,
        filters: &HitFilters,
        cancel: &AtomicBool,
    ) -> Result<&[Query], NotReady> {
        match self.state {
            SearchState::ReadyForSearch | SearchState::SearchComplete => {}
            other => return Err(NotReady(other)),
        }
        self.state = SearchState::SearchInProgress;
        let stats = reconcile_all(&mut self.queries, graph, settings, filters, cancel);
        info!(
            "search over {} quer(ies): {} usable hit(s), {} filtered, {} reverse-strand, {} on unknown segments",
            self.queries.len(),
            stats.usable_hits,
            stats.filtered_out,
            stats.reverse_strand,
            stats.missing_segment
        );
        self.last_stats = Some(stats);
        self.state = SearchState::SearchComplete;
        Ok(&self.queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::AlignmentHit;
    use crate::link::OverlapType;

    fn query_with_hit() -> Query {
        let mut query = Query::new("q", 100);
        query.hits.push(AlignmentHit {
            query_id: "q".to_string(),
            segment_name: "A".to_string(),
            percent_identity: 99.0,
            alignment_length: 100,
            mismatches: 0,
            gap_opens: 0,
            query_start: 1,
            query_end: 100,
            segment_start: 1,
            segment_end: 100,
            e_value: "1e-30".parse().unwrap(),
            bit_score: 180.0,
        });
        query
    }

    fn graph() -> AssemblyGraph {
        let mut graph = AssemblyGraph::new();
        let a = graph.add_segment_no_seq("A", 100, 1.0).unwrap();
        let b = graph.add_segment_no_seq("B", 100, 1.0).unwrap();
        graph.add_link(a, b, 0, OverlapType::ExactGiven).unwrap();
        graph
    }

    #[test]
    fn test_state_transitions() {
        let mut session = SearchSession::new();
        assert_eq!(session.state(), SearchState::DbNotBuilt);
        session.db_build_succeeded();
        assert_eq!(session.state(), SearchState::DbBuiltNoQueries);
        session.set_queries(vec![query_with_hit()]);
        assert_eq!(session.state(), SearchState::ReadyForSearch);

        let graph = graph();
        let cancel = AtomicBool::new(false);
        session
            .run(
                &graph,
                &ReconcileSettings::default(),
                &HitFilters::default(),
                &cancel,
            )
            .unwrap();
        assert_eq!(session.state(), SearchState::SearchComplete);
        assert_eq!(session.queries()[0].paths.len(), 1);

        // Query-set changes drop back to ready.
        session.set_queries(vec![query_with_hit()]);
        assert_eq!(session.state(), SearchState::ReadyForSearch);

        // Build failure invalidates from any state.
        session.db_build_failed();
        assert_eq!(session.state(), SearchState::DbNotBuilt);
    }

    #[test]
    fn test_run_is_rejected_before_ready() {
        let mut session = SearchSession::new();
        let graph = graph();
        let cancel = AtomicBool::new(false);
        let err = session
            .run(
                &graph,
                &ReconcileSettings::default(),
                &HitFilters::default(),
                &cancel,
            )
            .unwrap_err();
        assert_eq!(err, NotReady(SearchState::DbNotBuilt));
    }

    #[test]
    fn test_run_is_idempotent_from_complete() {
        let mut session = SearchSession::new();
        session.set_queries(vec![query_with_hit()]);
        session.db_build_succeeded();
        let graph = graph();
        let cancel = AtomicBool::new(false);
        for _ in 0..2 {
            session
                .run(
                    &graph,
                    &ReconcileSettings::default(),
                    &HitFilters::default(),
                    &cancel,
                )
                .unwrap();
            assert_eq!(session.state(), SearchState::SearchComplete);
            assert_eq!(session.queries()[0].paths.len(), 1);
        }
    }
}
