use std::sync::atomic::{AtomicBool, Ordering};

use crate::graph::AssemblyGraph;
use crate::link::{Direction, LinkId};
use crate::segment::SegmentId;

/// Bounded path enumeration and contiguity queries.
///
/// Both operations are depth-first searches whose only defense against
/// cyclic graphs is the explicit step budget plus a per-path occurrence
/// guard: a segment may appear at most twice in one path, which still
/// permits a single pass through a repeat or simple self-loop. The
/// `cancel` flag is checked at each step boundary, before branching into
/// the next set of links; a cancelled `trace_paths` hands back whatever it
/// has collected, a cancelled `leads_only_to_node` reports false.

fn occurrences(path: &[SegmentId], segment: SegmentId) -> usize {
    path.iter().filter(|&&s| s == segment).count()
}

/// Enumerate every path reachable from `start_link` in `direction` within
/// `steps_remaining` steps. A path ends when the budget runs out, the walk
/// dead-ends, or the next segment would be the link's own tail (a closed
/// loop). Paths are returned as segment lists, order not significant;
/// duplicates by value can occur and are left to the caller.
pub fn trace_paths(
    graph: &AssemblyGraph,
    start_link: LinkId,
    direction: Direction,
    steps_remaining: u32,
    cancel: &AtomicBool,
) -> Vec<Vec<SegmentId>> {
    let mut found = Vec::new();
    if steps_remaining == 0 {
        return found;
    }
    let link = match graph.link(start_link) {
        Some(l) => l,
        None => return found,
    };
    let origin = link.tail(direction);
    let mut path = vec![link.head(direction)];
    trace_step(
        graph,
        direction,
        origin,
        &mut path,
        steps_remaining,
        cancel,
        &mut found,
    );
    found
}

fn trace_step(
    graph: &AssemblyGraph,
    direction: Direction,
    origin: SegmentId,
    path: &mut Vec<SegmentId>,
    steps_remaining: u32,
    cancel: &AtomicBool,
    found: &mut Vec<Vec<SegmentId>>,
) {
    if cancel.load(Ordering::Relaxed) {
        found.push(path.clone());
        return;
    }
    let steps_remaining = steps_remaining.saturating_sub(1);
    let current = *path.last().unwrap();
    let next_links = graph.links_in_direction(current, direction);
    if steps_remaining == 0 || next_links.is_empty() {
        found.push(path.clone());
        return;
    }
    for &link_id in next_links {
        let next = graph.link_unchecked(link_id).head(direction);
        if next == origin {
            // Closed a loop back to the starting segment.
            found.push(path.clone());
            continue;
        }
        if occurrences(path, next) >= 2 {
            continue;
        }
        path.push(next);
        trace_step(graph, direction, origin, path, steps_remaining, cancel, found);
        path.pop();
    }
}

/// Does every path leaving `start_link` in `direction` reach `target`
/// (or, when `include_reverse_complement` is set, its rc partner) within
/// the budget? A single branch that loops back to the walk's first
/// segment, dead-ends elsewhere, or runs out of steps fails the whole
/// query. This is the universal counterpart of `trace_paths`.
pub fn leads_only_to_node(
    graph: &AssemblyGraph,
    start_link: LinkId,
    direction: Direction,
    target: SegmentId,
    steps_remaining: u32,
    include_reverse_complement: bool,
    cancel: &AtomicBool,
) -> bool {
    let link = match graph.link(start_link) {
        Some(l) => l,
        None => return false,
    };
    let target_rc = match graph.segment(target) {
        Some(s) => s.rc(),
        None => return false,
    };
    let first = link.head(direction);
    if first == target || (include_reverse_complement && first == target_rc) {
        return true;
    }
    let mut path = vec![first];
    leads_step(
        graph,
        direction,
        target,
        if include_reverse_complement {
            Some(target_rc)
        } else {
            None
        },
        &mut path,
        steps_remaining,
        cancel,
    )
}

fn leads_step(
    graph: &AssemblyGraph,
    direction: Direction,
    target: SegmentId,
    target_rc: Option<SegmentId>,
    path: &mut Vec<SegmentId>,
    steps_remaining: u32,
    cancel: &AtomicBool,
) -> bool {
    if cancel.load(Ordering::Relaxed) {
        return false;
    }
    let steps_remaining = steps_remaining.saturating_sub(1);
    if steps_remaining == 0 {
        return false;
    }
    let current = *path.last().unwrap();
    let next_links = graph.links_in_direction(current, direction);
    if next_links.is_empty() {
        // Dead end without having reached the target.
        return false;
    }
    for &link_id in next_links {
        let next = graph.link_unchecked(link_id).head(direction);
        if next == path[0] {
            // Circular walk that never met the target.
            return false;
        }
        if next == target || target_rc == Some(next) {
            continue; // this branch succeeds
        }
        if occurrences(path, next) >= 2 {
            continue; // already explored through this repeat
        }
        path.push(next);
        let ok = leads_step(graph, direction, target, target_rc, path, steps_remaining, cancel);
        path.pop();
        if !ok {
            return false;
        }
    }
    true
}

/// All walks from `from` to `to` using at most `max_nodes` segments,
/// forward orientation only. Used by the reconciler to connect hit pairs;
/// the occurrence guard and node cap bound the search the same way the
/// tracer's budget does.
pub fn all_paths_between(
    graph: &AssemblyGraph,
    from: SegmentId,
    to: SegmentId,
    max_nodes: usize,
    cancel: &AtomicBool,
) -> Vec<Vec<SegmentId>> {
    let mut found = Vec::new();
    if max_nodes == 0 || !graph.contains_segment(from) || !graph.contains_segment(to) {
        return found;
    }
    let mut path = vec![from];
    between_step(graph, to, max_nodes, &mut path, cancel, &mut found);
    found
}

fn between_step(
    graph: &AssemblyGraph,
    to: SegmentId,
    max_nodes: usize,
    path: &mut Vec<SegmentId>,
    cancel: &AtomicBool,
    found: &mut Vec<Vec<SegmentId>>,
) {
    if cancel.load(Ordering::Relaxed) {
        return;
    }
    if *path.last().unwrap() == to {
        found.push(path.clone());
        return;
    }
    if path.len() >= max_nodes {
        return;
    }
    for &link_id in graph.outgoing_links(*path.last().unwrap()) {
        let next = graph.link_unchecked(link_id).head(Direction::Forward);
        if occurrences(path, next) >= 2 {
            continue;
        }
        path.push(next);
        between_step(graph, to, max_nodes, path, cancel, found);
        path.pop();
    }
}
