use log::debug;

use crate::evalue::SciNot;

/// One alignment record from the external aligner, read-only input.
/// Coordinates are 1-based and inclusive, exactly as reported; a hit on
/// the reverse strand has `segment_start > segment_end`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AlignmentHit {
    pub query_id: String,
    pub segment_name: String,
    pub percent_identity: f64,
    pub alignment_length: usize,
    pub mismatches: u32,
    pub gap_opens: u32,
    pub query_start: usize,
    pub query_end: usize,
    pub segment_start: usize,
    pub segment_end: usize,
    pub e_value: SciNot,
    pub bit_score: f64,
}

impl AlignmentHit {
    /// Reverse-strand hits are discarded at ingestion; the graph's own
    /// reverse-complement segments carry the equivalent information.
    pub fn is_forward_strand(&self) -> bool {
        self.segment_start <= self.segment_end
    }

    /// Bases of the query this hit covers.
    pub fn query_span(&self) -> usize {
        self.query_end.saturating_sub(self.query_start) + 1
    }
}

/// How many records an ingestion pass accepted vs. skipped, surfaced so
/// the caller can report a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct IngestStats {
    pub accepted: usize,
    pub skipped: usize,
}

/// Recover the segment name from an aligner target label of the form
/// `NODE_<name>_length_<n>_cov_<x>`. The name component may itself
/// contain underscores, so the reserved fields are counted from the end;
/// a label not matching the pattern is already a plain segment name.
pub fn segment_name_from_label(label: &str) -> String {
    let parts: Vec<&str> = label.split('_').collect();
    if parts.len() >= 6
        && parts[0] == "NODE"
        && parts[parts.len() - 4] == "length"
        && parts[parts.len() - 2] == "cov"
    {
        parts[1..parts.len() - 4].join("_")
    } else {
        label.to_string()
    }
}

/// Parse one tab-separated aligner record with the fixed 12-field layout:
/// query id, target label, percent identity, alignment length, mismatches,
/// gap opens, query start/end, target start/end, e-value, bit score.
/// Anything malformed yields `None` and is the caller's to count.
pub fn parse_hit_line(line: &str) -> Option<AlignmentHit> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 12 {
        return None;
    }
    let hit = AlignmentHit {
        query_id: fields[0].to_string(),
        segment_name: segment_name_from_label(fields[1]),
        percent_identity: fields[2].parse().ok()?,
        alignment_length: fields[3].parse().ok()?,
        mismatches: fields[4].parse().ok()?,
        gap_opens: fields[5].parse().ok()?,
        query_start: fields[6].parse().ok()?,
        query_end: fields[7].parse().ok()?,
        segment_start: fields[8].parse().ok()?,
        segment_end: fields[9].parse().ok()?,
        e_value: fields[10].parse().ok()?,
        bit_score: fields[11].parse().ok()?,
    };
    // Coordinates are 1-based, so a zero is malformed, not a position.
    if hit.query_start == 0
        || hit.query_end == 0
        || hit.segment_start == 0
        || hit.segment_end == 0
    {
        return None;
    }
    Some(hit)
}

/// Parse a whole aligner output, skipping malformed records individually.
pub fn parse_hits(text: &str) -> (Vec<AlignmentHit>, IngestStats) {
    let mut hits = Vec::new();
    let mut stats = IngestStats::default();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        match parse_hit_line(line) {
            Some(hit) => {
                hits.push(hit);
                stats.accepted += 1;
            }
            None => {
                debug!("skipping malformed aligner record: {}", line);
                stats.skipped += 1;
            }
        }
    }
    (hits, stats)
}
