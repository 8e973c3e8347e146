use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use asmgraph::evalue::SciNot;
use asmgraph::graph::AssemblyGraph;
use asmgraph::hits::{parse_hits, IngestStats};
use asmgraph::link::OverlapType;
use asmgraph::overlap::resolve_graph_overlaps;
use asmgraph::path::Path;
use asmgraph::reconcile::{HitFilters, Query, ReconcileSettings, ReconcileStats, ScoredPath};
use asmgraph::search::SearchSession;

/// Query an assembly graph with externally produced alignment hits and
/// print the ranked candidate paths for each query as JSON.
#[derive(Parser, Debug)]
#[command(name = "asmgraph")]
struct Args {
    /// Graph listing handed over by the loader: tab-separated `segment`
    /// and `link` records (see `load_graph_listing`)
    pub graph: String,
    /// Aligner output: 12-column tab-separated hit records
    pub hits: String,
    /// Node cap for candidate paths
    #[arg(long, default_value_t = 6)]
    pub max_path_nodes: usize,
    /// Fraction of the query a candidate path must explain
    #[arg(long, default_value_t = 0.5)]
    pub min_query_coverage: f64,
    #[arg(long)]
    pub min_identity: Option<f64>,
    #[arg(long)]
    pub min_alignment_length: Option<usize>,
    /// E-value ceiling per hit, e.g. `1e-10`
    #[arg(long)]
    pub max_e_value: Option<String>,
    #[arg(long)]
    pub min_bit_score: Option<f64>,
    /// Overlap search range for links with no stated overlap
    #[arg(long, default_value_t = 1)]
    pub min_overlap: usize,
    #[arg(long, default_value_t = 100)]
    pub max_overlap: usize,
    /// Fix the RNG seed to make overlap resolution reproducible
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(short, long)]
    pub verbose: bool,
}

/// Build the graph from the loader's plain listing. Two record kinds:
///   segment <name> <sequence> <depth>
///   segment <name> * <length> <depth>        (bases not loaded)
///   link    <from+/-> <to+/-> <overlap|?>
/// Lines starting with `#` and blank lines are ignored; links may appear
/// before the segments they reference, so they are applied last.
fn load_graph_listing(text: &str) -> Result<AssemblyGraph, Box<dyn Error>> {
    let mut graph = AssemblyGraph::new();
    let mut link_lines: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match fields.first() {
            Some(&"segment") if fields.len() >= 4 && fields[2] == "*" => {
                let length: usize = fields[3].parse()?;
                let depth: f64 = fields.get(4).map_or(Ok(0.0), |d| d.parse())?;
                graph.add_segment_no_seq(fields[1], length, depth)?;
            }
            Some(&"segment") if fields.len() >= 3 => {
                let depth: f64 = fields.get(3).map_or(Ok(0.0), |d| d.parse())?;
                graph.add_segment(fields[1], fields[2].as_bytes().to_vec(), depth)?;
            }
            Some(&"link") if fields.len() >= 4 => link_lines.push(fields),
            _ => warn!("ignoring unrecognized graph record: {}", line),
        }
    }
    for fields in link_lines {
        let from = graph.segment_by_name(fields[1]);
        let to = graph.segment_by_name(fields[2]);
        let (from, to) = match (from, to) {
            (Some(f), Some(t)) => (f, t),
            _ => {
                warn!("link references unknown segment: {} -> {}", fields[1], fields[2]);
                continue;
            }
        };
        if fields[3] == "?" {
            graph.add_link(from, to, 0, OverlapType::Unknown)?;
        } else {
            graph.add_link(from, to, fields[3].parse()?, OverlapType::ExactGiven)?;
        }
    }
    Ok(graph)
}

#[derive(serde::Serialize)]
struct PathReport {
    path: String,
    nodes: usize,
    length: usize,
    hit_count: usize,
    query_coverage_by_path: f64,
    query_coverage_by_hits: f64,
    mean_hit_identity: f64,
    total_mismatches: u32,
    total_gap_opens: u32,
    length_discrepancy: f64,
    e_value_product: String,
}

impl PathReport {
    fn new(scored: &ScoredPath, graph: &AssemblyGraph) -> Self {
        let path: &Path = &scored.path;
        PathReport {
            path: path.describe(graph),
            nodes: path.node_count(),
            length: path.length(graph),
            hit_count: scored.hit_count,
            query_coverage_by_path: scored.query_coverage_by_path,
            query_coverage_by_hits: scored.query_coverage_by_hits,
            mean_hit_identity: scored.mean_hit_identity,
            total_mismatches: scored.total_mismatches,
            total_gap_opens: scored.total_gap_opens,
            length_discrepancy: scored.length_discrepancy,
            e_value_product: scored.e_value_product.to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct QueryReport {
    query: String,
    length: usize,
    hits: usize,
    paths: Vec<PathReport>,
}

#[derive(serde::Serialize)]
struct Report {
    ingest: IngestStats,
    search: Option<ReconcileStats>,
    queries: Vec<QueryReport>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).init();

    let graph_text = fs::read_to_string(&args.graph)?;
    let mut graph = load_graph_listing(&graph_text)?;
    info!(
        "loaded graph: {} segments, {} links",
        graph.segment_count(),
        graph.link_count()
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let resolved = resolve_graph_overlaps(&mut graph, args.min_overlap, args.max_overlap, &mut rng);
    if resolved > 0 {
        info!("auto-determined {} link overlap(s)", resolved);
    }

    let hits_text = fs::read_to_string(&args.hits)?;
    let (hits, ingest) = parse_hits(&hits_text);
    info!(
        "aligner records: {} accepted, {} skipped",
        ingest.accepted, ingest.skipped
    );

    // Group hits per query; the query length is not part of the record
    // format, so the furthest hit end stands in for it.
    let mut queries: BTreeMap<String, Query> = BTreeMap::new();
    for hit in hits {
        let entry = queries
            .entry(hit.query_id.clone())
            .or_insert_with(|| Query::new(hit.query_id.clone(), 0));
        entry.length = entry.length.max(hit.query_end);
        entry.hits.push(hit);
    }

    let filters = HitFilters {
        min_alignment_length: args.min_alignment_length,
        min_query_coverage: None,
        min_identity: args.min_identity,
        max_e_value: args
            .max_e_value
            .as_deref()
            .map(str::parse::<SciNot>)
            .transpose()?,
        min_bit_score: args.min_bit_score,
    };
    let settings = ReconcileSettings {
        max_path_nodes: args.max_path_nodes,
        min_query_coverage: args.min_query_coverage,
    };

    let mut session = SearchSession::new();
    session.set_queries(queries.into_values().collect());
    session.db_build_succeeded();
    let cancel = AtomicBool::new(false);
    session.run(&graph, &settings, &filters, &cancel)?;

    let report = Report {
        ingest,
        search: session.last_stats(),
        queries: session
            .queries()
            .iter()
            .map(|query| QueryReport {
                query: query.id.clone(),
                length: query.length,
                hits: query.hits.len(),
                paths: query
                    .paths
                    .iter()
                    .map(|scored| PathReport::new(scored, &graph))
                    .collect(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
