use std::collections::HashMap;
use std::env;
use std::path::Path;

use fedsearch_core::config::Config;
use fedsearch_core::types::{FacetBucket, Hit, QueryDescriptor, ResultType, SearchResponse, SortType, PATH_AGGREGATION};
use fedsearch_facets::{build_sheet_filters, FilterNode};
use fedsearch_federated::{collapse_versions, HttpFederatedSearch};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const SHEET_AGGREGATIONS: [&str; 2] = ["group", "topics_en"];

struct QueryArgs {
    text: String,
    start: usize,
    size: Option<usize>,
    filters: Vec<String>,
    sort: SortType,
    exact: bool,
    sheets: bool,
}

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} query <text> [--start N] [--size N] [--filter PATH]... [--sort relevance|chronological|dateCreated|numViews] [--exact] [--sheets]");
    eprintln!("Example: {prog} query 'שלום' --filter Tanakh/Torah --sort chronological");
    std::process::exit(1);
}

fn parse_sort(value: &str) -> anyhow::Result<SortType> {
    match value {
        "relevance" => Ok(SortType::Relevance),
        "chronological" => Ok(SortType::Chronological),
        "dateCreated" => Ok(SortType::DateCreated),
        "numViews" => Ok(SortType::NumViews),
        other => Err(anyhow::anyhow!("unknown sort '{other}'")),
    }
}

fn parse_query_args(args: &[String]) -> anyhow::Result<QueryArgs> {
    let mut out = QueryArgs { text: String::new(), start: 0, size: None, filters: Vec::new(), sort: SortType::Relevance, exact: false, sheets: false };
    let mut words = Vec::new();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().cloned().ok_or_else(|| anyhow::anyhow!("{flag} needs a value"));
        match arg.as_str() {
            "--start" => out.start = value("--start")?.parse()?,
            "--size" => out.size = Some(value("--size")?.parse()?),
            "--filter" => out.filters.push(value("--filter")?),
            "--sort" => out.sort = parse_sort(&value("--sort")?)?,
            "--exact" => out.exact = true,
            "--sheets" => out.sheets = true,
            _ => words.push(arg.clone()),
        }
    }
    out.text = words.join(" ");
    Ok(out)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).without_time().compact().init();
}

fn descriptor(args: &QueryArgs, default_size: usize) -> QueryDescriptor {
    let result_type = if args.sheets { ResultType::Sheet } else { ResultType::Text };
    let mut q = QueryDescriptor::new(&args.text, result_type);
    q.start = args.start;
    q.size = args.size.unwrap_or(default_size);
    q.sort_type = args.sort;
    q.exact = args.exact;
    if args.sheets {
        // sheet filters are written as `<dimension>:<key>`
        for f in &args.filters {
            let (kind, key) = f.split_once(':').unwrap_or(("topics_en", f.as_str()));
            q.applied_filter_agg_types.push(kind.to_string());
            q.applied_filters.push(key.to_string());
        }
        q.aggregations_to_update = SHEET_AGGREGATIONS.iter().map(|a| (*a).to_string()).collect();
    } else {
        q.applied_filters = args.filters.clone();
        q.applied_filter_agg_types = vec![PATH_AGGREGATION.to_string(); args.filters.len()];
        if !q.is_continuation() {
            q.aggregations_to_update = vec![PATH_AGGREGATION.to_string()];
        }
    }
    q
}

fn snippet(hit: &Hit) -> Option<String> {
    let fragments = hit.highlight.as_ref()?.as_object()?.values().next()?.as_array()?;
    fragments.first()?.as_str().map(str::to_string)
}

fn print_hits(response: &SearchResponse, q: &QueryDescriptor) {
    println!("\n🔍 {} results for \"{}\" (showing from {})", response.hits.total, q.query, q.start);
    let hits = if q.result_type == ResultType::Text { collapse_versions(response.hits.hits.clone()) } else { response.hits.hits.clone() };
    for (i, hit) in hits.iter().enumerate() {
        let rank = if q.sort_type == SortType::Relevance { format!("score={:.4}", -hit.score) } else { format!("date={}", hit.comp_date) };
        let versions = if hit.duplicates.is_empty() { String::new() } else { format!("  (+{} versions)", hit.duplicates.len()) };
        println!("\n  {}. {}  [{}]  {}{}", q.start + i + 1, hit.reference(), hit.came_from, rank, versions);
        if let Some(text) = snippet(hit) {
            println!("     📝 {text}");
        }
    }
}

fn print_tree(nodes: &[FilterNode], depth: usize) {
    for node in nodes {
        let mark = if node.selected { "☑" } else if node.is_partially_selected() { "◩" } else { "☐" };
        println!("  {}{} {} / {} ({})", "  ".repeat(depth), mark, node.title, node.he_title, node.doc_count);
        print_tree(&node.children, depth + 1);
    }
}

fn print_sheet_facets(response: &SearchResponse, q: &QueryDescriptor) {
    let Some(aggregations) = &response.aggregations else { return };
    let terms = HashMap::new();
    for kind in SHEET_AGGREGATIONS {
        let buckets: &[FacetBucket] = aggregations.get(kind).map_or(&[], |a| a.buckets.as_slice());
        if buckets.is_empty() {
            continue;
        }
        println!("\n📊 {kind}:");
        print_tree(&build_sheet_filters(buckets, &q.applied_filters, &q.applied_filter_agg_types, kind, &terms), 0);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.first().map(String::as_str) != Some("query") || args.len() < 2 {
        usage(&prog);
    }
    let parsed = parse_query_args(&args[1..])?;

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let search = HttpFederatedSearch::from_config(&config, Path::new("."))?;
    let q = descriptor(&parsed, search.settings().default_size);
    debug!(query = %q.query, start = q.start, size = q.size, filters = ?q.applied_filters, "dispatching");

    let Some(response) = search.execute_query(&q).await? else {
        println!("Nothing to search for.");
        return Ok(());
    };
    print_hits(&response, &q);

    if q.result_type == ResultType::Sheet {
        print_sheet_facets(&response, &q);
    } else if q.wants_aggregations() {
        let filters = search.text_filters(response.path_buckets(), &q.applied_filters);
        println!("\n📊 Filters:");
        print_tree(&filters.tree.available, 0);
        for orphan in &filters.orphans {
            println!("  ⚠️  {orphan} (applied, no matching results)");
        }
    }
    if !search.secondary_enabled() {
        println!("\nℹ️  Hebrew corpus search unavailable; showing primary results only.");
    }
    Ok(())
}
