mod pidfile;
mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use loom_core::{
    Category, ClusterEngine, ClusterRequest, ClusterSummary, Record, RecordFilter, RelationGraph,
    Strategy, export_records, now_iso8601, now_unix_secs, parse_records,
};
use loom_store::store::{LAST_INGEST_KEY, SCHEMA_VERSION_KEY};
use loom_store::{Config, Store};
use rmcp::{ServiceExt, transport::stdio};

#[derive(Parser)]
#[command(name = "loom", about = "Relationship graph and clustering for tagged memories")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Narrowing shared by every read command.
#[derive(Args, Clone, Debug, Default)]
struct FilterArgs {
    /// Only records carrying this tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Case-insensitive substring over content and tags
    #[arg(long)]
    search: Option<String>,

    /// Only records in this project
    #[arg(long)]
    project: Option<String>,

    /// Only records in this category ("uncategorized" for none)
    #[arg(long)]
    category: Option<String>,

    /// Maximum number of records to consider
    #[arg(long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            tags: self.tags.clone(),
            search: self.search.clone(),
            project: self.project.clone(),
            category: self.category.clone(),
            limit: self.limit,
        }
    }

    /// Filter with the limit bounded by `max_records`.
    fn capped(&self, max_records: usize) -> RecordFilter {
        let mut filter = self.to_filter();
        filter.limit = Some(filter.limit.map_or(max_records, |l| l.min(max_records)));
        filter
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Store a new record stamped with the current time
    Add {
        /// Record text
        content: String,

        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// One of: personal, work, code, research, conversations, preferences
        #[arg(long)]
        category: Option<Category>,

        /// Project label
        #[arg(long)]
        project: Option<String>,
    },

    /// Import records from JSON files (bare array or export envelope)
    Ingest {
        /// File path(s) to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List records, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Build the tag-overlap relationship graph
    Graph {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print the full graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Group records into clusters
    Cluster {
        /// category, tag, temporal, content, smart, or project
        #[arg(long)]
        strategy: Option<Strategy>,

        /// Smallest cluster to keep (1-10)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        min_size: Option<u8>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print clusters and summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show store statistics
    Stats,

    /// Export all records to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },
}

fn data_dir() -> PathBuf {
    std::env::var("LOOM_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(loom_store::default_base_dir)
}

fn open_store() -> Result<Store> {
    let base = data_dir();
    std::fs::create_dir_all(&base)
        .with_context(|| format!("failed to create {}", base.display()))?;
    Store::open(&loom_store::db_path(&base)).context("failed to open record store")
}

fn load_config() -> Result<Config> {
    Config::load(&data_dir()).context("failed to load config")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve().await,
        Commands::Add {
            content,
            tags,
            category,
            project,
        } => cmd_add(content, tags, *category, project.as_deref()),
        Commands::Ingest { files } => cmd_ingest(files),
        Commands::List { filter } => cmd_list(filter),
        Commands::Graph { filter, json } => cmd_graph(filter, *json),
        Commands::Cluster {
            strategy,
            min_size,
            filter,
            json,
        } => cmd_cluster(*strategy, min_size.map(usize::from), filter, *json),
        Commands::Stats => cmd_stats(),
        Commands::Export { path } => cmd_export(path),
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn cmd_serve() -> Result<()> {
    let store = open_store()?;
    let config = load_config()?;
    tracing::info!("starting MCP server on {}", data_dir().display());

    let pidfile = pidfile::ServePidfile::claim(&data_dir());

    let server = server::LoomServer::new(store, config);
    let service = server
        .clone()
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;

    tokio::select! {
        result = service.waiting() => {
            result.context("MCP server terminated abnormally")?;
            tracing::info!("stdin closed, shutting down");
        }
        _ = shutdown_signal() => {
            tracing::info!("signal received, shutting down");
        }
    }

    server.checkpoint_wal().await;
    drop(pidfile);
    Ok(())
}

fn cmd_add(
    content: &str,
    tags: &[String],
    category: Option<Category>,
    project: Option<&str>,
) -> Result<()> {
    let store = open_store()?;
    let record = new_record(content, tags, category, project);
    store
        .upsert_record(&record)
        .context("failed to store record")?;
    println!("added {}", record.id);
    Ok(())
}

/// A fresh record with a v4 id, stamped now.
pub(crate) fn new_record(
    content: &str,
    tags: &[String],
    category: Option<Category>,
    project: Option<&str>,
) -> Record {
    let mut record = Record::new(uuid::Uuid::new_v4().to_string(), content)
        .with_tags(tags.iter().cloned())
        .with_timestamp(now_iso8601());
    record.category = category;
    record.project = project
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);
    record
}

fn cmd_ingest(files: &[PathBuf]) -> Result<()> {
    let store = open_store()?;
    let mut total = 0;

    for path in files {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let records = parse_records(&json)
            .with_context(|| format!("failed to parse records from {}", path.display()))?;
        let stored = store
            .upsert_records(&records)
            .with_context(|| format!("failed to store records from {}", path.display()))?;
        println!("ingested {} → {stored} records", path.display());
        total += stored;
    }

    store
        .set_metadata(LAST_INGEST_KEY, &now_iso8601())
        .context("failed to record ingest time")?;
    println!("done. ingested={total}, total={}", store.count()?);
    Ok(())
}

fn cmd_list(filter: &FilterArgs) -> Result<()> {
    let store = open_store()?;
    let records = store
        .load_records(&filter.to_filter())
        .context("failed to load records")?;

    if records.is_empty() {
        println!("(no records)");
        return Ok(());
    }
    for record in &records {
        let tags: Vec<String> = record
            .relation_tags()
            .iter()
            .map(|t| format!("#{t}"))
            .collect();
        println!(
            "{}  {}  [{}]  {}  {}",
            record.id,
            record.timestamp,
            record.category_key(),
            record.label(),
            tags.join(" ")
        );
    }
    Ok(())
}

fn cmd_graph(filter: &FilterArgs, json: bool) -> Result<()> {
    let store = open_store()?;
    let config = load_config()?;
    let records = store
        .load_records(&filter.capped(config.graph.max_records))
        .context("failed to load records")?;

    let graph = RelationGraph::build(&records);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&graph).context("failed to serialize graph")?
        );
        return Ok(());
    }

    let stats = graph.stats();
    println!("nodes:      {}", stats.nodes);
    println!("edges:      {}", stats.edges);
    println!("isolated:   {}", stats.isolated);
    println!("density:    {:.3}", stats.density);
    println!("mean:       {:.3}", stats.mean_weight);
    for edge in graph.strongest_edges(10) {
        println!(
            "  {} -- {}  weight={:.2} shared={}",
            edge.source, edge.target, edge.weight, edge.shared_tags
        );
    }
    Ok(())
}

fn cmd_cluster(
    strategy: Option<Strategy>,
    min_size: Option<usize>,
    filter: &FilterArgs,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let config = load_config()?;
    let records = store
        .load_records(&filter.capped(config.graph.max_records))
        .context("failed to load records")?;

    let request = ClusterRequest::new(strategy.unwrap_or(config.clustering.strategy))
        .with_min_size(min_size.unwrap_or(config.clustering.min_cluster_size))
        .with_now(now_unix_secs());
    let clusters = ClusterEngine::cluster(&records, &request);
    let summary = ClusterSummary::compute(&records, &clusters);
    tracing::debug!(
        "{} clusters from {} records ({})",
        clusters.len(),
        records.len(),
        request.strategy
    );

    if json {
        let out = serde_json::json!({
            "strategy": request.strategy,
            "clusters": clusters,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if clusters.is_empty() {
        println!("(no clusters)");
    }
    for cluster in &clusters {
        println!(
            "{} ({})  strength={:.2}  keywords: {}",
            cluster.name,
            cluster.len(),
            cluster.strength,
            cluster.keywords.join(", ")
        );
        for member in &cluster.members {
            println!("  {member}");
        }
    }
    println!(
        "done. strategy={}, clusters={}, coverage={:.0}%",
        request.strategy,
        summary.clusters,
        summary.coverage * 100.0
    );
    Ok(())
}

fn cmd_stats() -> Result<()> {
    let store = open_store()?;
    let count = store.count().context("failed to count records")?;
    let tags = store.tag_counts().context("failed to count tags")?;
    let projects = store
        .project_counts()
        .context("failed to count projects")?;
    let db_size = store.db_size().context("failed to read db size")?;
    let schema = store
        .get_metadata(SCHEMA_VERSION_KEY)
        .context("failed to read schema version")?;
    let last_ingest = store
        .get_metadata(LAST_INGEST_KEY)
        .context("failed to read last ingest time")?;

    println!("records:    {count}");
    println!("tags:       {}", tags.len());
    println!("projects:   {}", projects.len());
    println!("db_size:    {:.1}MB", db_size as f64 / (1024.0 * 1024.0));
    println!("schema:     {}", schema.as_deref().unwrap_or("unknown"));
    println!("ingested:   {}", last_ingest.as_deref().unwrap_or("never"));
    for (tag, n) in tags.iter().take(10) {
        println!("  #{tag}: {n}");
    }
    for (project, n) in &projects {
        println!("  {project}: {n}");
    }
    Ok(())
}

fn cmd_export(path: &Path) -> Result<()> {
    let store = open_store()?;
    let records = store.load_all().context("failed to load records")?;

    let json = export_records(&records).context("failed to serialize records")?;
    std::fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    println!("exported {} records to {}", records.len(), path.display());
    Ok(())
}
