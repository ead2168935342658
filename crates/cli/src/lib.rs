use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use treegpt_conversation::load_archive;
use treegpt_graph::write_graph;
use treegpt_pipeline::{Pipeline, PipelineConfig, RunStats};
use treegpt_vector_store::{current_model_id, paths, EmbeddingMode, EmbeddingModel, VectorStore};

#[derive(Parser)]
#[command(name = "treegpt")]
#[command(about = "Turn a chat export into a clustered 3-D map of replies", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pipeline settings (TOML); flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override embedding backend (TREEGPT_EMBEDDING_MODE)
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Override embedding model id (TREEGPT_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Model cache directory (overrides TREEGPT_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Token budget before a context/reply pair is chunked
    #[arg(long, global = true)]
    max_tokens: Option<usize>,

    /// Only process the first N conversations of the archive
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Replies embedded at once (overrides TREEGPT_EMBED_CONCURRENCY)
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Linearize the archive and embed every assistant reply
    Prepare(PrepareArgs),

    /// Project and cluster prepared vectors into graph nodes
    Cluster(ClusterArgs),

    /// Prepare and cluster in a single run
    Build(BuildArgs),
}

#[derive(Args)]
struct PrepareArgs {
    /// conversations.json export [default: ~/.treegpt/unzipped/conversations.json]
    #[arg(long)]
    input: Option<PathBuf>,

    /// Prepared vectors [default: ~/.treegpt/graphs/prepared_messages.json]
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ClusterArgs {
    /// Prepared vectors [default: ~/.treegpt/graphs/prepared_messages.json]
    #[arg(long)]
    input: Option<PathBuf>,

    /// Graph nodes [default: ~/.treegpt/graphs/graph_data.json]
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct BuildArgs {
    /// conversations.json export [default: ~/.treegpt/unzipped/conversations.json]
    #[arg(long)]
    input: Option<PathBuf>,

    /// Graph nodes [default: ~/.treegpt/graphs/graph_data.json]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also keep the prepared vectors at this path
    #[arg(long)]
    vectors: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbedMode {
    Fast,
    Stub,
}

impl From<EmbedMode> for EmbeddingMode {
    fn from(mode: EmbedMode) -> Self {
        match mode {
            EmbedMode::Fast => Self::Fast,
            EmbedMode::Stub => Self::Stub,
        }
    }
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let pipeline = Pipeline::new(config).context("Invalid pipeline configuration")?;
    let started = Instant::now();

    let mut stats = RunStats::new();
    match &cli.command {
        Commands::Prepare(args) => run_prepare(&cli, &pipeline, args, &mut stats).await?,
        Commands::Cluster(args) => run_cluster(&pipeline, args, &mut stats).await?,
        Commands::Build(args) => run_build(&cli, &pipeline, args, &mut stats).await?,
    }

    stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if stats.failures() > 0 {
        log::warn!("{} replies could not be embedded", stats.failures());
    }
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ort logs every session option at info
    if !verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Defaults, then the config file, then flags.
fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(max_tokens) = cli.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(limit) = cli.limit {
        config.conversation_limit = Some(limit);
    }
    if let Some(concurrency) = cli.concurrency {
        config.embed_concurrency = Some(concurrency);
    }
    Ok(config)
}

async fn run_prepare(
    cli: &Cli,
    pipeline: &Pipeline,
    args: &PrepareArgs,
    stats: &mut RunStats,
) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(paths::default_archive_path);
    let output = args.output.clone().unwrap_or_else(paths::default_vectors_path);

    let vectors = prepare(cli, pipeline, &input, stats).await?;
    save_vectors(&vectors, &output).await
}

async fn run_cluster(pipeline: &Pipeline, args: &ClusterArgs, stats: &mut RunStats) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(paths::default_vectors_path);
    let output = args.output.clone().unwrap_or_else(paths::default_graph_path);

    let vectors = VectorStore::load(&input)
        .await
        .with_context(|| format!("Failed to load vectors {}", input.display()))?;
    cluster(pipeline, &vectors, &output, stats).await
}

async fn run_build(
    cli: &Cli,
    pipeline: &Pipeline,
    args: &BuildArgs,
    stats: &mut RunStats,
) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(paths::default_archive_path);
    let output = args.output.clone().unwrap_or_else(paths::default_graph_path);

    let vectors = prepare(cli, pipeline, &input, stats).await?;
    if let Some(path) = &args.vectors {
        save_vectors(&vectors, path).await?;
    }
    cluster(pipeline, &vectors, &output, stats).await
}

async fn prepare(
    cli: &Cli,
    pipeline: &Pipeline,
    input: &Path,
    stats: &mut RunStats,
) -> Result<VectorStore> {
    let conversations = load_archive(input)
        .await
        .with_context(|| format!("Failed to load archive {}", input.display()))?;
    let (messages, ingest) = pipeline.ingest(&conversations);
    stats.ingest = Some(ingest);

    let embedder = load_embedder(cli).await?;
    let counter = embedder
        .token_counter()
        .context("Failed to build token counter")?;
    let (vectors, embed) = pipeline.embed(&messages, Arc::new(embedder), counter).await?;
    stats.embed = Some(embed);
    Ok(vectors)
}

async fn cluster(
    pipeline: &Pipeline,
    vectors: &VectorStore,
    output: &Path,
    stats: &mut RunStats,
) -> Result<()> {
    let projector = pipeline.config().clustering.projector()?;
    let (nodes, graph) = pipeline.assemble(vectors, &projector)?;
    write_graph(output, &nodes)
        .await
        .with_context(|| format!("Failed to write graph {}", output.display()))?;
    stats.graph = Some(graph);
    Ok(())
}

async fn save_vectors(vectors: &VectorStore, path: &Path) -> Result<()> {
    vectors
        .save(path)
        .await
        .with_context(|| format!("Failed to write vectors {}", path.display()))
}

async fn load_embedder(cli: &Cli) -> Result<EmbeddingModel> {
    let mode = match cli.embed_mode {
        Some(mode) => mode.into(),
        None => EmbeddingMode::from_env()?,
    };
    let model_id = cli.embed_model.clone().unwrap_or_else(current_model_id);
    let model_dir = cli.model_dir.clone().unwrap_or_else(paths::model_dir);
    log::info!("Embedding with '{model_id}' ({} mode)", mode.as_str());

    // Session creation reads and optimizes the whole model file.
    tokio::task::spawn_blocking(move || EmbeddingModel::with_options(mode, &model_id, &model_dir))
        .await
        .context("Embedding model loader panicked")?
        .context("Failed to load embedding model")
}
