use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use patent_search::config::{
    default_config_path, find_config_file, load_config, write_default_config, Config,
};
use patent_search::models::{
    DateRange, ImageQuery, ImageRecord, Query, ResultKind, SearchFilters, SearchOutcome,
    SearchResult,
};
use patent_search::providers::mock::make_record;
use patent_search::providers::{
    HttpImageProvider, HttpTextProvider, MockProvider, MockResponse, SearchProvider,
};
use patent_search::search::{Dispatcher, SearchSession, SessionState, SessionView, Settlement};
use patent_search::utils::{
    format_plain, history_table, results_table, terminal_width, HttpClient, SavedSearch,
    SearchHistory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Patent Search - debounced patent and trademark search by text or image
#[derive(Parser, Debug)]
#[command(name = "patent-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search patent and trademark records by text or by image", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-search timeout in seconds (overrides search.timeout_secs)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Use built-in sample data instead of the configured endpoints
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

/// Filters shared by text searches
#[derive(clap::Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Record type to search
    #[arg(long, short = 't', default_value_t = ResultKind::Patent)]
    kind: ResultKind,

    /// Jurisdiction code (e.g. US, EP, IN)
    #[arg(long, short = 'j')]
    jurisdiction: Option<String>,

    /// Category or class
    #[arg(long)]
    category: Option<String>,

    /// Legal status (e.g. active, expired)
    #[arg(long)]
    status: Option<String>,

    /// Earliest date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Latest date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Maximum number of results (defaults to search.max_results)
    #[arg(long, short = 'n')]
    limit: Option<usize>,
}

impl FilterArgs {
    fn filters(&self) -> Result<SearchFilters> {
        let range = DateRange::new(self.from.as_deref(), self.to.as_deref())?;
        let mut filters = SearchFilters::new().date_range(range);
        if let Some(ref code) = self.jurisdiction {
            filters = filters.jurisdiction(code);
        }
        if let Some(ref category) = self.category {
            filters = filters.category(category);
        }
        if let Some(ref status) = self.status {
            filters = filters.status(status);
        }
        Ok(filters)
    }

    fn template(&self, config: &Config) -> Result<Query> {
        Ok(Query::default()
            .kind(self.kind)
            .filters(self.filters()?)
            .max_results(self.limit.unwrap_or(config.search.max_results)))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full-text search
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Save this search to history
        #[arg(long)]
        save: bool,
    },

    /// Find records with a similar image (JPEG, PNG or GIF up to 10 MiB)
    #[command(alias = "img")]
    Image {
        /// Image file
        path: PathBuf,

        /// Save this search to history
        #[arg(long)]
        save: bool,
    },

    /// Search as you type: each stdin line replaces the search box contents
    #[command(alias = "i")]
    Interactive {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show saved searches
    #[command(alias = "h")]
    History {
        /// Number of entries to show
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,

        /// Delete all saved searches
        #[arg(long)]
        clear: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref())
        .with_context(|| match config_path {
            Some(ref path) => format!("loading {}", path.display()),
            None => "loading configuration from environment".to_string(),
        })?;
    if let Some(secs) = cli.timeout {
        config.search.timeout_secs = secs.max(1);
    }

    init_tracing(&cli, &config);
    if let Some(ref path) = config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();

    match cli.command {
        Commands::Search {
            ref query,
            ref filters,
            save,
        } => {
            let query = Query {
                text: query.clone(),
                ..filters.template(&config)?
            };
            query.validate(config.search.min_query_len)?;

            let dispatcher = dispatcher(text_provider(&config, cli.demo)?, &config);
            let tagged = dispatcher
                .submit(query.clone())
                .await
                .context("search was superseded")?;
            let results = settled_results(tagged.outcome, cli.quiet)?;
            output_results(&results, format);

            if save {
                save_search(
                    &config,
                    SavedSearch::text(&query.text, query.kind, query.filters, results.len()),
                )?;
            }
        }
        Commands::Image { ref path, save } => {
            let image = read_image(path).await?;
            let file_name = image.file_name().to_string();

            let dispatcher = dispatcher(image_provider(&config, cli.demo)?, &config);
            let tagged = dispatcher
                .submit(image)
                .await
                .context("search was superseded")?;
            let results = settled_results(tagged.outcome, cli.quiet)?;
            output_results(&results, format);

            if save {
                save_search(&config, SavedSearch::image(&file_name, results.len()))?;
            }
        }
        Commands::Interactive { ref filters } => {
            let template = filters.template(&config)?;
            let provider = text_provider(&config, cli.demo)?;
            run_interactive(provider, &config, template, format, cli.quiet).await?;
        }
        Commands::History { limit, clear } => {
            let history = SearchHistory::new(config.history.resolved_path());
            if clear {
                history.clear()?;
                if !cli.quiet {
                    eprintln!("Cleared {}", history.path().display());
                }
            } else {
                let entries = history.recent(limit)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                    OutputFormat::Plain => {
                        for entry in &entries {
                            println!(
                                "{}\t{}\t{}\t{}",
                                entry.saved_at.to_rfc3339(),
                                entry.kind,
                                entry.result_count,
                                entry.query
                            );
                        }
                    }
                    _ => println!("{}", history_table(&entries)),
                }
            }
        }
        Commands::Config { ref command } => match command {
            ConfigCommands::Init { force } => {
                let path = match cli.config {
                    Some(ref path) => path.clone(),
                    None => default_config_path()
                        .context("no config directory on this platform, pass --config")?,
                };
                write_default_config(&path, *force)?;
                if !cli.quiet {
                    eprintln!("Wrote {}", path.display());
                }
            }
            ConfigCommands::Show => match format {
                OutputFormat::Json => {
                    let mut shown = config.clone();
                    if shown.providers.api_key.is_some() {
                        shown.providers.api_key = Some("********".to_string());
                    }
                    println!("{}", serde_json::to_string_pretty(&shown)?);
                }
                _ => print!("{}", config.to_toml()?),
            },
        },
    }

    Ok(())
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("patent_search={}", level)),
    );
    let json = config.logging.is_json();

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn dispatcher(provider: Arc<dyn SearchProvider>, config: &Config) -> Dispatcher<dyn SearchProvider> {
    Dispatcher::new(provider)
        .with_timeout(config.search.timeout())
        .with_min_query_len(config.search.min_query_len)
}

fn text_provider(config: &Config, demo: bool) -> Result<Arc<dyn SearchProvider>> {
    if demo {
        return Ok(demo_provider());
    }
    let Some(endpoint) = config.providers.text_url()? else {
        bail!(
            "no text search endpoint configured; set providers.text_endpoint \
             (or PATENT_SEARCH_PROVIDERS__TEXT_ENDPOINT), or pass --demo"
        );
    };
    let provider = HttpTextProvider::new(HttpClient::new()?, endpoint)
        .with_api_key(config.providers.api_key.clone());
    Ok(Arc::new(provider))
}

fn image_provider(config: &Config, demo: bool) -> Result<Arc<dyn SearchProvider>> {
    if demo {
        return Ok(demo_provider());
    }
    let Some(endpoint) = config.providers.image_url()? else {
        bail!(
            "no image search endpoint configured; set providers.image_endpoint \
             (or PATENT_SEARCH_PROVIDERS__IMAGE_ENDPOINT), or pass --demo"
        );
    };
    let provider = HttpImageProvider::new(HttpClient::new()?, endpoint)
        .with_api_key(config.providers.api_key.clone());
    Ok(Arc::new(provider))
}

/// Sample records answering every query, with a little latency
fn demo_provider() -> Arc<dyn SearchProvider> {
    let provider = MockProvider::new();
    provider.set_default_response(
        MockResponse::records(vec![
            make_record("1001", "Adjustable solar panel mounting frame"),
            make_record("1002", "Thin-film photovoltaic cell with textured substrate"),
            make_record("1003", "Tracking system for rooftop solar arrays"),
        ])
        .delay(Duration::from_millis(150)),
    );

    let mut logo = ImageRecord::new("2001", 0.93);
    logo.title = Some("Stylised sun mark".to_string());
    logo.number = Some("TM2001".to_string());
    logo.kind = Some("trademark".to_string());
    let mut leaf = ImageRecord::new("2002", 0.71);
    leaf.title = Some("Leaf and circle device".to_string());
    leaf.number = Some("TM2002".to_string());
    leaf.kind = Some("trademark".to_string());
    provider.set_image_response(
        MockResponse::records(vec![logo.into(), leaf.into()]).delay(Duration::from_millis(300)),
    );

    Arc::new(provider)
}

async fn read_image(path: &Path) -> Result<ImageQuery> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(ImageQuery::new(bytes, file_name)?)
}

/// Results of a settled search, or the user-facing failure message
fn settled_results(outcome: SearchOutcome, quiet: bool) -> Result<Vec<SearchResult>> {
    match outcome {
        SearchOutcome::Success(results) => {
            if !quiet {
                eprintln!("Found {} results", results.len());
            }
            Ok(results)
        }
        SearchOutcome::Failure(failure) => bail!("{}", failure.message),
    }
}

fn save_search(config: &Config, entry: SavedSearch) -> Result<()> {
    if !config.history.enabled {
        tracing::info!("History is disabled, not saving search");
        return Ok(());
    }
    SearchHistory::new(config.history.resolved_path()).record(&entry)?;
    Ok(())
}

fn output_results(results: &[SearchResult], format: OutputFormat) {
    match format.resolve() {
        OutputFormat::Json => match serde_json::to_string_pretty(results) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to encode results: {}", e),
        },
        OutputFormat::Plain => {
            for result in results {
                println!("{}\n", format_plain(result));
            }
        }
        _ => {
            if !results.is_empty() {
                println!("{}", results_table(results, terminal_width()));
            }
        }
    }
}

async fn run_interactive(
    provider: Arc<dyn SearchProvider>,
    config: &Config,
    template: Query,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let (session, mut notifications) = SearchSession::new(dispatcher(provider, config));
    session.set_kind(template.kind);
    session.set_filters(template.filters);
    session.set_max_results(template.max_results);

    let mut view = session.subscribe();
    let renderer = tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let current = view.borrow_and_update().clone();
            render_view(&current, format, quiet);
        }
    });
    let notifier = tokio::spawn(async move {
        while let Some(note) = notifications.recv().await {
            if std::io::stderr().is_terminal() {
                eprintln!("{}", note.message.red());
            } else {
                eprintln!("{}", note.message);
            }
        }
    });

    if !quiet {
        eprintln!("Type to search, one edit per line. Ctrl-D to finish.");
    }

    let mut input = session.attach_input(config.search.debounce());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => input.input(line),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                drop(input);
                renderer.abort();
                notifier.abort();
                return Ok(());
            }
        }
    }

    // let the last edit commit and its search settle before tearing down
    let deadline = config.search.timeout() + Duration::from_secs(1);
    tokio::time::sleep(config.search.debounce() + Duration::from_millis(100)).await;
    wait_settled(session.subscribe(), deadline).await;

    drop(input);
    drop(session);
    renderer.abort();
    notifier.abort();
    Ok(())
}

async fn wait_settled(mut view: watch::Receiver<SessionView>, limit: Duration) {
    let settled = view.wait_for(|v| !matches!(v.state, SessionState::Pending { .. }));
    if tokio::time::timeout(limit, settled).await.is_err() {
        tracing::warn!("Gave up waiting for the last search after {:?}", limit);
    }
}

fn render_view(view: &SessionView, format: OutputFormat, quiet: bool) {
    match view.state {
        SessionState::Idle => {
            if !quiet {
                eprintln!("(cleared)");
            }
        }
        SessionState::Pending { generation } => {
            if !quiet {
                eprintln!("searching... {}", generation);
            }
        }
        SessionState::Settled {
            generation,
            settlement: Settlement::Success,
        } => {
            if !quiet {
                eprintln!("{} {} results", generation, view.results.len());
            }
            output_results(&view.results, format);
        }
        // the notification task reports failures
        SessionState::Settled {
            settlement: Settlement::Failure,
            ..
        } => {}
    }
}
