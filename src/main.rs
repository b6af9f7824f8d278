use anyhow::{bail, Context, Result};
use quire::{
    api::routes::app,
    cli::{
        init::{self, InitConfig, InitResult},
        output::{Output, Tone},
        Cli, Commands,
    },
    rag::{chunker::TextChunker, indexer::Indexer},
    utils::toml_config::{LogFormat, QuireConfig, ServerConfig},
    AppState,
};
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.line(Tone::Fail, &format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    match cli.command {
        Some(Commands::Init { path, force }) => match init::run(InitConfig { path, force }, output) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => bail!("init failed: {}", e),
        },
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, output),
        Some(Commands::Index) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.server, cli.verbose);
            build_index(&config, output).await
        }
        None | Some(Commands::Serve) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.server, cli.verbose);
            serve(config, output).await
        }
    }
}

fn load_config(path: &Path) -> Result<QuireConfig> {
    QuireConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn init_tracing(server: &ServerConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { server.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    match server.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

fn show_config(path: &Path, validate: bool, output: &Output) -> Result<()> {
    let config = QuireConfig::load_unvalidated(path)
        .with_context(|| format!("loading {}", path.display()))?;

    output.heading(&format!("Configuration ({})", path.display()));
    output.toml(&toml::to_string_pretty(&config)?);

    if validate {
        output.blank();
        config.validate()?;
        for env in config.referenced_env_vars() {
            output.field("credential", &format!("{} (set)", env));
        }
        output.line(Tone::Ok, "configuration is valid");
    }
    Ok(())
}

async fn build_index(config: &QuireConfig, output: &Output) -> Result<()> {
    output.line(Tone::Note, "preparing embedder");
    let embedder = config.embedder_provider()?.create_embedder()?;
    let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    let indexer = Indexer::new(chunker, embedder, config.build_options());

    output.line(
        Tone::Note,
        &format!("indexing {}", config.rag.document_path.display()),
    );
    let report = indexer
        .run(&config.rag.document_path, &config.rag.index_path)
        .await
        .context("index build failed; any existing index was left untouched")?;

    output.index_report(&report);
    Ok(())
}

async fn serve(config: QuireConfig, output: &Output) -> Result<()> {
    output.banner();

    let state = AppState::from_config(&config).await?;
    if !state.index.is_ready() {
        output.line(
            Tone::Warn,
            "no usable index; /api/chat will answer 500 until one is built",
        );
        output.shell("quire-server index");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    output.line(Tone::Ok, &format!("listening on http://{}", addr));
    tracing::info!(%addr, "Server started");

    axum::serve(listener, app(state, config.server.max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
