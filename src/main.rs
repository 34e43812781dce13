use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snippet_transcript::{Chunker, Config, HostPage, StaticPage, TranscriptRequest, TranscriptSegment, TranscriptService};

fn cli() -> Command {
    let command = Command::new("snippet-transcript")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Capture video transcripts and fold them into readable chunks")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to the standard search paths)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("capture")
                .about("Capture the transcript of a video")
                .arg(
                    Arg::new("video")
                        .value_name("VIDEO")
                        .help("Video id or watch URL")
                        .required(true),
                )
                .arg(
                    Arg::new("no-timestamp")
                        .long("no-timestamp")
                        .help("Omit (MM:SS) prefixes from the transcript text")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("fallback")
                        .long("fallback")
                        .help("Allow the rendered transcript panel as a fallback")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the full result as JSON")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("page-snapshot")
                        .long("page-snapshot")
                        .value_name("FILE")
                        .help("Saved rendered page used for visibility checks and panel scraping"),
                )
                .arg(
                    Arg::new("relay-endpoint")
                        .long("relay-endpoint")
                        .value_name("URL")
                        .help("Endpoint of the transcript relay"),
                ),
        )
        .subcommand(
            Command::new("chunk")
                .about("Chunk a JSON array of transcript segments")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("JSON file with [{\"start\": 0, \"text\": \"...\"}, ...]")
                        .required(true),
                ),
        );

    #[cfg(feature = "api")]
    let command = command.subcommand(
        Command::new("serve").about("Serve the transcript API over HTTP").arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to listen on")
                .default_value("8080"),
        ),
    );

    command
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let (config, source) = load_config(matches.get_one::<String>("config"))?;
    init_logging(&config, verbose);

    info!("🚀 Snippet Transcript starting...");
    info!("📄 Configuration: {}", source);
    if verbose {
        info!("Verbose logging enabled");
    }
    config.validate()?;

    match matches.subcommand() {
        Some(("capture", sub)) => capture(config, sub).await,
        Some(("chunk", sub)) => chunk(&config, sub).await,
        #[cfg(feature = "api")]
        Some(("serve", sub)) => serve(config, sub).await,
        Some((other, _)) => Err(anyhow!("Unknown command: {}", other)),
        None => Err(anyhow!("No command given")),
    }
}

fn load_config(path: Option<&String>) -> Result<(Config, String)> {
    if let Some(path) = path {
        let config = Config::load_from(&PathBuf::from(path))?;
        return Ok((config, path.clone()));
    }

    match Config::load() {
        Ok(config) => Ok((config, "config file".to_string())),
        Err(_) => Ok((Config::from_env(), "defaults".to_string())),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.output.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snippet_transcript={},warn", level)));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn capture(mut config: Config, matches: &ArgMatches) -> Result<()> {
    let video = matches
        .get_one::<String>("video")
        .ok_or_else(|| anyhow!("VIDEO is required"))?;

    if let Some(endpoint) = matches.get_one::<String>("relay-endpoint") {
        config.relay.endpoint = Some(endpoint.clone());
    }

    let page: Arc<dyn HostPage> = match matches.get_one::<String>("page-snapshot") {
        Some(path) => {
            let markup = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Cannot read page snapshot {}", path))?;
            info!("🗂️  Using page snapshot: {}", path);
            Arc::new(StaticPage::new(markup))
        }
        None => Arc::new(StaticPage::empty()),
    };

    let with_timestamp = config.output.with_timestamp && !matches.get_flag("no-timestamp");
    let request = TranscriptRequest::new(video.clone())
        .with_timestamp(with_timestamp)
        .with_fallback(matches.get_flag("fallback"));

    let service = TranscriptService::from_config(&config, page);
    let start_time = std::time::Instant::now();
    let result = service.get_transcript(&request).await;
    info!("⏱️  Capture finished in {:.2}s", start_time.elapsed().as_secs_f64());

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_empty() {
        warn!("No transcript available for {}", video);
        return Err(anyhow!("No transcript available for {}", video));
    }

    info!("🎞️  {} [{}]", result.title, result.language);
    println!("{}", result.text);
    Ok(())
}

async fn chunk(config: &Config, matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("file")
        .ok_or_else(|| anyhow!("FILE is required"))?;

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read segments file {}", path))?;
    let segments: Vec<TranscriptSegment> =
        serde_json::from_str(&content).with_context(|| format!("Invalid segments JSON in {}", path))?;

    let chunks = Chunker::new(config.chunking).chunk(&segments);
    info!("🧩 {} segments folded into {} chunks", segments.len(), chunks.len());
    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

#[cfg(feature = "api")]
async fn serve(config: Config, matches: &ArgMatches) -> Result<()> {
    use snippet_transcript::api::ApiServer;
    use snippet_transcript::ConnectionManager;

    let port: u16 = matches
        .get_one::<String>("port")
        .map(|p| p.parse())
        .transpose()
        .context("Invalid port")?
        .unwrap_or(8080);

    // Keep the manager alive for the lifetime of the server
    let notifications = ConnectionManager::from_config(&config.notifications);
    if let Some(manager) = &notifications {
        let mut receiver = manager.subscribe();
        manager.connect();
        tokio::spawn(async move {
            while let Ok(notification) = receiver.recv().await {
                info!("🔔 Notification: {}", notification.data);
            }
        });
    }

    let config = Arc::new(config);
    let service = Arc::new(TranscriptService::from_config(&config, Arc::new(StaticPage::empty())));
    let result = ApiServer::new(service, config, port).start().await;

    if let Some(manager) = &notifications {
        manager.disconnect();
    }
    result
}
