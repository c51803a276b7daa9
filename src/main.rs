use anyhow::{Context, bail};
use clap::Parser;
use clipfetch::youtube::utils::build_watch_url;
use clipfetch::{
    AcquisitionSession, AcquisitionState, AssetSelector, Config, DownloadGate, LocalFile,
    SessionUpdate, VideoMeta,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "clipfetch",
    about = "Look up and download a video from a pasted link",
    long_about = "Resolve a YouTube link through the media backend and save the video locally.\n\
    Local video files are handed over as-is.\n\n\
    Examples:\n\
      clipfetch https://youtu.be/dQw4w9WgXcQ                  # Look up and download\n\
      clipfetch -i \"watch this https://youtu.be/dQw4w9WgXcQ\"  # Show info only\n\
      clipfetch -d ./videos https://youtu.be/dQw4w9WgXcQ      # Download to directory\n\
      clipfetch ./holiday.mp4                                 # Use a local file\n\
      clipfetch --interactive                                 # Each stdin line edits the input"
)]
struct Args {
    /// Link, pasted text or local video file
    #[arg(help = "Link, pasted text containing a link, or a local video file")]
    input: Vec<String>,

    #[arg(short = 'd', long = "dir", help = "Download to specified directory")]
    output_dir: Option<PathBuf>,

    #[arg(long = "api-base-url", help = "Base URL of the media backend")]
    api_base_url: Option<String>,

    #[arg(long = "debounce-ms", help = "Quiet time before an edit is looked up")]
    debounce_ms: Option<u64>,

    #[arg(long = "timeout", help = "Request timeout in seconds")]
    timeout_secs: Option<u64>,

    #[arg(
        short = 'i',
        long = "info-only",
        help = "Look up and show information only, no download"
    )]
    info_only: bool,

    #[arg(
        long = "interactive",
        help = "Read edits from stdin (:download, :paste <text>, :clear, :quit)"
    )]
    interactive: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(base) = &self.api_base_url {
            config.api_base_url = base.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Local files are only announced; processing them is somebody else's job.
struct AnnounceSelector;

impl AssetSelector for AnnounceSelector {
    fn select(&self, file: LocalFile) {
        println!("✓ Selected local file: {} ({})", file.file_name(), file.mime);
        println!("    Path: {}", file.path.display());
    }
}

fn display_meta(meta: &VideoMeta) {
    println!("{}", meta.title);
    if !meta.channel_title.is_empty() {
        println!("    Channel: {}", meta.channel_title);
    }
    if !meta.duration_display.is_empty() {
        println!("    Duration: {}", meta.duration_display);
    }
    if !meta.thumbnail_url.is_empty() {
        println!("    Thumbnail: {}", meta.thumbnail_url);
    }
    if let Some(id) = &meta.id {
        println!("    Watch: {}", build_watch_url(id));
    }
}

fn report(update: &SessionUpdate, state: &AcquisitionState) {
    match update {
        SessionUpdate::LookupStarted { identifier, .. } => {
            println!("Looking up {}...", identifier)
        }
        SessionUpdate::MetadataApplied { .. } => match state {
            AcquisitionState::Ready(meta) => display_meta(meta),
            AcquisitionState::Failed(reason) => eprintln!("✗ {}", reason),
            _ => {}
        },
        SessionUpdate::InputRejected { reason } => eprintln!("✗ {}", reason),
        SessionUpdate::Delivered { path, .. } => println!("✓ Saved to: {}", path.display()),
        SessionUpdate::DownloadFailed { reason, .. } => eprintln!("✗ Download failed: {}", reason),
        SessionUpdate::Stale { .. } | SessionUpdate::Ignored => {}
    }
}

async fn run_once(mut session: AcquisitionSession, args: &Args) -> anyhow::Result<()> {
    let input = args.input.join(" ");
    if input.trim().is_empty() {
        bail!("nothing to do: pass a link or use --interactive");
    }

    if Path::new(&input).is_file() {
        session.select_file(&input)?;
        return Ok(());
    }

    session.paste(&input);
    for update in session.settle().await {
        report(&update, session.state());
    }

    match session.state() {
        AcquisitionState::Ready(_) => {}
        AcquisitionState::Failed(reason) => bail!("{}", reason),
        other => bail!("lookup did not finish (state: {})", other.status()),
    }

    if args.info_only {
        println!("Information only mode - skipping download.");
        return Ok(());
    }

    println!("Downloading...");
    if session.request_download() == DownloadGate::Disabled {
        bail!("download is not available right now");
    }
    for update in session.settle().await {
        report(&update, session.state());
    }
    if let AcquisitionState::Failed(reason) = session.state() {
        bail!("{}", reason);
    }
    Ok(())
}

async fn run_interactive(mut session: AcquisitionSession) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type or paste a link. Commands: :download, :paste <text>, :clear, :quit");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match line.trim() {
                    ":quit" | ":q" => break,
                    ":clear" => session.edit_input(""),
                    ":download" | ":d" => {
                        if session.request_download() == DownloadGate::Disabled {
                            eprintln!("✗ Download is not available (state: {})", session.state().status());
                        }
                    }
                    text => match text.strip_prefix(":paste ") {
                        Some(pasted) => session.paste(pasted),
                        None if Path::new(text).is_file() => {
                            if let Err(e) = session.select_file(text) {
                                eprintln!("✗ {}", e);
                            }
                        }
                        None => session.edit_input(text),
                    },
                }
            }
            Some(update) = session.step() => report(&update, session.state()),
            else => break,
        }
    }

    session.shutdown();
    for update in session.settle().await {
        report(&update, session.state());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipfetch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;
    tracing::debug!(?config, "Loaded configuration");

    let session = AcquisitionSession::from_config(&config)?.with_selector(Arc::new(AnnounceSelector));

    if args.interactive {
        run_interactive(session).await
    } else {
        run_once(session, &args).await
    }
}
