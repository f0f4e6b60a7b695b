use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use tokio::sync::mpsc;

use ivolution_launcher::config::{DEFAULT_APP_NAME, DEFAULT_BASE_URL, DEFAULT_BINARY_NAME};
use ivolution_launcher::download::{existing_download, validate_version};
use ivolution_launcher::engine::state::AppState;
use ivolution_launcher::{
    DestinationStrategy, DownloadRequest, LauncherConfig, LauncherEngine, LauncherError,
    ManifestVariant, ReleaseSource, Result, VersionDescriptor, env, selector,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantArg {
    Catalog,
    Latest,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    /// <dir>/versions/<version>/<binary>
    Versioned,
    /// <dir>/<app>_v<version>.<ext>
    Flat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List published versions, newest first.
    Versions,
    /// Show the release available for this platform.
    Latest,
    /// Download a version (the newest one unless --version is given).
    Download {
        #[arg(long)]
        version: Option<String>,
        /// Expected SHA-256 of the binary; the download fails on mismatch.
        #[arg(long, value_name = "HEX")]
        sha256: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "Ivolution Launcher",
    author,
    version,
    about = "Finds Ivolution releases and downloads the one you pick"
)]
struct Cli {
    /// Print launcher version and exit.
    #[arg(long)]
    version_only: bool,
    /// Origin hosting the version manifest.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, value_enum, default_value_t = VariantArg::Catalog)]
    variant: VariantArg,
    #[arg(long, value_enum, default_value_t = LayoutArg::Versioned)]
    layout: LayoutArg,
    /// Override the directory downloads are written under.
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    fn config(&self) -> LauncherConfig {
        let variant = match self.variant {
            VariantArg::Catalog => ManifestVariant::Catalog,
            VariantArg::Latest => ManifestVariant::Latest,
        };
        let destination = match self.layout {
            LayoutArg::Versioned => DestinationStrategy::VersionedDirectory {
                root: self.output_dir.clone().unwrap_or_else(env::user_data_dir),
                binary_name: DEFAULT_BINARY_NAME.to_owned(),
            },
            LayoutArg::Flat => DestinationStrategy::FlatDownloads {
                dir: self.output_dir.clone().unwrap_or_else(env::downloads_dir),
                app_name: DEFAULT_APP_NAME.to_owned(),
            },
        };
        LauncherConfig {
            base_url: self.base_url.clone(),
            variant,
            destination,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("Ivolution Launcher {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let mut engine = LauncherEngine::new(&cli.config(), cancel.clone());
    spawn_ctrl_c_handler(cancel);

    let result = match cli.command.unwrap_or(Command::Versions) {
        Command::Versions => print_versions(&mut engine).await,
        Command::Latest => print_latest(&mut engine).await,
        Command::Download { version, sha256 } => run_download(&mut engine, version, sha256).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            err.exit_code()
        }
    }
}

fn spawn_ctrl_c_handler(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            cancel.store(true, Ordering::SeqCst);
        }
    });
}

async fn print_versions(engine: &mut LauncherEngine) -> Result<()> {
    let versions = engine.list_versions().await?;
    let default = selector::select_default(&versions).map(|d| d.version.clone());
    for descriptor in &versions {
        let marker = if Some(&descriptor.version) == default.as_ref() {
            "*"
        } else {
            " "
        };
        print_descriptor(marker, descriptor);
    }
    Ok(())
}

fn print_descriptor(marker: &str, descriptor: &VersionDescriptor) {
    if descriptor.release_date.is_empty() {
        println!("{marker} {}", descriptor.version);
    } else {
        println!("{marker} {}  ({})", descriptor.version, descriptor.release_date);
    }
    if !descriptor.features.is_empty() {
        println!("    features: {}", descriptor.features.join(", "));
    }
    let req = &descriptor.requirements;
    for (label, spec) in [("minimal", &req.minimal), ("recommended", &req.recommended)] {
        if !(spec.ram.is_empty() && spec.cpu.is_empty() && spec.gpu.is_empty()) {
            println!("    {label}: RAM {} | CPU {} | GPU {}", spec.ram, spec.cpu, spec.gpu);
        }
    }
}

async fn print_latest(engine: &mut LauncherEngine) -> Result<()> {
    let platform = engine.platform();
    let pointer = engine.check_for_updates().await?;
    let release = pointer
        .latest(platform)
        .ok_or_else(|| LauncherError::PlatformUnavailable(platform.to_string()))?;
    println!("Latest version: {} ({platform})", release.version);
    println!("{}", release.download_url);
    Ok(())
}

async fn run_download(
    engine: &mut LauncherEngine,
    version: Option<String>,
    sha256: Option<String>,
) -> Result<()> {
    let versions = engine.list_versions().await?;
    let chosen = match version.as_deref() {
        Some(wanted) => versions.iter().find(|d| d.version == wanted),
        None => selector::select_default(&versions),
    }
    .ok_or(LauncherError::InvalidSelection)?;

    validate_version(&chosen.version)?;
    let destination = engine.download_destination(&chosen.version);
    if let Some(size) = existing_download(&destination).await {
        info!(
            "{} already exists ({size} bytes), downloading again",
            destination.display()
        );
    }

    let mut request = DownloadRequest::new(&chosen.download_url, &chosen.version, engine.platform());
    if let Some(hex) = sha256 {
        request = request.with_sha256(hex);
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(format!("Downloading {}", chosen.version));

    let (tx, rx) = mpsc::unbounded_channel();
    let render = tokio::spawn(render_progress(rx, bar.clone()));
    let result = engine.download_request(&request, &tx).await;
    drop(tx);
    let _ = render.await;
    bar.finish_and_clear();

    let path = result?;
    println!("Downloaded {} to {}", chosen.version, path.display());
    Ok(())
}

async fn render_progress(mut rx: mpsc::UnboundedReceiver<AppState>, bar: ProgressBar) {
    while let Some(state) = rx.recv().await {
        if let AppState::Downloading { progress, .. } = state {
            bar.set_position(progress.round() as u64);
        }
    }
}
