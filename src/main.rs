mod app;
mod components;
mod event;
mod handler;
mod theme;
mod tui;
mod ui;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use json_tree::config::{
    AppConfig, FilterConfig, GeneralConfig, ObserverConfig, PagingConfig, TreeConfig,
};
use json_tree::error::{AppError, Result};
use json_tree::tree::Node;

use crate::app::App;
use crate::event::{Event, EventHandler};
use crate::tui::{install_panic_hook, Tui};

/// Browse and filter a JSON hierarchy in the terminal.
///
/// The input is either one nested tree (an object with `id`, `name` and
/// `children`) or an array of flat records linked by `parentId`.
#[derive(Parser, Debug)]
#[command(name = "jtree", version, about)]
struct Cli {
    /// JSON file to display
    path: PathBuf,

    /// Config file (overrides the default search locations)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Render the root's children as top-level rows
    #[arg(long)]
    hide_root: bool,

    /// Id of the node to select, open and reveal at startup
    #[arg(long, short)]
    select: Option<String>,

    /// Children rendered per "load more" step
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Match count above which children are paged
    #[arg(long)]
    eager_threshold: Option<usize>,

    /// Use the polling observer instead of intersection reports
    #[arg(long)]
    polling: bool,

    /// Fuzzy name matching instead of substring matching
    #[arg(long)]
    fuzzy: bool,

    /// Write logs here instead of the default log file
    #[arg(long)]
    log_file: Option<String>,

    /// Disable mouse capture
    #[arg(long)]
    no_mouse: bool,

    /// Initial filter text
    #[arg(long, short)]
    filter: Option<String>,
}

impl Cli {
    /// Flags as a partial config laid over the config files.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                mouse: self.no_mouse.then_some(false),
                log_file: self.log_file.clone(),
            },
            tree: TreeConfig {
                include_root: self.hide_root.then_some(false),
                selected_node: self.select.clone(),
                ..Default::default()
            },
            paging: PagingConfig {
                chunk_size: self.chunk_size,
                eager_threshold: self.eager_threshold,
                ..Default::default()
            },
            filter: FilterConfig {
                mode: self.fuzzy.then(|| "fuzzy".to_string()),
                ..Default::default()
            },
            observer: ObserverConfig {
                strategy: self.polling.then(|| "polling".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Send logs to `path`; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env("JTREE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

/// Read the tree; flat record arrays hang under a synthesized root named
/// after the file.
fn load_tree(path: &Path) -> Result<Node> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let reader = BufReader::new(File::open(path)?);
    Node::from_reader(reader, Node::new("#root", name))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.path.canonicalize().map_err(|_| {
        AppError::InvalidPath(format!("{} does not exist", cli.path.display()))
    })?;

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    init_logging(&config.log_file())?;

    let started = Instant::now();
    let root = load_tree(&path)?;
    info!(
        path = %path.display(),
        nodes = root.count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "tree loaded"
    );

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut app = App::new(root, &config, title)?;
    if let Some(term) = &cli.filter {
        app.filter.text = term.clone();
        app.filter.end();
        app.apply_filter();
    }

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(16));

    let result = run(&mut tui, &mut app, &mut events).await;
    if let Err(e) = &result {
        error!(error = %e, "event loop failed");
    }

    app.dispose();
    tui.restore()?;
    result
}

async fn run(tui: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(app, frame);
        })?;
        app.sync_viewport();

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(app, mouse),
            Event::Tick => app.tick(Instant::now()),
            Event::Resize(_, _) => {}
        }

        if app.should_quit {
            info!("quit");
            return Ok(());
        }
    }
}
