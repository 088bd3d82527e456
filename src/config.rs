//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--hide-root`, `--chunk-size`, etc.)
//! 2. `$JTREE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.jtree.toml` in the current working directory
//! 4. Global `~/.config/jtree/config.toml`
//! 5. Built-in defaults

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::tree::controller::{
    NoMatchPlaceholder, TreeOptions, DEFAULT_NODE_ICON, DEFAULT_SELECTED_CLASS,
};
use crate::tree::observer::ObserverStrategy;
use crate::tree::paging::{
    PagingPolicy, DEFAULT_CHUNK_SIZE, DEFAULT_EAGER_THRESHOLD, DEFAULT_MAX_EAGER_DEPTH,
};
use crate::tree::NodeId;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Where tracing output goes; the terminal itself is never written to.
    pub log_file: Option<String>,
}

/// Tree rendering settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Render the root node as the top row.
    pub include_root: Option<bool>,
    /// Icon name; an empty string disables icons.
    pub node_icon: Option<String>,
    /// Id of the node selected at startup.
    pub selected_node: Option<String>,
    /// Class marking the selected label.
    pub selected_class: Option<String>,
    /// Placeholder text shown when nothing matches.
    pub no_match_text: Option<String>,
}

/// Chunked rendering settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PagingConfig {
    pub chunk_size: Option<usize>,
    /// Match count at or below which everything renders eagerly.
    pub eager_threshold: Option<usize>,
    pub max_eager_depth: Option<usize>,
}

/// Filter input settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Keystroke debounce in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Match mode: "substring" or "fuzzy".
    pub mode: Option<String>,
}

/// Viewport observation settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObserverConfig {
    /// "auto", "intersection" or "polling".
    pub strategy: Option<String>,
    pub poll_interval_ms: Option<u64>,
    /// Delay before the selected node is scrolled into view.
    pub reveal_delay_ms: Option<u64>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_bg: Option<String>,
    pub tree_fg: Option<String>,
    pub tree_cursor_bg: Option<String>,
    pub tree_selected_fg: Option<String>,
    pub tree_branch_fg: Option<String>,
    pub tree_guide_fg: Option<String>,
    pub load_more_fg: Option<String>,
    pub filter_bg: Option<String>,
    pub filter_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub paging: PagingConfig,
    pub filter: FilterConfig,
    pub observer: ObserverConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default filter debounce in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Default reveal delay in milliseconds.
pub const DEFAULT_REVEAL_DELAY_MS: u64 = 1000;
/// Default log file name, placed in the system temp directory.
pub const DEFAULT_LOG_FILE: &str = "jtree.log";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("JTREE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".jtree.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("jtree").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Logging is configured from this file, so it is not up yet.
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                mouse: other.general.mouse.or(self.general.mouse),
                log_file: other.general.log_file.clone().or(self.general.log_file),
            },
            tree: TreeConfig {
                include_root: other.tree.include_root.or(self.tree.include_root),
                node_icon: other.tree.node_icon.clone().or(self.tree.node_icon),
                selected_node: other
                    .tree
                    .selected_node
                    .clone()
                    .or(self.tree.selected_node),
                selected_class: other
                    .tree
                    .selected_class
                    .clone()
                    .or(self.tree.selected_class),
                no_match_text: other
                    .tree
                    .no_match_text
                    .clone()
                    .or(self.tree.no_match_text),
            },
            paging: PagingConfig {
                chunk_size: other.paging.chunk_size.or(self.paging.chunk_size),
                eager_threshold: other
                    .paging
                    .eager_threshold
                    .or(self.paging.eager_threshold),
                max_eager_depth: other
                    .paging
                    .max_eager_depth
                    .or(self.paging.max_eager_depth),
            },
            filter: FilterConfig {
                debounce_ms: other.filter.debounce_ms.or(self.filter.debounce_ms),
                mode: other.filter.mode.clone().or(self.filter.mode),
            },
            observer: ObserverConfig {
                strategy: other.observer.strategy.clone().or(self.observer.strategy),
                poll_interval_ms: other
                    .observer
                    .poll_interval_ms
                    .or(self.observer.poll_interval_ms),
                reveal_delay_ms: other
                    .observer
                    .reveal_delay_ms
                    .or(self.observer.reveal_delay_ms),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so that later files overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Log file path.
    pub fn log_file(&self) -> PathBuf {
        match &self.general.log_file {
            Some(path) => PathBuf::from(path),
            None => std::env::temp_dir().join(DEFAULT_LOG_FILE),
        }
    }

    pub fn include_root(&self) -> bool {
        self.tree.include_root.unwrap_or(true)
    }

    pub fn node_icon(&self) -> &str {
        self.tree.node_icon.as_deref().unwrap_or(DEFAULT_NODE_ICON)
    }

    /// Startup selection, parsed the same way ids typed on the command line are.
    pub fn selected_node(&self) -> Option<NodeId> {
        self.tree.selected_node.as_deref().map(NodeId::parse)
    }

    /// Selected class; an empty string disables it.
    pub fn selected_class(&self) -> Option<&str> {
        match self.tree.selected_class.as_deref() {
            Some("") => None,
            Some(class) => Some(class),
            None => Some(DEFAULT_SELECTED_CLASS),
        }
    }

    pub fn no_match_text(&self) -> &str {
        self.tree.no_match_text.as_deref().unwrap_or("No matching nodes")
    }

    pub fn paging(&self) -> PagingPolicy {
        PagingPolicy {
            chunk_size: self.paging.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            eager_threshold: self
                .paging
                .eager_threshold
                .unwrap_or(DEFAULT_EAGER_THRESHOLD),
            max_eager_depth: self
                .paging
                .max_eager_depth
                .unwrap_or(DEFAULT_MAX_EAGER_DEPTH),
        }
    }

    /// Filter input debounce interval in milliseconds.
    pub fn debounce_ms(&self) -> u64 {
        self.filter.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    /// Whether names are matched fuzzily instead of by substring.
    pub fn fuzzy_filter(&self) -> bool {
        self.filter.mode.as_deref() == Some("fuzzy")
    }

    pub fn observer_strategy(&self) -> ObserverStrategy {
        ObserverStrategy::from_str(self.observer.strategy.as_deref().unwrap_or("auto"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.observer
                .poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(
            self.observer
                .reveal_delay_ms
                .unwrap_or(DEFAULT_REVEAL_DELAY_MS),
        )
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }

    /// Controller options for a tree rendering into `render_target`.
    pub fn tree_options(&self, render_target: &str) -> TreeOptions {
        let no_match = self.no_match_text();
        TreeOptions {
            render_target: render_target.to_string(),
            include_root: self.include_root(),
            node_icon: self.node_icon().to_string(),
            selected_node_id: self.selected_node(),
            selected_node_class: self.selected_class().map(str::to_string),
            selected_node_style: BTreeMap::new(),
            no_match: (!no_match.is_empty())
                .then(|| NoMatchPlaceholder::Markup(no_match.to_string())),
            paging: self.paging(),
            observer: self.observer_strategy(),
            poll_interval: self.poll_interval(),
            reveal_delay: self.reveal_delay(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
