//! Application configuration for Pressline.
//!
//! Site config lives at `<site root>/pressline.toml` (falling back to
//! `~/.pressline/pressline.toml`). CLI flags and environment variables
//! override config file values, which override defaults. Everything is frozen
//! into an immutable [`RunContext`] before any component runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PresslineError, Result};
use crate::retry::RetryPolicy;
use crate::types::is_url_safe_slug;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "pressline.toml";

/// Fallback config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pressline";

// ---------------------------------------------------------------------------
// Config structs (matching pressline.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub nav: NavConfig,
}

/// `[queue]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Spreadsheet ID. Required at run time (usually via `SEO_SHEET_ID`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,

    /// Tab holding the queue.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Service-account key file, relative to the site root unless absolute.
    #[serde(default = "default_credentials")]
    pub credentials: String,

    /// Sheets API origin (overridable for testing).
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_name: default_sheet_name(),
            credentials: default_credentials(),
            api_base: default_api_base(),
        }
    }
}

fn default_sheet_name() -> String {
    "Queue".into()
}
fn default_credentials() -> String {
    "automation/secrets/service-account.json".into()
}
fn default_api_base() -> String {
    "https://sheets.googleapis.com".into()
}

/// `[generator]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generator executable.
    #[serde(default = "default_generator_command")]
    pub command: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Step ceiling enforced by the generator itself.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,

    /// Capabilities the generator must never use.
    #[serde(default = "default_disallowed_tools")]
    pub disallowed_tools: Vec<String>,

    /// Environment variables that must be unset for a run to start.
    #[serde(default = "default_forbidden_env")]
    pub forbidden_env: Vec<String>,

    /// Optional instruction template replacing the built-in prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: default_generator_command(),
            model: default_model(),
            max_turns: default_max_turns(),
            permission_mode: default_permission_mode(),
            disallowed_tools: default_disallowed_tools(),
            forbidden_env: default_forbidden_env(),
            prompt_file: None,
        }
    }
}

fn default_generator_command() -> String {
    "claude".into()
}
fn default_model() -> String {
    "sonnet".into()
}
fn default_max_turns() -> u32 {
    15
}
fn default_permission_mode() -> String {
    "acceptEdits".into()
}
fn default_disallowed_tools() -> Vec<String> {
    vec!["Bash".into(), "WebFetch".into(), "WebSearch".into()]
}
fn default_forbidden_env() -> Vec<String> {
    vec!["ANTHROPIC_API_KEY".into()]
}

/// `[site]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public origin used for sitemap locations.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Site name; `<title>` values ending in `| <name>` are trimmed.
    #[serde(default)]
    pub name: String,

    /// Directory whose subdirectories feed the rollups.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Canonical artifact file inside each item directory.
    #[serde(default = "default_artifact_file")]
    pub artifact_file: String,

    /// Paginated index document (holds the index marker region).
    #[serde(default = "default_index_page")]
    pub index_page: String,

    /// Homepage document (holds the latest-items marker region).
    #[serde(default = "default_home_page")]
    pub home_page: String,

    #[serde(default = "default_sitemap")]
    pub sitemap: String,

    /// Category used when an artifact declares none.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Cover image `src`; `{slug}` is substituted.
    #[serde(default = "default_cover_image")]
    pub cover_image: String,

    /// Heading selectors tried before social-preview and `<title>` fallbacks.
    #[serde(default = "default_title_selectors")]
    pub title_selectors: Vec<String>,

    /// Top-level pages listed first in the sitemap.
    #[serde(default = "default_static_pages")]
    pub static_pages: Vec<StaticPage>,

    /// Content type → directory mapping for expected output paths.
    #[serde(default = "default_content_types")]
    pub content_types: Vec<ContentTypeConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            name: String::new(),
            content_dir: default_content_dir(),
            artifact_file: default_artifact_file(),
            index_page: default_index_page(),
            home_page: default_home_page(),
            sitemap: default_sitemap(),
            default_category: default_category(),
            cover_image: default_cover_image(),
            title_selectors: default_title_selectors(),
            static_pages: default_static_pages(),
            content_types: default_content_types(),
        }
    }
}

fn default_base_url() -> String {
    "https://example.com".into()
}
fn default_content_dir() -> String {
    "content".into()
}
fn default_artifact_file() -> String {
    "index.html".into()
}
fn default_index_page() -> String {
    "content/index.html".into()
}
fn default_home_page() -> String {
    "index.html".into()
}
fn default_sitemap() -> String {
    "sitemap.xml".into()
}
fn default_category() -> String {
    "Blog".into()
}
fn default_cover_image() -> String {
    "/images/content/{slug}-cover.webp".into()
}
fn default_title_selectors() -> Vec<String> {
    vec!["h1.blog-header__title".into(), "h1".into()]
}
fn default_static_pages() -> Vec<StaticPage> {
    vec![
        StaticPage::new("/", "weekly", "1.0"),
        StaticPage::new("/content/", "daily", "0.9"),
        StaticPage::new("/contact/", "monthly", "0.7"),
    ]
}
fn default_content_types() -> Vec<ContentTypeConfig> {
    vec![
        ContentTypeConfig::new("article", "content"),
        ContentTypeConfig::new("blog", "blog"),
        ContentTypeConfig::new("landing", "landing"),
        ContentTypeConfig::new("landing-page", "landing"),
    ]
}

/// `[[site.static_pages]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPage {
    /// Path relative to the site origin, e.g. `/contact/`.
    pub path: String,
    pub changefreq: String,
    pub priority: String,
}

impl StaticPage {
    pub fn new(path: &str, changefreq: &str, priority: &str) -> Self {
        Self {
            path: path.into(),
            changefreq: changefreq.into(),
            priority: priority.into(),
        }
    }
}

/// `[[site.content_types]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeConfig {
    /// Queue `type` value (case-insensitive).
    pub name: String,
    /// Directory (relative to the site root) holding `<slug>/<artifact>`.
    pub dir: String,
}

impl ContentTypeConfig {
    pub fn new(name: &str, dir: &str) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }
}

impl SiteConfig {
    /// Directory for a queue content type, matched case-insensitively.
    pub fn content_type_dir(&self, content_type: &str) -> Option<&str> {
        let wanted = content_type.trim();
        self.content_types
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(wanted))
            .map(|t| t.dir.as_str())
    }

    /// Relative path a task of this type and slug must produce. `None` for
    /// an unknown type or a slug that is not URL-safe.
    pub fn expected_artifact(&self, content_type: &str, slug: &str) -> Option<PathBuf> {
        if !is_url_safe_slug(slug) {
            return None;
        }
        let dir = self.content_type_dir(content_type)?;
        Some(Path::new(dir).join(slug).join(&self.artifact_file))
    }

    /// Public URL path of a rollup item: `/<content_dir>/<slug>/`.
    pub fn item_href(&self, slug: &str) -> String {
        format!("/{}/{slug}/", self.content_dir.trim_matches('/'))
    }

    /// Cover image `src` for a slug.
    pub fn cover_src(&self, slug: &str) -> String {
        self.cover_image.replace("{slug}", slug)
    }
}

/// `[publish]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Designated publishing branch.
    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Task batch file, relative to the site root.
    #[serde(default = "default_batch_file")]
    pub batch_file: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            remote: default_remote(),
            batch_file: default_batch_file(),
        }
    }
}

fn default_branch() -> String {
    "main".into()
}
fn default_remote() -> String {
    "origin".into()
}
fn default_batch_file() -> String {
    "automation/tasks.json".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    2_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_max_delay_ms() -> u64 {
    60_000
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// `[history]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Only roll up items whose artifact has at least one commit.
    #[serde(default)]
    pub require_committed: bool,
}

/// `[nav]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavConfig {
    /// Links every header menu must carry.
    #[serde(default)]
    pub links: Vec<NavLink>,

    /// Extra pages (relative to the site root) whose menus are synced.
    #[serde(default)]
    pub pages: Vec<String>,
}

/// `[[nav.links]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub href: String,
    pub label: String,
    /// Insert right after the item linking here; append when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

// ---------------------------------------------------------------------------
// Runtime context (frozen from config + CLI flags + environment)
// ---------------------------------------------------------------------------

/// Values supplied by CLI flags or their environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub credentials: Option<PathBuf>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
}

impl AppConfig {
    /// Apply CLI/environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(id) = overrides.sheet_id.as_ref().filter(|s| !s.trim().is_empty()) {
            self.queue.sheet_id = Some(id.trim().to_string());
        }
        if let Some(name) = overrides.sheet_name.as_ref().filter(|s| !s.trim().is_empty()) {
            self.queue.sheet_name = name.trim().to_string();
        }
        if let Some(path) = &overrides.credentials {
            self.queue.credentials = path.to_string_lossy().to_string();
        }
        if let Some(model) = overrides.model.as_ref().filter(|s| !s.trim().is_empty()) {
            self.generator.model = model.trim().to_string();
        }
        if let Some(turns) = overrides.max_turns {
            self.generator.max_turns = turns;
        }
    }
}

/// Everything the rollup synchronizer needs.
#[derive(Debug, Clone)]
pub struct SiteContext {
    /// Site root (the git working tree).
    pub root: PathBuf,
    /// Run date.
    pub today: NaiveDate,
    pub base_url: Url,
    pub site: SiteConfig,
    pub nav: NavConfig,
    pub history: HistoryConfig,
}

impl SiteContext {
    pub fn new(config: &AppConfig, root: &Path, today: NaiveDate) -> Result<Self> {
        let base_url = Url::parse(&config.site.base_url).map_err(|e| {
            PresslineError::config(format!("invalid site.base_url '{}': {e}", config.site.base_url))
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            today,
            base_url,
            site: config.site.clone(),
            nav: config.nav.clone(),
            history: config.history.clone(),
        })
    }

    /// Absolute path of a site-relative path.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Run date as `YYYY-MM-DD`.
    pub fn today_str(&self) -> String {
        self.today.format(crate::types::DATE_FORMAT).to_string()
    }
}

/// Resolved task-queue settings.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub sheet_id: String,
    pub sheet_name: String,
    /// Absolute path to an existing service-account key file.
    pub credentials: PathBuf,
    pub api_base: String,
}

/// Immutable per-run context handed to every pipeline component.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub site: SiteContext,
    pub queue: QueueSettings,
    pub generator: GeneratorConfig,
    pub publish: PublishConfig,
    pub retry: RetryPolicy,
}

impl RunContext {
    /// Validate and freeze configuration for a publishing run.
    ///
    /// A missing queue ID or credentials file is a fatal config error.
    pub fn resolve(config: &AppConfig, root: &Path, today: NaiveDate) -> Result<Self> {
        let sheet_id = config
            .queue
            .sheet_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                PresslineError::config(
                    "missing queue ID. Set SEO_SHEET_ID or queue.sheet_id in pressline.toml",
                )
            })?;

        let credentials = {
            let p = PathBuf::from(&config.queue.credentials);
            if p.is_absolute() { p } else { root.join(p) }
        };
        if !credentials.is_file() {
            return Err(PresslineError::config(format!(
                "missing service account key file: {}\n\
                 Set GOOGLE_APPLICATION_CREDENTIALS or place it at {}",
                credentials.display(),
                default_credentials()
            )));
        }

        Ok(Self {
            site: SiteContext::new(config, root, today)?,
            queue: QueueSettings {
                sheet_id,
                sheet_name: config.queue.sheet_name.clone(),
                credentials,
                api_base: config.queue.api_base.trim_end_matches('/').to_string(),
            },
            generator: config.generator.clone(),
            publish: config.publish.clone(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    pub fn root(&self) -> &Path {
        &self.site.root
    }

    pub fn today(&self) -> NaiveDate {
        self.site.today
    }

    /// Absolute path of the task batch file.
    pub fn batch_path(&self) -> PathBuf {
        self.site.root.join(&self.publish.batch_file)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the fallback config directory (`~/.pressline/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PresslineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Locate the config file: explicit path, then `<root>/pressline.toml`,
/// then `~/.pressline/pressline.toml`.
pub fn find_config_file(root: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(PresslineError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = root.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }

    let global = config_dir()?.join(CONFIG_FILE_NAME);
    Ok(global.is_file().then_some(global))
}

/// Load config for a site root. Returns defaults if no file exists.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<AppConfig> {
    match find_config_file(root, explicit)? {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!(root = %root.display(), "no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PresslineError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PresslineError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default `pressline.toml` into `root`. Refuses to overwrite.
pub fn init_config(root: &Path) -> Result<PathBuf> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(PresslineError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| PresslineError::config(e.to_string()))?;
    crate::atomic::write_atomic(&path, content.as_bytes())?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path)
}

/// Fail if any forbidden environment variable is set and non-empty.
pub fn check_forbidden_env(generator: &GeneratorConfig) -> Result<()> {
    for var in &generator.forbidden_env {
        if std::env::var(var).is_ok_and(|v| !v.is_empty()) {
            return Err(PresslineError::Precondition(format!(
                "{var} is set. Unset it before running the generator (unset {var})"
            )));
        }
    }
    Ok(())
}
