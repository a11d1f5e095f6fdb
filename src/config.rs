use anyhow::{Context, Result};
use std::path::Path;

use crate::host::DEFAULT_GLYPH_WIDTH;
use crate::logging::LogLevel;
use crate::resource::PropertyFile;
use crate::scene::Dialect;
use crate::state::DEFAULT_FLAG_COUNT;
use crate::talk::TalkConfig;

/// Name of the options file looked up in the config directory
pub const CONFIG_FILE: &str = "parlor.cfg";

/// Engine options that can be set via CLI or config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    // Commandline-only options
    pub config_file: Option<String>,

    // Commandline and config file options
    pub content_dir: Option<String>,
    pub log_level: LogLevel,
    pub dialect: Dialect,
    pub window_width: u32,
    pub glyph_width: u32,
    pub page_lines: usize,
    pub choice_rows: usize,
    pub page_ticks: u32,
    pub flag_count: usize,
    pub player_name: String,
}

impl Default for Options {
    fn default() -> Self {
        let talk = TalkConfig::default();
        Self {
            config_file: None,
            content_dir: None,
            log_level: LogLevel::Warning,
            dialect: talk.dialect,
            window_width: talk.window_width,
            glyph_width: DEFAULT_GLYPH_WIDTH,
            page_lines: talk.page_lines,
            choice_rows: talk.choice_rows,
            page_ticks: talk.page_ticks,
            flag_count: DEFAULT_FLAG_COUNT,
            player_name: talk.player_name,
        }
    }
}

impl Options {
    /// Apply every recognised key of a property file over `self`
    pub fn apply_properties(mut self, props: &PropertyFile) -> Result<Self> {
        if let Some(dir) = props.get("contentdir") {
            self.content_dir = Some(dir.to_string());
        }
        if let Some(level) = props.get("loglevel") {
            self.log_level = parse_log_level(level)?;
        }
        if let Some(dialect) = props.get("dialect") {
            self.dialect = parse_dialect(dialect)?;
        }
        if let Some(v) = props.get("windowwidth") {
            self.window_width = parse_positive(v, "windowwidth")?;
        }
        if let Some(v) = props.get("glyphwidth") {
            self.glyph_width = parse_positive(v, "glyphwidth")?;
        }
        if let Some(v) = props.get("pagelines") {
            self.page_lines = parse_page_lines(v)?;
        }
        if let Some(v) = props.get("choicerows") {
            self.choice_rows = parse_positive(v, "choicerows")?;
        }
        if let Some(v) = props.get("pageticks") {
            self.page_ticks = v.parse().context("Invalid pageticks value")?;
        }
        if let Some(v) = props.get("flagcount") {
            self.flag_count = parse_positive(v, "flagcount")?;
        }
        if let Some(name) = props.get("playername") {
            self.player_name = name.to_string();
        }

        for key in props.keys() {
            if !KNOWN_KEYS.contains(&key) {
                log::warn!("Ignoring unknown config key '{}'", key);
            }
        }
        Ok(self)
    }

    /// Interpreter settings derived from these options
    pub fn talk_config(&self) -> TalkConfig {
        TalkConfig {
            dialect: self.dialect,
            window_width: self.window_width,
            page_lines: self.page_lines,
            choice_rows: self.choice_rows,
            page_ticks: self.page_ticks,
            player_name: self.player_name.clone(),
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "contentdir",
    "loglevel",
    "dialect",
    "windowwidth",
    "glyphwidth",
    "pagelines",
    "choicerows",
    "pageticks",
    "flagcount",
    "playername",
];

/// Load options from a config file. A missing default file yields the
/// defaults; an explicitly named file must exist.
pub fn load_config(config_file: Option<&str>) -> Result<Options> {
    let (path, required) = match config_file {
        Some(p) => (p.to_string(), true),
        None => (CONFIG_FILE.to_string(), false),
    };

    if !required && !Path::new(&path).exists() {
        log::debug!("No {} found, using default options", path);
        return Ok(Options::default());
    }

    let props = PropertyFile::load(&path).with_context(|| format!("Cannot load config {}", path))?;
    let mut options = Options::default()
        .apply_properties(&props)
        .with_context(|| format!("Invalid config {}", path))?;
    options.config_file = Some(path);
    Ok(options)
}

/// Parse a dialect name ("scalpel" or "tattoo")
pub fn parse_dialect(s: &str) -> Result<Dialect> {
    s.parse::<Dialect>()
        .map_err(|_| anyhow::anyhow!("Invalid dialect: {}. Valid options: scalpel, tattoo", s))
}

/// Parse a log level given by name or number
pub fn parse_log_level(s: &str) -> Result<LogLevel> {
    if let Ok(n) = s.parse::<i32>() {
        if !(0..=6).contains(&n) {
            anyhow::bail!("Log level {} out of range (0 to 6)", n);
        }
        return Ok(LogLevel::from_i32(n));
    }
    LogLevel::from_name(s).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid log level: {}. Valid options: nothing, user, error, warning, info, debug, all",
            s
        )
    })
}

/// Lines per page; the speaker header needs at least one more
pub fn parse_page_lines(s: &str) -> Result<usize> {
    let lines: usize = s.parse().context("Invalid pagelines value")?;
    if lines < 2 {
        anyhow::bail!("pagelines must be at least 2");
    }
    Ok(lines)
}

fn parse_positive<T>(s: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let value: T = s
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", key, s))?;
    if value == T::default() {
        anyhow::bail!("{} must be positive", key);
    }
    Ok(value)
}
