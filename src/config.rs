/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing, unreadable or
/// holds invalid values; every problem is logged, none is fatal.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::confetti::Rgb;
use crate::error::ConfigError;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GreetConfig {
    pub general: GeneralConfig,
    pub timing: TimingConfig,
    pub memory: MemoryConfig,
    pub puzzle: PuzzleConfig,
    pub candles: CandleConfig,
    pub confetti: ConfettiConfig,
    pub journey: JourneyConfig,
    pub media: MediaConfig,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub title: String,
    pub recipient: String,
    pub closing_message: String,
    pub log_file: PathBuf,
    pub frame_ms: u64,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub preview_ms: u64,         // all cards shown before the first flip
    pub mismatch_ms: u64,        // unequal pair stays visible this long
    pub memory_advance_ms: u64,
    pub puzzle_advance_ms: u64,
    pub candles_advance_ms: u64,
    pub confetti_ms: u64,
    pub message_ms: u64,
}

#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub icons: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PuzzleConfig {
    pub grid_size: usize,
}

#[derive(Clone, Debug)]
pub struct CandleConfig {
    pub count: usize,
}

#[derive(Clone, Debug)]
pub struct ConfettiConfig {
    pub palette: Vec<Rgb>,
    pub small_burst: usize,
    pub big_burst: usize,
}

#[derive(Clone, Debug)]
pub struct JourneyConfig {
    pub texts: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub intro_track: PathBuf,
    pub loop_track: PathBuf,
    pub video: PathBuf,
    pub video_command: Vec<String>,
    pub visibility_threshold: f32,
    pub sfx: bool,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    memory: TomlMemory,
    #[serde(default)]
    puzzle: TomlPuzzle,
    #[serde(default)]
    candles: TomlCandles,
    #[serde(default)]
    confetti: TomlConfetti,
    #[serde(default)]
    journey: TomlJourney,
    #[serde(default)]
    media: TomlMedia,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_recipient")]
    recipient: String,
    #[serde(default = "default_closing")]
    closing_message: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_preview")]
    preview_ms: u64,
    #[serde(default = "default_mismatch")]
    mismatch_ms: u64,
    #[serde(default = "default_memory_advance")]
    memory_advance_ms: u64,
    #[serde(default = "default_puzzle_advance")]
    puzzle_advance_ms: u64,
    #[serde(default = "default_candles_advance")]
    candles_advance_ms: u64,
    #[serde(default = "default_confetti_ms")]
    confetti_ms: u64,
    #[serde(default = "default_message_ms")]
    message_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlMemory {
    #[serde(default = "default_icons")]
    icons: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlPuzzle {
    #[serde(default = "default_grid_size")]
    grid_size: usize,
}

#[derive(Deserialize, Debug)]
struct TomlCandles {
    #[serde(default = "default_candle_count")]
    count: usize,
}

#[derive(Deserialize, Debug)]
struct TomlConfetti {
    #[serde(default = "default_palette")]
    palette: Vec<String>,
    #[serde(default = "default_small_burst")]
    small_burst: usize,
    #[serde(default = "default_big_burst")]
    big_burst: usize,
}

#[derive(Deserialize, Debug)]
struct TomlJourney {
    #[serde(default = "default_texts")]
    texts: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlMedia {
    #[serde(default = "default_intro_track")]
    intro_track: String,
    #[serde(default = "default_loop_track")]
    loop_track: String,
    #[serde(default = "default_video")]
    video: String,
    #[serde(default = "default_video_command")]
    video_command: Vec<String>,
    #[serde(default = "default_threshold")]
    visibility_threshold: f32,
    #[serde(default = "default_sfx")]
    sfx: bool,
}

// ── Defaults ──

fn default_title() -> String { "Happy Birthday".into() }
fn default_recipient() -> String { "you".into() }
fn default_closing() -> String { "Here's to another year of adventures together.".into() }
fn default_log_file() -> String { "wishcard.log".into() }
fn default_frame_ms() -> u64 { 16 }

fn default_preview() -> u64 { 3000 }
fn default_mismatch() -> u64 { 1000 }
fn default_memory_advance() -> u64 { 1500 }
fn default_puzzle_advance() -> u64 { 1500 }
fn default_candles_advance() -> u64 { 2000 }
fn default_confetti_ms() -> u64 { 5000 }
fn default_message_ms() -> u64 { 2500 }

fn default_icons() -> Vec<String> {
    ["🎂", "🎁", "🎈", "✨", "🕯️", "🎉", "🎩", "🍰"].iter().map(|s| s.to_string()).collect()
}
fn default_grid_size() -> usize { 3 }
fn default_candle_count() -> usize { 3 }

fn default_palette() -> Vec<String> {
    ["#d4af37", "#fdfbf7", "#e0c060", "#333333"].iter().map(|s| s.to_string()).collect()
}
fn default_small_burst() -> usize { 50 }
fn default_big_burst() -> usize { 150 }

fn default_texts() -> Vec<String> {
    [
        "Where it all started...",
        "Every late night and every early coffee.",
        "All the places we got lost on purpose.",
        "And everything still ahead of us.",
    ].iter().map(|s| s.to_string()).collect()
}

fn default_intro_track() -> String { "audio/song1.mp3".into() }
fn default_loop_track() -> String { "audio/song2.mp3".into() }
fn default_video() -> String { "video/birthday.mp4".into() }
fn default_video_command() -> Vec<String> { vec!["mpv".into(), "--really-quiet".into()] }
fn default_threshold() -> f32 { 0.5 }
fn default_sfx() -> bool { true }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            title: default_title(),
            recipient: default_recipient(),
            closing_message: default_closing(),
            log_file: default_log_file(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            preview_ms: default_preview(),
            mismatch_ms: default_mismatch(),
            memory_advance_ms: default_memory_advance(),
            puzzle_advance_ms: default_puzzle_advance(),
            candles_advance_ms: default_candles_advance(),
            confetti_ms: default_confetti_ms(),
            message_ms: default_message_ms(),
        }
    }
}

impl Default for TomlMemory {
    fn default() -> Self {
        TomlMemory { icons: default_icons() }
    }
}

impl Default for TomlPuzzle {
    fn default() -> Self {
        TomlPuzzle { grid_size: default_grid_size() }
    }
}

impl Default for TomlCandles {
    fn default() -> Self {
        TomlCandles { count: default_candle_count() }
    }
}

impl Default for TomlConfetti {
    fn default() -> Self {
        TomlConfetti {
            palette: default_palette(),
            small_burst: default_small_burst(),
            big_burst: default_big_burst(),
        }
    }
}

impl Default for TomlJourney {
    fn default() -> Self {
        TomlJourney { texts: default_texts() }
    }
}

impl Default for TomlMedia {
    fn default() -> Self {
        TomlMedia {
            intro_track: default_intro_track(),
            loop_track: default_loop_track(),
            video: default_video(),
            video_command: default_video_command(),
            visibility_threshold: default_threshold(),
            sfx: default_sfx(),
        }
    }
}

// ── Validation ──

fn check_icons(icons: Vec<String>) -> Result<Vec<String>, ConfigError> {
    if icons.is_empty() {
        return Err(ConfigError::Invalid { key: "memory.icons", reason: "list is empty".into() });
    }
    for (i, icon) in icons.iter().enumerate() {
        if icon.trim().is_empty() {
            return Err(ConfigError::Invalid { key: "memory.icons", reason: "blank icon".into() });
        }
        if icons[..i].contains(icon) {
            return Err(ConfigError::Invalid {
                key: "memory.icons",
                reason: format!("`{icon}` appears twice"),
            });
        }
    }
    Ok(icons)
}

fn check_range(key: &'static str, value: usize, min: usize, max: usize) -> Result<usize, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { key, reason: format!("{value} is outside {min}..={max}") })
    }
}

fn parse_palette(colors: &[String]) -> Result<Vec<Rgb>, ConfigError> {
    let palette = colors
        .iter()
        .map(|c| Rgb::from_hex(c).ok_or_else(|| ConfigError::Invalid {
            key: "confetti.palette",
            reason: format!("`{c}` is not a #rrggbb color"),
        }))
        .collect::<Result<Vec<_>, _>>()?;
    if palette.is_empty() {
        return Err(ConfigError::Invalid { key: "confetti.palette", reason: "list is empty".into() });
    }
    Ok(palette)
}

/// Keep a valid value, or log the problem and use the default.
fn or_default<T>(checked: Result<T, ConfigError>, default: impl FnOnce() -> T) -> T {
    checked.unwrap_or_else(|e| {
        log::warn!("{e}; using default");
        default()
    })
}

// ── Loading ──

impl GreetConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = match load_toml(&search_dirs) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("{e}");
                log::warn!("Using default settings.");
                TomlConfig::default()
            }
        };
        Self::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(t: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let icons = or_default(check_icons(t.memory.icons), default_icons);
        let grid_size = or_default(
            check_range("puzzle.grid_size", t.puzzle.grid_size, 2, 5),
            default_grid_size,
        );
        let count = or_default(
            check_range("candles.count", t.candles.count, 1, 9),
            default_candle_count,
        );
        let palette = or_default(parse_palette(&t.confetti.palette), || {
            parse_palette(&default_palette()).unwrap_or_default()
        });
        let threshold = if (0.0..=1.0).contains(&t.media.visibility_threshold) {
            t.media.visibility_threshold
        } else {
            log::warn!(
                "invalid setting `media.visibility_threshold`: {} is outside 0..=1; using default",
                t.media.visibility_threshold
            );
            default_threshold()
        };

        GreetConfig {
            general: GeneralConfig {
                title: t.general.title,
                recipient: t.general.recipient,
                closing_message: t.general.closing_message,
                log_file: PathBuf::from(t.general.log_file),
                frame_ms: t.general.frame_ms.max(1),
            },
            timing: TimingConfig {
                preview_ms: t.timing.preview_ms,
                mismatch_ms: t.timing.mismatch_ms,
                memory_advance_ms: t.timing.memory_advance_ms,
                puzzle_advance_ms: t.timing.puzzle_advance_ms,
                candles_advance_ms: t.timing.candles_advance_ms,
                confetti_ms: t.timing.confetti_ms,
                message_ms: t.timing.message_ms,
            },
            memory: MemoryConfig { icons },
            puzzle: PuzzleConfig { grid_size },
            candles: CandleConfig { count },
            confetti: ConfettiConfig {
                palette,
                small_burst: t.confetti.small_burst,
                big_burst: t.confetti.big_burst,
            },
            journey: JourneyConfig { texts: t.journey.texts },
            media: MediaConfig {
                intro_track: resolve_asset(&t.media.intro_track, search_dirs),
                loop_track: resolve_asset(&t.media.loop_track, search_dirs),
                video: resolve_asset(&t.media.video, search_dirs),
                video_command: t.media.video_command,
                visibility_threshold: threshold,
                sfx: t.media.sfx,
            },
        }
    }
}

impl Default for GreetConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[])
    }
}

/// Absolute paths are kept; relative ones are looked up in the candidate
/// directories, falling back to CWD-relative.
fn resolve_asset(path: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter()
        .map(|d| d.join(path))
        .find(|candidate| candidate.exists())
        .unwrap_or(p)
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/wishcard)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/wishcard");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/wishcard)
    let sys = PathBuf::from("/usr/share/wishcard");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First `config.toml` found wins. No file at all is not an error.
fn load_toml(search_dirs: &[PathBuf]) -> Result<TomlConfig, ConfigError> {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            return parse_file(&path);
        }
    }
    Ok(TomlConfig::default())
}

fn parse_file(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    toml::from_str::<TomlConfig>(&text)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_str(text: &str) -> GreetConfig {
        let t: TomlConfig = toml::from_str(text).expect("test toml parses");
        GreetConfig::from_toml(t, &[])
    }

    #[test]
    fn empty_file_gives_defaults() {
        let c = from_str("");
        assert_eq!(c.timing.preview_ms, 3000);
        assert_eq!(c.timing.mismatch_ms, 1000);
        assert_eq!(c.timing.candles_advance_ms, 2000);
        assert_eq!(c.memory.icons.len(), 8);
        assert_eq!(c.puzzle.grid_size, 3);
        assert_eq!(c.candles.count, 3);
        assert_eq!(c.confetti.palette.len(), 4);
        assert_eq!(c.confetti.small_burst, 50);
        assert_eq!(c.confetti.big_burst, 150);
        assert_eq!(c.journey.texts.len(), 4);
        assert_eq!(c.media.visibility_threshold, 0.5);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = from_str(
            "[timing]\npreview_ms = 500\n\n[memory]\nicons = [\"A\", \"B\"]\n",
        );
        assert_eq!(c.timing.preview_ms, 500);
        assert_eq!(c.timing.mismatch_ms, 1000);
        assert_eq!(c.memory.icons, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn duplicate_icons_fall_back() {
        let c = from_str("[memory]\nicons = [\"A\", \"A\"]\n");
        assert_eq!(c.memory.icons, default_icons());
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let c = from_str(
            "[puzzle]\ngrid_size = 12\n[candles]\ncount = 0\n[media]\nvisibility_threshold = 2.0\n",
        );
        assert_eq!(c.puzzle.grid_size, 3);
        assert_eq!(c.candles.count, 3);
        assert_eq!(c.media.visibility_threshold, 0.5);
    }

    #[test]
    fn bad_palette_falls_back() {
        let c = from_str("[confetti]\npalette = [\"#fff\", \"gold\"]\n");
        assert_eq!(c.confetti.palette.len(), 4);
        let ok = from_str("[confetti]\npalette = [\"#fff\"]\n");
        assert_eq!(ok.confetti.palette, vec![Rgb { r: 255, g: 255, b: 255 }]);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = std::env::temp_dir().join(format!("wishcard-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("config.toml");
        std::fs::write(&path, "[timing\npreview_ms = ").expect("write");
        let err = load_toml(&[dir.clone()]).expect_err("should not parse");
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = std::env::temp_dir().join("wishcard-cfg-definitely-missing");
        assert!(load_toml(&[dir]).is_ok());
    }
}
