use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::queue::DEFAULT_QUEUE_CAPACITY;

const DEFAULT_OPTIONS_FILE: &str = "options.toml";
const DEFAULT_VIDEO_EXTENSION: &str = "mp4";
const DEFAULT_MIN_BRIGHTNESS: u8 = 10;
const DEFAULT_MIN_SIZE: u64 = 325;
const DEFAULT_MAX_SIZE: u64 = 40_000;
const DEFAULT_RESULT_FILE: &str = "insects_per_frame.csv";
const DEFAULT_VIDEO_INFO_FILE: &str = "video_info.csv";
pub const DEFAULT_ANNOTATE_DIR: &str = "annotated";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CounterConfigFile {
    input: Option<InputConfigFile>,
    detection: Option<DetectionConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct InputConfigFile {
    folder: Option<PathBuf>,
    extension: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    min_brightness: Option<u8>,
    min_size: Option<u64>,
    max_size: Option<u64>,
    queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    result_file: Option<PathBuf>,
    video_info_file: Option<PathBuf>,
    annotate_dir: Option<PathBuf>,
}

/// Batch settings, layered: defaults, options file, `COUNTER_*` environment,
/// then whatever the caller overrides before calling [`CounterSettings::validate`].
///
/// `min_size` and `max_size` are in millionths of the transformed frame area.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSettings {
    pub folder: Option<PathBuf>,
    pub video_extension: String,
    pub min_brightness: u8,
    pub min_size: u64,
    pub max_size: u64,
    pub queue_capacity: usize,
    pub result_file: PathBuf,
    pub video_info_file: PathBuf,
    pub annotate_dir: Option<PathBuf>,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            folder: None,
            video_extension: DEFAULT_VIDEO_EXTENSION.to_string(),
            min_brightness: DEFAULT_MIN_BRIGHTNESS,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            result_file: PathBuf::from(DEFAULT_RESULT_FILE),
            video_info_file: PathBuf::from(DEFAULT_VIDEO_INFO_FILE),
            annotate_dir: None,
        }
    }
}

impl CounterSettings {
    /// Load from `path`, else `COUNTER_CONFIG`, else `options.toml` in the
    /// working directory when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| {
                std::env::var("COUNTER_CONFIG")
                    .ok()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_OPTIONS_FILE);
                default.exists().then_some(default)
            });
        let file_cfg = match config_path.as_deref() {
            Some(path) => {
                log::debug!("config: reading {}", path.display());
                Some(read_config_file(path)?)
            }
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CounterConfigFile) -> Self {
        let defaults = Self::default();
        let input = file.input.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        Self {
            folder: input.folder,
            video_extension: input.extension.unwrap_or(defaults.video_extension),
            min_brightness: detection.min_brightness.unwrap_or(defaults.min_brightness),
            min_size: detection.min_size.unwrap_or(defaults.min_size),
            max_size: detection.max_size.unwrap_or(defaults.max_size),
            queue_capacity: detection.queue_capacity.unwrap_or(defaults.queue_capacity),
            result_file: output.result_file.unwrap_or(defaults.result_file),
            video_info_file: output.video_info_file.unwrap_or(defaults.video_info_file),
            annotate_dir: output.annotate_dir,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(folder) = std::env::var("COUNTER_FOLDER") {
            if !folder.trim().is_empty() {
                self.folder = Some(PathBuf::from(folder));
            }
        }
        if let Some(value) = env_number("COUNTER_MIN_BRIGHTNESS")? {
            self.min_brightness = value;
        }
        if let Some(value) = env_number("COUNTER_MIN_SIZE")? {
            self.min_size = value;
        }
        if let Some(value) = env_number("COUNTER_MAX_SIZE")? {
            self.max_size = value;
        }
        if let Some(value) = env_number("COUNTER_QUEUE_CAPACITY")? {
            self.queue_capacity = value;
        }
        if let Ok(path) = std::env::var("COUNTER_RESULT_FILE") {
            if !path.trim().is_empty() {
                self.result_file = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("COUNTER_VIDEO_INFO_FILE") {
            if !path.trim().is_empty() {
                self.video_info_file = PathBuf::from(path);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_size > self.max_size {
            return Err(anyhow!(
                "min_size ({}) must not exceed max_size ({})",
                self.min_size,
                self.max_size
            ));
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue_capacity must be greater than zero"));
        }
        let extension = self.video_extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(anyhow!(
                "invalid video extension '{}'",
                self.video_extension
            ));
        }
        Ok(())
    }

    /// Video extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.video_extension.trim_start_matches('.')
    }

    /// Size bounds in pixels² for a transformed frame of `width` x `height`.
    pub fn size_bounds(&self, width: u32, height: u32) -> (u64, u64) {
        (
            area_fraction_to_pixels(self.min_size, width, height),
            area_fraction_to_pixels(self.max_size, width, height),
        )
    }
}

/// Convert an area given in millionths of the frame into pixels², truncating.
pub fn area_fraction_to_pixels(millionths: u64, width: u32, height: u32) -> u64 {
    let area = width as f64 * height as f64;
    (millionths as f64 * 1e-6 * area) as u64
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a non-negative integer", key)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<CounterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
