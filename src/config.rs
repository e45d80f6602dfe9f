use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classify::Thresholds;
use crate::prompt::Similarity;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Overrides for the basic boost profile
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_skip")]
    pub skip: f32,
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default = "default_detailed_duration")]
    pub detailed_duration: f32,
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration: f32,
    #[serde(default)]
    pub segments: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptConfig {
    #[serde(default)]
    pub similarity: Similarity,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            skip: default_skip(),
            duration: default_duration(),
            detailed_duration: default_detailed_duration(),
            fallback_duration: default_fallback_duration(),
            segments: 0,
        }
    }
}

pub fn default_skip() -> f32 { 5.0 }
pub fn default_duration() -> f32 { 90.0 }
pub fn default_detailed_duration() -> f32 { 120.0 }
pub fn default_fallback_duration() -> f32 { 30.0 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// `./tunescribe.toml`, then `~/.config/tunescribe/config.toml`, then the
/// platform config directory.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("tunescribe.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("tunescribe").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("tunescribe").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.analysis.skip, 5.0);
        assert_eq!(cfg.analysis.duration, 90.0);
        assert_eq!(cfg.analysis.detailed_duration, 120.0);
        assert_eq!(cfg.analysis.fallback_duration, 30.0);
        assert_eq!(cfg.prompt.similarity, Similarity::High);
        assert_eq!(cfg.thresholds, Thresholds::basic());
    }

    #[test]
    fn sections_parse() {
        let cfg: Config = toml::from_str(
            r#"
            [analysis]
            skip = 0.0
            segments = 3

            [prompt]
            similarity = "low"
            instruments = ["kemenche", "tulum"]
            genre = "karadeniz"

            [thresholds]
            detection_floor = 0.15

            [thresholds.davul]
            min_onsets = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.skip, 0.0);
        assert_eq!(cfg.analysis.segments, 3);
        assert_eq!(cfg.analysis.duration, 90.0);
        assert_eq!(cfg.prompt.similarity, Similarity::Low);
        assert_eq!(cfg.prompt.instruments, vec!["kemenche", "tulum"]);
        assert_eq!(cfg.prompt.genre.as_deref(), Some("karadeniz"));
        assert_eq!(cfg.thresholds.detection_floor, 0.15);
        assert_eq!(cfg.thresholds.davul.min_onsets, 4);
        assert_eq!(cfg.thresholds.davul.gain, 0.7);
    }

    #[test]
    fn unreadable_config_is_none() {
        assert!(load_config(Path::new("/nonexistent/tunescribe.toml")).is_none());
    }
}
