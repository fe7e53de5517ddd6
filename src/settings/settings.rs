// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::audio::resample::DEFAULT_CHUNK_SIZE;

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How often the progress bar is refreshed while playing
    pub progress_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            // Roughly one display frame
            progress_interval_ms: 16,
        }
    }
}

impl PlaybackSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

/// Output device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub volume: f32, // 0.0-1.0
    pub resampler_chunk_size: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            resampler_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Main player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub version: i32, // Settings schema version for future migrations
    pub playback: PlaybackSettings,
    pub output: OutputSettings,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: 1,
            playback: PlaybackSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

impl PlayerSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("player_settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let settings: PlayerSettings =
            serde_json::from_str(&content).context("Failed to parse settings")?;

        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        // Ensure directory exists
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;

        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PlayerSettings::load(dir.path()).unwrap();
        assert_eq!(settings, PlayerSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("nested");

        let mut settings = PlayerSettings::default();
        settings.output.volume = 0.25;
        settings.playback.progress_interval_ms = 50;
        settings.save(&app_dir).unwrap();

        assert_eq!(PlayerSettings::load(&app_dir).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            PlayerSettings::get_settings_path(dir.path()),
            r#"{ "output": { "volume": 0.5 } }"#,
        )
        .unwrap();

        let settings = PlayerSettings::load(dir.path()).unwrap();
        assert_eq!(settings.output.volume, 0.5);
        assert_eq!(settings.output.resampler_chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.playback, PlaybackSettings::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(PlayerSettings::get_settings_path(dir.path()), "{ nope").unwrap();
        assert!(PlayerSettings::load(dir.path()).is_err());
    }

    #[test]
    fn test_progress_interval_never_zero() {
        let settings = PlaybackSettings { progress_interval_ms: 0 };
        assert_eq!(settings.progress_interval(), Duration::from_millis(1));
    }
}
