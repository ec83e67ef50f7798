use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub directories: Directories,
    pub vad: VadSettings,
    pub toggles: Toggles,
}

/// Input/output/temp directory layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Directories {
    pub input: PathBuf,
    pub output: PathBuf,
    pub temp: PathBuf,
}

/// Voice-activity-detection thresholds for the batch pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadSettings {
    /// Noise floor handed to the silence-detection filter (e.g. "-30dB")
    pub noise_floor_db: String,
    pub min_silence_secs: f64,
    pub min_speech_secs: f64,
    pub padding_secs: f64,
}

/// Read-only diagnostic logging toggles, passed by reference into components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Toggles {
    /// Log each raw audio push received from the capture backend
    pub log_audio_data: bool,
    /// Log "processing chunk" messages in the live loop
    pub log_chunk_processing: bool,
    /// Detailed diagnostic messages for the transcription flow
    pub diagnostic: bool,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            input: PathBuf::from("recordings"),
            output: PathBuf::from("transcripts"),
            temp: PathBuf::from("tmp"),
        }
    }
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            noise_floor_db: defaults::NOISE_FLOOR_DB.to_string(),
            min_silence_secs: defaults::MIN_SILENCE_SECS,
            min_speech_secs: defaults::MIN_SPEECH_SECS,
            padding_secs: defaults::PADDING_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist.
    ///
    /// Invalid TOML is still an error; only a missing file falls back.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCRIBA_INPUT_DIR → directories.input
    /// - SCRIBA_OUTPUT_DIR → directories.output
    /// - SCRIBA_TEMP_DIR → directories.temp
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("SCRIBA_INPUT_DIR")
            && !dir.is_empty()
        {
            self.directories.input = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SCRIBA_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.directories.output = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SCRIBA_TEMP_DIR")
            && !dir.is_empty()
        {
            self.directories.temp = PathBuf::from(dir);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/scriba/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("scriba").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.vad.noise_floor_db, "-30dB");
        assert_eq!(config.vad.min_silence_secs, 0.8);
        assert_eq!(config.vad.min_speech_secs, 0.3);
        assert_eq!(config.vad.padding_secs, 0.15);

        assert!(!config.toggles.log_audio_data);
        assert!(!config.toggles.log_chunk_processing);
        assert!(!config.toggles.diagnostic);
    }

    #[test]
    fn test_load_full_config_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[directories]
input = "/data/in"
output = "/data/out"
temp = "/data/tmp"

[vad]
noise_floor_db = "-35dB"
min_silence_secs = 1.0
min_speech_secs = 0.5
padding_secs = 0.2

[toggles]
log_audio_data = true
diagnostic = true
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.directories.input, PathBuf::from("/data/in"));
        assert_eq!(config.directories.output, PathBuf::from("/data/out"));
        assert_eq!(config.directories.temp, PathBuf::from("/data/tmp"));
        assert_eq!(config.vad.noise_floor_db, "-35dB");
        assert_eq!(config.vad.min_silence_secs, 1.0);
        assert_eq!(config.vad.min_speech_secs, 0.5);
        assert_eq!(config.vad.padding_secs, 0.2);
        assert!(config.toggles.log_audio_data);
        assert!(!config.toggles.log_chunk_processing);
        assert!(config.toggles.diagnostic);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing_fields() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[vad]
min_silence_secs = 2.5
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.vad.min_silence_secs, 2.5);
        assert_eq!(config.vad.noise_floor_db, "-30dB");
        assert_eq!(config.directories.input, PathBuf::from("recordings"));
    }

    #[test]
    fn test_load_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not = valid [ toml").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file_falls_back() {
        let config = Config::load_or_default(Path::new("/nonexistent/scriba.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_toml_still_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "broken = [").unwrap();
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_toggles_are_copy() {
        let toggles = Toggles {
            log_audio_data: true,
            log_chunk_processing: false,
            diagnostic: true,
        };
        let copied = toggles;
        assert!(copied.log_audio_data);
        assert!(toggles.diagnostic);
    }
}
