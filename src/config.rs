//! Editor configuration loaded from TOML.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for an editor session. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Engine sample rate in Hz.
    pub sample_rate: u32,
    /// Offline render block size in frames.
    pub block_size: usize,
    /// Upper end of the gain slider; gain = slider / max.
    pub gain_slider_max: f32,
    /// Gain applied to new volume controls.
    pub default_gain: f32,
    /// Glyphs for pin labels, cycled by label index.
    pub pin_alphabet: String,
    /// A pin carrying this many labels ignores further connect clicks.
    pub max_pin_labels: usize,
    /// MIME types accepted from drag and drop.
    pub accepted_media: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 128,
            gain_slider_max: 2000.0,
            default_gain: 1.0,
            pin_alphabet: crate::pin::DEFAULT_ALPHABET.to_string(),
            max_pin_labels: 5,
            accepted_media: vec![
                "audio/mp3".to_string(),
                "audio/ogg".to_string(),
                "audio/wav".to_string(),
            ],
        }
    }
}

impl EditorConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the session cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if self.block_size == 0 {
            return Err(invalid("block_size", "must be positive"));
        }
        if !(self.gain_slider_max.is_finite() && self.gain_slider_max > 0.0) {
            return Err(invalid("gain_slider_max", "must be a positive number"));
        }
        if !(self.default_gain.is_finite() && self.default_gain >= 0.0) {
            return Err(invalid("default_gain", "must be a non-negative number"));
        }
        if self.pin_alphabet.is_empty() {
            return Err(invalid("pin_alphabet", "must not be empty"));
        }
        if self.max_pin_labels == 0 {
            return Err(invalid("max_pin_labels", "must be at least 1"));
        }
        if let Some(bad) = self
            .accepted_media
            .iter()
            .find(|m| crate::ingest::MediaKind::from_mime(m).is_none())
        {
            return Err(invalid("accepted_media", &format!("'{bad}' is not an audio type")));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gain_slider_max, 2000.0);
        assert_eq!(config.max_pin_labels, 5);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = EditorConfig::from_toml_str("sample_rate = 44100\n").unwrap();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.block_size, 128);
        assert_eq!(config.accepted_media.len(), 3);
    }

    #[test]
    fn toml_roundtrip() {
        let config = EditorConfig {
            pin_alphabet: "xyz".into(),
            ..Default::default()
        };
        let parsed = EditorConfig::from_toml_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EditorConfig::from_toml_str("gain_slider_max = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gain_slider_max", .. }));
        let err = EditorConfig::from_toml_str("accepted_media = [\"text/plain\"]\n").unwrap_err();
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EditorConfig::from_toml_str("sample_rate = [").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}
