use crate::policy::{RateSelection, TargetRatePolicy};
use anyhow::Context;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use streamdec_audio::{Caps, DEFAULT_SAMPLE_RATE};

pub const CONFIG_DIR_NAME: &str = "streamdec";
pub const ENV_PREFIX: &str = "STREAMDEC";
pub const STDIO_PATH: &str = "-";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub stage: StageConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn parse() -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(config_file_path("config.toml")?.as_str()).required(false))
            .add_source(File::with_name("config.toml").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("stage.allowed_sample_rates")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build config")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize config")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input.path.is_empty() {
            anyhow::bail!("Input path is empty");
        } else if self.input.chunk_bytes == 0 {
            anyhow::bail!("Input chunk size must not be zero");
        } else if self.output.path.is_empty() {
            anyhow::bail!("Output path is empty");
        }
        Ok(())
    }
}

pub fn config_file_path(file_name: impl AsRef<Path>) -> anyhow::Result<String> {
    Ok(Path::new("/etc")
        .join(CONFIG_DIR_NAME)
        .join(file_name)
        .to_str()
        .context("Failed to build config file path")?
        .to_string())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StageConfig {
    /// Strictly ascending list of rates a stream may be converted to.
    pub allowed_sample_rates: Vec<u32>,
    pub rate_selection: RateSelection,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            allowed_sample_rates: vec![22_050, 32_000, 44_100, 48_000, 88_200, 96_000, 176_400, 192_000],
            rate_selection: RateSelection::default(),
        }
    }
}

impl StageConfig {
    pub fn policy(&self) -> anyhow::Result<TargetRatePolicy> {
        TargetRatePolicy::new(self.allowed_sample_rates.clone(), self.rate_selection)
            .context("Invalid stage configuration")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InputConfig {
    /// Raw PCM file to read, `-` for stdin.
    pub path: String,
    pub format: String,
    pub channels: u32,
    pub rate: u32,
    /// Bytes handed to the stage per buffer, independent of the frame size.
    pub chunk_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: STDIO_PATH.to_string(),
            format: "S16LE".to_string(),
            channels: 2,
            rate: DEFAULT_SAMPLE_RATE,
            chunk_bytes: 4096,
        }
    }
}

impl InputConfig {
    pub fn caps(&self) -> Caps {
        Caps::new(self.format.as_str(), self.channels, self.rate)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Destination of the converted stream, `-` for stdout.
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: STDIO_PATH.to_string(),
        }
    }
}
