// Configuration management module
// Loads, validates and persists the TOML settings for the model services and the index

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_ENV_VAR, Config, ConfigError, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, EmbeddingConfig,
    GenerationConfig, PromptConfig, Provider, RetrievalConfig,
};

/// Resolve the configuration directory, preferring an explicit override
#[inline]
pub fn get_config_dir(
    override_dir: Option<&std::path::Path>,
) -> Result<std::path::PathBuf, ConfigError> {
    override_dir.map_or_else(Config::default_config_dir, |dir| Ok(dir.to_path_buf()))
}
