use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.provider, Provider::OpenAi);
    assert_eq!(config.embedding.model, "text-embedding-3-large");
    assert_eq!(config.generation.model, "gpt-4o-mini");
    assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(config.retrieval.k, 3);
    assert_eq!(config.retrieval.table, "plan_chunks");
    assert!(config.prompt.system_template.is_none());
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.embedding.base_url = Some("ftp://example.com".to_string());
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.generation.base_url = Some("not a url".to_string());
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.generation.model = "   ".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidModel("generation"))
    ));

    let mut invalid_config = config.clone();
    invalid_config.generation.temperature = 2.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.timeout_seconds = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTimeout(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));

    let mut invalid_config = config;
    invalid_config.prompt.system_template = Some("Sin contexto".to_string());
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTemplate(_))
    ));
}

#[test]
fn setter_validation() {
    let mut config = Config::default();

    assert!(config.retrieval.set_k(5).is_ok());
    assert_eq!(config.retrieval.k, 5);
    assert!(config.retrieval.set_k(0).is_err());
    assert!(config.retrieval.set_k(51).is_err());
    assert_eq!(config.retrieval.k, 5);

    assert!(config.generation.set_temperature(0.0).is_ok());
    assert!(config.generation.set_temperature(-0.1).is_err());
    assert!(config.generation.set_temperature(2.1).is_err());
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let toml_str = r#"
        [generation]
        provider = "ollama"
        base_url = "http://localhost:11434"
        model = "llama3.1"

        [retrieval]
        k = 5
    "#;

    let config: Config = toml::from_str(toml_str).expect("should parse partial toml");
    assert_eq!(config.generation.provider, Provider::Ollama);
    assert_eq!(config.generation.model, "llama3.1");
    assert!((config.generation.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
    assert_eq!(config.retrieval.k, 5);
    assert_eq!(config.retrieval.table, "plan_chunks");
    assert_eq!(config.embedding, EmbeddingConfig::default());
}

#[test]
fn ollama_generation_without_url_uses_ollama_default() {
    let config: Config = toml::from_str("[generation]\nprovider = \"ollama\"\n")
        .expect("should parse partial toml");

    assert_eq!(config.generation.base_url, None);
    assert_eq!(config.generation.base_url(), "http://localhost:11434");
    assert_eq!(
        config
            .generation
            .service_url()
            .expect("default url is valid")
            .as_str(),
        "http://localhost:11434/"
    );
    assert_eq!(
        config.embedding.service_url().expect("default url is valid").as_str(),
        "https://api.openai.com/"
    );
}

#[test]
fn ollama_embedding_without_url_uses_ollama_default() {
    let config: Config = toml::from_str("[embedding]\nprovider = \"ollama\"\n")
        .expect("should parse partial toml");

    assert_eq!(config.embedding.base_url, None);
    assert_eq!(
        config.embedding.service_url().expect("default url is valid").as_str(),
        "http://localhost:11434/"
    );
    assert!(config.validate().is_ok());
}

#[test]
fn explicit_url_overrides_provider_default() {
    let mut generation = GenerationConfig {
        provider: Provider::Ollama,
        base_url: Some("http://gpu-box:11434/".to_string()),
        ..GenerationConfig::default()
    };
    assert_eq!(generation.base_url(), "http://gpu-box:11434/");

    generation.base_url = Some("   ".to_string());
    assert_eq!(generation.base_url(), "http://localhost:11434");
}

#[test]
fn default_urls_are_not_written() {
    let toml_str = toml::to_string(&Config::default()).expect("should serialize toml correctly");
    assert!(!toml_str.contains("base_url"));
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.embedding, EmbeddingConfig::default());
    assert_eq!(config.index_path(), temp_dir.path().join("vectordb"));
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_dir = temp_dir.path().join("nested");

    let mut config = Config {
        base_dir: config_dir.clone(),
        ..Config::default()
    };
    config.retrieval.k = 4;
    config.generation.model = "gpt-4o".to_string();
    config.save().expect("should save config");

    assert!(config_dir.join("config.toml").exists());

    let loaded = Config::load(&config_dir).expect("should load saved config");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\nk = 0\n",
    )
    .expect("should write config");

    let result = Config::load(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::InvalidTopK(0))));

    fs::write(temp_dir.path().join("config.toml"), "[retrieval\nk = ")
        .expect("should write config");
    let result = Config::load(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn absolute_index_path_is_kept() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: PathBuf::from("/etc/pnd-assistant"),
        ..Config::default()
    };
    config.retrieval.index_path = temp_dir.path().join("index");

    assert_eq!(config.index_path(), temp_dir.path().join("index"));
}

#[test]
#[serial]
fn api_key_from_config_wins() {
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::set_var(API_KEY_ENV_VAR, "sk-from-env") };

    let mut config = Config::default();
    config.generation.api_key = Some("sk-from-file".to_string());

    let key = config
        .generation
        .resolve_api_key()
        .expect("should resolve key");
    assert_eq!(key.as_deref(), Some("sk-from-file"));

    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(API_KEY_ENV_VAR) };
}

#[test]
#[serial]
fn api_key_env_fallback() {
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::set_var(API_KEY_ENV_VAR, "sk-from-env") };

    let config = Config::default();
    let key = config
        .embedding
        .resolve_api_key()
        .expect("should resolve key");
    assert_eq!(key.as_deref(), Some("sk-from-env"));
    assert!(config.require_credentials().is_ok());

    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(API_KEY_ENV_VAR) };
}

#[test]
#[serial]
fn missing_api_key_is_a_configuration_error() {
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(API_KEY_ENV_VAR) };

    let mut config = Config::default();
    config.embedding.api_key = Some("  ".to_string());

    assert!(matches!(
        config.require_credentials(),
        Err(ConfigError::MissingApiKey("embedding"))
    ));

    config.embedding.api_key = Some("sk-embed".to_string());
    assert!(matches!(
        config.require_credentials(),
        Err(ConfigError::MissingApiKey("generation"))
    ));
}

#[test]
#[serial]
fn ollama_needs_no_api_key() {
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(API_KEY_ENV_VAR) };

    let mut config = Config::default();
    config.embedding.provider = Provider::Ollama;
    config.generation.provider = Provider::Ollama;

    assert!(config.require_credentials().is_ok());
    assert_eq!(
        config
            .generation
            .resolve_api_key()
            .expect("should resolve key"),
        None
    );
}
