/*!
 * Tests for loading and validating configuration files
 */

use anyhow::Result;
use std::fs;
use std::time::Duration;

use sqlchat::app_config::{
    CachePolicyKind, Config, DatabaseBackend, LogLevel, TranslationProvider,
};
use sqlchat::database::{BackendKind, ConnectionTarget};
use sqlchat::translation::CachePolicy;

use crate::common;

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("nested").join("sqlchat.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.translation.provider, TranslationProvider::Groq);
    assert_eq!(config.translation.get_model(), "llama3-8b-8192");
    assert!(config.database.read_only);

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(written["translation"]["provider"], "groq");
    Ok(())
}

#[test]
fn test_loadOrCreate_withOllamaFile_shouldUseItsProviderSettings() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("sqlchat.json");
    fs::write(
        &path,
        r#"{
            "database": { "sqlite_path": "/tmp/class.db", "read_only": false },
            "translation": {
                "provider": "ollama",
                "available_providers": [
                    { "type": "ollama", "model": "sqlcoder", "endpoint": "http://gpu-box:11434" }
                ],
                "common": { "temperature": 0.1 }
            },
            "pipeline": { "explain": true, "cache": { "policy": "unbounded" } },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.get_model(), "sqlcoder");
    assert_eq!(config.translation.get_endpoint(), "http://gpu-box:11434");
    assert_eq!(config.translation.get_timeout_secs(), 30);
    assert_eq!(config.translation.common.temperature, Some(0.1));
    assert_eq!(
        config.translation.common.sql_prompt().system,
        "You are an assistant that generates SQL queries."
    );
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.pipeline.cache.policy, CachePolicyKind::Unbounded);
    assert_eq!(config.pipeline.cache.to_policy(), CachePolicy::Unbounded);
    assert!(config.pipeline.to_pipeline_config().explain);
    assert!(config.validate().is_ok());

    match config.database.to_target()? {
        ConnectionTarget::File(file) => {
            assert_eq!(file.path, std::path::PathBuf::from("/tmp/class.db"));
            assert!(!file.read_only);
        }
        other => panic!("Expected file target, got {}", other),
    }
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("sqlchat.json");
    fs::write(&path, "{ not json")?;

    let error = Config::load_or_create(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_pipelineConfig_defaults_shouldLimitBothStages() {
    let pipeline = Config::default().pipeline.to_pipeline_config();

    assert!(!pipeline.explain);
    assert_eq!(pipeline.translation_timeout, Some(Duration::from_secs(60)));
    assert_eq!(pipeline.execution_timeout, Some(Duration::from_secs(30)));
}

#[test]
fn test_mysqlBackend_withCompleteSettings_shouldBuildNetworkTarget() -> Result<()> {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.database.backend = DatabaseBackend::Mysql;
    config.database.mysql.host = "db.internal".to_string();
    config.database.mysql.user = "reader".to_string();
    config.database.mysql.password = "p@ss".to_string();
    config.database.mysql.database = "school".to_string();

    assert!(config.validate().is_ok());
    let target = config.database.to_target()?;
    assert_eq!(target.kind(), BackendKind::Network);
    assert!(!target.to_string().contains("p@ss"));
    Ok(())
}

#[test]
fn test_mysqlBackend_withNonNumericPort_shouldFailValidation() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config.database.backend = DatabaseBackend::Mysql;
    config.database.mysql.user = "reader".to_string();
    config.database.mysql.database = "school".to_string();
    config.database.mysql.port = "33o6".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn test_applyApiKey_withoutExplicitKey_shouldKeepConfiguredKeyForLocalProvider() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    config.translation.active_provider_config_mut().api_key = "local-key".to_string();

    config.apply_api_key(None);

    assert_eq!(config.translation.get_api_key(), "local-key");
}

#[test]
fn test_applyApiKey_withMissingProviderEntry_shouldAddIt() {
    let mut config = Config::default();
    config.translation.available_providers.clear();
    config.translation.provider = TranslationProvider::Anthropic;

    config.apply_api_key(Some("sk-ant-cli".to_string()));

    assert_eq!(config.translation.get_api_key(), "sk-ant-cli");
    assert_eq!(config.translation.get_model(), "claude-3-haiku-20240307");
    assert!(config.validate().is_ok());
}

#[test]
fn test_providerFromStr_shouldBeCaseInsensitive() {
    assert_eq!("LMStudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert_eq!("GROQ".parse::<TranslationProvider>().unwrap(), TranslationProvider::Groq);
    assert!("bard".parse::<TranslationProvider>().is_err());
}
