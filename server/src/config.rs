use anyhow::{Context, Result};
use platform_db::DatabaseSettings;

const DEFAULT_PIPELINE: &str = "Vendas";
const DEFAULT_LOSS_REASONS: &str = "Preco,Concorrencia,Sem retorno do cliente";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub default_pipeline: String,
    pub default_loss_reasons: Vec<String>,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database =
            DatabaseSettings::from_lookup(&lookup).context("invalid database settings")?;

        let default_pipeline = lookup("DEFAULT_PIPELINE_NAME")
            .map(|raw| raw.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_PIPELINE.into());

        let default_loss_reasons = split_list(
            &lookup("DEFAULT_LOSS_REASONS").unwrap_or_else(|| DEFAULT_LOSS_REASONS.into()),
        );
        let cors_allowed_origins = split_list(
            &lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into()),
        );

        Ok(Self {
            database,
            default_pipeline,
            default_loss_reasons,
            cors_allowed_origins,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
