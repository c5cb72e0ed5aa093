use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub identity_server_url: String,
    pub identity_api_token: String,
    pub port: u16,
    pub help_docs_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            identity_server_url: std::env::var("IDENTITY_SERVER_URL")
                .map_err(|_| {
                    anyhow::anyhow!("IDENTITY_SERVER_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("IDENTITY_SERVER_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("IDENTITY_SERVER_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })?,
            identity_api_token: std::env::var("IDENTITY_API_TOKEN")
                .map_err(|_| anyhow::anyhow!("IDENTITY_API_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("IDENTITY_API_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            help_docs_base_url: std::env::var("HELP_DOCS_BASE_URL")
                .map_err(|_| anyhow::anyhow!("HELP_DOCS_BASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("HELP_DOCS_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("HELP_DOCS_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Identity server URL: {}", config.identity_server_url);
        tracing::debug!("Help docs base URL: {}", config.help_docs_base_url);
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }
}
