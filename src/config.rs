use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    pub jwt_expiracao_minutos: i64,
    /// Grace window (days) separating "vencido" from "inadimplente".
    pub carencia_dias: i64,
    /// Customer/debt cache TTL in seconds.
    pub cache_ttl_cliente: u64,
    /// Boleto cache TTL in seconds.
    pub cache_ttl_boleto: u64,
    /// Seeded operator account; password is hashed before storage.
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable required"))
                .and_then(|secret| {
                    if secret.trim().len() < 16 {
                        anyhow::bail!("JWT_SECRET must have at least 16 characters");
                    }
                    Ok(secret)
                })?,
            jwt_expiracao_minutos: std::env::var("JWT_EXPIRACAO_MINUTOS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRACAO_MINUTOS must be a number"))?,
            carencia_dias: std::env::var("CARENCIA_DIAS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CARENCIA_DIAS must be a number"))?,
            cache_ttl_cliente: std::env::var("CACHE_TTL_CLIENTE")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CACHE_TTL_CLIENTE must be a number of seconds"))?,
            cache_ttl_boleto: std::env::var("CACHE_TTL_BOLETO")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CACHE_TTL_BOLETO must be a number of seconds"))?,
            admin_username: std::env::var("ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Grace window: {} days", config.carencia_dias);
        tracing::debug!(
            "Cache TTLs: cliente {}s, boleto {}s",
            config.cache_ttl_cliente,
            config.cache_ttl_boleto
        );

        Ok(config)
    }
}
