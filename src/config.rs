use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Which `GuessStore` implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid STORE_BACKEND: {}. Must be one of: postgres, memory", s)),
        }
    }
}

/// Price oracle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub endpoint: String,
    pub asset: String,
    pub currency: String,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub fallback_enabled: bool,
    pub fallback_min: Decimal,
    pub fallback_max: Decimal,
    pub fallback_seed: Option<u64>,
}

/// Game rules
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub resolution_delay_secs: u64,
    pub win_delta: i64,
    pub loss_delta: i64,
    pub recent_guesses_limit: i64,
    pub sweep_interval_secs: u64,
    pub sweep_batch_size: i64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database: Option<DatabaseConfig>,
    pub oracle: OracleConfig,
    pub game: GameConfig,
    pub log_level: String,
    pub environment: String,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32);
        let acquire_timeout_secs = env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64);
        let idle_timeout_secs = env_parse("DATABASE_IDLE_TIMEOUT_SECS", 600u64); // 10 minutes
        let max_lifetime_secs = env_parse("DATABASE_MAX_LIFETIME_SECS", 1800u64); // 30 minutes
        let test_before_acquire = env_parse("DATABASE_TEST_BEFORE_ACQUIRE", true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/pricecall".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl OracleConfig {
    /// Create oracle config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let endpoint = env::var("PRICE_ENDPOINT").unwrap_or(defaults.endpoint);
        let asset = env::var("PRICE_ASSET").unwrap_or(defaults.asset);
        let currency = env::var("PRICE_CURRENCY").unwrap_or(defaults.currency);
        let request_timeout_secs =
            env_parse("PRICE_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs);
        let cache_ttl_secs = env_parse("PRICE_CACHE_TTL_SECS", defaults.cache_ttl_secs);
        let fallback_enabled = env_parse("PRICE_FALLBACK_ENABLED", defaults.fallback_enabled);
        let fallback_min = env_parse("PRICE_FALLBACK_MIN", defaults.fallback_min);
        let fallback_max = env_parse("PRICE_FALLBACK_MAX", defaults.fallback_max);
        let fallback_seed = env::var("PRICE_FALLBACK_SEED")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok());

        let config = Self {
            endpoint,
            asset,
            currency,
            request_timeout_secs,
            cache_ttl_secs,
            fallback_enabled,
            fallback_min,
            fallback_max,
            fallback_seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_secs == 0 {
            return Err("PRICE_REQUEST_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("PRICE_CACHE_TTL_SECS must be greater than 0".to_string());
        }
        if self.fallback_min <= Decimal::ZERO || self.fallback_min >= self.fallback_max {
            return Err(format!(
                "Invalid fallback range: {} - {} (need 0 < min < max)",
                self.fallback_min, self.fallback_max
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd"
                .to_string(),
            asset: "bitcoin".to_string(),
            currency: "usd".to_string(),
            request_timeout_secs: 5,
            cache_ttl_secs: 20,
            fallback_enabled: true,
            fallback_min: Decimal::new(3_000_000, 2),
            fallback_max: Decimal::new(7_000_000, 2),
            fallback_seed: None,
        }
    }
}

impl GameConfig {
    /// Create game config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            resolution_delay_secs: env_parse(
                "GUESS_RESOLUTION_DELAY_SECS",
                defaults.resolution_delay_secs,
            ),
            win_delta: env_parse("SCORE_WIN_DELTA", defaults.win_delta),
            loss_delta: env_parse("SCORE_LOSS_DELTA", defaults.loss_delta),
            recent_guesses_limit: env_parse("RECENT_GUESSES_LIMIT", defaults.recent_guesses_limit),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            sweep_batch_size: env_parse("SWEEP_BATCH_SIZE", defaults.sweep_batch_size),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.resolution_delay_secs == 0 {
            return Err("GUESS_RESOLUTION_DELAY_SECS must be greater than 0".to_string());
        }
        if self.win_delta < 0 {
            return Err("SCORE_WIN_DELTA must not be negative".to_string());
        }
        if self.loss_delta > 0 {
            return Err("SCORE_LOSS_DELTA must not be positive".to_string());
        }
        if self.loss_delta == i64::MIN {
            return Err(format!("SCORE_LOSS_DELTA must be greater than {}", i64::MIN));
        }
        if self.recent_guesses_limit <= 0 {
            return Err("RECENT_GUESSES_LIMIT must be greater than 0".to_string());
        }
        if self.sweep_interval_secs == 0 || self.sweep_batch_size <= 0 {
            return Err("SWEEP_INTERVAL_SECS and SWEEP_BATCH_SIZE must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn resolution_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.resolution_delay_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            resolution_delay_secs: 60,
            win_delta: 1,
            loss_delta: -1,
            recent_guesses_limit: 10,
            sweep_interval_secs: 30,
            sweep_batch_size: 100,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let store_backend = env::var("STORE_BACKEND")
            .map(|s| StoreBackend::from_str(&s))
            .unwrap_or(Ok(StoreBackend::Postgres))?;

        let database = match store_backend {
            StoreBackend::Postgres => Some(DatabaseConfig::from_env()?),
            StoreBackend::Memory => None,
        };

        let oracle = OracleConfig::from_env()?;
        let game = GameConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            store_backend,
            database,
            oracle,
            game,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database: None,
            oracle: OracleConfig::default(),
            game: GameConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}
