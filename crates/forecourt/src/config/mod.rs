use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service. The
/// dev identity provider is only wired up outside `Production`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub rewards: RewardConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("APP_PORT", 5000u16)?;
        let public_url =
            env::var("APP_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let jwt_secret =
            env::var("APP_JWT_SECRET").unwrap_or_else(|_| "forecourt-dev-secret".to_string());
        let token_ttl_hours = parse_env("APP_TOKEN_TTL_HOURS", 168i64)?;
        let dev_token = env::var("APP_DEV_TOKEN").ok().filter(|t| !t.is_empty());

        let visit_threshold = parse_env("APP_VISIT_THRESHOLD", 5u64)?;
        if visit_threshold == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "APP_VISIT_THRESHOLD",
            });
        }
        let duplicate_window_hours = parse_env("APP_DUPLICATE_WINDOW_HOURS", 24i64)?;
        let coupon_ttl_days = match env::var("APP_COUPON_TTL_DAYS") {
            Ok(raw) => Some(raw.parse::<i64>().map_err(|_| ConfigError::InvalidNumber {
                var: "APP_COUPON_TTL_DAYS",
            })?),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                public_url,
            },
            telemetry: TelemetryConfig { log_level },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours,
                dev_token,
            },
            rewards: RewardConfig {
                visit_threshold,
                duplicate_window_hours,
                coupon_ttl_days,
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding and public links.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL baked into station QR payloads.
    pub public_url: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Token signing and the optional dev bearer token.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Configuration-gated test identity; never honored in production.
    pub dev_token: Option<String>,
}

/// Visit-counting and coupon-issuance knobs.
#[derive(Debug, Clone)]
pub struct RewardConfig {
    /// A coupon is issued on every Nth visit.
    pub visit_threshold: u64,
    pub duplicate_window_hours: i64,
    pub coupon_ttl_days: Option<i64>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str },
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var } => write!(f, "{var} must be a valid number"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
