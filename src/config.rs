use std::{env, fmt::Display, str::FromStr};

pub const DEFAULT_JWT_SECRET: &str = "change-me-jwt-secret";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub upload_dir: String,
    pub jwt: JwtConfig,
    pub seed: SeedConfig,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub schedule: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = var_or("JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            log::warn!("JWT_SECRET not set. Using an insecure default secret. Set JWT_SECRET in production.");
        }

        Self {
            database_url: var_or("DATABASE_URL", "sqlite://./data/barbershop.db"),
            port: parse_or("PORT", 8080),
            upload_dir: var_or("UPLOAD_DIR", "./uploads"),
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_hours: parse_or("JWT_TTL_HOURS", 72),
            },
            seed: SeedConfig {
                admin_email: var_or("ADMIN_EMAIL", "admin@barbershop.local"),
                admin_password: var_or("ADMIN_PASSWORD", "admin"),
                admin_name: var_or("ADMIN_NAME", "Shop Admin"),
                schedule: parse_or("SEED_SCHEDULE", false),
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|err| {
            log::warn!("Invalid {key} value '{raw}': {err}. Using default {default}.");
            default
        }),
        Err(_) => default,
    }
}
