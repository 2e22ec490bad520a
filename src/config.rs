use std::env;
use std::path::PathBuf;

// ============================================================================
// Configuration
// ============================================================================

const DEFAULT_PORT: u16 = 5200;
const DEFAULT_ORDERS_FILE: &str = "orders.json";
const DEFAULT_ADMIN_EMAIL: &str = "admin@orderdesk.local";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin@123";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub orders_file: PathBuf,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(port = %raw, "Invalid PORT, using {}", DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let orders_file = env::var("ORDERS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ORDERS_FILE));

        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
        let admin_password =
            env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

        Self {
            port,
            orders_file,
            admin_email,
            admin_password,
        }
    }

    pub fn is_admin(&self, email: &str, password: &str) -> bool {
        email == self.admin_email && password == self.admin_password
    }
}
