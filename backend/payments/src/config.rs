//! Application configuration loaded from environment variables.

use crate::errors::{PaymentError, Result};

/// Which set of provider adapters the composition root wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Real adapters calling the providers' APIs.
    Live,
    /// In-memory fakes; no outbound calls. Used by demo deployments.
    Sandbox,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the REST API server
    pub api_port: u16,
    /// Path to the SQLite database file
    pub database_url: String,
    /// HS256 secret shared with the platform's auth service
    pub jwt_secret: String,
    /// ISO currency code applied to all charges
    pub currency: String,
    /// `live` or `sandbox` adapter wiring
    pub provider_mode: ProviderMode,
    /// Upper bound on a single adapter charge call, in seconds
    pub charge_timeout_secs: u64,
    /// Stripe API key and endpoint
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    /// Pre-shared secret for verifying Stripe webhook signatures
    pub stripe_webhook_secret: String,
    /// M-Pesa API endpoint and key
    pub mpesa_api_base: String,
    pub mpesa_api_key: String,
    /// Instasend API endpoint and key
    pub instasend_api_base: String,
    pub instasend_api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let provider_mode = match env_var("PROVIDER_MODE")
            .unwrap_or_else(|_| "sandbox".to_string())
            .as_str()
        {
            "live" => ProviderMode::Live,
            "sandbox" => ProviderMode::Sandbox,
            other => {
                return Err(PaymentError::Config(format!(
                    "Invalid PROVIDER_MODE: {other} (expected live or sandbox)"
                )))
            }
        };

        Ok(Config {
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| PaymentError::Config("Invalid API_PORT".to_string()))?,
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./zerohunger_donations.db".to_string()),
            jwt_secret: env_var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            currency: env_var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            provider_mode,
            charge_timeout_secs: env_var("CHARGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| PaymentError::Config("Invalid CHARGE_TIMEOUT_SECS".to_string()))?,
            stripe_secret_key: env_var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_api_base: env_var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_webhook_secret: env_var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            mpesa_api_base: env_var("MPESA_API_BASE")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            mpesa_api_key: env_var("MPESA_API_KEY").unwrap_or_default(),
            instasend_api_base: env_var("INSTASEND_API_BASE")
                .unwrap_or_else(|_| "https://payment.intasend.com".to_string()),
            instasend_api_key: env_var("INSTASEND_API_KEY").unwrap_or_default(),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| PaymentError::Config(format!("Missing env var: {key}")))
}
