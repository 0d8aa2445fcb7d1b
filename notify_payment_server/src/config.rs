use std::{env, time::Duration};

use log::*;
use notify_payment_engine::{DealPolicy, DEFAULT_AUTO_REJECT_TIMEOUT, DEFAULT_INSTRUCTION_TEMPLATE};
use npg_common::{parse_boolean_flag, parse_optional_string, Secret};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_NPG_HOST: &str = "127.0.0.1";
const DEFAULT_NPG_PORT: u16 = 3001;
const GENERATED_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The bearer token that forwarding devices must present on `/notify`.
    pub notify_secret: Secret<String>,
    /// The bearer token for the deal, device and account routes. If `None`, those routes are open.
    pub admin_token: Option<Secret<String>>,
    /// Pending deals are rejected after this long.
    pub deal_timeout: Duration,
    /// If true, every deal must be linked to an account.
    pub require_account: bool,
    pub payment_instruction_template: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_NPG_HOST.to_string(),
            port: DEFAULT_NPG_PORT,
            notify_secret: Secret::new(random_secret()),
            admin_token: None,
            deal_timeout: DEFAULT_AUTO_REJECT_TIMEOUT,
            require_account: false,
            payment_instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("NPG_HOST").ok().unwrap_or_else(|| DEFAULT_NPG_HOST.into());
        let port = env::var("NPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for NPG_PORT. {e} Using the default, {DEFAULT_NPG_PORT}, instead."
                    );
                    DEFAULT_NPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_NPG_PORT);
        let notify_secret = parse_optional_string(env::var("NPG_NOTIFY_SECRET").ok()).unwrap_or_else(|| {
            warn!(
                "🚨️🚨️🚨️ NPG_NOTIFY_SECRET is not set. I'm using a random value for this session, so no device will be \
                 able to submit notifications. Set NPG_NOTIFY_SECRET to the token configured on your devices. 🚨️🚨️🚨️"
            );
            random_secret()
        });
        let admin_token = parse_optional_string(env::var("NPG_ADMIN_TOKEN").ok()).map(Secret::new);
        if admin_token.is_none() {
            warn!(
                "🪛️ NPG_ADMIN_TOKEN is not set. The deal, device and account routes are open to anyone who can reach \
                 this server."
            );
        }
        let deal_timeout = parse_deal_timeout(env::var("NPG_DEAL_TIMEOUT").ok());
        let require_account = flag_from_env("NPG_REQUIRE_ACCOUNT", false);
        let payment_instruction_template = parse_optional_string(env::var("NPG_PAYMENT_INSTRUCTION_TEMPLATE").ok())
            .unwrap_or_else(|| DEFAULT_INSTRUCTION_TEMPLATE.to_string());
        let use_x_forwarded_for = flag_from_env("NPG_USE_X_FORWARDED_FOR", false);
        let use_forwarded = flag_from_env("NPG_USE_FORWARDED", false);
        Self {
            host,
            port,
            notify_secret: Secret::new(notify_secret),
            admin_token,
            deal_timeout,
            require_account,
            payment_instruction_template,
            use_x_forwarded_for,
            use_forwarded,
        }
    }

    pub fn deal_policy(&self) -> DealPolicy {
        DealPolicy {
            auto_reject_timeout: self.deal_timeout,
            require_account: self.require_account,
            instruction_template: self.payment_instruction_template.clone(),
        }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers and middleware need. Secrets are excluded so that they
/// are not passed around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

fn flag_from_env(name: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(name).ok(), default).unwrap_or_else(|e| {
        warn!("🪛️ Invalid configuration value for {name}. {e} Using the default, {default}, instead.");
        default
    })
}

fn parse_deal_timeout(value: Option<String>) -> Duration {
    let Some(value) = parse_optional_string(value) else {
        info!(
            "🪛️ NPG_DEAL_TIMEOUT is not set. Using the default value of {} seconds.",
            DEFAULT_AUTO_REJECT_TIMEOUT.as_secs()
        );
        return DEFAULT_AUTO_REJECT_TIMEOUT;
    };
    match value.parse::<u64>() {
        Ok(0) => {
            warn!("🪛️ NPG_DEAL_TIMEOUT must be greater than zero. Using the default value instead.");
            DEFAULT_AUTO_REJECT_TIMEOUT
        },
        Ok(secs) => Duration::from_secs(secs),
        Err(e) => {
            warn!("🪛️ Invalid configuration value for NPG_DEAL_TIMEOUT. {e}. Using the default value instead.");
            DEFAULT_AUTO_REJECT_TIMEOUT
        },
    }
}

fn random_secret() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(GENERATED_SECRET_LENGTH).map(char::from).collect()
}
