use std::{
    env, fs,
    num::NonZeroUsize,
    ops::Deref,
    path::Path,
    str::FromStr,
    sync::Arc,
};

use anyhow::Context;
use tracing::{info, warn};

use crate::{
    error::Error,
    provider::{DatabasePool, HTTP},
    push::{DeliveryTransport, Dispatcher, PayloadBuilder, WebPush},
    registry::{MemoryRegistry, SubscriptionRegistry},
    types::Urgency,
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

pub struct State {
    pub config: Config,
    pub registry: Arc<dyn SubscriptionRegistry>,
    /// `None` when no VAPID credentials are configured.
    pub dispatcher: Option<Dispatcher>,
}

impl State {
    pub fn new(
        config: Config,
        registry: Arc<dyn SubscriptionRegistry>,
        transport: Option<Arc<dyn DeliveryTransport>>,
    ) -> State {
        let dispatcher = transport.map(|transport| {
            Dispatcher::new(
                registry.clone(),
                transport,
                PayloadBuilder::new(&config),
                NonZeroUsize::new(config.max_tasks),
            )
        });

        State {
            config,
            registry,
            dispatcher,
        }
    }

    /// Connects the registry and builds the push transport from `config`.
    pub async fn init(config: Config) -> Result<State, Error> {
        let registry = Self::init_registry(&config).await?;
        let transport = Self::init_transport(&config)?;

        Ok(Self::new(config, registry, transport))
    }

    async fn init_registry(
        config: &Config,
    ) -> Result<Arc<dyn SubscriptionRegistry>, Error> {
        match &config.database_url {
            Some(url) => {
                let database = DatabasePool::new(url, config).await?;
                database.init_migrations().await?;
                let registry: Arc<dyn SubscriptionRegistry> =
                    Arc::new(database.subscription);
                info!("Subscription registry: postgres");
                Ok(registry)
            },
            None => {
                warn!(
                    "DATABASE_URL not set, subscriptions are kept in memory only"
                );
                let registry: Arc<dyn SubscriptionRegistry> =
                    Arc::new(MemoryRegistry::new());
                Ok(registry)
            },
        }
    }

    fn init_transport(
        config: &Config,
    ) -> Result<Option<Arc<dyn DeliveryTransport>>, Error> {
        let Some(vapid) = &config.vapid else {
            warn!("VAPID keys not found, sending notifications is disabled");
            return Ok(None);
        };

        let http = HTTP::new(config)?;
        let transport: Arc<dyn DeliveryTransport> =
            Arc::new(WebPush::new(config, vapid, http)?);

        Ok(Some(transport))
    }
}

#[derive(Debug, Clone)]
pub struct VapidKeys {
    /// PEM encoded P-256 private key.
    pub private_key: Vec<u8>,
    /// Uncompressed public key, URL-safe base64 without padding.
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub allowed_origins: Vec<String>,
    pub timeout: u64,
    pub max_tasks: usize,
    pub status_code_to_delete: Vec<u16>,
    pub mail_to: String,
    pub push_ttl: i64,
    pub push_urgency: Urgency,
    pub notification_icon: String,
    pub notification_badge: String,
    pub notification_default_url: String,
    pub vapid: Option<VapidKeys>,
}

fn parse_config_vapid_keys() -> Result<Option<VapidKeys>, Error> {
    let directory = env!("CARGO_MANIFEST_DIR");
    let private_key_dir = format!("{}/cert/vapid_private.pem", directory);
    let public_key_dir = format!("{}/cert/vapid_public.b64", directory);

    if !Path::new(&private_key_dir).exists()
        || !Path::new(&public_key_dir).exists()
    {
        return Ok(None);
    }

    let private_key = fs::read(&private_key_dir)
        .with_context(|| format!("reading {}", private_key_dir))?;
    let public_key = fs::read_to_string(&public_key_dir)
        .with_context(|| format!("reading {}", public_key_dir))?;

    Ok(Some(VapidKeys {
        private_key,
        public_key: public_key.trim().to_owned(),
    }))
}

pub fn get_configuration() -> Result<Config, Error> {
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let database_url = env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());
    let max_connections = env::var("MAX_CONNECTIONS")?.parse()?;
    let allowed_origins = parse_list(&env::var("ALLOWED_ORIGINS")?);
    let timeout = env::var("TIMEOUT")?.parse()?;
    let max_tasks = env::var("MAX_TASKS")?.parse()?;
    let status_code_to_delete =
        parse_status_codes(&env::var("STATUS_CODE_TO_DELETE")?)?;
    let mail_to = env::var("MAIL_TO")?;
    let push_ttl = env::var("PUSH_TTL")?.parse()?;
    let push_urgency = Urgency::from_str(&env::var("PUSH_URGENCY")?)?;
    let notification_icon = env::var("NOTIFICATION_ICON")?;
    let notification_badge = env::var("NOTIFICATION_BADGE")?;
    let notification_default_url = env::var("NOTIFICATION_DEFAULT_URL")?;

    let vapid = parse_config_vapid_keys()?;

    let config = Config {
        server_host,
        port,
        database_url,
        max_connections,
        allowed_origins,
        timeout,
        max_tasks,
        status_code_to_delete,
        mail_to,
        push_ttl,
        push_urgency,
        notification_icon,
        notification_badge,
        notification_default_url,
        vapid,
    };

    Ok(config)
}

/// Loads `notifier.conf`, then `.env`, from the crate directory into the process
/// environment. Missing files are skipped.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";
    let notifier_config_file: &str = "notifier.conf";

    let directory = env!("CARGO_MANIFEST_DIR");

    for file in [notifier_config_file, config_file] {
        let path = format!("{}/{}", directory, file);
        if !Path::new(&path).exists() {
            continue;
        }

        let config_string = fs::read_to_string(path)?;
        for (key, value) in parse_config_string(&config_string) {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(&str, &str)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.to_owned())
        .collect()
}

fn parse_status_codes(value: &str) -> Result<Vec<u16>, Error> {
    let mut status_code_to_delete = vec![];

    for code in parse_list(value) {
        status_code_to_delete.push(code.parse::<u16>()?);
    }

    Ok(status_code_to_delete)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server_host: String::from("127.0.0.1"),
        port: 8080,
        database_url: None,
        max_connections: 5,
        allowed_origins: vec![String::from("*")],
        timeout: 5,
        max_tasks: 8,
        status_code_to_delete: vec![404, 410],
        mail_to: String::from("ops@league.example"),
        push_ttl: 86400,
        push_urgency: Urgency::High,
        notification_icon: String::from("/icons/icon-192x192.png"),
        notification_badge: String::from("/icons/badge-72x72.png"),
        notification_default_url: String::from("/"),
        vapid: None,
    }
}
