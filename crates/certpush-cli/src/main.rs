use std::{collections::HashMap, error::Error};

use clap::Parser;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use certpush_core::{
    client::{ApnsOptions, ApnsService},
    message::PushMessage,
    payload::{Alert, Aps, NotificationPayload, Sound},
};

use crate::config::{ApnsConfig, AppConfig};

mod config;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "certpush",
    version,
    about = "Send APNs notifications with a PKCS#12 certificate bundle"
)]
struct Args {
    /// Path to the config file with the certificate bundle credentials.
    #[arg(
        env = "CERTPUSH_CONFIG",
        long = "config",
        default_value = "./certpush.toml"
    )]
    config_path: String,

    /// Target device token (hex, no wrapping brackets or spaces).
    #[arg(long = "device-token")]
    device_token: String,

    /// Alert title for a simple notification.
    #[arg(long, conflicts_with = "payload_json")]
    title: Option<String>,

    /// Alert body shown under the title.
    #[arg(long, requires = "title")]
    body: Option<String>,

    /// Raw JSON object used verbatim as the payload.
    #[arg(long = "payload-json")]
    payload_json: Option<String>,

    /// Override the configured delivery priority (5 or 10).
    #[arg(long)]
    priority: Option<u8>,

    /// Force the production gateway even when the config says sandbox.
    #[arg(long)]
    production: bool,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig, Box<dyn Error>> {
        let raw = std::fs::read_to_string(&self.config_path).map_err(|err| {
            std::io::Error::new(
                err.kind(),
                format!("failed to read config file {}: {err}", self.config_path),
            )
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to parse config file {}: {err}", self.config_path),
            )
        })?;
        Ok(config)
    }

    fn build_payload(&self) -> Result<Map<String, Value>, Box<dyn Error>> {
        if let Some(raw) = self.payload_json.as_deref() {
            return match serde_json::from_str::<Value>(raw)? {
                Value::Object(map) => Ok(map),
                _ => Err("--payload-json must be a JSON object".into()),
            };
        }
        let title = self
            .title
            .clone()
            .ok_or("either --title or --payload-json is required")?;
        let aps = Aps {
            alert: Alert {
                title,
                body: self.body.clone(),
            },
            badge: None,
            sound: Some(Sound::Name("default".to_string())),
            thread_id: None,
            mutable_content: None,
        };
        Ok(NotificationPayload::new(aps, HashMap::new()).into_map()?)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config()?;
    let payload = args.build_payload()?;
    tracing::debug!(config_path = args.config_path.as_str(), "configuration loaded");

    let sandbox = if args.production {
        false
    } else {
        config.apns.sandbox
    };
    let message = PushMessage::new(
        config.apns.topic.clone(),
        args.priority.unwrap_or(config.apns.priority),
        payload,
        args.device_token.clone(),
        config.apns.certificate_path.clone(),
        config.apns.passphrase.clone(),
        sandbox,
    );

    let service = ApnsService::with_options(gateway_options(&config.apns));
    let outcome = service.send(&message).await;
    service.close();

    match outcome {
        Ok(response) if response.status.is_success() => {
            println!(
                "delivered message {} (HTTP {}, apns-id {})",
                message.message_id(),
                response.status_code,
                response.apns_id.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Ok(response) => {
            let reason = response
                .error_reason
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "no reason reported".to_string());
            eprintln!(
                "gateway rejected message {} (HTTP {}): {reason}",
                message.message_id(),
                response.status_code
            );
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("failed to deliver message {}: {err}", message.message_id());
            std::process::exit(1);
        }
    }
}

fn gateway_options(config: &ApnsConfig) -> ApnsOptions {
    let mut options = ApnsOptions::default();
    if let Some(endpoint) = &config.production_endpoint {
        options.production_endpoint = endpoint.clone();
    }
    if let Some(endpoint) = &config.sandbox_endpoint {
        options.sandbox_endpoint = endpoint.clone();
    }
    options
}
