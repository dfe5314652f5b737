use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub apns: ApnsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApnsConfig {
    pub certificate_path: String,
    pub passphrase: String,
    pub topic: String,
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub production_endpoint: Option<String>,
    pub sandbox_endpoint: Option<String>,
}

fn default_sandbox() -> bool {
    true
}

fn default_priority() -> u8 {
    10
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn minimal_config_applies_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [apns]
            certificate_path = "./identity.p12"
            passphrase = "secret"
            topic = "com.example.app"
            "#,
        )
        .expect("config should parse");
        assert!(config.apns.sandbox);
        assert_eq!(config.apns.priority, 10);
        assert!(config.apns.production_endpoint.is_none());
        assert!(config.apns.sandbox_endpoint.is_none());
    }

    #[test]
    fn missing_topic_is_rejected() {
        let err = toml::from_str::<AppConfig>(
            r#"
            [apns]
            certificate_path = "./identity.p12"
            passphrase = "secret"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn overrides_are_honored() {
        let config: AppConfig = toml::from_str(
            r#"
            [apns]
            certificate_path = "./identity.p12"
            passphrase = "secret"
            topic = "com.example.app"
            sandbox = false
            priority = 5
            sandbox_endpoint = "http://localhost:8030"
            "#,
        )
        .expect("config should parse");
        assert!(!config.apns.sandbox);
        assert_eq!(config.apns.priority, 5);
        assert_eq!(
            config.apns.sandbox_endpoint.as_deref(),
            Some("http://localhost:8030")
        );
    }
}
