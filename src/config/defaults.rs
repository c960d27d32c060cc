use super::*;

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/plunge.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.octopus.energy/v1".to_string(),
            user_agent: format!("plunge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            console: true,
        }
    }
}

impl Default for CurrentSlotConfig {
    fn default() -> Self {
        Self {
            boundary_guard_ms: 100,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            publish_hour: 16,
            fetch_on_start: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            notifications: NotificationsConfig::default(),
            current_slot: CurrentSlotConfig::default(),
            refresh: RefreshConfig::default(),
            timezone: "Europe/London".to_string(),
            settings_file: "plunge_settings.json".to_string(),
        }
    }
}
