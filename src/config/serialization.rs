//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

/// Quote a value as a TOML basic string
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

impl Config {
    /// Render the `secret_key` line, commented out when no key is set
    fn secret_key_line(&self) -> String {
        match &self.security.secret_key {
            Some(key) => format!("secret_key = {}", toml_string(key)),
            None => "# secret_key = \"\"  # generate one with `wirebound keygen`".to_string(),
        }
    }

    /// Serialize config to TOML format
    pub fn to_toml(&self) -> String {
        format!(
            r#"# wirebound configuration

# Wire server bind address
bind_addr = {bind}

# Wire request bodies above this size are rejected (bytes)
max_body_bytes = {max_body}

# State token signing (WIREBOUND_SECRET_KEY env var overrides)
# Without a key, a random one is generated at boot and issued tokens
# stop verifying after a restart.
[security]
{secret_key}
# Reject tokens older than this many seconds (0 = never expire)
max_token_age_secs = {max_age}

# Demonstration components: counter, todo-list, notifier
[demo]
enabled = {demo_enabled}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level}
# JSON file logging in addition to stdout
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            bind = toml_string(&self.bind_addr.to_string()),
            max_body = self.max_body_bytes,
            secret_key = self.secret_key_line(),
            max_age = self.security.max_token_age_secs,
            demo_enabled = self.demo.enabled,
            log_level = toml_string(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = toml_string(&self.logging.file_dir.display().to_string()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = toml_string(&self.logging.file_prefix),
        )
    }
}
