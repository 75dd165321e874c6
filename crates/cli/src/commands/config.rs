use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use jargon_jar_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn field(key: &'static str, env_keys: &'static [&'static str], value: String) -> Field {
    Field { key, env_keys, value }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        field("database.url", &["JARGON_JAR_DATABASE_URL"], config.database.url.clone()),
        field(
            "database.max_connections",
            &["JARGON_JAR_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            &["JARGON_JAR_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        field(
            "slack.signing_secret",
            &["JARGON_JAR_SLACK_SIGNING_SECRET"],
            redact_secret(Some(&config.slack.signing_secret)),
        ),
        field(
            "slack.client_id",
            &["JARGON_JAR_SLACK_CLIENT_ID"],
            config.slack.client_id.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        field(
            "slack.client_secret",
            &["JARGON_JAR_SLACK_CLIENT_SECRET"],
            redact_secret(config.slack.client_secret.as_ref()),
        ),
        field(
            "slack.api_base_url",
            &["JARGON_JAR_SLACK_API_BASE_URL"],
            config.slack.api_base_url.clone(),
        ),
        field(
            "slack.unknown_subcommand_policy",
            &["JARGON_JAR_SLACK_UNKNOWN_SUBCOMMAND_POLICY"],
            format!("{:?}", config.slack.unknown_subcommand_policy),
        ),
        field(
            "server.bind_address",
            &["JARGON_JAR_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["JARGON_JAR_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.public_base_url",
            &["JARGON_JAR_SERVER_PUBLIC_BASE_URL"],
            config.public_base_url(),
        ),
        field(
            "server.graceful_shutdown_secs",
            &["JARGON_JAR_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field(
            "logging.level",
            &["JARGON_JAR_LOGGING_LEVEL", "JARGON_JAR_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["JARGON_JAR_LOGGING_FORMAT", "JARGON_JAR_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["jargon-jar.toml", "config/jargon-jar.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|secret| secret.expose_secret().trim().is_empty()) {
        None => "<unset>".to_string(),
        Some(true) => "<empty>".to_string(),
        Some(false) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, field_source, redact_secret};

    #[test]
    fn secrets_are_never_rendered() {
        let secret = SecretString::from("8f742231b1".to_string());
        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some(&SecretString::from(" ".to_string()))), "<empty>");
    }

    #[test]
    fn file_source_requires_the_full_key_path() {
        let doc: Value = "[slack]\napi_base_url = \"http://localhost\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "slack.api_base_url"));
        assert!(!contains_path(&doc, "slack.client_id"));
        assert_eq!(
            field_source("slack.api_base_url", &["JARGON_JAR_TEST_UNSET_KEY"], Some(&doc), None),
            "file (config file)"
        );
        assert_eq!(field_source("server.port", &[], Some(&doc), None), "default");
    }
}
