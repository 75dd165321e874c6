use std::env;
use std::sync::{Mutex, OnceLock};

use jargon_jar_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;

const VALID_ENV: &[(&str, &str)] = &[
    ("JARGON_JAR_SLACK_SIGNING_SECRET", "test-signing-secret"),
    ("JARGON_JAR_DATABASE_URL", "sqlite::memory:"),
];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_signing_secret() {
    with_env(&[("JARGON_JAR_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("slack.signing_secret"));
    });
}

#[test]
fn seed_loads_the_global_catalogue() {
    with_env(VALID_ENV, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(
            payload["message"],
            "global jargon catalogue ready: 10 inserted, 0 already present"
        );
    });
}

#[test]
fn seed_is_repeatable_against_a_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("jar.db").display());

    with_env(
        &[
            ("JARGON_JAR_SLACK_SIGNING_SECRET", "test-signing-secret"),
            ("JARGON_JAR_DATABASE_URL", url.as_str()),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");

            let second = seed::run();
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");
            assert_eq!(
                parse_payload(&second.output)["message"],
                "global jargon catalogue ready: 0 inserted, 10 already present"
            );
        },
    );
}

#[test]
fn config_redacts_the_signing_secret_and_names_env_sources() {
    with_env(VALID_ENV, || {
        let output = config::run();

        assert!(!output.contains("test-signing-secret"));
        assert!(output.contains(
            "- slack.signing_secret = <redacted> (source: env (JARGON_JAR_SLACK_SIGNING_SECRET))"
        ));
        assert!(output.contains("- slack.client_secret = <unset> (source: default)"));
    });
}

#[test]
fn doctor_json_fails_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_passes_with_warnings_on_a_fresh_database() {
    with_env(VALID_ENV, || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"][1]["name"], "slack_credentials");
        assert_eq!(report["checks"][1]["status"], "warn");
        assert_eq!(report["checks"][2]["status"], "warn");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let keys = [
        "JARGON_JAR_DATABASE_URL",
        "JARGON_JAR_DATABASE_MAX_CONNECTIONS",
        "JARGON_JAR_DATABASE_TIMEOUT_SECS",
        "JARGON_JAR_SLACK_SIGNING_SECRET",
        "JARGON_JAR_SLACK_CLIENT_ID",
        "JARGON_JAR_SLACK_CLIENT_SECRET",
        "JARGON_JAR_SLACK_API_BASE_URL",
        "JARGON_JAR_SLACK_UNKNOWN_SUBCOMMAND_POLICY",
        "JARGON_JAR_SERVER_BIND_ADDRESS",
        "JARGON_JAR_SERVER_PORT",
        "JARGON_JAR_SERVER_PUBLIC_BASE_URL",
        "JARGON_JAR_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "JARGON_JAR_LOGGING_LEVEL",
        "JARGON_JAR_LOGGING_FORMAT",
        "JARGON_JAR_LOG_LEVEL",
        "JARGON_JAR_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
