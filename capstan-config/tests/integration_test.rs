//! Integration tests for capstan-config

use capstan_config::domains::logging::{LogFormat, LogLevel};
use capstan_config::*;
use std::io::Write;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = CapstanConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("CAPSTAN_EXECUTION_NUM_TRIES", Some("5")),
        ("CAPSTAN_EXECUTION_MAX_PARALLEL", Some("4")),
        ("CAPSTAN_TOOLS_PROCESS_EXE", Some("/opt/tools/mproc")),
        ("CAPSTAN_LOG_LEVEL", Some("debug")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.execution.num_tries, 5);
        assert_eq!(config.execution.max_parallel_jobs, 4);
        assert_eq!(config.tools.process_exe, "/opt/tools/mproc");
        assert_eq!(config.logging.level, LogLevel::Debug);
    });
}

#[test]
fn test_invalid_env_override_rejected() {
    with_vars(
        vec![("CAPSTAN_EXECUTION_NUM_TRIES", Some("not-a-number"))],
        || {
            let loader = ConfigLoader::new();
            assert!(loader.from_env().is_err());
        },
    );
}

#[test]
fn test_yaml_config_serialization() {
    let config = CapstanConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();

    // Parse it back
    let parsed: CapstanConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
}

#[test]
fn test_comprehensive_config() {
    let yaml = r#"
execution:
  num_tries: 3
  max_parallel_jobs: 2

tools:
  process_exe: "/usr/local/bin/mproc"

logging:
  level: warn
  format: json
  include_location: true

server:
  bind_address: "0.0.0.0"
  port: 9100
  cors:
    allowed_origins:
      - "*"
    max_age: 3600
"#;

    let config: CapstanConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate_all().is_ok());

    assert_eq!(config.execution.num_tries, 3);
    assert_eq!(config.execution.max_parallel_jobs, 2);
    assert_eq!(config.tools.process_exe, "/usr/local/bin/mproc");
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Json);

    let server = config.server.unwrap();
    assert_eq!(server.bind_address, "0.0.0.0");
    assert_eq!(server.port, 9100);
    assert_eq!(server.cors.max_age.as_secs(), 3600);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "execution:\n  num_tries: 4\ntools:\n  process_exe: \"mproc-test\"\n"
    )
    .unwrap();

    let loader = ConfigLoader::with_prefix("CAPSTAN_FILE_TEST");
    let config = loader.from_file(file.path()).unwrap();

    assert_eq!(config.execution.num_tries, 4);
    assert_eq!(config.tools.process_exe, "mproc-test");
    // Untouched domains keep their defaults
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_invalid_config_rejected() {
    let yaml = r#"
execution:
  num_tries: 0
"#;

    let config: CapstanConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate_all().is_err());
}

#[test]
fn test_generate_sample_parses() {
    let sample = CapstanConfig::generate_sample();
    let parsed: CapstanConfig = serde_yaml::from_str(&sample).unwrap();
    assert!(parsed.validate_all().is_ok());
    assert!(parsed.server.is_some());
}
