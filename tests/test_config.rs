use std::time::Duration;

use tether::config::Config;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.idle_timeout(), Some(Duration::from_secs(10)));
    assert_eq!(cfg.server.max_request_bytes, 8192);
    assert_eq!(cfg.server.max_body_bytes, 1024 * 1024);
    assert_eq!(cfg.static_files.root.to_str(), Some("static"));
    assert_eq!(cfg.log_level, "info");
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  listen_addr: "0.0.0.0:3000"
  idle_timeout_secs: 30
  max_request_bytes: 16384
  max_body_bytes: 4096
static_files:
  root: "/srv/www"
log_level: "debug"
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.idle_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(cfg.server.max_request_bytes, 16384);
    assert_eq!(cfg.server.max_body_bytes, 4096);
    assert_eq!(cfg.static_files.root.to_str(), Some("/srv/www"));
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("server:\n  listen_addr: \"127.0.0.1:9000\"\n").unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.server.idle_timeout_secs, 10);
    assert_eq!(cfg.static_files.root.to_str(), Some("static"));
}

#[test]
fn test_config_zero_idle_timeout_disables_deadline() {
    let cfg = Config::from_yaml_str("server:\n  idle_timeout_secs: 0\n").unwrap();

    assert_eq!(cfg.server.idle_timeout(), None);
}

#[test]
fn test_config_invalid_yaml() {
    assert!(Config::from_yaml_str("server: [not, a, map]").is_err());
}

#[test]
fn test_config_from_missing_file() {
    assert!(Config::from_file("/nonexistent/tether.yaml").is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1, cfg2);
}

#[test]
fn test_config_listen_env_override() {
    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:5000");
    }
    let cfg = Config::load().unwrap();
    unsafe {
        std::env::remove_var("LISTEN");
    }

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:5000");
}
