use super::*;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// # Safety
/// Callers hold `ENV_LOCK`; no other module reads the `PEDIDOS_*` variables.
unsafe fn clear_pedidos_env() {
    unsafe {
        std::env::remove_var("PEDIDOS_API_URL");
        std::env::remove_var("PEDIDOS_SESSION_FILE");
        std::env::remove_var("PEDIDOS_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("PEDIDOS_PAGE_LIMIT");
    }
}

#[test]
fn from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_pedidos_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.api_url, DEFAULT_API_URL);
    assert_eq!(cfg.request_timeout, None);
    assert_eq!(cfg.page_limit, DEFAULT_PAGE_LIMIT);
    assert!(cfg.session_file.ends_with("session.json") || cfg.session_file.ends_with(FALLBACK_SESSION_FILE));
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_pedidos_env();
        std::env::set_var("PEDIDOS_API_URL", "https://api.example.test/");
        std::env::set_var("PEDIDOS_SESSION_FILE", "/tmp/pedidos/session.json");
        std::env::set_var("PEDIDOS_REQUEST_TIMEOUT_SECS", "30");
        std::env::set_var("PEDIDOS_PAGE_LIMIT", "25");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.api_url, "https://api.example.test");
    assert_eq!(cfg.session_file, PathBuf::from("/tmp/pedidos/session.json"));
    assert_eq!(cfg.request_timeout, Some(Duration::from_secs(30)));
    assert_eq!(cfg.page_limit, 25);

    unsafe { clear_pedidos_env() };
}

#[test]
fn from_env_rejects_bad_timeout() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_pedidos_env();
        std::env::set_var("PEDIDOS_REQUEST_TIMEOUT_SECS", "soon");
    }

    let err = ClientConfig::from_env().unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidNumber { var: "PEDIDOS_REQUEST_TIMEOUT_SECS", value: "soon".to_owned() }
    );

    unsafe { clear_pedidos_env() };
}

#[test]
fn from_env_rejects_zero_and_oversized_page_limit() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    for value in ["0", "4294967296", "-5"] {
        unsafe {
            clear_pedidos_env();
            std::env::set_var("PEDIDOS_PAGE_LIMIT", value);
        }

        let err = ClientConfig::from_env().unwrap_err();
        assert_eq!(err, ConfigError::InvalidNumber { var: "PEDIDOS_PAGE_LIMIT", value: value.to_owned() });
    }

    unsafe { clear_pedidos_env() };
}

#[test]
fn normalize_api_url_trims_trailing_slashes() {
    assert_eq!(normalize_api_url(" http://localhost:8080// ").unwrap(), "http://localhost:8080");
}

#[test]
fn normalize_api_url_requires_scheme_and_host() {
    assert!(normalize_api_url("localhost:8080").is_err());
    assert!(normalize_api_url("http://").is_err());
    assert!(normalize_api_url("ftp://example.test").is_err());
}

#[test]
fn with_api_url_uses_defaults() {
    let cfg = ClientConfig::with_api_url("http://127.0.0.1:9000/", "s.json").unwrap();
    assert_eq!(cfg.api_url, "http://127.0.0.1:9000");
    assert_eq!(cfg.page_limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(cfg.request_timeout, None);
}
