//! Session handlers built from `crumb.yaml` files on disk.

use crumb_core::CrumbConfig;
use crumb_session::{ErrorKind, SessionHandler, SessionState};
use http::HeaderMap;
use http::header::{COOKIE, SET_COOKIE};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const RSA_PRIVATE: &[u8] = include_bytes!("../../crumb-token/tests/fixtures/rsa_private.pem");
const RSA_PUBLIC: &[u8] = include_bytes!("../../crumb-token/tests/fixtures/rsa_public.pem");

fn write_config(dir: &Path, yaml: &str) -> CrumbConfig {
    let path = dir.join("crumb.yaml");
    fs::write(&path, yaml).unwrap();
    CrumbConfig::load_with_context(&path).unwrap()
}

/// Feed a response's Set-Cookie back as the next request's Cookie header.
fn carry(response: &HeaderMap) -> HeaderMap {
    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    let pair = set_cookie.split(';').next().unwrap();
    let mut request = HeaderMap::new();
    request.insert(COOKIE, pair.parse().unwrap());
    request
}

/// An RS256 configuration with key paths relative to the config file.
#[test]
fn test_rsa_handler_from_config_file() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("keys")).unwrap();
    fs::write(dir.path().join("keys/private.pem"), RSA_PRIVATE).unwrap();
    fs::write(dir.path().join("keys/public.pem"), RSA_PUBLIC).unwrap();

    let config = write_config(
        dir.path(),
        r#"
cookie:
  name: sid
  max_age_secs: 600
  same_site: Strict
signing:
  method: RS256
  private_key_file: keys/private.pem
  public_key_file: keys/public.pem
  issuer: https://auth.example.com
"#,
    );
    let handler = SessionHandler::from_config(&config).unwrap();
    assert_eq!(handler.name(), "sid");

    let session = handler
        .new_session()
        .with_subject("jpj")
        .with_issuer("https://auth.example.com");
    let mut response = HeaderMap::new();
    handler.save_session(&mut response, &session).unwrap();

    let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("sid="));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Max-Age=600"));

    let (loaded, state) = handler.resolve(&carry(&response)).unwrap();
    assert_eq!(state, SessionState::Live);
    assert_eq!(loaded.subject(), Some("jpj"));
    assert_eq!(loaded.id(), session.id());
}

/// A session without the configured issuer fails verification and is not
/// replaced.
#[test]
fn test_issuer_mismatch_is_hard_failure() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("secret.key"), "integration-secret").unwrap();
    let config = write_config(
        dir.path(),
        "signing:\n  secret_env: ~\n  secret_file: secret.key\n  issuer: crumb\n",
    );
    let handler = SessionHandler::from_config(&config).unwrap();

    let mut response = HeaderMap::new();
    handler
        .save_session(&mut response, &handler.new_session())
        .unwrap();

    let err = handler.resolve(&carry(&response)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidClaims);
    assert!(!err.is_recoverable());
}

/// Without a private key the handler can read sessions but not write them.
#[test]
fn test_verify_only_handler() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("public.pem"), RSA_PUBLIC).unwrap();
    let config = write_config(
        dir.path(),
        "signing:\n  method: RS256\n  public_key_file: public.pem\n",
    );
    let handler = SessionHandler::from_config(&config).unwrap();

    let mut response = HeaderMap::new();
    let err = handler
        .save_session(&mut response, &handler.new_session())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(response.is_empty());
}

#[test]
fn test_unknown_method_fails_closed() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "signing:\n  method: none\n");

    let err = SessionHandler::from_config(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
