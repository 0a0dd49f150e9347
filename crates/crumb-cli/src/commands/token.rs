//! Token commands.
//!
//! `crumb token mint` - Mint a signed session token.
//! `crumb token inspect` - Decode a token without verification.
//! `crumb token verify` - Verify a token against the configured key.

use anyhow::Context;
use chrono::{Duration, Utc};
use crumb_core::CrumbConfig;
use crumb_token::{Lifecycle, Session, SessionCodec, TokenSigner, inspect_unverified};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Load `crumb.yaml`, resolving key file paths relative to it.
pub(crate) fn load_config(path: &Path) -> anyhow::Result<CrumbConfig> {
    CrumbConfig::load_with_context(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn signer_from(config: &CrumbConfig) -> anyhow::Result<TokenSigner> {
    TokenSigner::from_config(&config.signing).with_context(|| {
        format!(
            "Failed to set up {} signing; check the signing section",
            config.signing.method
        )
    })
}

/// Accept either a token or a path to a file holding one.
fn read_token(token: String) -> anyhow::Result<String> {
    if Path::new(&token).exists() {
        Ok(fs::read_to_string(&token)?.trim().to_string())
    } else {
        Ok(token)
    }
}

/// Parse a duration string like "90s", "30m", "12h" or "7d". A bare number is minutes.
fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();
    let out_of_range = || format!("Duration '{s}' is out of range");

    if let Some(seconds) = s.strip_suffix('s') {
        return Duration::try_seconds(seconds.parse()?).with_context(out_of_range);
    }
    if let Some(minutes) = s.strip_suffix('m') {
        return Duration::try_minutes(minutes.parse()?).with_context(out_of_range);
    }
    if let Some(hours) = s.strip_suffix('h') {
        return Duration::try_hours(hours.parse()?).with_context(out_of_range);
    }
    if let Some(days) = s.strip_suffix('d') {
        return Duration::try_days(days.parse()?).with_context(out_of_range);
    }

    let minutes: i64 = s
        .parse()
        .with_context(|| format!("Invalid duration '{s}'. Use e.g. 90s, 30m, 12h, 7d"))?;
    Duration::try_minutes(minutes).with_context(out_of_range)
}

/// Split `key=value`. The value is taken as JSON when it parses, as a string otherwise.
fn parse_claim(spec: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = spec
        .split_once('=')
        .with_context(|| format!("Invalid claim '{spec}'. Expected key=value"))?;
    let key = key.trim();
    anyhow::ensure!(!key.is_empty(), "Invalid claim '{spec}': empty key");

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Mint a signed session token.
pub fn mint(
    config_path: &Path,
    subject: Option<String>,
    ttl: Option<String>,
    claims: Vec<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let signer = signer_from(&config)?;

    let ttl = match &ttl {
        Some(ttl) => parse_duration(ttl)?,
        None => Duration::seconds(config.cookie.max_age_secs),
    };

    let now = Utc::now();
    let mut session = signer.issue_at(now);
    if let Some(subject) = subject {
        session = session.with_subject(subject);
    }
    for spec in &claims {
        let (key, value) = parse_claim(spec)?;
        session.insert(&key, value)?;
    }
    session.extend_ttl(ttl, now);

    let token = signer.serialize(&session)?;

    if let Some(output_path) = output {
        fs::write(&output_path, &token)?;
        println!("✔ Token written to: {}", output_path.display());
        println!("  Method: {}", signer.method());
        if let Some(sub) = session.subject() {
            println!("  Subject: {sub}");
        }
        if let Some(exp) = session.expires_at() {
            println!("  Expires: {exp}");
        }
    } else {
        println!("{token}");
    }

    Ok(())
}

/// Print a token's header and claims without verifying the signature.
pub fn inspect(token: String) -> anyhow::Result<()> {
    let token = read_token(token)?;
    let info = inspect_unverified(&token)?;

    let report = json!({
        "header": { "alg": info.alg, "typ": info.typ },
        "claims": info.claims,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!();
    println!("⚠️  Signature NOT verified. Use `crumb token verify` to check it.");

    Ok(())
}

/// Verify a token and print its claims.
pub fn verify(config_path: &Path, token: String) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let signer = signer_from(&config)?;
    let token = read_token(token)?;

    let session: Session = match signer.unserialize(&token) {
        Ok(session) => session,
        Err(e) => {
            println!("✖ Token verification failed ({:?}): {e}", e.kind());
            anyhow::bail!("token rejected: {e}");
        }
    };

    println!("✔ Token is valid");
    println!();
    println!("Token Details:");
    println!("  Method: {}", signer.method());
    if let Some(id) = session.id() {
        println!("  Id: {id}");
    }
    if let Some(sub) = session.subject() {
        println!("  Subject: {sub}");
    }
    if let Some(remaining) = session.time_until_expiry(Utc::now()) {
        println!("  Expires in: {}s", remaining.num_seconds());
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&session)?);

    Ok(())
}
