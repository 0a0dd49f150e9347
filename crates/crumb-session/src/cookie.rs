//! Reading and writing the session cookie.

use crate::error::SessionError;
use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, SameSite};
use crumb_core::{CookieConfig, SameSitePolicy};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

/// How a session handler moves token strings in and out of HTTP headers.
pub trait CookieTransport: Send + Sync {
    /// Cookie attributes this transport applies.
    fn config(&self) -> &CookieConfig;

    /// Value of the first cookie called `name` in the request headers.
    fn get_cookie(&self, headers: &HeaderMap, name: &str) -> Result<Option<String>, SessionError>;

    /// A cookie carrying `value` with the configured max-age and attributes.
    fn new_cookie(&self, name: &str, value: String) -> Cookie<'static>;

    /// Mark a cookie as already expired so the client drops it.
    fn expire_cookie(&self, cookie: Cookie<'static>) -> Cookie<'static>;

    /// Append a `Set-Cookie` header for `cookie`.
    fn set_cookie(&self, headers: &mut HeaderMap, cookie: &Cookie<'_>)
    -> Result<(), SessionError>;
}

/// The default transport: standard `Cookie` / `Set-Cookie` headers.
#[derive(Debug, Clone, Default)]
pub struct CookieFactory {
    config: CookieConfig,
}

impl CookieFactory {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }
}

impl CookieTransport for CookieFactory {
    fn config(&self) -> &CookieConfig {
        &self.config
    }

    fn get_cookie(&self, headers: &HeaderMap, name: &str) -> Result<Option<String>, SessionError> {
        for header in headers.get_all(COOKIE) {
            let header = header
                .to_str()
                .map_err(|e| SessionError::Transport(format!("unreadable Cookie header: {e}")))?;
            // Skip pairs that do not parse; a stray bad cookie must not hide ours
            for cookie in Cookie::split_parse(header).flatten() {
                if cookie.name() == name {
                    return Ok(Some(cookie.value().to_string()));
                }
            }
        }
        Ok(None)
    }

    fn new_cookie(&self, name: &str, value: String) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value))
            .path(self.config.path.clone())
            .max_age(Duration::seconds(self.config.max_age_secs))
            .secure(self.config.secure)
            .http_only(self.config.http_only);

        if let Some(domain) = &self.config.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(same_site) = same_site(self.config.same_site) {
            builder = builder.same_site(same_site);
        }
        builder.build()
    }

    fn expire_cookie(&self, mut cookie: Cookie<'static>) -> Cookie<'static> {
        cookie.set_max_age(Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    fn set_cookie(
        &self,
        headers: &mut HeaderMap,
        cookie: &Cookie<'_>,
    ) -> Result<(), SessionError> {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| SessionError::Transport(format!("invalid Set-Cookie value: {e}")))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }
}

/// `None` means no SameSite attribute at all.
fn same_site(policy: SameSitePolicy) -> Option<SameSite> {
    match policy {
        SameSitePolicy::Strict => Some(SameSite::Strict),
        SameSitePolicy::Lax => Some(SameSite::Lax),
        SameSitePolicy::None => Some(SameSite::None),
        SameSitePolicy::Default => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append(COOKIE, HeaderValue::from_str(c).unwrap());
        }
        headers
    }

    #[test]
    fn test_get_cookie_finds_named_value() {
        let factory = CookieFactory::default();
        let headers = request_with(&["theme=dark; crumb_session=a.b.c; other=1"]);

        assert_eq!(
            factory.get_cookie(&headers, "crumb_session").unwrap(),
            Some("a.b.c".to_string())
        );
        assert_eq!(factory.get_cookie(&headers, "missing").unwrap(), None);
    }

    #[test]
    fn test_get_cookie_across_headers() {
        let factory = CookieFactory::default();
        let headers = request_with(&["theme=dark", "crumb_session=tok"]);
        assert_eq!(
            factory.get_cookie(&headers, "crumb_session").unwrap(),
            Some("tok".to_string())
        );
    }

    #[test]
    fn test_get_cookie_without_header() {
        let factory = CookieFactory::default();
        assert_eq!(
            factory.get_cookie(&HeaderMap::new(), "crumb_session").unwrap(),
            None
        );
    }

    #[test]
    fn test_get_cookie_rejects_opaque_header() {
        let factory = CookieFactory::default();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_bytes(b"crumb_session=\xff").unwrap());

        let err = factory.get_cookie(&headers, "crumb_session").unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_new_cookie_applies_config() {
        let factory = CookieFactory::new(CookieConfig {
            domain: Some("example.com".into()),
            same_site: SameSitePolicy::Strict,
            ..CookieConfig::default()
        });
        let cookie = factory.new_cookie("crumb_session", "tok".into());

        assert_eq!(cookie.name(), "crumb_session");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(1800)));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn test_default_same_site_sends_no_attribute() {
        let factory = CookieFactory::new(CookieConfig {
            same_site: SameSitePolicy::Default,
            ..CookieConfig::default()
        });
        let cookie = factory.new_cookie("crumb_session", "tok".into());

        assert_eq!(cookie.same_site(), None);
        assert!(!cookie.to_string().contains("SameSite"));
    }

    #[test]
    fn test_expire_cookie() {
        let factory = CookieFactory::default();
        let cookie = factory.expire_cookie(factory.new_cookie("crumb_session", "tok".into()));

        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.value(), "tok");
    }

    #[test]
    fn test_set_cookie_appends() {
        let factory = CookieFactory::default();
        let mut headers = HeaderMap::new();
        factory
            .set_cookie(&mut headers, &factory.new_cookie("a", "1".into()))
            .unwrap();
        factory
            .set_cookie(&mut headers, &factory.new_cookie("b", "2".into()))
            .unwrap();

        let values: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("a=1"));
        assert!(values[0].contains("Max-Age=1800"));
        assert!(values[0].contains("HttpOnly"));
        assert!(values[1].starts_with("b=2"));
    }
}
