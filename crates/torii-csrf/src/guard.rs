use crate::{
    cipher::{self, Secret, Token},
    referer::RefererValidator,
    vary::patch_vary_headers,
};
use cookie::{time, Cookie, SameSite};
use http::{
    header::{self, HeaderName},
    request::Parts,
    uri::{Authority, Scheme},
    HeaderMap, HeaderValue, Method,
};
use thiserror::Error;
use torii_config::{cookie::SameSite as SameSiteConfig, csrf::Configuration};

static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Marker extension turning off enforcement for a single request
///
/// Cookies keep working as usual: they are still read, sanitised, and emitted.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsrfExempt;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Reason {
    #[error("Referer checking failed - no Referer.")]
    NoReferer,

    #[error("Referer checking failed - {0} does not match any trusted origins.")]
    BadReferer(String),

    #[error("CSRF cookie not set.")]
    NoCsrfCookie,

    #[error("CSRF token missing or incorrect.")]
    BadToken,

    #[error("Referer checking failed - Referer is malformed.")]
    MalformedReferer,

    #[error("Referer checking failed - Referer is insecure while host is secure.")]
    InsecureReferer,
}

impl Reason {
    #[must_use]
    pub fn into_error(self) -> torii_error::Error {
        torii_error::Error::forbidden(self)
    }
}

/// Configuration, preprocessed once per layer
pub(crate) struct Settings {
    pub(crate) config: Configuration,
    pub(crate) header_name: HeaderName,
    pub(crate) referer: RefererValidator,
}

impl Settings {
    pub(crate) fn new(config: Configuration) -> Result<Self, header::InvalidHeaderName> {
        let header_name = HeaderName::try_from(config.header_name.as_str())?;
        let referer =
            RefererValidator::new(config.trusted_origins.clone(), config.cookie_domain.clone());

        Ok(Self {
            config,
            header_name,
            referer,
        })
    }
}

/// Methods RFC 7231 defines as safe. These are never checked
#[inline]
fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Per-request CSRF state
///
/// Lives from the start of the request until the response headers are written.
pub struct CsrfGuard {
    settings: triomphe::Arc<Settings>,
    token: Option<Token>,
    used: bool,
    needs_cookie_reset: bool,
}

impl CsrfGuard {
    pub(crate) fn new(settings: triomphe::Arc<Settings>) -> Self {
        Self {
            settings,
            token: None,
            used: false,
            needs_cookie_reset: false,
        }
    }

    pub(crate) fn field_name(&self) -> &str {
        &self.settings.config.field_name
    }

    /// Adopt the token from the CSRF cookie, if there is one
    ///
    /// Malformed cookie values are swapped for a fresh token which is sent back with the response.
    pub fn load_cookie(&mut self, headers: &HeaderMap) {
        let cookie_name = self.settings.config.cookie_name.as_str();

        let mut cookie_token = None;
        'outer: for header in headers.get_all(header::COOKIE) {
            let Ok(value_str) = header.to_str() else {
                continue;
            };

            for cookie in Cookie::split_parse_encoded(value_str) {
                let Ok(cookie) = cookie else {
                    continue;
                };

                if cookie.name() == cookie_name {
                    cookie_token = Some(cookie.value_trimmed().to_owned());
                    break 'outer;
                }
            }
        }

        if let Some(cookie_token) = cookie_token {
            let token = cipher::sanitize(&cookie_token);
            if token.as_str() != cookie_token {
                debug!("replacing malformed csrf cookie");
                self.needs_cookie_reset = true;
            }

            self.token = Some(token);
        }
    }

    /// Token to embed into a form or send along with a request
    ///
    /// Every call returns a differently salted token for the same secret.
    pub fn get_token(&mut self) -> Token {
        let secret = match self.token {
            Some(ref token) => cipher::decode(token),
            None => {
                let secret = Secret::generate();
                self.token = Some(cipher::encode(&secret));
                secret
            }
        };

        self.used = true;
        cipher::encode(&secret)
    }

    /// Replace the secret altogether. Call this whenever the user logs in or out
    pub fn rotate_token(&mut self) {
        self.token = Some(cipher::new_token());
        self.used = true;
        self.needs_cookie_reset = true;
    }

    #[must_use]
    pub fn needs_cookie(&self) -> bool {
        self.used || self.needs_cookie_reset
    }

    fn is_secure(&self, parts: &Parts) -> bool {
        if parts.uri.scheme() == Some(&Scheme::HTTPS) {
            return true;
        }

        self.settings.config.trust_forwarded_proto
            && parts
                .headers
                .get(&X_FORWARDED_PROTO)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
    }

    fn check_referer(&self, parts: &Parts) -> Result<(), Reason> {
        let referer = match parts.headers.get(header::REFERER) {
            Some(value) => Some(value.to_str().map_err(|_| Reason::MalformedReferer)?),
            None => None,
        };

        let authority = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .and_then(|host| host.parse::<Authority>().ok())
            .or_else(|| parts.uri.authority().cloned());
        let (host, port) = authority.as_ref().map_or(("", 443), |authority| {
            (authority.host(), authority.port_u16().unwrap_or(443))
        });

        self.settings.referer.validate(referer, host, port)
    }

    /// Decide whether the request may go through
    ///
    /// `form_token` is the value of the token field of an urlencoded POST body, if any.
    pub fn enforce(&self, parts: &Parts, form_token: Option<&str>) -> Result<(), Reason> {
        if is_safe(&parts.method) {
            return Ok(());
        }

        if parts.extensions.get::<CsrfExempt>().is_some() {
            return Ok(());
        }

        if self.is_secure(parts) {
            self.check_referer(parts)?;
        }

        let Some(ref cookie_token) = self.token else {
            return Err(Reason::NoCsrfCookie);
        };

        let submitted = form_token
            .filter(|token| parts.method == Method::POST && !token.is_empty())
            .or_else(|| {
                parts
                    .headers
                    .get(&self.settings.header_name)
                    .and_then(|value| value.to_str().ok())
            })
            .unwrap_or_default();

        let submitted = cipher::sanitize(submitted);
        if cipher::compare_salted(&submitted, cookie_token) {
            Ok(())
        } else {
            Err(Reason::BadToken)
        }
    }

    fn build_cookie(&self, token: &Token) -> Cookie<'static> {
        let config = &self.settings.config;
        let max_age = i64::try_from(config.cookie_age_secs).unwrap_or(i64::MAX);

        let mut builder = Cookie::build((config.cookie_name.to_string(), token.to_string()))
            .path(config.cookie_path.to_string())
            .max_age(time::Duration::seconds(max_age))
            .secure(config.cookie_secure)
            .http_only(config.cookie_httponly);

        if let Some(ref domain) = config.cookie_domain {
            builder = builder.domain(domain.to_string());
        }

        if let Some(same_site) = config.cookie_same_site {
            builder = builder.same_site(match same_site {
                SameSiteConfig::Strict => SameSite::Strict,
                SameSiteConfig::Lax => SameSite::Lax,
                SameSiteConfig::None => SameSite::None,
            });
        }

        builder.build()
    }

    /// Write the cookie back if the token was handed out, rotated, or replaced
    ///
    /// The cookie is renewed on every such response to restart its expiry timer.
    pub fn finish(&self, headers: &mut HeaderMap) {
        if !self.needs_cookie() {
            return;
        }

        let Some(ref token) = self.token else {
            return;
        };

        let encoded_cookie = self.build_cookie(token).encoded().to_string();
        match HeaderValue::try_from(encoded_cookie) {
            Ok(header_value) => {
                headers.append(header::SET_COOKIE, header_value);
                patch_vary_headers(headers, ["Cookie"]);
            }
            Err(error) => error!(?error, "failed to encode csrf cookie"),
        }
    }
}
