use crate::Reason;
use smol_str::SmolStr;
use url::Url;

/// Whether `host` is `pattern` or, for patterns starting with a dot, a subdomain of it
///
/// `.example.com` matches `example.com` and `foo.example.com`. Anything else requires an exact match.
/// Comparison is case-insensitive and an empty pattern never matches.
#[must_use]
pub fn is_same_domain(host: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    match pattern.strip_prefix('.') {
        Some(bare) => host == bare || host.ends_with(&pattern),
        None => host == pattern,
    }
}

/// `[user[:password]@]host[:port]` of the URL, ports only when given explicitly
fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;

    let mut netloc = String::new();
    if !url.username().is_empty() || url.password().is_some() {
        netloc.push_str(url.username());
        if let Some(password) = url.password() {
            netloc.push(':');
            netloc.push_str(password);
        }
        netloc.push('@');
    }

    netloc.push_str(host);
    if let Some(port) = url.port() {
        netloc.push(':');
        netloc.push_str(&port.to_string());
    }

    Some(netloc)
}

#[derive(Clone, Debug)]
pub struct RefererValidator {
    trusted_origins: Vec<SmolStr>,
    cookie_domain: Option<SmolStr>,
}

impl RefererValidator {
    #[must_use]
    pub fn new(trusted_origins: Vec<SmolStr>, cookie_domain: Option<SmolStr>) -> Self {
        Self {
            trusted_origins,
            cookie_domain,
        }
    }

    /// The origin requests are implicitly allowed to come from
    ///
    /// That's the cookie domain (following the cookie matching rules) or the exact request host.
    /// The port is added unless it is one of the default ports.
    #[must_use]
    pub fn same_origin(&self, host: &str, port: u16) -> String {
        let base = self.cookie_domain.as_deref().unwrap_or(host);
        if matches!(port, 80 | 443) {
            base.to_owned()
        } else {
            format!("{base}:{port}")
        }
    }

    pub fn validate(&self, referer: Option<&str>, host: &str, port: u16) -> Result<(), Reason> {
        let Some(referer) = referer else {
            return Err(Reason::NoReferer);
        };

        let Ok(referer) = Url::parse(referer) else {
            return Err(Reason::MalformedReferer);
        };
        let Some(referer_netloc) = netloc(&referer) else {
            return Err(Reason::MalformedReferer);
        };

        if referer.scheme() != "https" {
            return Err(Reason::InsecureReferer);
        }

        let same_origin = self.same_origin(host, port);
        let is_trusted = self
            .trusted_origins
            .iter()
            .map(SmolStr::as_str)
            .chain([same_origin.as_str()])
            .any(|pattern| is_same_domain(&referer_netloc, pattern));

        if is_trusted {
            Ok(())
        } else {
            Err(Reason::BadReferer(referer.to_string()))
        }
    }
}
