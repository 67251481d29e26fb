use crate::{
    record::CookieExpiry, AnySessionStore, Session, SessionId, SessionRecord, SessionStore,
};
use cookie::{time, Cookie, SameSite};
use futures_util::{future::BoxFuture, FutureExt};
use http::{header, HeaderMap, HeaderValue, Request, Response};
use std::{
    mem,
    task::{self, Poll},
};
use torii_config::{cookie::SameSite as SameSiteConfig, session::Configuration};
use torii_error::ErrorResponse;
use tower_service::Service;
use triomphe::Arc;

fn session_id(config: &Configuration, headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse_encoded)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == config.cookie_name)
        .and_then(|cookie| SessionId::parse(cookie.value_trimmed()))
}

fn build_cookie(config: &Configuration, record: &SessionRecord) -> Cookie<'static> {
    let max_age = match record.cookie_expiry() {
        CookieExpiry::Configured => config.cookie_age(),
        CookieExpiry::BrowserSession => None,
        CookieExpiry::MaxAge(max_age) => Some(max_age),
    };

    let mut builder = Cookie::build((config.cookie_name.to_string(), record.id().to_string()))
        .path(config.cookie_path.to_string())
        .secure(config.cookie_secure)
        .http_only(config.cookie_httponly);

    if let Some(max_age) = max_age {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        builder = builder.max_age(time::Duration::seconds(max_age));
    }

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

/// Server errors and responses rendered from an [`torii_error::Error`] count as failed requests
#[inline]
fn is_failure<B>(response: &Response<B>) -> bool {
    response.status().is_server_error()
        || response.extensions().get::<ErrorResponse>().is_some()
}

#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    config: Arc<Configuration>,
    store: AnySessionStore,
}

impl<S> SessionService<S> {
    pub(crate) fn new(inner: S, config: Arc<Configuration>, store: AnySessionStore) -> Self {
        Self {
            inner,
            config,
            store,
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SessionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = Response<ResBody>;

    fn poll_ready(&mut self, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);
        let store = self.store.clone();

        async move {
            let loaded = match session_id(&config, req.headers()) {
                Some(id) => store.load(&id).await,
                None => Ok(store.new_session()),
            };

            let record = match loaded {
                Ok(record) => record,
                Err(error) => {
                    error!(error = ?error.error(), "failed to load session");
                    return Ok(error.into_http_response());
                }
            };

            let session = Session::new(record);
            req.extensions_mut().insert(session.clone());

            // Failed requests leave the stored session untouched
            let mut response = inner.call(req).await?;
            if is_failure(&response) {
                debug!(status = %response.status(), "request failed, session not persisted");
                return Ok(response);
            }

            let mut record = session.snapshot();
            if let Err(error) = store.save(&mut record).await {
                error!(error = ?error.error(), id = %record.id(), "failed to save session");
                return Ok(error.into_http_response());
            }

            if record.needs_cookie() {
                let encoded_cookie = build_cookie(&config, &record).encoded().to_string();
                match HeaderValue::try_from(encoded_cookie) {
                    Ok(header_value) => {
                        response
                            .headers_mut()
                            .append(header::SET_COOKIE, header_value);
                    }
                    Err(error) => error!(?error, "failed to encode session cookie"),
                }
            }

            Ok::<_, S::Error>(response)
        }
        .boxed()
    }
}
