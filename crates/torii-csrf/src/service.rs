use crate::{guard::Settings, CsrfGuard, CsrfHandle};
use bytes::Bytes;
use futures_util::{
    future::{self, BoxFuture},
    stream, FutureExt,
};
use http::{header, request::Parts, Method, Request, Response};
use http_body::Body;
use http_body_util::{BodyExt, Either, Full, LengthLimitError, Limited};
use std::{
    convert::Infallible,
    mem,
    task::{self, Poll},
};
use torii_error::{Error, ErrorType};
use tower_service::Service;
use triomphe::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body handed to the inner service
///
/// Form POST bodies have been buffered to look for the token field, everything else is passed through untouched.
pub type CsrfBody<B> = Either<B, Full<Bytes>>;

/// Form encodings searched for the token field
enum FormEncoding {
    Urlencoded,
    Multipart { boundary: String },
}

fn form_encoding(parts: &Parts) -> Option<FormEncoding> {
    if parts.method != Method::POST {
        return None;
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())?;
    let mime = content_type.split(';').next()?.trim();

    if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Some(FormEncoding::Urlencoded)
    } else if mime.eq_ignore_ascii_case("multipart/form-data") {
        match multer::parse_boundary(content_type) {
            Ok(boundary) => Some(FormEncoding::Multipart { boundary }),
            Err(error) => {
                debug!(?error, "multipart body without boundary");
                None
            }
        }
    } else {
        None
    }
}

fn find_urlencoded_field(body: &[u8], field_name: &str) -> Option<String> {
    let fields: Vec<(String, String)> = match serde_urlencoded::from_bytes(body) {
        Ok(fields) => fields,
        Err(error) => {
            debug!(?error, "failed to decode urlencoded body");
            return None;
        }
    };

    fields
        .into_iter()
        .find_map(|(name, value)| (name == field_name).then_some(value))
}

async fn find_multipart_field(body: Bytes, boundary: String, field_name: &str) -> Option<String> {
    let stream = stream::once(future::ready(Ok::<_, Infallible>(body)));
    let mut multipart = multer::Multipart::new(stream, boundary);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(error) => {
                debug!(?error, "failed to decode multipart body");
                return None;
            }
        };

        if field.name() == Some(field_name) {
            return field.text().await.ok();
        }
    }
}

#[derive(Clone)]
pub struct CsrfService<S> {
    inner: S,
    settings: Arc<Settings>,
}

impl<S> CsrfService<S> {
    pub(crate) fn new(inner: S, settings: Arc<Settings>) -> Self {
        Self { inner, settings }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CsrfService<S>
where
    S: Service<Request<CsrfBody<ReqBody>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send,
    ReqBody: Body<Data = Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: From<String> + Send + 'static,
{
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = Response<ResBody>;

    fn poll_ready(&mut self, cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Take the service that was driven to readiness, leave the clone behind
        let clone = self.inner.clone();
        let mut inner = mem::replace(&mut self.inner, clone);
        let settings = Arc::clone(&self.settings);

        async move {
            let (mut parts, body) = req.into_parts();

            let mut guard = CsrfGuard::new(Arc::clone(&settings));
            guard.load_cookie(&parts.headers);

            let (body, form_token) = if let Some(encoding) = form_encoding(&parts) {
                let collected = Limited::new(body, settings.config.max_form_size)
                    .collect()
                    .await;

                let bytes = match collected {
                    Ok(collected) => collected.to_bytes(),
                    Err(error) if error.is::<LengthLimitError>() => {
                        debug!(limit = settings.config.max_form_size, "form body too large");
                        return Ok(Error::with_body(
                            ErrorType::PayloadTooLarge,
                            "Form body too large.",
                        )
                        .into_http_response());
                    }
                    Err(error) => {
                        debug!(?error, "failed to read form body");
                        return Ok(Error::with_body(
                            ErrorType::BadRequest,
                            "Failed to read request body.",
                        )
                        .into_http_response());
                    }
                };

                let field_name = settings.config.field_name.as_str();
                let form_token = match encoding {
                    FormEncoding::Urlencoded => find_urlencoded_field(&bytes, field_name),
                    FormEncoding::Multipart { boundary } => {
                        find_multipart_field(bytes.clone(), boundary, field_name).await
                    }
                };
                (Either::Right(Full::new(bytes)), form_token)
            } else {
                (Either::Left(body), None)
            };

            if let Err(reason) = guard.enforce(&parts, form_token.as_deref()) {
                info!(%reason, method = %parts.method, uri = %parts.uri, "rejected request");
                return Ok(reason.into_error().into_http_response());
            }

            let handle = CsrfHandle::new(guard);
            parts.extensions.insert(handle.clone());

            let mut response = inner.call(Request::from_parts(parts, body)).await?;
            handle.finish(response.headers_mut());

            Ok::<_, S::Error>(response)
        }
        .boxed()
    }
}
