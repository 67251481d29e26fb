#[macro_use]
extern crate tracing;

use std::fmt::{self, Debug, Display};

pub use self::{ext::ResultExt, response::ErrorResponse};

mod axum;
mod ext;
mod response;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorType {
    /// The request body could not be read
    BadRequest(Option<String>),
    /// The request was refused. Carries the human-readable reason
    Forbidden(Option<String>),
    PayloadTooLarge(Option<String>),
    /// The session backend could not be reached or answered with an error
    StoreUnavailable,
    Other(Option<String>),
}

#[derive(Debug)]
pub struct Error {
    ty: ErrorType,
    inner: eyre::Report,
}

impl Error {
    #[inline]
    pub fn new<E>(ty: ErrorType, err: E) -> Self
    where
        E: Into<eyre::Report>,
    {
        Self {
            ty,
            inner: err.into(),
        }
    }

    /// Error whose message doubles as the response body
    #[inline]
    pub fn with_body<M>(ty: fn(Option<String>) -> ErrorType, message: M) -> Self
    where
        M: Display,
    {
        let message = message.to_string();
        Self {
            ty: ty(Some(message.clone())),
            inner: eyre::Report::msg(message),
        }
    }

    /// Refuse the request, keeping the reason both as the report message and as the response body
    #[inline]
    pub fn forbidden<R>(reason: R) -> Self
    where
        R: Display,
    {
        Self::with_body(ErrorType::Forbidden, reason)
    }

    #[must_use]
    pub fn error_type(&self) -> &ErrorType {
        &self.ty
    }

    pub fn error(&self) -> &eyre::Report {
        &self.inner
    }

    #[must_use]
    pub fn into_error(self) -> eyre::Report {
        self.inner
    }

    #[must_use]
    pub fn with_error_type(self, ty: ErrorType) -> Self {
        Self { ty, ..self }
    }
}

impl<T> From<T> for Error
where
    T: Into<eyre::Report>,
{
    fn from(value: T) -> Self {
        Self {
            ty: ErrorType::Other(None),
            inner: value.into(),
        }
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <eyre::Report as fmt::Display>::fmt(&self.inner, f)
    }
}
