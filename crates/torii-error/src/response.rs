use crate::{Error, ErrorType};
use http::{Response, StatusCode};

/// Response extension set on every response rendered from an [`Error`]
///
/// Outer middleware use it to tell failed requests apart from successful ones, whatever the status code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ErrorResponse;

impl Error {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.ty {
            ErrorType::BadRequest(..) => StatusCode::BAD_REQUEST,
            ErrorType::Forbidden(..) => StatusCode::FORBIDDEN,
            ErrorType::PayloadTooLarge(..) => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorType::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorType::Other(..) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render into a plain-text response over any body type
    pub fn into_http_response<B>(self) -> Response<B>
    where
        B: From<String>,
    {
        debug!(error = ?self.inner);

        let status = self.status_code();
        let body = match self.ty {
            ErrorType::BadRequest(body)
            | ErrorType::Forbidden(body)
            | ErrorType::PayloadTooLarge(body)
            | ErrorType::Other(body) => body.unwrap_or_default(),
            ErrorType::StoreUnavailable => "Session store unavailable.".into(),
        };

        let mut response = Response::new(B::from(body));
        *response.status_mut() = status;
        response.extensions_mut().insert(ErrorResponse);
        response
    }
}

#[cfg(test)]
mod test {
    use crate::{Error, ErrorResponse, ErrorType};
    use http::{Response, StatusCode};

    #[test]
    fn body_and_marker() {
        let response: Response<String> =
            Error::with_body(ErrorType::PayloadTooLarge, "Form body too large.")
                .into_http_response();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.body(), "Form body too large.");
        assert_eq!(response.extensions().get(), Some(&ErrorResponse));
    }

    #[test]
    fn store_unavailable_body() {
        let response: Response<String> =
            Error::new(ErrorType::StoreUnavailable, eyre::eyre!("timed out")).into_http_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body(), "Session store unavailable.");
    }

    #[test]
    fn other_hides_report() {
        let response: Response<String> =
            Error::from(eyre::eyre!("connection reset")).into_http_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().is_empty());
    }
}
