use crate::Error;
use axum_core::{
    body::Body,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_http_response::<Body>()
    }
}
