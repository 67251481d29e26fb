use axum::{
    extract::Query,
    response::{IntoResponse, Response},
};
use http::header::CONTENT_TYPE;
use std::collections::HashMap;
use torii_error::Result;
use torii_session::Session;

pub(crate) fn data_response(session: &Session) -> Result<Response> {
    let body = sonic_rs::to_string(session.snapshot().data())?;
    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

/// Store every query parameter in the session and return the session data
pub async fn get(
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    for (key, value) in params {
        session.insert(key, &value)?;
    }

    data_response(&session)
}

pub async fn clear(session: Session) -> Result<Response> {
    session.clear();
    data_response(&session)
}
