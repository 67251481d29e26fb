use axum::{routing, Router};
use color_eyre::eyre::{self, Context};
use std::time::Duration;
use tokio::net::TcpListener;
use torii_config::{server, Configuration};
use torii_csrf::CsrfLayer;
use torii_session::SessionLayer;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub mod handler;

/// Router with the CSRF and session middleware applied
pub fn create(
    csrf_layer: CsrfLayer,
    session_layer: SessionLayer,
    server_config: &server::Configuration,
) -> Router {
    let router = Router::new()
        .route("/", routing::get(handler::session::get))
        .route("/clear", routing::get(handler::session::clear))
        .route(
            "/form",
            routing::get(handler::form::get).post(handler::form::post),
        )
        .route("/login", routing::post(handler::form::login));

    with_middleware(router, csrf_layer, session_layer, server_config)
}

/// Wrap the routes into the middleware stack
///
/// The session layer sits outside the CSRF layer and inside the panic handler.
/// Failed requests, panics included, therefore never persist session state.
pub fn with_middleware(
    router: Router,
    csrf_layer: CsrfLayer,
    session_layer: SessionLayer,
    server_config: &server::Configuration,
) -> Router {
    router
        .layer(csrf_layer)
        .layer(session_layer)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server_config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
}

#[instrument(skip_all, fields(port = %config.server.port))]
pub async fn run(config: &Configuration) -> eyre::Result<()> {
    let csrf_layer = CsrfLayer::new(config.csrf.clone()).wrap_err("Invalid CSRF header name")?;
    let session_layer = SessionLayer::from_config(config.session.clone())
        .await
        .map_err(torii_error::Error::into_error)
        .wrap_err("Failed to set up the session store")?;

    let router = create(csrf_layer, session_layer, &config.server);
    let listener = TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .wrap_err("Failed to bind the listener")?;

    info!("listening for connections");
    axum::serve(listener, router)
        .with_graceful_shutdown(crate::signal::shutdown())
        .await?;

    Ok(())
}
