use cookie::Cookie;
use http::{
    header::{COOKIE, SET_COOKIE},
    Request, Response, StatusCode,
};
use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};
use torii_config::session::Configuration;
use torii_session::{
    store::{InMemory, Redis},
    AnySessionStore, Session, SessionId, SessionIdRef, SessionLayer,
};
use tower::{service_fn, BoxError, Layer, ServiceExt};

/// Binds the query parameters into the session, `/clear` clears it. Responds with the session data
async fn handler(req: Request<String>) -> Result<Response<String>, Infallible> {
    let session = req.extensions().get::<Session>().unwrap().clone();

    if req.uri().path() == "/clear" {
        session.clear();
    } else if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            session.insert(key, value).unwrap();
        }
    }

    let body = sonic_rs::to_string(session.snapshot().data()).unwrap();
    Ok(Response::new(body))
}

fn session_cookie(response: &Response<String>) -> Option<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse_encoded(value.to_owned()).ok())
        .find(|cookie| cookie.name() == "session_id")
}

struct Client {
    layer: SessionLayer,
}

impl Client {
    fn new(config: Configuration, store: InMemory) -> Self {
        Self {
            layer: SessionLayer::new(config, AnySessionStore::from(store)),
        }
    }

    async fn get(&self, uri: &str, session_id: Option<&str>) -> Response<String> {
        let mut builder = Request::builder().uri(uri);
        if let Some(session_id) = session_id {
            builder = builder.header(COOKIE, format!("session_id={session_id}"));
        }

        self.layer
            .layer(service_fn(handler))
            .oneshot(builder.body(String::new()).unwrap())
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn init_session() {
    let store = InMemory::new();
    let client = Client::new(Configuration::default(), store.clone());

    let response = client.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response).expect("missing session cookie");
    assert_eq!(cookie.value().len(), 30);
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.max_age(), None);
    assert!(store.contains(SessionIdRef::from_str(cookie.value())));
    assert_eq!(response.into_body(), "{}");
}

#[tokio::test]
async fn write_session() {
    let store = InMemory::new();
    let client = Client::new(Configuration::default(), store);

    let response = client.get("/?foo=bar", None).await;
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(response.into_body(), r#"{"foo":"bar"}"#);

    let response = client.get("/", Some(cookie.value())).await;
    assert!(session_cookie(&response).is_none());
    assert_eq!(response.into_body(), r#"{"foo":"bar"}"#);

    // Modifying a loaded session re-sends its cookie under the same identifier
    let response = client.get("/?foo=baz", Some(cookie.value())).await;
    let reissued = session_cookie(&response).expect("modified session without cookie");
    assert_eq!(reissued.value(), cookie.value());
    assert_eq!(response.into_body(), r#"{"foo":"baz"}"#);
}

#[tokio::test]
async fn modified_session_refreshes_max_age() {
    let config = Configuration {
        cookie_age_secs: Some(3600),
        ..Configuration::default()
    };
    let client = Client::new(config, InMemory::new());

    let response = client.get("/", None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = client.get("/", Some(cookie.value())).await;
    assert!(session_cookie(&response).is_none());

    let response = client.get("/?foo=bar", Some(cookie.value())).await;
    let reissued = session_cookie(&response).unwrap();
    assert_eq!(reissued.value(), cookie.value());
    assert_eq!(reissued.max_age(), Some(cookie::time::Duration::seconds(3600)));
}

#[tokio::test]
async fn clear_session() {
    let store = InMemory::new();
    let client = Client::new(Configuration::default(), store.clone());

    let response = client.get("/?foo=bar", None).await;
    let old_cookie = session_cookie(&response).unwrap();

    let response = client.get("/clear", Some(old_cookie.value())).await;
    let new_cookie = session_cookie(&response).expect("clearing didn't issue a new cookie");
    assert_ne!(new_cookie.value(), old_cookie.value());
    assert_eq!(response.into_body(), "{}");

    assert!(!store.contains(SessionIdRef::from_str(old_cookie.value())));
    assert!(store.contains(SessionIdRef::from_str(new_cookie.value())));

    // The old identifier is dead. Presenting it gets a brand new session
    let response = client.get("/", Some(old_cookie.value())).await;
    let fresh_cookie = session_cookie(&response).unwrap();
    assert_ne!(fresh_cookie.value(), old_cookie.value());
    assert_ne!(fresh_cookie.value(), new_cookie.value());
    assert_eq!(response.into_body(), "{}");
}

#[tokio::test]
async fn malformed_cookie_starts_new_session() {
    let store = InMemory::new();
    let client = Client::new(Configuration::default(), store);

    let response = client.get("/?foo=bar", Some("../../etc/passwd")).await;
    let cookie = session_cookie(&response).unwrap();
    assert_ne!(cookie.value(), "../../etc/passwd");
    assert_eq!(response.into_body(), r#"{"foo":"bar"}"#);
}

#[tokio::test]
async fn cookie_attributes() {
    let config = Configuration {
        cookie_age_secs: Some(3600),
        cookie_domain: Some("example.com".into()),
        cookie_httponly: true,
        cookie_secure: true,
        ..Configuration::default()
    };
    let client = Client::new(config, InMemory::new());

    let response = client.get("/", None).await;
    let cookie = session_cookie(&response).unwrap();

    assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(3600)));
    assert_eq!(cookie.domain(), Some("example.com"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
}

#[tokio::test]
async fn expire_cookie() {
    let store = InMemory::new();
    let layer = SessionLayer::new(Configuration::default(), store.into());

    let service = layer.layer(service_fn(|req: Request<String>| async move {
        let session = req.extensions().get::<Session>().unwrap();
        session.expire_cookie(Some(Duration::from_secs(60)));
        Ok::<_, Infallible>(Response::new(String::new()))
    }));
    let response = service.oneshot(Request::new(String::new())).await.unwrap();

    let cookie = session_cookie(&response).unwrap();
    assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(60)));
}

#[tokio::test]
async fn inner_error_skips_persistence() {
    let store = InMemory::new();
    let layer = SessionLayer::new(Configuration::default(), store.clone().into());
    let seen_id = Arc::new(Mutex::new(None));

    let service = layer.layer(service_fn({
        let seen_id = Arc::clone(&seen_id);
        move |req: Request<String>| {
            let seen_id = Arc::clone(&seen_id);
            async move {
                let session = req.extensions().get::<Session>().unwrap();
                session.insert("foo", "bar").unwrap();
                *seen_id.lock().unwrap() = Some(session.id());

                Err::<Response<String>, BoxError>("handler blew up".into())
            }
        }
    }));

    assert!(service
        .oneshot(Request::new(String::new()))
        .await
        .is_err());

    let seen_id = seen_id.lock().unwrap().take().expect("handler wasn't called");
    assert!(!store.contains(&seen_id));
}

/// Writes into the session, then answers with the response built by `respond`
async fn failing_request(
    store: &InMemory,
    respond: fn() -> Response<String>,
) -> (Response<String>, SessionId) {
    let layer = SessionLayer::new(Configuration::default(), store.clone().into());
    let seen_id = Arc::new(Mutex::new(None));

    let service = layer.layer(service_fn({
        let seen_id = Arc::clone(&seen_id);
        move |req: Request<String>| {
            let seen_id = Arc::clone(&seen_id);
            async move {
                let session = req.extensions().get::<Session>().unwrap();
                session.insert("half", "written").unwrap();
                *seen_id.lock().unwrap() = Some(session.id());

                Ok::<_, Infallible>(respond())
            }
        }
    }));

    let response = service.oneshot(Request::new(String::new())).await.unwrap();
    let seen_id = seen_id.lock().unwrap().take().expect("handler wasn't called");
    (response, seen_id)
}

#[tokio::test]
async fn error_response_skips_persistence() {
    let store = InMemory::new();
    let (response, seen_id) = failing_request(&store, || {
        torii_error::Error::forbidden("CSRF token missing or incorrect.").into_http_response()
    })
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(session_cookie(&response).is_none());
    assert!(!store.contains(&seen_id));
}

#[tokio::test]
async fn server_error_skips_persistence() {
    let store = InMemory::new();
    let (response, seen_id) = failing_request(&store, || {
        let mut response = Response::new("boom".to_string());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(session_cookie(&response).is_none());
    assert!(!store.contains(&seen_id));
}

#[tokio::test]
async fn unreachable_store_is_unavailable() {
    let redis_config = fred::types::RedisConfig::from_url("redis://127.0.0.1:1").unwrap();
    let pool = fred::clients::RedisPool::new(redis_config, None, None, None, 1).unwrap();
    let store = Redis::builder()
        .pool(pool)
        .timeout(Duration::from_millis(100))
        .build();

    let layer = SessionLayer::new(Configuration::default(), store.into());
    let response = layer
        .layer(service_fn(handler))
        .oneshot(
            Request::builder()
                .header(COOKIE, format!("session_id={}", "a".repeat(30)))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body(), "Session store unavailable.");
    assert!(session_cookie(&response).is_none());
}
