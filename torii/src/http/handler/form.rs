use super::session::data_response;
use axum::{
    response::{Html, Response},
    Form,
};
use serde::Deserialize;
use torii_csrf::CsrfHandle;
use torii_error::Result;
use torii_session::Session;

#[derive(Deserialize)]
pub struct GreetForm {
    name: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
}

pub async fn get(csrf: CsrfHandle) -> Html<String> {
    let hidden_input = csrf.hidden_input();

    Html(format!(
        r#"<form method="post" action="/form">{hidden_input}<input name="name"/><button>Greet</button></form>
<form method="post" action="/login">{hidden_input}<input name="username"/><button>Log in</button></form>"#
    ))
}

pub async fn post(Form(form): Form<GreetForm>) -> Html<String> {
    let name = form
        .name
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    Html(format!("<p>Hello, {name}!</p>"))
}

/// Move the visitor onto a fresh session and CSRF secret, then remember the username
pub async fn login(
    csrf: CsrfHandle,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    session.clear();
    session.insert("username", &form.username)?;
    csrf.rotate_token();

    data_response(&session)
}
