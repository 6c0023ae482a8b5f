use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar, Form,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use tera::Tera;
use tower_http::limit::RequestBodyLimitLayer;

use crate::recipes::RecipeClient;
use eiyo_core::models::CookPage;
use eiyo_core::service::{AddOutcome, NutritionService};
use eiyo_core::session::SessionId;

const BODY_LIMIT: usize = 64 * 1024; // 64 KiB
const SESSION_COOKIE: &str = "eiyo_session";

const TPL_BASE: &str = include_str!("templates/base.html");
const TPL_TOTALS: &str = include_str!("templates/totals.html");
const TPL_INDEX: &str = include_str!("templates/index.html");
const TPL_TOTAL: &str = include_str!("templates/total.html");
const TPL_COOK: &str = include_str!("templates/cook.html");

#[derive(Clone)]
struct AppState {
    service: Arc<NutritionService>,
    recipes: Arc<RecipeClient>,
    templates: Arc<Tera>,
}

// --- Form types ---

#[derive(Deserialize)]
struct IndexForm {
    action: Option<String>,
    food_name: Option<String>,
    food_id: Option<String>,
    gram: Option<String>,
}

#[derive(Deserialize)]
struct AddForm {
    gram: Option<String>,
}

#[derive(Deserialize)]
struct TotalForm {
    action: Option<String>,
    #[serde(default)]
    gram: Vec<String>,
    #[serde(default)]
    delete_item: Vec<String>,
}

// --- Error handling ---

enum WebError {
    Internal(anyhow::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("<h1>Internal server error</h1>"),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'none'; style-src 'unsafe-inline'; img-src https:; form-action 'self'",
        ),
    );
    response
}

// --- Helpers ---

/// The request's session id, minting a new cookie when the client has none
/// or sent one that is not a valid id.
fn session_from(jar: CookieJar) -> (CookieJar, SessionId) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| SessionId::parse(c.value()))
    {
        return (jar, id);
    }
    let id = SessionId::generate();
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), id)
}

fn render<T: Serialize>(tera: &Tera, name: &str, page: &T) -> Result<Html<String>, WebError> {
    let context =
        tera::Context::from_serialize(page).context("failed to build template context")?;
    let html = tera
        .render(name, &context)
        .with_context(|| format!("failed to render {name}"))?;
    Ok(Html(html))
}

pub fn build_templates() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", TPL_BASE),
        ("totals.html", TPL_TOTALS),
        ("index.html", TPL_INDEX),
        ("total.html", TPL_TOTAL),
        ("cook.html", TPL_COOK),
    ])
    .context("failed to load templates")?;
    Ok(tera)
}

// --- Handlers ---

async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), WebError> {
    let (jar, session) = session_from(jar);
    let page = state.service.index_page(&session)?;
    Ok((jar, render(&state.templates, "index.html", &page)?))
}

async fn index_action(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<IndexForm>,
) -> Result<Response, WebError> {
    let (jar, session) = session_from(jar);
    let food_id = form.food_id.as_deref().unwrap_or("");

    let page = match form.action.as_deref().unwrap_or("search") {
        "select" => state.service.select(&session, food_id)?,
        "add" => match state
            .service
            .add_to_cart(&session, food_id, form.gram.as_deref())?
        {
            AddOutcome::Added => return Ok((jar, Redirect::to("/")).into_response()),
            AddOutcome::Rejected(page) => page,
        },
        _ => state
            .service
            .search(&session, form.food_name.as_deref().unwrap_or(""))?,
    };

    Ok((jar, render(&state.templates, "index.html", &page)?).into_response())
}

async fn add_to_cart(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(food_id): Path<String>,
    Form(form): Form<AddForm>,
) -> Result<Response, WebError> {
    let (jar, session) = session_from(jar);
    match state
        .service
        .add_to_cart(&session, &food_id, form.gram.as_deref())?
    {
        AddOutcome::Added => Ok((jar, Redirect::to("/")).into_response()),
        AddOutcome::Rejected(page) => {
            Ok((jar, render(&state.templates, "index.html", &page)?).into_response())
        }
    }
}

async fn total(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), WebError> {
    let (jar, session) = session_from(jar);
    let page = state.service.total_page(&session)?;
    Ok((jar, render(&state.templates, "total.html", &page)?))
}

async fn total_action(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<TotalForm>,
) -> Result<(CookieJar, Html<String>), WebError> {
    let (jar, session) = session_from(jar);
    let page = match form.action.as_deref().unwrap_or("") {
        "update" => state.service.update_quantities(&session, &form.gram)?,
        "delete_selected" => state.service.delete_selected(&session, &form.delete_item)?,
        "delete_all" => state.service.clear(&session)?,
        _ => state.service.total_page(&session)?,
    };
    Ok((jar, render(&state.templates, "total.html", &page)?))
}

async fn cook(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let page = CookPage {
        enabled: state.recipes.is_enabled(),
        recipes: state.recipes.ranking().await,
    };
    render(&state.templates, "cook.html", &page)
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(index_action))
        .route("/add/{id}", post(add_to_cart))
        .route("/total", get(total).post(total_action))
        .route("/cook", get(cook))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    service: NutritionService,
    recipes: RecipeClient,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    if !recipes.is_enabled() {
        tracing::info!(
            "{} not set; recipe page will be empty",
            crate::config::RECIPE_APP_ID_ENV
        );
    }

    let state = AppState {
        service: Arc::new(service),
        recipes: Arc::new(recipes),
        templates: Arc::new(build_templates()?),
    };

    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        tracing::warn!("Listening on {bind}. Any device on your network can reach this app.");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
