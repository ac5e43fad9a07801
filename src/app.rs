use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::TemplateError;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::admin::{self, AdminSession, MAX_UPLOAD_BYTES, UploadError, UploadFile};
use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::dashboard::DashboardSession;
use crate::date_utils::parse_iso;
use crate::modal::ENTER_DELAY;
use crate::templates::{self, Templates};

/// Browser cookie carrying the backend session
pub const SESSION_COOKIE: &str = "board_session";

/// Room for the multipart framing around the largest accepted file
const UPLOAD_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    config: Config,
    http: reqwest::Client,
    templates: Templates,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, TemplateError> {
        Ok(AppState {
            config,
            http: reqwest::Client::new(),
            templates: Templates::new()?,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn api(&self, session: Option<String>) -> ApiClient {
        ApiClient::with_http(self.config.api_url.as_str(), self.http.clone())
            .with_session(session)
    }

    fn render<T: Serialize>(
        &self,
        status: StatusCode,
        name: &str,
        title: &str,
        data: &T,
    ) -> Response {
        match self.templates.page(name, title, data) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                error!("failed to render {}: {}", name, err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }

    fn error_page(&self, status: StatusCode, title: &str, message: &str) -> Response {
        match self.templates.error_page(title, message) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                error!("failed to render error page: {}", err);
                (status, message.to_string()).into_response()
            }
        }
    }
}

#[derive(Deserialize)]
struct DashboardQuery {
    dept: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

/// Fragments of the admin page; absent sections are left out
#[derive(Default, Serialize)]
struct AdminView {
    admin_bar: Option<String>,
    notice: Option<String>,
    login: Option<String>,
    stats: Option<String>,
    upload: Option<String>,
    result: Option<String>,
}

impl AdminView {
    fn login(error: Option<&str>) -> Self {
        AdminView {
            login: Some(admin::login_form(error).to_html()),
            ..Default::default()
        }
    }

    fn upload_with_notice(message: &str) -> Self {
        AdminView {
            notice: Some(admin::notice(message).to_html()),
            upload: Some(admin::upload_form().to_html()),
            ..Default::default()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/day/:date", get(serve_day))
        .route("/admin", get(serve_admin))
        .route("/admin/login", post(handle_login))
        .route("/admin/logout", post(handle_logout))
        .route("/admin/preview", post(handle_preview))
        .route("/admin/import", post(handle_import))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + UPLOAD_OVERHEAD))
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.bind;
    let state = Arc::new(AppState::new(config)?);
    info!(
        "using backend {} for year {}",
        state.config.api_url, state.config.year
    );

    let app = router(state);

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn session_from(jar: &CookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    urlencoding::decode(cookie.value())
        .ok()
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn session_cookie(session: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, urlencoding::encode(session).into_owned()))
        .path("/")
        .http_only(true)
        .build()
}

/// Load the dashboard for the configured year, or answer with the init error page
async fn load_dashboard(
    state: &AppState,
    api: &ApiClient,
    dept: Option<String>,
) -> Result<DashboardSession, Response> {
    let config = &state.config;
    match DashboardSession::fetch(api, config.year, config.upcoming_limit).await {
        Ok(mut session) => {
            session.set_department(dept);
            Ok(session)
        }
        Err(err) => {
            warn!("dashboard initialisation failed: {}", err);
            Err(state.error_page(
                StatusCode::BAD_GATEWAY,
                "Could not load tasks",
                &format!("The task service did not answer: {}", err),
            ))
        }
    }
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let api = state.api(session_from(&jar));
    let session = match load_dashboard(&state, &api, query.dept).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    info!(
        "dashboard {} ({} days with tasks)",
        session.year(),
        session.data().counts.len()
    );
    state.render(
        StatusCode::OK,
        templates::DASHBOARD,
        "Warning calendar",
        &session.page(),
    )
}

/// Dashboard with the detail modal of one day open
///
/// A failed day fetch still renders the dashboard, with a notice instead of
/// the modal.
async fn serve_day(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(date): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let Some(date) = parse_iso(&date) else {
        return state.error_page(
            StatusCode::NOT_FOUND,
            "Unknown day",
            &format!("{} is not a valid date", date),
        );
    };

    let api = state.api(session_from(&jar));
    let mut session = match load_dashboard(&state, &api, query.dept).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    let outcome = session.open_day(&api, date).await;
    info!("day {} requested: {:?}", date, outcome);
    session.advance(ENTER_DELAY);

    state.render(
        StatusCode::OK,
        templates::DASHBOARD,
        "Warning calendar",
        &session.page(),
    )
}

/// Admin bar and stats panel for a logged-in admin, with the upload form
///
/// Returns `None` when the session does not belong to an admin. Stats that
/// fail to load leave a placeholder panel.
async fn admin_page(api: &ApiClient) -> Option<AdminView> {
    let AdminSession::Admin(user) = AdminSession::resolve(api).await else {
        return None;
    };
    let stats = match api.get_stats().await {
        Ok(stats) => stats,
        Err(err) => {
            warn!("could not load stats: {}", err);
            None
        }
    };
    Some(AdminView {
        admin_bar: Some(admin::admin_bar(&user).to_html()),
        stats: Some(admin::stats_panel(stats.as_ref()).to_html()),
        upload: Some(admin::upload_form().to_html()),
        ..Default::default()
    })
}

async fn serve_admin(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let api = state.api(session_from(&jar));
    let view = admin_page(&api).await.unwrap_or_else(|| AdminView::login(None));
    state.render(StatusCode::OK, templates::ADMIN, "Admin", &view)
}

/// Handle an admin login
///
/// # Arguments
/// * `jar` - Cookie jar receiving the backend session on success
/// * `form` - Username and password from the login form
///
/// # Returns
/// * `Response` - Redirect to the admin page, or the login form with the error
async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let api = state.api(None);
    match api.login(&form.username, &form.password).await {
        Ok(outcome) => {
            info!("admin {} logged in", form.username);
            let jar = match outcome.session {
                Some(session) => jar.add(session_cookie(&session)),
                None => jar,
            };
            (jar, Redirect::to("/admin")).into_response()
        }
        Err(err) => {
            let status = match &err {
                ApiError::Status { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ApiError::Rejected(_) => StatusCode::UNAUTHORIZED,
                ApiError::Transport { .. } | ApiError::Decode { .. } => StatusCode::BAD_GATEWAY,
            };
            warn!("login for {} failed: {}", form.username, err);
            let message = err.to_string();
            state.render(status, templates::ADMIN, "Admin", &AdminView::login(Some(&message)))
        }
    }
}

async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let api = state.api(session_from(&jar));
    if api.session().is_some() {
        if let Err(err) = api.logout().await {
            warn!("backend logout failed: {}", err);
        }
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/admin"),
    )
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadFile, UploadError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(UploadError::Missing),
            Err(err) => return Err(multipart_error(err)),
        };
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadFile::new(name, content_type, bytes.to_vec()));
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::Malformed(err.body_text())
    }
}

fn upload_status(err: &UploadError) -> StatusCode {
    match err {
        UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[derive(Clone, Copy, Debug)]
enum UploadAction {
    Preview,
    Import,
}

async fn handle_preview(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    handle_upload(&state, &jar, multipart, UploadAction::Preview).await
}

async fn handle_import(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    handle_upload(&state, &jar, multipart, UploadAction::Import).await
}

/// Validate the uploaded file locally, then hand it to the backend
async fn handle_upload(
    state: &AppState,
    jar: &CookieJar,
    multipart: Multipart,
    action: UploadAction,
) -> Response {
    let file = match read_upload(multipart).await.and_then(|file| {
        admin::validate_upload(&file)?;
        Ok(file)
    }) {
        Ok(file) => file,
        Err(err) => {
            warn!("rejected upload: {}", err);
            let view = AdminView::upload_with_notice(&err.to_string());
            return state.render(upload_status(&err), templates::ADMIN, "Admin", &view);
        }
    };

    let Some(session) = session_from(jar) else {
        return Redirect::to("/admin").into_response();
    };
    let api = state.api(Some(session));

    info!(
        "{:?} of {} ({})",
        action,
        file.name,
        admin::format_file_size(file.size())
    );
    let reply = match action {
        UploadAction::Preview => api.preview_import(&file).await,
        UploadAction::Import => api.import_tasks(&file).await,
    };

    match reply {
        Ok(reply) => {
            let result = match action {
                UploadAction::Preview => {
                    admin::preview_view(&reply.preview.unwrap_or_default(), &reply.errors)
                }
                UploadAction::Import => admin::import_result_view(&reply.stats, &reply.errors),
            };
            let mut view = admin_page(&api).await.unwrap_or_else(|| AdminView {
                upload: Some(admin::upload_form().to_html()),
                ..Default::default()
            });
            view.result = Some(format!(
                "{}{}",
                admin::file_info(Some(&file)).to_html(),
                result.to_html()
            ));
            state.render(StatusCode::OK, templates::ADMIN, "Admin", &view)
        }
        Err(err) if err.status() == Some(401) => {
            let view = AdminView::login(Some("Your session has expired. Please log in again."));
            state.render(StatusCode::UNAUTHORIZED, templates::ADMIN, "Admin", &view)
        }
        Err(err) => {
            warn!("{:?} failed: {}", action, err);
            let status = match &err {
                ApiError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::Status { status: 400, .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            let view = AdminView::upload_with_notice(&err.to_string());
            state.render(status, templates::ADMIN, "Admin", &view)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_round_trips_through_encoding() {
        let cookie = session_cookie("session=a b; remember=1");
        let jar = CookieJar::new().add(cookie);
        assert_eq!(
            session_from(&jar),
            Some("session=a b; remember=1".to_string())
        );
    }

    #[test]
    fn missing_or_empty_cookie_means_no_session() {
        assert_eq!(session_from(&CookieJar::new()), None);
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, ""));
        assert_eq!(session_from(&jar), None);
    }
}
