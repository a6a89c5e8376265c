use actix_web::{
    body::BoxBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    error::InternalError,
    http::StatusCode,
    web, App, Error, HttpRequest, HttpResponse, HttpServer, Responder, ResponseError,
};
use tracing::info;

use crate::api::context::AppState;
use crate::api::types::{
    ConfigureRequest, ErrorResponse, HealthResponse, LoginRequest, MessageResponse, TokenResponse,
};
use crate::error::FeedError;

impl ResponseError for FeedError {
    fn status_code(&self) -> StatusCode {
        match self {
            FeedError::DateMismatch { .. } | FeedError::InvalidDate(_) | FeedError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            FeedError::UpstreamUnavailable(_)
            | FeedError::MalformedFeed(_)
            | FeedError::SinkUnavailable(_) => StatusCode::BAD_GATEWAY,
            FeedError::StorageWriteFailure(_) | FeedError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        let error = match self {
            FeedError::DateMismatch { .. } => "No data available for this date".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}

fn error_body(status: StatusCode, error: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.into(),
    })
}

async fn configure_handler(
    body: web::Json<ConfigureRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder, Error> {
    state.configure(&body.currencies).await?;
    Ok(web::Json(MessageResponse {
        message: "Currencies configured successfully".to_string(),
    }))
}

async fn currencies_handler(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, Error> {
    let snapshot = state.rates_for(&path.into_inner()).await?;
    Ok(web::Json(snapshot.rates))
}

async fn analytics_handler(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    if !state.sessions.authorize(&req)? {
        return Ok(error_body(StatusCode::UNAUTHORIZED, "Missing or invalid bearer token"));
    }
    let rows = state.analytics().await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn login_handler(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    Ok(match state.sessions.login(&body.username, &body.password)? {
        Some(token) => HttpResponse::Ok().json(TokenResponse { token }),
        None => error_body(StatusCode::UNAUTHORIZED, "Invalid username or password"),
    })
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    web::Json(HealthResponse {
        status: "ok",
        ticks: state.pipeline.metrics(),
    })
}

pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<BoxBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let response = error_body(StatusCode::BAD_REQUEST, err.to_string());
        InternalError::from_response(err, response).into()
    });

    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config)
        .route("/health", web::get().to(health_handler))
        .route("/login", web::post().to(login_handler))
        .route("/analytics", web::get().to(analytics_handler))
        .route("/currencies/configure", web::post().to(configure_handler))
        .route("/configure-currencies", web::post().to(configure_handler))
        .route("/currencies/{date}", web::get().to(currencies_handler))
}

pub async fn run_server(state: AppState, bind: &str) -> std::io::Result<()> {
    info!(bind = %bind, "starting api server");
    HttpServer::new(move || build_app(state.clone()))
        .bind(bind)?
        .run()
        .await
}
