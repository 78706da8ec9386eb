pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::HelpdeskConfig;
use crate::handlers::health_check;
use crate::services::{
    AuthService, CommentService, DirectoryService, InvitationNotifier, InvitationService,
    JwtService, TicketService,
};
use crate::store::Store;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::users::list_users,
        handlers::tickets::list_tickets,
        handlers::tickets::create_ticket,
        handlers::tickets::get_ticket,
        handlers::tickets::update_ticket,
        handlers::tickets::delete_ticket,
        handlers::tickets::update_ticket_status,
        handlers::tickets::assign_ticket,
        handlers::comments::list_comments,
        handlers::comments::create_comment,
        handlers::comments::edit_comment,
        handlers::comments::delete_comment,
        handlers::invitations::create_invitation,
        handlers::invitations::validate_invitation,
        handlers::invitations::accept_invitation,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterOrganizationRequest,
            dtos::auth::LoginRequest,
            dtos::auth::SessionResponse,
            dtos::tickets::CreateTicketRequest,
            dtos::tickets::UpdateTicketRequest,
            dtos::tickets::UpdateStatusRequest,
            dtos::tickets::AssignTicketRequest,
            dtos::tickets::TicketListResponse,
            dtos::comments::CreateCommentRequest,
            dtos::comments::EditCommentRequest,
            dtos::invitations::CreateInvitationRequest,
            dtos::invitations::CreateInvitationResponse,
            dtos::invitations::InvitationDetailsResponse,
            dtos::invitations::AcceptInvitationRequest,
            models::Role,
            models::UserSummary,
            models::OrganizationSummary,
            models::TicketStatus,
            models::TicketPriority,
            models::TicketView,
            models::Comment,
            models::CommentThread,
            policy::TicketSort,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Organization sign-up and login"),
        (name = "Users", description = "Organization directory"),
        (name = "Tickets", description = "Tickets, status and assignment"),
        (name = "Comments", description = "Threaded ticket comments"),
        (name = "Invitations", description = "Invite members into an organization"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: HelpdeskConfig,
    pub store: Arc<dyn Store>,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub directory: DirectoryService,
    pub tickets: TicketService,
    pub comments: CommentService,
    pub invitations: InvitationService,
}

impl AppState {
    pub fn new(
        config: HelpdeskConfig,
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry_minutes);

        Self {
            auth: AuthService::new(store.clone(), jwt.clone()),
            directory: DirectoryService::new(store.clone()),
            tickets: TicketService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            invitations: InvitationService::new(
                store.clone(),
                notifier,
                config.invitations.public_base_url.clone(),
                config.invitations.expiry_days,
            ),
            jwt,
            store,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let protected = Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route(
            "/tickets/:id",
            get(handlers::get_ticket)
                .patch(handlers::update_ticket)
                .delete(handlers::delete_ticket),
        )
        .route("/tickets/:id/status", patch(handlers::update_ticket_status))
        .route("/tickets/:id/assignees", put(handlers::assign_ticket))
        .route(
            "/tickets/:id/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/tickets/:id/comments/:comment_id",
            patch(handlers::edit_comment).delete(handlers::delete_comment),
        )
        .route("/invitations", post(handlers::create_invitation))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/invitations/validate", get(handlers::validate_invitation))
        .route("/invitations/accept", post(handlers::accept_invitation))
        .merge(protected);

    if state.config.swagger.enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));
    }

    let origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let app = app
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}
