use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::quiz::list_quizzes))
        .nest("/events", event_routes())
        .nest("/sessions", session_routes())
        .nest("/prizes", prize_routes())
}

fn event_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::session::start_session))
        .routes(routes!(handlers::prize::bulk_draw))
        .routes(routes!(handlers::prize::list_event_prizes))
}

fn session_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::session::get_session,
            handlers::session::cancel_session
        ))
        .routes(routes!(handlers::session::submit_answer))
        .routes(routes!(handlers::session::complete_session))
}

fn prize_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::prize::my_prizes))
        .routes(routes!(handlers::prize::claim_prize))
}
