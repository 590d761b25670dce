// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assignment, auth, progress, quiz, reference},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public sub-routers: auth and reference data.
/// * Everything else sits behind the bearer-token middleware; role and
///   ownership checks happen inside the handlers via the guard.
/// * Applies global middleware (Trace, CORS) and injects the app state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let reference_routes = Router::new()
        .route("/statuses", get(reference::get_quiz_statuses))
        .route("/roles", get(reference::get_available_roles));

    let protected_routes = Router::new()
        .route("/users", get(reference::get_all_users))
        .route("/quizzes", post(quiz::create_quiz))
        .route("/quizzes/mine", get(quiz::get_user_quizzes))
        .route("/quizzes/status", post(quiz::set_quiz_status))
        .route("/quizzes/{id}/questions", get(quiz::get_questions_by_quiz))
        .route("/quizzes/{id}/scores", get(progress::get_quiz_scores))
        .route("/questions", post(quiz::create_question))
        .route("/questions/{id}/answers", get(quiz::get_answers_by_question))
        .route("/answers", post(quiz::create_answer))
        .route(
            "/assignments",
            post(assignment::assign_quiz).get(assignment::get_assigned_quizzes),
        )
        .route("/assignments/accept", post(assignment::set_accepted_status))
        .route("/progress/answers", post(progress::submit_answer))
        .route("/progress/next", get(progress::get_next_question))
        .route("/progress/summary", get(progress::get_participant_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = reference_routes.merge(protected_routes);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
