// tests/api_tests.rs
//
// End-to-end tests for auth, authoring and assignment. Each test spawns the
// real router on a random port against a fresh in-memory SQLite database.

use quiz_backend::{config::Config, routes, seed::seed_reference_data, state::AppState};
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // A single connection keeps the in-memory database alive for the test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    seed_reference_data(&pool)
        .await
        .expect("Failed to seed reference data");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        questions_view_owner_only: false,
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a user with the given role and logs them in.
/// Returns (user_id, token).
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    role: Option<&str>,
) -> (i64, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "role": role,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let user_id = body["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    (user_id, body["token"].as_str().unwrap().to_string())
}

/// Creates a Draft quiz and returns its id.
async fn create_quiz(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(token)
        .json(&serde_json::json!({"title": "Capitals", "description": "Geography"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_question(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    quiz_id: i64,
    text: &str,
) -> i64 {
    let response = client
        .post(format!("{}/api/questions", address))
        .bearer_auth(token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "question": text}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_answer(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    question_id: i64,
    text: &str,
    is_correct: bool,
) -> i64 {
    let response = client
        .post(format!("{}/api/answers", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "question_id": question_id,
            "answer": text,
            "is_correct": is_correct,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn set_quiz_status(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    quiz_id: i64,
    status: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/quizzes/status", address))
        .bearer_auth(token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "status": status}))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_and_login_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (user_id, token) = register_and_login(&client, &address, Some("Creator")).await;
    assert!(user_id > 0);
    assert!(!token.is_empty());
}

#[tokio::test]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"username": "yo", "password": "password123"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_with_unknown_role_leaves_no_orphaned_user() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "rollback_probe",
            "password": "password123",
            "role": "Archmage",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // The user row must have been rolled back with the failed profile,
    // so logging in finds no account.
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": "rollback_probe",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // And the username is free to register again.
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "rollback_probe",
            "password": "password123",
            "role": "Participant",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for expected in [201, 409] {
        let response = client
            .post(format!("{}/api/auth/register", address))
            .json(&serde_json::json!({
                "username": "twice",
                "password": "password123",
                "role": "Participant",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn creator_endpoints_reject_anonymous_and_wrong_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, participant_token) = register_and_login(&client, &address, Some("Participant")).await;

    // Anonymous callers are cut off by the token middleware.
    let response = client
        .post(format!("{}/api/quizzes", address))
        .json(&serde_json::json!({"title": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let gated_gets = ["/api/users", "/api/quizzes/mine", "/api/quizzes/1/scores"];
    for path in gated_gets {
        let response = client
            .get(format!("{}{}", address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401, "GET {path} anonymous");

        let response = client
            .get(format!("{}{}", address, path))
            .bearer_auth(&participant_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 403, "GET {path} as Participant");
    }

    // Authenticated but wrong role fails closed with 403.
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&participant_token)
        .json(&serde_json::json!({"title": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .post(format!("{}/api/questions", address))
        .bearer_auth(&participant_token)
        .json(&serde_json::json!({"quiz_id": 1, "question": "?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = set_quiz_status(&client, &address, &participant_token, 1, "Published").await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn reference_listings_are_seeded() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/statuses", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let statuses: serde_json::Value = response.json().await.unwrap();
    let names: Vec<&str> = statuses
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Draft", "Published", "Closed"]);

    let response = client
        .get(format!("{}/api/roles", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let roles: serde_json::Value = response.json().await.unwrap();
    assert_eq!(roles.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn publishing_requires_answers_and_lists_every_offender() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address, Some("Creator")).await;

    let quiz_id = create_quiz(&client, &address, &token).await;
    let q1 = create_question(&client, &address, &token, quiz_id, "Capital of France?").await;
    let q2 = create_question(&client, &address, &token, quiz_id, "Capital of Italy?").await;

    let response = set_quiz_status(&client, &address, &token, quiz_id, "Published").await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains(&q1.to_string()), "missing {q1} in {error}");
    assert!(error.contains(&q2.to_string()), "missing {q2} in {error}");

    create_answer(&client, &address, &token, q1, "Paris", true).await;
    create_answer(&client, &address, &token, q2, "Rome", true).await;

    let response = set_quiz_status(&client, &address, &token, quiz_id, "Published").await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_status_name_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address, Some("Creator")).await;
    let quiz_id = create_quiz(&client, &address, &token).await;

    let response = set_quiz_status(&client, &address, &token, quiz_id, "Archived").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn questions_and_answers_only_while_draft() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address, Some("Creator")).await;

    let quiz_id = create_quiz(&client, &address, &token).await;
    let q1 = create_question(&client, &address, &token, quiz_id, "2 + 2?").await;
    create_answer(&client, &address, &token, q1, "4", true).await;

    let response = set_quiz_status(&client, &address, &token, quiz_id, "Published").await;
    assert_eq!(response.status().as_u16(), 200);

    // Published quizzes accept neither new questions nor new answers.
    let response = client
        .post(format!("{}/api/questions", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "question": "too late"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/answers", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({"question_id": q1, "answer": "5", "is_correct": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn answer_authoring_requires_quiz_ownership() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, owner_token) = register_and_login(&client, &address, Some("Creator")).await;
    let (_, other_token) = register_and_login(&client, &address, Some("Creator")).await;

    let quiz_id = create_quiz(&client, &address, &owner_token).await;
    let q1 = create_question(&client, &address, &owner_token, quiz_id, "Who owns this?").await;

    let response = client
        .post(format!("{}/api/answers", address))
        .bearer_auth(&other_token)
        .json(&serde_json::json!({"question_id": q1, "answer": "me", "is_correct": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn any_creator_may_list_questions_by_default() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, owner_token) = register_and_login(&client, &address, Some("Creator")).await;
    let (_, other_token) = register_and_login(&client, &address, Some("Creator")).await;

    let quiz_id = create_quiz(&client, &address, &owner_token).await;
    create_question(&client, &address, &owner_token, quiz_id, "Visible?").await;

    let response = client
        .get(format!("{}/api/quizzes/{}/questions", address, quiz_id))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let questions: serde_json::Value = response.json().await.unwrap();
    assert_eq!(questions.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn assignment_requires_published_quiz_and_rejects_duplicates() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, creator_token) = register_and_login(&client, &address, Some("Creator")).await;
    let (participant_id, _) = register_and_login(&client, &address, Some("Participant")).await;

    let quiz_id = create_quiz(&client, &address, &creator_token).await;
    let q1 = create_question(&client, &address, &creator_token, quiz_id, "Ready?").await;
    create_answer(&client, &address, &creator_token, q1, "yes", true).await;

    // Still Draft: not assignable.
    let response = client
        .post(format!("{}/api/assignments", address))
        .bearer_auth(&creator_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "user_id": participant_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = set_quiz_status(&client, &address, &creator_token, quiz_id, "Published").await;
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/assignments", address))
        .bearer_auth(&creator_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "user_id": participant_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    // Second assignment for the same pair is an explicit error, not a no-op.
    let response = client
        .post(format!("{}/api/assignments", address))
        .bearer_auth(&creator_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "user_id": participant_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn accept_and_decline_assignment_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, creator_token) = register_and_login(&client, &address, Some("Creator")).await;
    let (participant_id, participant_token) =
        register_and_login(&client, &address, Some("Participant")).await;

    let quiz_id = create_quiz(&client, &address, &creator_token).await;
    let q1 = create_question(&client, &address, &creator_token, quiz_id, "Accept me?").await;
    create_answer(&client, &address, &creator_token, q1, "ok", true).await;
    set_quiz_status(&client, &address, &creator_token, quiz_id, "Published").await;

    // Declining before any assignment exists is Not-Found.
    let response = client
        .post(format!("{}/api/assignments/accept", address))
        .bearer_auth(&participant_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "accepted": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    client
        .post(format!("{}/api/assignments", address))
        .bearer_auth(&creator_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "user_id": participant_id}))
        .send()
        .await
        .unwrap();

    // Declining a never-accepted assignment is a validation error.
    let response = client
        .post(format!("{}/api/assignments/accept", address))
        .bearer_auth(&participant_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "accepted": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/assignments/accept", address))
        .bearer_auth(&participant_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "accepted": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/api/assignments", address))
        .bearer_auth(&participant_token)
        .send()
        .await
        .unwrap();
    let assignments: serde_json::Value = response.json().await.unwrap();
    assert_eq!(assignments[0]["accepted"], serde_json::json!(true));
}

#[tokio::test]
async fn answers_listing_requires_published_quiz_and_progress() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, creator_token) = register_and_login(&client, &address, Some("Creator")).await;
    let (participant_id, participant_token) =
        register_and_login(&client, &address, Some("Participant")).await;

    let quiz_id = create_quiz(&client, &address, &creator_token).await;
    let q1 = create_question(&client, &address, &creator_token, quiz_id, "Pick one").await;
    create_answer(&client, &address, &creator_token, q1, "a", true).await;
    create_answer(&client, &address, &creator_token, q1, "b", false).await;

    // Draft quiz: answers are not served.
    let response = client
        .get(format!("{}/api/questions/{}/answers", address, q1))
        .bearer_auth(&participant_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    set_quiz_status(&client, &address, &creator_token, quiz_id, "Published").await;

    // Published but no accepted assignment, hence no progress row.
    let response = client
        .get(format!("{}/api/questions/{}/answers", address, q1))
        .bearer_auth(&participant_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    client
        .post(format!("{}/api/assignments", address))
        .bearer_auth(&creator_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "user_id": participant_id}))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/assignments/accept", address))
        .bearer_auth(&participant_token)
        .json(&serde_json::json!({"quiz_id": quiz_id, "accepted": true}))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("{}/api/questions/{}/answers", address, q1))
        .bearer_auth(&participant_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let answers: serde_json::Value = response.json().await.unwrap();
    assert_eq!(answers.as_array().unwrap().len(), 2);
}
