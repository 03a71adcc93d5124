use super::*;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use shared::domain::{RecallClassification, WordId, WordlistId};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct BackendState {
    cookies: Arc<Mutex<Vec<Option<String>>>>,
    proceed_forms: Arc<Mutex<Vec<bool>>>,
    register_names: Arc<Mutex<Vec<String>>>,
    uploads: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
    saved_settings: Arc<Mutex<Option<UserSettings>>>,
    current_body: Arc<Mutex<String>>,
    resets: Arc<Mutex<u32>>,
}

const ITEM_JSON: &str = r#"{"word":{"id":9,"name":"kantan","hint":"easy","definition":"simple"},"wordKnownType":"KNOWN"}"#;

async fn record_cookie(state: &BackendState, headers: &HeaderMap) -> bool {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let authorized = cookie.as_deref() == Some("user_id=7");
    state.cookies.lock().await.push(cookie);
    authorized
}

async fn handle_me(
    State(state): State<BackendState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, StatusCode> {
    if !record_cookie(&state, &headers).await {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(UserProfile {
        id: UserId(7),
        name: "alice".to_string(),
        user_settings: None,
    }))
}

#[derive(Deserialize)]
struct RegisterQuery {
    user_name: String,
}

async fn handle_register(
    State(state): State<BackendState>,
    Form(form): Form<RegisterQuery>,
) -> String {
    state.register_names.lock().await.push(form.user_name);
    "7".to_string()
}

async fn handle_current(State(state): State<BackendState>, headers: HeaderMap) -> String {
    record_cookie(&state, &headers).await;
    state.current_body.lock().await.clone()
}

#[derive(Deserialize)]
struct ProceedQuery {
    is_known: bool,
}

async fn handle_proceed(
    State(state): State<BackendState>,
    Form(form): Form<ProceedQuery>,
) -> &'static str {
    state.proceed_forms.lock().await.push(form.is_known);
    if form.is_known {
        ITEM_JSON
    } else {
        "no more words"
    }
}

async fn handle_progress() -> Json<DailyProgress> {
    Json(DailyProgress {
        remaining: 2,
        learning: 3,
        finished: 5,
    })
}

async fn handle_reset(State(state): State<BackendState>) {
    *state.resets.lock().await += 1;
}

async fn handle_settings(State(state): State<BackendState>) -> String {
    match state.saved_settings.lock().await.as_ref() {
        Some(settings) => serde_json::to_string(settings).expect("settings json"),
        None => String::new(),
    }
}

async fn handle_edit_settings(
    State(state): State<BackendState>,
    Json(settings): Json<UserSettings>,
) -> Json<UserSettings> {
    *state.saved_settings.lock().await = Some(settings.clone());
    Json(settings)
}

async fn handle_wordlists() -> Json<Vec<Wordlist>> {
    Json(vec![
        Wordlist {
            id: WordlistId(1),
            name: "JLPT N5".to_string(),
        },
        Wordlist {
            id: WordlistId(2),
            name: "JLPT N4".to_string(),
        },
    ])
}

async fn handle_upload(
    State(state): State<BackendState>,
    mut multipart: Multipart,
) -> &'static str {
    let mut file_name = String::new();
    let mut filename_field = String::new();
    let mut bytes = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().unwrap_or_default().to_string();
                bytes = field.bytes().await.expect("file bytes").to_vec();
            }
            Some("filename") => {
                filename_field = field.text().await.expect("filename text");
            }
            _ => {}
        }
    }
    state
        .uploads
        .lock()
        .await
        .push((file_name, filename_field, bytes));
    "uploaded"
}

async fn spawn_backend() -> (String, BackendState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = BackendState::default();
    let app = Router::new()
        .route("/user/me", get(handle_me))
        .route("/user/register", post(handle_register))
        .route("/user/settings", get(handle_settings))
        .route("/user/settings/edit", post(handle_edit_settings))
        .route("/wordlist/all", get(handle_wordlists))
        .route("/wordlist/upload", post(handle_upload))
        .route("/learning/current", get(handle_current))
        .route("/learning/proceed", post(handle_proceed))
        .route("/learning/progress", get(handle_progress))
        .route("/learning/reset", post(handle_reset))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn logged_in(server_url: &str) -> MemoClient {
    MemoClient::new(server_url)
        .expect("client")
        .with_session(UserId(7))
}

#[test]
fn rejects_non_http_backend_url() {
    assert!(matches!(
        MemoClient::new("ftp://example.com"),
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        MemoClient::new("not a url"),
        Err(ClientError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn normalizes_trailing_slash() {
    let client = MemoClient::new("http://localhost:8080/").expect("client");
    assert_eq!(client.server_url(), "http://localhost:8080");
}

#[tokio::test]
async fn requests_without_session_fail_locally() {
    let client = MemoClient::new("http://127.0.0.1:9").expect("client");
    let err = client.current_item().await.expect_err("no session");
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn register_adopts_returned_user_id() {
    let (server_url, state) = spawn_backend().await;
    let mut client = MemoClient::new(&server_url).expect("client");

    let user_id = client.register("  alice ").await.expect("register");

    assert_eq!(user_id, UserId(7));
    assert_eq!(client.user_id(), Some(UserId(7)));
    assert_eq!(*state.register_names.lock().await, vec!["alice".to_string()]);
}

#[tokio::test]
async fn register_rejects_blank_name() {
    let mut client = MemoClient::new("http://127.0.0.1:9").expect("client");
    assert!(matches!(
        client.register("   ").await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn login_sends_session_cookie() {
    let (server_url, state) = spawn_backend().await;
    let mut client = MemoClient::new(&server_url).expect("client");

    let profile = client.login(UserId(7)).await.expect("login");

    assert_eq!(profile.name, "alice");
    assert_eq!(
        *state.cookies.lock().await,
        vec![Some("user_id=7".to_string())]
    );
}

#[tokio::test]
async fn rejected_login_drops_session() {
    let (server_url, _) = spawn_backend().await;
    let mut client = MemoClient::new(&server_url).expect("client");

    let err = client.login(UserId(8)).await.expect_err("unknown user");

    assert!(matches!(err, ClientError::Unauthorized { .. }));
    assert!(err.backend_responded());
    assert_eq!(client.user_id(), None);
}

#[tokio::test]
async fn current_item_parses_review_item() {
    let (server_url, state) = spawn_backend().await;
    *state.current_body.lock().await = ITEM_JSON.to_string();
    let client = logged_in(&server_url);

    let item = client
        .current_item()
        .await
        .expect("fetch")
        .expect("item present");

    assert_eq!(item.id(), WordId(9));
    assert_eq!(item.classification(), RecallClassification::Known);
}

#[tokio::test]
async fn unrecognised_known_type_is_still_an_item() {
    let (server_url, state) = spawn_backend().await;
    *state.current_body.lock().await =
        r#"{"word":{"id":1,"name":"neko","hint":"cat"},"wordKnownType":"FAMILIAR"}"#.to_string();
    let client = logged_in(&server_url);

    let item = client
        .current_item()
        .await
        .expect("fetch")
        .expect("item present");

    assert_eq!(item.name(), "neko");
    assert_eq!(item.classification(), RecallClassification::Other);
    assert_eq!(ReviewPhase::initial_for(item.classification()), ReviewPhase::Question);
}

#[tokio::test]
async fn empty_or_non_item_body_is_completion_signal() {
    let (server_url, state) = spawn_backend().await;
    let client = logged_in(&server_url);

    assert_eq!(client.current_item().await.expect("fetch"), None);

    *state.current_body.lock().await = "done for today".to_string();
    assert_eq!(client.current_item().await.expect("fetch"), None);
}

#[tokio::test]
async fn proceed_posts_is_known_form() {
    let (server_url, state) = spawn_backend().await;
    let client = logged_in(&server_url);

    let next = client.proceed(true).await.expect("proceed known");
    assert_eq!(next.map(|item| item.id()), Some(WordId(9)));

    let next = client.proceed(false).await.expect("proceed unknown");
    assert_eq!(next, None);

    assert_eq!(*state.proceed_forms.lock().await, vec![true, false]);
}

#[tokio::test]
async fn progress_and_reset_round_trip() {
    let (server_url, state) = spawn_backend().await;
    let client = logged_in(&server_url);

    let progress = client.progress().await.expect("progress");
    assert_eq!(progress.total(), 10);
    assert_eq!(progress.completion_ratio(), 0.5);

    client.reset().await.expect("reset");
    assert_eq!(*state.resets.lock().await, 1);
}

#[tokio::test]
async fn settings_are_optional_until_saved() {
    let (server_url, _) = spawn_backend().await;
    let client = logged_in(&server_url);

    assert_eq!(client.settings().await.expect("settings"), None);

    let wanted = UserSettings {
        current_wordlist_id: WordlistId(2),
        daily_new_word_count: 5,
        daily_revising_word_count: 20,
    };
    let saved = client.update_settings(&wanted).await.expect("save");
    assert_eq!(saved, wanted);
    assert_eq!(client.settings().await.expect("settings"), Some(wanted));
}

#[tokio::test]
async fn lists_wordlists() {
    let (server_url, _) = spawn_backend().await;
    let client = logged_in(&server_url);

    let lists = client.wordlists().await.expect("wordlists");
    let names: Vec<_> = lists.iter().map(|list| list.name.as_str()).collect();
    assert_eq!(names, vec!["JLPT N5", "JLPT N4"]);
}

#[tokio::test]
async fn upload_sends_file_and_filename_fields() {
    let (server_url, state) = spawn_backend().await;
    let client = logged_in(&server_url);
    let path =
        std::env::temp_dir().join(format!("kantanmemo_upload_{}.csv", std::process::id()));
    std::fs::write(&path, b"neko,cat\ninu,dog\n").expect("write word list");

    let ack = client.upload_wordlist(&path).await.expect("upload");

    let expected_name = path
        .file_name()
        .expect("file name")
        .to_string_lossy()
        .into_owned();
    assert_eq!(ack, "uploaded");
    let uploads = state.uploads.lock().await.clone();
    assert_eq!(
        uploads,
        vec![(
            expected_name.clone(),
            expected_name,
            b"neko,cat\ninu,dog\n".to_vec()
        )]
    );
    std::fs::remove_file(path).expect("cleanup");
}

#[tokio::test]
async fn upload_of_missing_file_is_reported_before_any_request() {
    let client = logged_in("http://127.0.0.1:9");
    let err = client
        .upload_wordlist(Path::new("/definitely/not/here.csv"))
        .await
        .expect_err("missing file");
    assert!(matches!(err, ClientError::Io { .. }));
}

#[tokio::test]
async fn server_errors_are_classified_as_backend_failures() {
    let (server_url, _) = spawn_backend().await;
    let client = logged_in(&server_url);

    let res = client
        .request(Method::GET, "/no/such/route")
        .send()
        .await
        .expect("transport");
    let err = check_status(res).await.expect_err("404");
    assert_eq!(err.category(), ErrorCategory::Backend);
    assert!(!err.requires_reauth());
}
