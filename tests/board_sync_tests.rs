/// Client library tests against a live server on a random local port
use design_commons::{
    account::RegisterRequest,
    board::{CreatePinRequest, PinKind, Position, UpdatePinRequest},
    client::{ApiClient, BoardSync, BoardSyncConfig, PinsFetch, SessionStore},
    config::ServerConfig,
    forum::CreateThreadRequest,
    server::build_router,
    store::MemoryDocumentBackend,
    AppContext,
};
use std::{sync::Arc, time::Duration};
use tempfile::TempDir;

/// Start a server and return its base URL
async fn spawn_server() -> String {
    let ctx = AppContext::with_backend(
        ServerConfig::ephemeral("/tmp/unused"),
        Arc::new(MemoryDocumentBackend::new()),
    )
    .unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, build_router(ctx)).await.unwrap();
    });

    format!("http://{}", addr)
}

fn registration(email: &str, name: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "correct horse battery".to_string(),
        display_name: name.to_string(),
        school: None,
        job_title: None,
        invite_token: None,
    }
}

fn quote(content: &str) -> CreatePinRequest {
    CreatePinRequest {
        kind: PinKind::Quote,
        title: None,
        content: content.to_string(),
        url: None,
        color: None,
        position: Some(Position::new(10.0, 10.0)),
        rotation: Some(0.0),
    }
}

#[tokio::test]
async fn test_session_survives_restart() {
    let base_url = spawn_server().await;
    let temp_dir = TempDir::new().unwrap();
    let session_path = temp_dir.path().join("session.json");

    let client = ApiClient::new(&base_url)
        .unwrap()
        .with_session_store(SessionStore::new(&session_path))
        .await
        .unwrap();
    let user = client.register(&registration("ada@school.edu", "Ada")).await.unwrap();
    assert_eq!(user.display_name, "Ada");

    let restored = ApiClient::new(&base_url)
        .unwrap()
        .with_session_store(SessionStore::new(&session_path))
        .await
        .unwrap();
    assert_eq!(restored.current_user_id(), Some(user.id.clone()));
    assert_eq!(restored.me().await.unwrap().id, user.id);

    restored.logout().await.unwrap();
    assert!(!session_path.exists());
    assert!(!restored.is_signed_in());
}

#[tokio::test]
async fn test_api_errors_carry_status_and_message() {
    let base_url = spawn_server().await;
    let client = ApiClient::new(&base_url).unwrap();

    let err = client.create_pin(&quote("Hello")).await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    client.register(&registration("ada@school.edu", "Ada")).await.unwrap();
    let err = client.delete_pin("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("Pin not found"));
}

#[tokio::test]
async fn test_conditional_pin_fetch() {
    let base_url = spawn_server().await;
    let client = ApiClient::new(&base_url).unwrap();
    client.register(&registration("ada@school.edu", "Ada")).await.unwrap();
    client.create_pin(&quote("Empathize")).await.unwrap();

    let etag = match client.fetch_pins(None).await.unwrap() {
        PinsFetch::Pins { pins, etag } => {
            assert_eq!(pins.len(), 1);
            etag.unwrap()
        }
        PinsFetch::NotModified => panic!("first fetch must return pins"),
    };

    assert_eq!(
        client.fetch_pins(Some(&etag)).await.unwrap(),
        PinsFetch::NotModified
    );
}

#[tokio::test]
async fn test_board_sync_sees_other_users_and_debounces_moves() {
    let base_url = spawn_server().await;

    // Bo registers first and becomes the admin; Ada is a plain member
    let bo = ApiClient::new(&base_url).unwrap();
    bo.register(&registration("bo@school.edu", "Bo")).await.unwrap();
    let ada = Arc::new(ApiClient::new(&base_url).unwrap());
    ada.register(&registration("ada@school.edu", "Ada")).await.unwrap();

    let sync = BoardSync::new(
        Arc::clone(&ada),
        BoardSyncConfig {
            poll_interval: Duration::from_millis(100),
            debounce: Duration::from_millis(50),
        },
    );
    sync.start();

    // Another member's pin shows up through polling alone
    let pin = bo.create_pin(&quote("Prototype early")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    let pins = sync.pins().await;
    assert_eq!(pins.len(), 1);
    assert!(!sync.is_owner(&pins[0]));

    for step in 1..=4 {
        sync.move_pin(&pin.id, Position::new(20.0 * step as f64, 50.0))
            .await
            .unwrap();
    }
    sync.flush().await;

    let stored = bo.list_pins().await.unwrap();
    assert_eq!(stored[0].position, Position::new(80.0, 50.0));

    // Editing someone else's pin is refused and recorded
    let err = sync
        .update_pin(UpdatePinRequest {
            id: pin.id.clone(),
            content: Some("Mine now".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(sync.last_error().await.is_some());

    let liked = sync.toggle_like(&pin.id).await.unwrap();
    assert_eq!(liked.likes, vec![ada.current_user_id().unwrap()]);

    sync.stop();
    assert!(!sync.is_polling());
}

#[tokio::test]
async fn test_forum_through_client() {
    let base_url = spawn_server().await;
    let client = ApiClient::new(&base_url).unwrap();
    client.register(&registration("ada@school.edu", "Ada")).await.unwrap();

    let thread = client
        .create_thread(&CreateThreadRequest {
            topic_id: "technology".to_string(),
            title: "3D printers".to_string(),
            content: "Which one?".to_string(),
        })
        .await
        .unwrap();
    client.create_reply(&thread.id, "The sturdy one").await.unwrap();

    assert_eq!(client.get_thread(&thread.id).await.unwrap().reply_count, 1);
    assert_eq!(client.list_replies(&thread.id).await.unwrap().len(), 1);

    let topics = client.topics().await.unwrap();
    let technology = topics.iter().find(|t| t.id == "technology").unwrap();
    assert_eq!(technology.thread_count, 1);

    client.delete_thread(&thread.id).await.unwrap();
    assert!(client.list_threads(Some("technology")).await.unwrap().is_empty());
}
