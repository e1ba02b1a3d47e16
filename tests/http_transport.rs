use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use warp::Filter;

use profile_photo_uploader::errors::AppError;
use profile_photo_uploader::uploader::{
    AvatarTransport, CredentialPolicy, HttpTransport, MediaKind, ProgressCallback, UploadRequest,
};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[derive(Debug, Clone, Default)]
struct Received {
    kind: Option<String>,
    content_type: Option<String>,
    authorization: Option<String>,
    body: Vec<u8>,
}

/// Serves the avatar endpoint on an ephemeral port. `status` decides whether
/// the upload is accepted.
fn serve(status: u16) -> (SocketAddr, Arc<Mutex<Received>>) {
    let received = Arc::new(Mutex::new(Received::default()));
    let sink = received.clone();

    let route = warp::post()
        .and(warp::path!("api" / "v1" / "profile" / "avatar" / "upload"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::bytes())
        .map(
            move |query: HashMap<String, String>,
                  content_type: Option<String>,
                  authorization: Option<String>,
                  body: warp::hyper::body::Bytes| {
                *sink.lock().unwrap() = Received {
                    kind: query.get("kind").cloned(),
                    content_type,
                    authorization,
                    body: body.to_vec(),
                };

                let code = warp::http::StatusCode::from_u16(status).unwrap();
                let reply = if code.is_success() {
                    r#"{"updatedUser":{"id":"u1","avatar":"https://cdn/x/cat.png"}}"#
                } else {
                    "storage unavailable"
                };
                warp::reply::with_status(reply, code)
            },
        );

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, received)
}

fn transport(addr: SocketAddr, credentials: CredentialPolicy) -> HttpTransport {
    HttpTransport::new(
        &format!("http://{}/api/v1", addr),
        "profile/avatar/upload",
        credentials,
        None,
    )
    .unwrap()
    .with_chunk_size(1024)
}

fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<(u64, Option<u64>)>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: ProgressCallback = Arc::new(move |sent, total| {
        sink.lock().unwrap().push((sent, total));
    });
    (callback, events)
}

fn cat_request() -> UploadRequest {
    UploadRequest {
        kind: MediaKind::Image,
        file_name: "cat.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![42u8; 4096],
    }
}

#[tokio::test]
async fn test_multipart_upload_reports_progress() {
    let (addr, received) = serve(200);
    let transport = transport(addr, CredentialPolicy::BearerToken("secret".to_string()));
    let (callback, events) = recording_callback();

    let body = transport.upload(cat_request(), callback).await.unwrap();
    assert!(body.contains("updatedUser"));

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 4);
    assert_eq!(events.last(), Some(&(4096, Some(4096))));
    assert!(events.windows(2).all(|pair| pair[0].0 < pair[1].0));

    let received = received.lock().unwrap().clone();
    assert_eq!(received.kind.as_deref(), Some("image"));
    assert_eq!(received.authorization.as_deref(), Some("Bearer secret"));
    assert!(received
        .content_type
        .unwrap_or_default()
        .starts_with("multipart/form-data"));
    assert!(contains(&received.body, b"name=\"avatar\""));
    assert!(contains(&received.body, b"filename=\"cat.png\""));
    assert!(contains(&received.body, &[42u8; 4096]));
}

#[tokio::test]
async fn test_video_kind_is_tagged() {
    let (addr, received) = serve(200);
    let transport = transport(addr, CredentialPolicy::Anonymous);
    let (callback, _) = recording_callback();

    let request = UploadRequest {
        kind: MediaKind::Video,
        file_name: "clip.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        bytes: vec![1u8; 10],
    };
    transport.upload(request, callback).await.unwrap();

    let received = received.lock().unwrap().clone();
    assert_eq!(received.kind.as_deref(), Some("video"));
    assert!(received.authorization.is_none());
}

#[tokio::test]
async fn test_error_status_is_server_rejection() {
    let (addr, _) = serve(503);
    let transport = transport(addr, CredentialPolicy::Anonymous);
    let (callback, _) = recording_callback();

    let err = transport.upload(cat_request(), callback).await.unwrap_err();
    match err {
        AppError::ServerRejection { status, reason } => {
            assert_eq!(status, Some(503));
            assert!(reason.contains("storage unavailable"));
        }
        other => panic!("expected a server rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let transport = HttpTransport::new(
        "http://127.0.0.1:9/api/v1",
        "profile/avatar/upload",
        CredentialPolicy::Anonymous,
        None,
    )
    .unwrap();
    let (callback, _) = recording_callback();

    let err = transport.upload(cat_request(), callback).await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
}
