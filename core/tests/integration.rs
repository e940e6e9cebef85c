//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `FetchResource` and
//! `Repository` through the real `ureq` transport. Checks that URL building,
//! body encoding, and response normalization agree with an actual HTTP stack.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rest_resource::{
    ArrayFormat, CallOptions, ContentType, EntityResource, Envelope, FetchResource,
    RepositoryBuilder, RequestOptions, Resource, ResourceError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/api/")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    display_name: String,
    #[serde(default)]
    email: Option<String>,
}

fn echo_field(envelope: &Envelope, field: &str) -> Value {
    envelope.as_json().unwrap()[field].clone()
}

#[test]
fn json_post_reaches_server_as_json() {
    let base = start_server();
    let resource = FetchResource::new(RequestOptions::new(base).with_header("X-Client", "tests"));

    let envelope = resource
        .post("echo", Some(&json!({"name": "Ann", "tags": ["a", "b"]})), None)
        .unwrap();

    assert_eq!(envelope.status(), Some(200));
    assert_eq!(echo_field(&envelope, "method"), "POST");
    assert_eq!(echo_field(&envelope, "content_type"), "application/json");
    assert_eq!(echo_field(&envelope, "headers")["x-client"], "tests");
    let body = echo_field(&envelope, "body");
    let sent: Value = serde_json::from_str(body.as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({"name": "Ann", "tags": ["a", "b"]}));
}

#[test]
fn delete_body_reaches_server() {
    let base = start_server();
    let resource = FetchResource::new(RequestOptions::new(base));

    let envelope = resource.delete("echo", Some(&json!({"ids": [3, 4]})), None).unwrap();

    assert_eq!(echo_field(&envelope, "method"), "DELETE");
    assert_eq!(echo_field(&envelope, "content_type"), "application/json");
    let body = echo_field(&envelope, "body");
    let sent: Value = serde_json::from_str(body.as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({"ids": [3, 4]}));
}

#[test]
fn query_params_use_configured_array_format() {
    let base = start_server();
    let resource = FetchResource::new(RequestOptions::new(base));

    let call = CallOptions::new().param("ids", json!([1, 2])).param("q", "a b");
    let envelope = resource.get("echo", None, Some(&call)).unwrap();
    assert_eq!(echo_field(&envelope, "query"), "ids=1,2&q=a%20b");

    let call = call.array_format(ArrayFormat::Array);
    let envelope = resource.get("echo", None, Some(&call)).unwrap();
    assert_eq!(echo_field(&envelope, "query"), "ids[]=1&ids[]=2&q=a%20b");
}

#[test]
fn multipart_body_is_flattened() {
    let base = start_server();
    let resource = FetchResource::new(
        RequestOptions::new(base).with_content_type(ContentType::FormData),
    );

    let envelope = resource
        .post("echo", Some(&json!({"user": {"name": "Ann"}, "tags": ["x"]})), None)
        .unwrap();

    let content_type = echo_field(&envelope, "content_type");
    assert!(content_type
        .as_str()
        .unwrap()
        .starts_with("multipart/form-data; boundary="));
    let body = echo_field(&envelope, "body");
    let body = body.as_str().unwrap();
    assert!(body.contains("name=\"user[name]\"\r\n\r\nAnn\r\n"));
    assert!(body.contains("name=\"tags[]\"\r\n\r\nx\r\n"));
}

#[test]
fn text_response_has_no_status_field() {
    let base = start_server();
    let resource = FetchResource::new(RequestOptions::new(base));

    let envelope = resource.get("ping", None, None).unwrap();
    assert_eq!(envelope, Envelope::Text("pong".to_string()));
    assert_eq!(envelope.status(), None);
}

#[test]
fn not_found_calls_error_hook_once() {
    let base = start_server();
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let resource = FetchResource::new(RequestOptions::new(base).with_error_hook(move |resp, _| {
        assert_eq!(resp.status, 404);
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    let err = resource
        .get("users/00000000-0000-0000-0000-000000000000", None, None)
        .unwrap_err();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.body().unwrap(),
        &Envelope::Json(json!({"error": "user not found", "_status": 404}))
    );
}

#[test]
fn unreachable_host_is_a_transport_error() {
    // bind then drop so the port is very likely closed
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let resource = FetchResource::new(RequestOptions::new(format!("http://127.0.0.1:{port}")));
    let err = resource.get("users", None, None).unwrap_err();
    assert!(matches!(err, ResourceError::Transport(_)));
}

#[test]
fn repository_lifecycle() {
    let base = start_server();
    let repo = RepositoryBuilder::new(base, "users")
        .rename("name", "display_name")
        .build::<Member>();

    // list: empty
    assert!(repo.get_all_entities(None).unwrap().is_empty());

    // create
    let created = repo
        .create(&Member {
            id: None,
            display_name: "Ann".to_string(),
            email: Some("ann@example.com".to_string()),
        })
        .unwrap();
    assert_eq!(created.display_name, "Ann");
    let id = created.id.clone().unwrap();

    // find
    assert_eq!(repo.find(&id).unwrap(), created);

    // replace
    let replaced = repo
        .update(
            &id,
            &Member {
                id: None,
                display_name: "Anna".to_string(),
                email: None,
            },
        )
        .unwrap();
    assert_eq!(replaced.display_name, "Anna");
    assert!(replaced.email.is_none());

    // list: one item
    let all = repo.find_all(None).unwrap();
    assert_eq!(all, vec![replaced]);

    // remove: 204 comes back as empty text
    assert_eq!(repo.remove(&id).unwrap(), Envelope::Text(String::new()));

    // find after remove: 404
    let err = repo.find(&id).unwrap_err();
    assert_eq!(err.status(), Some(404));
}
