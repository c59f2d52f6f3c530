//! End-to-end calls against the live mock service.
//!
//! # Design
//! Starts the mock server on a random port, then drives `RequestDispatcher`
//! with the real reqwest transport. Covers JSON, query, multipart, header and
//! failure paths over actual HTTP.

use std::io::Write;
use std::net::SocketAddr;

use microrest_core::{
    ApiConfig, Cookie, FileParam, ParamTree, RequestDispatcher, RestError, ServiceDescriptor, UrlResolver,
};
use serde_json::json;

fn start_server() -> SocketAddr {
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

    addr
}

fn dispatcher(addr: SocketAddr, path_prefix: &str) -> RequestDispatcher<ServiceDescriptor> {
    let config = ApiConfig::new()
        .with_prefix(mock_server::API_PREFIX)
        .with_version(mock_server::API_VERSION)
        .with_host("users", format!("http://{addr}"));
    RequestDispatcher::new(UrlResolver::new(config), ServiceDescriptor::new("users", path_prefix)).unwrap()
}

#[test]
fn user_lifecycle() {
    let addr = start_server();
    let users = dispatcher(addr, "users");

    // Step 1: create with a nested profile sent as raw JSON.
    let params = ParamTree::new()
        .with("name", "Ada")
        .with("profile", ParamTree::new().with("age", 36).with("langs", vec!["en", "fr"]));
    let created = users.rest("POST", "", &params).unwrap();
    assert_eq!(created["name"], "Ada");
    assert_eq!(created["profile"], json!({"age": 36, "langs": ["en", "fr"]}));
    let id = created["id"].as_str().unwrap().to_string();

    // Step 2: fetch it back.
    let fetched = users.get(&format!("/{id}"), &ParamTree::new()).unwrap();
    assert_eq!(fetched, created);

    // Step 3: list with nested filters encoded as bracketed query keys.
    let listed = users
        .get("", &ParamTree::new().with("filter", ParamTree::new().with("role", "admin")))
        .unwrap();
    assert_eq!(listed["query"]["filter[role]"], "admin");
    assert_eq!(listed["users"].as_array().unwrap().len(), 1);

    // Step 4: delete, then the user is gone.
    users.rest("delete", &id, &ParamTree::new()).unwrap();
    let err = users.get(&id, &ParamTree::new()).unwrap_err();
    assert!(matches!(err, RestError::Upstream { ref message, code: 404 } if message == "user not found"));
}

#[test]
fn validation_failure_surfaces_upstream_message() {
    let addr = start_server();
    let err = dispatcher(addr, "users")
        .post("", &ParamTree::new().with("profile", ParamTree::new().with("age", 1)))
        .unwrap_err();
    assert_eq!(err.code(), Some(422));
    assert_eq!(err.message(), "The name field is required.");
}

#[test]
fn avatar_upload_is_multipart() {
    let addr = start_server();
    let users = dispatcher(addr, "users");
    let created = users.post("", &ParamTree::new().with("name", "Grace")).unwrap();
    let id = created["id"].as_str().unwrap();

    let mut avatar = tempfile::NamedTempFile::new().unwrap();
    avatar.write_all(b"not-really-a-png").unwrap();

    let params = ParamTree::new()
        .with("avatar", FileParam::new(avatar.path()).with_name("grace.png"))
        .with("caption", ParamTree::new().with("text", "hello").with("public", true))
        .with("note", None::<String>);
    let uploaded = users.post(&format!("{id}/avatar"), &params).unwrap();

    assert_eq!(uploaded["fields"], json!({"caption[text]": "hello", "caption[public]": "1"}));
    assert_eq!(
        uploaded["files"],
        json!([{"field": "avatar", "filename": "grace.png", "content_type": "image/png", "size": 16}])
    );
    // The file is only read.
    assert!(avatar.path().exists());
}

#[test]
fn headers_and_cookies_reach_the_service() {
    let addr = start_server();
    let mut whoami = dispatcher(addr, "whoami");
    whoami.header("X-Request-Id", "req-1").cookie(Cookie::new("session", "abc"));

    let echoed = whoami.get("", &ParamTree::new()).unwrap();
    assert_eq!(echoed["accept"], "application/json");
    assert_eq!(echoed["server_protocol"], "HTTP/1.1");
    assert_eq!(echoed["cookie"], "session=abc");
    assert_eq!(echoed["request_id"], "req-1");
}

#[test]
fn unreadable_error_bodies_are_malformed_upstream() {
    let addr = start_server();
    let faults = dispatcher(addr, "faults");

    let err = faults.get("", &ParamTree::new()).unwrap_err();
    match err {
        RestError::MalformedUpstream { code, ref body, .. } => {
            assert_eq!(code, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = faults.get("silent", &ParamTree::new()).unwrap_err();
    assert!(matches!(err, RestError::MalformedUpstream { code: 503, .. }));
}

#[test]
fn missing_host_fails_without_network() {
    let config = ApiConfig::new().with_prefix("api").with_version("v1");
    let d = RequestDispatcher::new(UrlResolver::new(config), ServiceDescriptor::new("ledger", "entries")).unwrap();
    let err = d.get("", &ParamTree::new()).unwrap_err();
    assert!(matches!(err, RestError::ConfigurationMissing(ref k) if k == "api.LEDGER"));
}
