//! Integration tests for the client-credentials login using wiremock.
//!
//! Verifies the shape of the token request (Basic auth, form body, scopes,
//! base headers) and how the session reacts to success and failure.

use mvision_devices::auth::{Credentials, login};
use mvision_devices::error::MvisionError;
use mvision_devices::session::{Endpoints, Session};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/iam/v1.1/token";

/// Base64 of `client-id:client-secret`.
const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

fn credentials() -> Credentials {
    Credentials::new("client-id", "client-secret", "api-key")
}

fn session_for(server: &MockServer) -> Session {
    let endpoints = Endpoints::new(
        format!("{}{TOKEN_PATH}", server.uri()),
        format!("{}/epo/v2/devices", server.uri()),
    );
    Session::with_endpoints("api-key", None, endpoints).unwrap()
}

#[tokio::test]
async fn login_installs_token_then_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", BASIC_AUTH))
        .and(header("x-api-key", "api-key"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains(
            "scope=epo.admin+epo.device.r+epo.grps.r+epo.evt.r+epo.tags.r",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T",
            "token_type": "B",
            "expires_in": 599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let token = login(&mut session, &credentials()).await.unwrap();

    assert_eq!(token.access_token, "T");
    assert_eq!(session.authorization(), Some("T B"));
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn unauthorized_login_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid_client"}"#),
        )
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let err = login(&mut session, &credentials()).await.unwrap_err();

    assert!(matches!(err, MvisionError::Auth { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("401"), "should include status, got: {msg}");
    assert!(msg.contains("invalid_client"), "should include body, got: {msg}");
    assert!(!session.is_authenticated(), "no header after a failed login");
}

#[tokio::test]
async fn malformed_token_response_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let err = login(&mut session, &credentials()).await.unwrap_err();

    match err {
        MvisionError::Auth { source, .. } => {
            assert!(source.is_some(), "parse failure should be chained")
        }
        other => panic!("expected Auth error, got: {other}"),
    }
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn token_response_without_type_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T"
        })))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let result = login(&mut session, &credentials()).await;
    assert!(matches!(result, Err(MvisionError::Auth { .. })));
}

#[tokio::test]
async fn unreachable_token_endpoint_is_an_auth_error() {
    let endpoints = Endpoints::new("http://127.0.0.1:1/token", "http://127.0.0.1:1/devices");
    let mut session = Session::with_endpoints("api-key", None, endpoints).unwrap();

    let err = login(&mut session, &credentials()).await.unwrap_err();
    assert!(matches!(err, MvisionError::Auth { .. }), "got: {err}");
}
