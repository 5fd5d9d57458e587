mod support;

use anyhow::Result;
use credrotate::error::ErrorKind;
use credrotate::rotation::Backend;
use serde_json::json;
use support::{envelope, envelope_with_old, orchestrator_for, tenable_record};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IO_KEYS: &str = "accessKey=access-key;secretKey=secret-key";

#[tokio::test]
async fn io_user_password_change_sends_current_password() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("x-apikeys", IO_KEYS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": 2, "username": "admin@example.com" },
                { "id": 17, "username": "alice" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/users/17/chpasswd"))
        .and(body_json(json!({
            "password": "n3w-pw",
            "current_password": "0ld-pw"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableIoUser, &server.uri())
        .run(&envelope_with_old(vec![tenable_record()], "alice", "n3w-pw", "0ld-pw"))
        .await;

    assert!(outcome.succeeded, "{}", outcome.message);
    assert_eq!(outcome.exit_status(), 0);
    Ok(())
}

#[tokio::test]
async fn io_user_zero_matches_never_calls_update() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableIoUser, &server.uri())
        .run(&envelope_with_old(vec![tenable_record()], "alice", "n3w-pw", "0ld-pw"))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::IdentityNotFound));
    assert_eq!(outcome.exit_status(), 1);
    Ok(())
}

#[tokio::test]
async fn io_user_rejected_keys_is_authentication_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "statusCode": 401,
            "error": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableIoUser, &server.uri())
        .run(&envelope_with_old(vec![tenable_record()], "alice", "n3w-pw", "0ld-pw"))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::AuthenticationError));
    assert!(!outcome.message.contains("secret-key"));
    Ok(())
}

#[tokio::test]
async fn io_credential_is_found_across_pages() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .and(query_param("f", "name:eq:linux-ssh"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": [{ "uuid": "u-0", "name": "linux-ssh-old" }],
            "pagination": { "total": 2, "limit": 100, "offset": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": [{ "uuid": "u-1", "name": "linux-ssh" }],
            "pagination": { "total": 2, "limit": 100, "offset": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/credentials/u-1"))
        .and(body_json(json!({ "settings": { "password": "n3w-pw" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableIoCredential, &server.uri())
        .run(&envelope(vec![tenable_record()], "linux-ssh", "n3w-pw"))
        .await;

    assert!(outcome.succeeded, "{}", outcome.message);
    assert_eq!(
        outcome.status_line(),
        "Password successfully rotated for credential name linux-ssh"
    );
    Ok(())
}

#[tokio::test]
async fn io_credential_duplicates_are_ambiguous() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": [
                { "uuid": "u-1", "name": "linux-ssh" },
                { "uuid": "u-2", "name": "linux-ssh" }
            ],
            "pagination": { "total": 2 }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableIoCredential, &server.uri())
        .run(&envelope(vec![tenable_record()], "linux-ssh", "n3w-pw"))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::AmbiguousIdentity));
    Ok(())
}

fn sc_record() -> credrotate::credentials::AuthenticationRecord {
    tenable_record().with_field("tenable_sc_host", "sc.example.net")
}

#[tokio::test]
async fn sc_user_edit_carries_current_password() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(query_param("fields", "id,username"))
        .and(header("x-apikey", "accesskey=access-key; secretkey=secret-key;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "regular",
            "response": [
                { "id": "1", "username": "admin" },
                { "id": "3", "username": "alice" }
            ],
            "error_code": 0,
            "error_msg": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/user/3"))
        .and(body_json(json!({ "currentPassword": "0ld-pw", "password": "n3w-pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "id": "3" },
            "error_code": 0,
            "error_msg": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableScUser, &server.uri())
        .run(&envelope_with_old(vec![sc_record()], "alice", "n3w-pw", "0ld-pw"))
        .await;

    assert!(outcome.succeeded, "{}", outcome.message);
    Ok(())
}

#[tokio::test]
async fn sc_error_code_on_edit_is_update_failure() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [{ "id": 3, "username": "alice" }],
            "error_code": 0
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/user/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": null,
            "error_code": 143,
            "error_msg": "Current password is incorrect."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableScUser, &server.uri())
        .run(&envelope_with_old(vec![sc_record()], "alice", "n3w-pw", "wrong"))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::UpdateFailure));
    assert!(outcome.message.contains("Current password is incorrect"));
    Ok(())
}

#[tokio::test]
async fn sc_error_msg_echoing_password_is_redacted() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [{ "id": 3, "username": "alice" }],
            "error_code": 0
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/user/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": null,
            "error_code": 143,
            "error_msg": "Password 'N3wSecret!' rejected; current 'wr\"ong' invalid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(Backend::TenableScUser, &server.uri())
        .run(&envelope_with_old(vec![sc_record()], "alice", "N3wSecret!", "wr\"ong"))
        .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::UpdateFailure));
    let line = outcome.status_line();
    assert!(!line.contains("N3wSecret!"), "{line}");
    assert!(!line.contains("wr\"ong"), "{line}");
    assert!(line.contains("Password '********' rejected"), "{line}");
    Ok(())
}

fn api_record(server: &MockServer) -> credrotate::credentials::AuthenticationRecord {
    tenable_record().with_field("url", format!("{}/credentials", server.uri()))
}

#[tokio::test]
async fn api_credential_read_modify_write() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .and(query_param("f", "name:eq:db-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": [
                { "uuid": "c-9", "name": "db-admin" },
                { "uuid": "c-10", "name": "db-admin-2" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/credentials/c-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "db-admin",
            "type": { "id": "SSH" },
            "settings": { "username": "dba", "auth_method": "password" },
            "permissions": [{ "grantee_uuid": "g-1", "permissions": 64 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/credentials/c-9"))
        .and(body_json(json!({
            "name": "db-admin",
            "settings": { "username": "dba", "auth_method": "password", "password": "n3w-pw" },
            "permissions": [{ "grantee_uuid": "g-1", "permissions": 64 }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = credrotate::rotation::RotationOrchestrator::new(std::sync::Arc::new(
        credrotate::rotation::DefaultAdapterFactory::new(
            Backend::TenableApiCredential,
            Default::default(),
        ),
    ));
    let outcome = orchestrator
        .run(&envelope(vec![api_record(&server)], "db-admin", "n3w-pw"))
        .await;

    assert!(outcome.succeeded, "{}", outcome.message);
    Ok(())
}

#[tokio::test]
async fn api_credential_without_settings_never_writes() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": [{ "uuid": "c-9", "name": "db-admin" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/credentials/c-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "db-admin",
            "type": { "id": "SSH" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = orchestrator_for(
        Backend::TenableApiCredential,
        &format!("{}/credentials", server.uri()),
    )
    .run(&envelope(vec![api_record(&server)], "db-admin", "n3w-pw"))
    .await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::UpdateFailure));
    assert!(outcome.message.contains("settings"));
    Ok(())
}
