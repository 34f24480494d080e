#![cfg(feature = "reqwest")]

// std
use std::{env, path::PathBuf, process, sync::Arc};
// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
// self
use strava_client::{
	api::ReqwestApiClient,
	auth::Credential,
	config::ClientConfig,
	error::Error,
	flows::AuthState,
	store::{CredentialStore, FileStore, MemoryStore},
	url::Url,
};

const CLIENT_ID: &str = "5150";
const CLIENT_SECRET: &str = "secret-auth";

#[derive(Debug, Deserialize)]
struct Athlete {
	id: u64,
}

fn build_client(server: &MockServer, store: Arc<dyn CredentialStore>) -> ReqwestApiClient {
	let config = ClientConfig::builder(CLIENT_ID, CLIENT_SECRET)
		.base_url(server.url("/api/v3"))
		.auth_base_url(server.base_url())
		.build()
		.expect("Mock server configuration should build.");

	ReqwestApiClient::new(config, store).expect("Reqwest client should build.")
}

fn token_body(access: &str, refresh: &str) -> String {
	let expires_at = OffsetDateTime::now_utc().unix_timestamp() + 21_600;

	format!(
		r#"{{"token_type":"Bearer","access_token":"{access}","refresh_token":"{refresh}","expires_at":{expires_at},"expires_in":21600,"athlete":{{"id":7}}}}"#
	)
}

fn temp_path(tag: &str) -> PathBuf {
	let unique = format!(
		"strava_client_auth_it_{tag}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique)
}

#[tokio::test]
async fn exchanged_code_authorizes_resource_calls() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "one-time-code")
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple("client_secret", CLIENT_SECRET);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-exchanged", "refresh-exchanged"));
		})
		.await;
	let athlete = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v3/athlete").header("authorization", "Bearer access-exchanged");
			then.status(200).header("content-type", "application/json").body(r#"{"id":7}"#);
		})
		.await;
	let store = MemoryStore::default();
	let client = build_client(&server, Arc::new(store.clone()));
	let redirect =
		Url::parse("http://localhost:8000/callback").expect("Redirect fixture should parse.");
	let request = client.auth().authorize_url(&redirect, &["read", "activity:read_all"]);

	request.validate_state(&request.state).expect("Echoed state should validate.");

	assert_eq!(
		client.auth().state().await.expect("State should resolve."),
		AuthState::Unauthenticated
	);

	let credential = client
		.auth()
		.exchange_code("one-time-code", &redirect)
		.await
		.expect("Code exchange should succeed.");

	token.assert_async().await;

	assert_eq!(credential.access_token.expose(), "access-exchanged");
	assert_eq!(
		store.snapshot().map(|c| c.refresh_token.expose().to_owned()),
		Some("refresh-exchanged".into())
	);
	assert_eq!(client.auth().state().await.expect("State should resolve."), AuthState::Valid);

	let me: Athlete = client.get("athlete", &[]).await.expect("Authorized GET should succeed.");

	athlete.assert_async().await;

	assert_eq!(me.id, 7);
}

#[tokio::test]
async fn expired_file_credential_is_refreshed_and_persisted() {
	let server = MockServer::start_async().await;
	let path = temp_path("refresh");
	let store = FileStore::open(&path).expect("File store should open.");
	let stale = Credential::builder()
		.access_token("stale-access")
		.refresh_token("file-refresh")
		.expires_in(Duration::seconds(60))
		.build()
		.expect("Credential fixture should build.");

	store.save(stale).await.expect("Seeding the file store should succeed.");

	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "file-refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("fresh-access", "fresh-refresh"));
		})
		.await;
	let athlete = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v3/athlete").header("authorization", "Bearer fresh-access");
			then.status(200).header("content-type", "application/json").body(r#"{"id":7}"#);
		})
		.await;
	let client = build_client(&server, Arc::new(store));
	let me: Athlete = client.get("athlete", &[]).await.expect("Refreshed GET should succeed.");

	token.assert_calls_async(1).await;
	athlete.assert_async().await;

	assert_eq!(me.id, 7);

	let reopened = FileStore::open(&path).expect("File store should reopen.");
	let persisted = reopened
		.load()
		.await
		.expect("Loading from disk should succeed.")
		.expect("Refreshed credential should be on disk.");

	assert_eq!(persisted.access_token.expose(), "fresh-access");
	assert_eq!(persisted.refresh_token.expose(), "fresh-refresh");

	let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn rejected_refresh_leaves_client_unauthenticated() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant","error_description":"Bad Request"}"#);
		})
		.await;
	let store = MemoryStore::with_credential(
		Credential::builder()
			.access_token("stale-access")
			.refresh_token("revoked-refresh")
			.expires_in(Duration::seconds(30))
			.build()
			.expect("Credential fixture should build."),
	);
	let client = build_client(&server, Arc::new(store));
	let err = client
		.get::<Athlete>("athlete", &[])
		.await
		.expect_err("A revoked refresh token should fail the call.");

	token.assert_calls_async(1).await;

	assert!(matches!(err, Error::Authentication { .. }));
	assert_eq!(
		client.auth().state().await.expect("State should resolve."),
		AuthState::Unauthenticated
	);
}

#[tokio::test]
async fn malformed_token_body_is_a_decoding_error() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(r#"{"unexpected":true}"#);
		})
		.await;
	let client = build_client(&server, Arc::new(MemoryStore::default()));
	let redirect =
		Url::parse("http://localhost:8000/callback").expect("Redirect fixture should parse.");
	let err = client
		.auth()
		.exchange_code("one-time-code", &redirect)
		.await
		.expect_err("A malformed token body should not produce a credential.");

	token.assert_async().await;

	assert!(matches!(err, Error::Decoding { .. }));
	assert_eq!(
		client.auth().state().await.expect("State should resolve."),
		AuthState::Unauthenticated
	);
}
