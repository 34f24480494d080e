//! Pure mapping from HTTP outcomes to the client error taxonomy.

// crates.io
use oauth2::http::{HeaderMap, StatusCode};
// self
use crate::{_prelude::*, http};

/// Wait applied to a 429 that carries no usable `Retry-After`, in seconds.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 900;

/// Classifies a completed response; `None` means success (any 2xx).
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Option<Error> {
	if status.is_success() {
		return None;
	}

	let body = || String::from_utf8_lossy(body).into_owned();

	Some(match status {
		StatusCode::BAD_REQUEST => Error::Validation { body: body() },
		StatusCode::UNAUTHORIZED =>
			Error::Authentication { reason: format!("server rejected the access token: {}", body()) },
		StatusCode::NOT_FOUND => Error::NotFound { body: body() },
		StatusCode::TOO_MANY_REQUESTS => Error::RateLimit { retry_after: retry_after_secs(headers) },
		_ => Error::Http { status: status.as_u16(), body: body() },
	})
}

/// Seconds to wait before retrying a 429, defaulting to [`DEFAULT_RETRY_AFTER_SECS`].
pub fn retry_after_secs(headers: &HeaderMap) -> u64 {
	http::parse_retry_after(headers).map_or(DEFAULT_RETRY_AFTER_SECS, |wait| {
		// Round partial seconds up so the retry never lands early.
		wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
	})
}

/// Decodes a 2xx body; an empty body decodes as JSON `null`.
pub fn decode_body<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de)?;

	de.end().map_err(|source| Error::Decoding { path: ".".into(), source })?;

	Ok(value)
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderValue, header::RETRY_AFTER};
	// self
	use super::*;

	fn classify(status: u16, body: &str) -> Option<Error> {
		let status = StatusCode::from_u16(status).expect("Status fixture should be valid.");

		classify_response(status, &HeaderMap::new(), body.as_bytes())
	}

	#[test]
	fn success_statuses_are_not_errors() {
		assert!(classify(200, "{}").is_none());
		assert!(classify(201, "{}").is_none());
		assert!(classify(204, "").is_none());
	}

	#[test]
	fn statuses_map_to_their_variants() {
		assert!(matches!(
			classify(400, "bad field"),
			Some(Error::Validation { body }) if body == "bad field"
		));
		assert!(matches!(classify(401, ""), Some(Error::Authentication { .. })));
		assert!(matches!(classify(404, "gone"), Some(Error::NotFound { body }) if body == "gone"));
		assert!(matches!(
			classify(500, "oops"),
			Some(Error::Http { status: 500, body }) if body == "oops"
		));
		assert!(matches!(classify(403, ""), Some(Error::Http { status: 403, .. })));
	}

	#[test]
	fn rate_limit_reads_retry_after_with_default() {
		assert!(matches!(classify(429, ""), Some(Error::RateLimit { retry_after: 900 })));

		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));

		let error = classify_response(StatusCode::TOO_MANY_REQUESTS, &headers, b"");

		assert!(matches!(error, Some(Error::RateLimit { retry_after: 5 })));
	}

	#[test]
	fn decode_treats_empty_body_as_null() {
		let unit: Option<u32> = decode_body(b"").expect("Empty body should decode as null.");

		assert_eq!(unit, None);

		let err = decode_body::<u32>(b"  ").expect_err("Null should not decode as a number.");

		assert!(matches!(err, Error::Decoding { .. }));
	}

	#[test]
	fn decode_failure_reports_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Activity {
			id: u64,
			name: String,
		}

		let err = decode_body::<Vec<Activity>>(br#"[{"id":1,"name":"a"},{"id":"x","name":"b"}]"#)
			.expect_err("Second element should fail.");

		match err {
			Error::Decoding { path, .. } => assert_eq!(path, "[1].id"),
			other => panic!("Expected a decoding error, got {other:?}."),
		}
	}
}
