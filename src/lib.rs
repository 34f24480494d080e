//! Strava API client core: OAuth2 bearer credentials with transparent refresh, dual-window quota
//! admission, and bounded retries behind one async request pipeline.
//!
//! The crate is organized leaves first:
//!
//! - [`store`] persists the single credential record ([`store::MemoryStore`],
//!   [`store::FileStore`]).
//! - [`rate_limit`] tracks the short and long request windows and absorbs server quota headers.
//! - [`flows`] hosts the [`flows::AuthCoordinator`], which bootstraps and refreshes credentials.
//! - [`api`] hosts the [`api::ApiClient`] executor, the response classifier, and pagination.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod rate_limit;
pub mod store;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
