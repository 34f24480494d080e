//! Page-number pagination over any single-page fetch function.

// self
use crate::{_prelude::*, obs};

/// What [`Paginator::fetch_all`] does when a page fails after earlier pages succeeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageFailurePolicy {
	/// Return the pages accumulated so far and drop the error.
	#[default]
	PartialResults,
	/// Return the error and drop the accumulated pages.
	FailFast,
}

/// Pagination settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paginator {
	/// Items requested per page.
	pub page_size: u32,
	/// Stop after this many pages; `None` walks until an empty page.
	pub max_pages: Option<u32>,
	/// Behavior on a mid-walk failure.
	pub failure_policy: PageFailurePolicy,
}
impl Paginator {
	/// Default page size.
	pub const DEFAULT_PAGE_SIZE: u32 = 30;

	/// Creates a paginator with the provided page size.
	pub fn new(page_size: u32) -> Self {
		Self { page_size, ..Default::default() }
	}

	/// Caps the number of pages fetched.
	pub fn max_pages(mut self, max_pages: u32) -> Self {
		self.max_pages = Some(max_pages);

		self
	}

	/// Overrides the failure policy.
	pub fn failure_policy(mut self, policy: PageFailurePolicy) -> Self {
		self.failure_policy = policy;

		self
	}

	/// Calls `fetch_page(page, per_page)` from page 1 until an empty page, the page cap, or
	/// an error.
	///
	/// A short page does not end the walk. An error before any page succeeded is always
	/// returned; later errors follow [`Paginator::failure_policy`].
	pub async fn fetch_all<T, F, Fut>(&self, mut fetch_page: F) -> Result<Vec<T>>
	where
		F: FnMut(u32, u32) -> Fut,
		Fut: Future<Output = Result<Vec<T>>>,
	{
		let mut items = Vec::new();
		let mut page = 1;

		loop {
			if self.max_pages.is_some_and(|max| page > max) {
				break;
			}

			match fetch_page(page, self.page_size).await {
				Ok(batch) if batch.is_empty() => break,
				Ok(batch) => items.extend(batch),
				Err(e) if page == 1 => return Err(e),
				Err(e) => match self.failure_policy {
					PageFailurePolicy::PartialResults => {
						obs::record_partial_page(page, &e);

						break;
					},
					PageFailurePolicy::FailFast => return Err(e),
				},
			}

			page += 1;
		}

		Ok(items)
	}
}
impl Default for Paginator {
	fn default() -> Self {
		Self {
			page_size: Self::DEFAULT_PAGE_SIZE,
			max_pages: None,
			failure_policy: PageFailurePolicy::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		future::{self, Ready},
	};
	// self
	use super::*;

	type Page = Ready<Result<Vec<u32>>>;

	fn scripted(pages: Vec<Result<Vec<u32>>>) -> impl FnMut(u32, u32) -> Page {
		let mut pages: VecDeque<_> = pages.into();

		move |_, _| future::ready(pages.pop_front().unwrap_or_else(|| Ok(Vec::new())))
	}

	fn boom() -> Error {
		Error::Http { status: 500, body: String::new() }
	}

	#[tokio::test]
	async fn walks_until_an_empty_page() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let log = seen.clone();
		let items = Paginator::new(2)
			.fetch_all(move |page, per_page| {
				log.lock().push((page, per_page));

				future::ready(Ok(match page {
					1 => vec![1, 2],
					2 => vec![3],
					_ => Vec::new(),
				}))
			})
			.await
			.expect("Walk should succeed.");

		assert_eq!(items, vec![1, 2, 3]);
		assert_eq!(*seen.lock(), vec![(1, 2), (2, 2), (3, 2)]);
	}

	#[tokio::test]
	async fn stops_at_the_page_cap() {
		let items = Paginator::default()
			.max_pages(2)
			.fetch_all(scripted(vec![Ok(vec![1]), Ok(vec![2]), Ok(vec![3])]))
			.await
			.expect("Capped walk should succeed.");

		assert_eq!(items, vec![1, 2]);
	}

	#[tokio::test]
	async fn single_page_cap_fetches_once() {
		let calls = Arc::new(Mutex::new(0));
		let counter = calls.clone();
		let items = Paginator::default()
			.max_pages(1)
			.fetch_all(move |page, _| {
				*counter.lock() += 1;

				future::ready(Ok(vec![page, page]))
			})
			.await
			.expect("Single-page walk should succeed.");

		assert_eq!(items, vec![1, 1]);
		assert_eq!(*calls.lock(), 1);
	}

	#[tokio::test]
	async fn first_page_failure_propagates() {
		let err = Paginator::default()
			.fetch_all(scripted(vec![Err(boom())]))
			.await
			.expect_err("First-page failure should propagate.");

		assert!(matches!(err, Error::Http { status: 500, .. }));
	}

	#[tokio::test]
	async fn later_failure_returns_partial_results_by_default() {
		let items = Paginator::default()
			.fetch_all(scripted(vec![Ok(vec![1, 2]), Err(boom())]))
			.await
			.expect("Partial results should be returned.");

		assert_eq!(items, vec![1, 2]);
	}

	#[tokio::test]
	async fn fail_fast_policy_surfaces_later_failures() {
		let err = Paginator::default()
			.failure_policy(PageFailurePolicy::FailFast)
			.fetch_all(scripted(vec![Ok(vec![1, 2]), Err(boom())]))
			.await
			.expect_err("Fail-fast walk should return the error.");

		assert!(matches!(err, Error::Http { .. }));
	}
}
