use std::cell::{Cell, RefCell};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::computed::Computed;
use crate::effect::Effect;
use crate::signal::Signal;
use crate::value::Value;
use crate::Evaluation;

/// Normalized fetch failure. Fetchers that fail with something other than
/// an error value should wrap the payload via [`FetchError::msg`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("{message}")]
pub struct FetchError {
	message: String,
}

impl FetchError {
	pub fn msg(message: impl Into<String>) -> Self {
		FetchError {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
	Unresolved,
	Pending,
	Ready,
	Refreshing,
	Errored,
}

/// What a fetcher hands back: an immediately available value, an immediate
/// failure, or a deferred completion. An immediate value transitions the
/// resource straight to `Ready` without ever visiting `Pending`.
pub enum Fetch<V> {
	Value(V),
	Fail(FetchError),
	Deferred(Deferred<V>),
}

impl<V> From<Result<V, FetchError>> for Fetch<V> {
	fn from(result: Result<V, FetchError>) -> Self {
		match result {
			Ok(value) => Fetch::Value(value),
			Err(error) => Fetch::Fail(error),
		}
	}
}

enum DeferredState<V> {
	Waiting,
	Subscribed(Box<dyn FnOnce(Result<V, FetchError>)>),
	Settled(Result<V, FetchError>),
	Done,
}

/// Single-threaded promise-like handle. The producer keeps a clone and
/// settles it exactly once; later settlements are ignored. Completion is
/// delivered through a callback, which is the only way asynchronous work
/// reaches back into the graph.
pub struct Deferred<V> {
	inner: Rc<RefCell<DeferredState<V>>>,
}

impl<V> Clone for Deferred<V> {
	fn clone(&self) -> Self {
		Deferred {
			inner: self.inner.clone(),
		}
	}
}

impl<V> Default for Deferred<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> Deferred<V> {
	pub fn new() -> Self {
		Deferred {
			inner: Rc::new(RefCell::new(DeferredState::Waiting)),
		}
	}

	pub fn resolve(&self, value: V) {
		self.settle(Ok(value));
	}

	pub fn reject(&self, error: FetchError) {
		self.settle(Err(error));
	}

	fn settle(&self, result: Result<V, FetchError>) {
		let waiter = {
			let mut state = self.inner.borrow_mut();
			match std::mem::replace(&mut *state, DeferredState::Done) {
				DeferredState::Waiting => {
					*state = DeferredState::Settled(result);
					return;
				}
				DeferredState::Subscribed(waiter) => waiter,
				settled => {
					// Already settled; keep the first completion.
					*state = settled;
					return;
				}
			}
		};

		waiter(result);
	}

	fn subscribe(&self, waiter: Box<dyn FnOnce(Result<V, FetchError>)>) {
		let settled = {
			let mut state = self.inner.borrow_mut();
			match std::mem::replace(&mut *state, DeferredState::Done) {
				DeferredState::Waiting => {
					*state = DeferredState::Subscribed(waiter);
					return;
				}
				DeferredState::Settled(result) => result,
				other => {
					*state = other;
					return;
				}
			}
		};

		waiter(settled);
	}
}

struct ResourceBody<K, V>
where
	K: Clone + 'static,
	V: Clone + Hash + 'static,
{
	key: Value<K>,
	fetcher: Box<dyn Fn(&K) -> Fetch<V>>,
	value: Signal<Option<V>>,
	error: Signal<Option<FetchError>>,
	state: Signal<ResourceState>,
	next_fetch: Cell<u64>,
	inflight: Cell<Option<u64>>,
	has_value: Cell<bool>,
	this: Weak<ResourceBody<K, V>>,
}

/// Asynchronous value keyed by a reactive input. The fetch lifecycle is an
/// explicit state machine; only the most recently issued fetch may ever
/// mutate it — completions of superseded fetches are discarded, which is
/// the sole cancellation mechanism.
pub struct Resource<K, V>
where
	K: Clone + 'static,
	V: Clone + Hash + 'static,
{
	body: Rc<ResourceBody<K, V>>,
	loading: Computed<bool>,
	_effect: Option<Effect>,
}

impl<K, V> Clone for Resource<K, V>
where
	K: Clone + 'static,
	V: Clone + Hash + 'static,
{
	fn clone(&self) -> Self {
		Resource {
			body: self.body.clone(),
			loading: self.loading.clone(),
			_effect: self._effect.clone(),
		}
	}
}

impl<K, V> Resource<K, V>
where
	K: Clone + 'static,
	V: Clone + Hash + 'static,
{
	/// Creates the resource and binds an effect to the input key: the fetch
	/// path runs immediately and again whenever the key changes.
	pub fn new(key: impl Into<Value<K>>, fetcher: impl Fn(&K) -> Fetch<V> + 'static) -> Self {
		let mut resource = Self::manual(key, fetcher);

		let effect = Effect::new({
			let body = resource.body.clone();
			move |cx: &Evaluation| {
				let key = body.key.get(cx).clone();
				body.fetch(&key);
			}
		});

		resource._effect = Some(effect);
		resource
	}

	/// Creates the resource without auto-issuing any fetch; loading happens
	/// only through [`Resource::refetch`] / [`Resource::refetch_with`].
	pub fn manual(key: impl Into<Value<K>>, fetcher: impl Fn(&K) -> Fetch<V> + 'static) -> Self {
		let body = Rc::new_cyclic(|this| ResourceBody {
			key: key.into(),
			fetcher: Box::new(fetcher),
			value: Signal::new(None),
			error: Signal::new(None),
			state: Signal::new(ResourceState::Unresolved),
			next_fetch: Cell::new(0),
			inflight: Cell::new(None),
			has_value: Cell::new(false),
			this: this.clone(),
		});

		let loading = Computed::new({
			let state = body.state.clone();
			move |cx: &Evaluation| {
				matches!(
					*state.get(cx),
					ResourceState::Pending | ResourceState::Refreshing
				)
			}
		});

		Resource {
			body,
			loading,
			_effect: None,
		}
	}

	/// The resolved value: `Ok(Some)` while Ready/Refreshing, `Ok(None)`
	/// while Unresolved/Pending, and the stored error when Errored.
	pub fn value(&self, cx: &impl AsRef<Evaluation>) -> Result<Option<V>, FetchError> {
		self.body.read_value(Some(cx.as_ref()))
	}

	pub fn value_once(&self) -> Result<Option<V>, FetchError> {
		self.body.read_value(None)
	}

	/// Like `value`, but once anything has ever resolved it keeps exposing
	/// the last successful value even while a later fetch has errored —
	/// the "last known good" read path.
	pub fn latest(&self, cx: &impl AsRef<Evaluation>) -> Result<Option<V>, FetchError> {
		self.body.read_latest(Some(cx.as_ref()))
	}

	pub fn latest_once(&self) -> Result<Option<V>, FetchError> {
		self.body.read_latest(None)
	}

	pub fn state(&self, cx: &impl AsRef<Evaluation>) -> ResourceState {
		*self.body.state.get(cx)
	}

	pub fn state_once(&self) -> ResourceState {
		*self.body.state.get_once()
	}

	pub fn error(&self, cx: &impl AsRef<Evaluation>) -> Option<FetchError> {
		self.body.error.get(cx).clone()
	}

	pub fn error_once(&self) -> Option<FetchError> {
		self.body.error.get_once().clone()
	}

	/// True while Pending or Refreshing.
	pub fn loading(&self) -> Computed<bool> {
		self.loading.clone()
	}

	/// Overwrites the resolved value without issuing a fetch (manual or
	/// optimistic update). The state becomes Ready; an outstanding fetch,
	/// if any, is still allowed to complete.
	pub fn set_value(&self, value: V) {
		self.body.complete(Ok(value));
	}

	/// Re-issues the fetch with the current input key.
	pub fn refetch(&self) {
		let key = self.body.key.get_once().clone();
		self.body.fetch(&key);
	}

	/// Re-issues the fetch with an explicit key instead of the input key.
	pub fn refetch_with(&self, key: K) {
		self.body.fetch(&key);
	}
}

impl<K, V> ResourceBody<K, V>
where
	K: Clone + 'static,
	V: Clone + Hash + 'static,
{
	fn fetch(&self, key: &K) {
		match (self.fetcher)(key) {
			Fetch::Value(value) => {
				// A synchronous result supersedes whatever was in flight.
				self.inflight.set(None);
				self.complete(Ok(value));
			}
			Fetch::Fail(error) => {
				self.inflight.set(None);
				self.complete(Err(error));
			}
			Fetch::Deferred(deferred) => {
				let id = self.next_fetch.get();
				self.next_fetch.set(id + 1);
				self.inflight.set(Some(id));

				self.state.set(if self.has_value.get() {
					ResourceState::Refreshing
				} else {
					ResourceState::Pending
				});

				let this = self.this.clone();
				deferred.subscribe(Box::new(move |result| {
					if let Some(body) = this.upgrade() {
						body.settle(id, result);
					}
				}));
			}
		}
	}

	fn settle(&self, id: u64, result: Result<V, FetchError>) {
		if self.inflight.get() != Some(id) {
			tracing::debug!(fetch = id, "discarding stale fetch completion");
			return;
		}

		self.inflight.set(None);
		self.complete(result);
	}

	fn complete(&self, result: Result<V, FetchError>) {
		// One notification pass; observers never see the value and the
		// state disagree.
		crate::batch(|| match result {
			Ok(value) => {
				self.value.set(Some(value));
				self.error.set(None);
				self.state.set(ResourceState::Ready);
				self.has_value.set(true);
			}
			Err(error) => {
				self.error.set(Some(error));
				self.state.set(ResourceState::Errored);
			}
		})
	}

	fn read_state(&self, cx: Option<&Evaluation>) -> ResourceState {
		match cx {
			Some(cx) => *self.state.get(cx),
			None => *self.state.get_once(),
		}
	}

	fn read_stored(&self, cx: Option<&Evaluation>) -> Option<V> {
		match cx {
			Some(cx) => self.value.get(cx).clone(),
			None => self.value.get_once().clone(),
		}
	}

	fn read_value(&self, cx: Option<&Evaluation>) -> Result<Option<V>, FetchError> {
		let state = self.read_state(cx);
		let value = self.read_stored(cx);

		match state {
			ResourceState::Unresolved | ResourceState::Pending => Ok(None),
			ResourceState::Ready | ResourceState::Refreshing => Ok(value),
			ResourceState::Errored => {
				let error = match cx {
					Some(cx) => self.error.get(cx).clone(),
					None => self.error.get_once().clone(),
				};
				Err(error.unwrap_or_else(|| FetchError::msg("unknown error")))
			}
		}
	}

	fn read_latest(&self, cx: Option<&Evaluation>) -> Result<Option<V>, FetchError> {
		if !self.has_value.get() {
			return self.read_value(cx);
		}

		Ok(self.read_stored(cx))
	}
}
