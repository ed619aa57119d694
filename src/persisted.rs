use std::cell::Cell;
use std::cell::Ref;
use std::hash::Hash;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::effect::{Effect, Effects};
use crate::signal::Signal;
use crate::store::StorageEngine;
use crate::Evaluation;

/// A signal hydrated from a storage engine at creation and written back on
/// every change. The hydration itself does not echo a save.
pub struct Persisted<T>
where
	T: Clone + Hash + Serialize + DeserializeOwned + 'static,
{
	signal: Signal<T>,
	_effects: Effects<1>,
}

impl<T> Persisted<T>
where
	T: Clone + Hash + Serialize + DeserializeOwned + 'static,
{
	pub fn new(initial: T, key: impl Into<String>, engine: Rc<dyn StorageEngine>) -> Self {
		let key = key.into();
		let signal = Signal::new(initial);
		let skip_save = Rc::new(Cell::new(true));

		let mut effects = Effects::default();
		effects.add(Effect::new({
			let signal = signal.clone();
			let skip_save = skip_save.clone();
			let engine = engine.clone();
			let key = key.clone();
			move |cx: &Evaluation| {
				// Track before deciding to skip, so the hydration write
				// still registers the dependency.
				let value = signal.get(cx).clone();
				if skip_save.get() {
					return;
				}
				match serde_json::to_string(&value) {
					Ok(raw) => engine.set(&key, raw),
					Err(error) => tracing::warn!(%key, %error, "failed to persist value"),
				}
			}
		}));

		if let Some(raw) = engine.get(&key) {
			match serde_json::from_str(&raw) {
				Ok(stored) => signal.set(stored),
				Err(error) => {
					tracing::warn!(%key, %error, "ignoring undecodable persisted value")
				}
			}
		}
		skip_save.set(false);

		Persisted {
			signal,
			_effects: effects,
		}
	}

	#[inline]
	pub fn get(&self, cx: &impl AsRef<Evaluation>) -> Ref<'_, T> {
		self.signal.get(cx)
	}

	#[inline]
	pub fn get_once(&self) -> Ref<'_, T> {
		self.signal.get_once()
	}

	#[inline]
	pub fn set(&self, value: T) {
		self.signal.set(value)
	}

	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) {
		self.signal.update(func)
	}

	/// The underlying signal, for wiring into other primitives.
	pub fn signal(&self) -> Signal<T> {
		self.signal.clone()
	}
}
