use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::signal::Signal;
use crate::store::{StorageEngine, StoreError};
use crate::value::Value;
use crate::{Computed, Evaluation};

/// Keyed reactive store: an ordered set of elements deduplicated by an
/// explicit id extractor, mirrored into a storage engine item by item.
/// Mutations persist only what actually changed, never the whole set.
pub struct Collection<T>
where
	T: Clone + Hash + Serialize + DeserializeOwned + 'static,
{
	elements: Signal<Vec<T>>,
	engine: Rc<dyn StorageEngine>,
	id_of: Box<dyn Fn(&T) -> String>,
	is_empty: Computed<bool>,
}

impl<T> Collection<T>
where
	T: Clone + Hash + Serialize + DeserializeOwned + 'static,
{
	/// Opens the collection, hydrating its elements from the engine.
	/// Entries that no longer decode are skipped with a warning.
	pub fn new(engine: Rc<dyn StorageEngine>, id_of: impl Fn(&T) -> String + 'static) -> Self {
		let mut initial = Vec::new();
		for key in engine.keys() {
			let Some(raw) = engine.get(&key) else {
				continue;
			};
			match serde_json::from_str(&raw) {
				Ok(item) => initial.push(item),
				Err(error) => {
					tracing::warn!(%key, %error, "skipping undecodable persisted item")
				}
			}
		}

		Self::build(engine, id_of, initial)
	}

	/// Opens the collection with the given elements instead of whatever the
	/// engine holds. Nothing is persisted until the first mutation.
	pub fn with_initial(
		engine: Rc<dyn StorageEngine>,
		id_of: impl Fn(&T) -> String + 'static,
		initial: Vec<T>,
	) -> Self {
		Self::build(engine, id_of, initial)
	}

	fn build(
		engine: Rc<dyn StorageEngine>,
		id_of: impl Fn(&T) -> String + 'static,
		initial: Vec<T>,
	) -> Self {
		let elements = Signal::new(initial);
		let is_empty = Computed::new({
			let elements = elements.clone();
			move |cx: &Evaluation| elements.get(cx).is_empty()
		});

		Collection {
			elements,
			engine,
			id_of: Box::new(id_of),
			is_empty,
		}
	}

	pub fn get(&self, cx: &impl AsRef<Evaluation>) -> Vec<T> {
		self.elements.get(cx).clone()
	}

	pub fn get_once(&self) -> Vec<T> {
		self.elements.get_once().clone()
	}

	/// The elements as a reactive input for other primitives.
	pub fn value(&self) -> Value<Vec<T>> {
		self.elements.clone().into()
	}

	pub fn is_empty(&self) -> Computed<bool> {
		self.is_empty.clone()
	}

	pub fn add(&self, item: T) -> Result<(), StoreError> {
		self.extend(vec![item])
	}

	/// Adds the items, replacing existing elements with the same id.
	/// Duplicate ids within `items` collapse to the last occurrence. Only
	/// the added items are written to the engine.
	pub fn extend(&self, items: Vec<T>) -> Result<(), StoreError> {
		let mut added: IndexMap<String, T> = IndexMap::new();
		for item in items {
			added.insert((self.id_of)(&item), item);
		}

		// Encode everything up front: a failing item must leave both the
		// engine and the elements untouched.
		let mut encoded = Vec::with_capacity(added.len());
		for (id, item) in &added {
			let raw = serde_json::to_string(item).map_err(StoreError::Encode)?;
			encoded.push((id.clone(), raw));
		}

		let mut merged: IndexMap<String, T> = IndexMap::new();
		for item in self.elements.get_once().iter() {
			merged.insert((self.id_of)(item), item.clone());
		}

		for (id, raw) in encoded {
			self.engine.set(&id, raw);
		}

		for (id, item) in added {
			merged.insert(id, item);
		}

		self.elements.set(merged.into_values().collect());
		Ok(())
	}

	pub fn remove(&self, item: &T) {
		let id = (self.id_of)(item);
		self.engine.delete(&id);
		self.elements
			.update(|elements| elements.retain(|current| (self.id_of)(current) != id));
	}

	pub fn clear(&self) {
		self.engine.clear();
		self.elements.set(Vec::new());
	}
}
