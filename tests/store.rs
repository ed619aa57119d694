use std::rc::Rc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use finegrain::{Collection, MemoryStorage, Persisted, StorageEngine};

#[derive(Clone, Hash, PartialEq, Debug, Serialize, Deserialize)]
struct Todo {
	id: u32,
	title: String,
}

fn todo(id: u32, title: &str) -> Todo {
	Todo {
		id,
		title: title.to_string(),
	}
}

#[test]
fn memory_storage_scopes_keys() {
	let storage = MemoryStorage::new("todos");

	storage.set("1", "one".to_string());
	storage.set("todos:2", "two".to_string());

	assert_eq!(storage.get("1"), Some("one".to_string()));
	assert_eq!(storage.get("todos:1"), Some("one".to_string()));
	assert_eq!(storage.get("2"), Some("two".to_string()));

	let keys = storage.keys();
	assert_eq!(keys, vec!["todos:1".to_string(), "todos:2".to_string()]);

	storage.delete("1");
	assert_eq!(storage.get("1"), None);

	storage.clear();
	assert!(storage.keys().is_empty());
}

#[test]
fn collection_adds_and_dedups_by_id() {
	let engine = Rc::new(MemoryStorage::new("todos"));
	let collection: Collection<Todo> =
		Collection::new(engine.clone(), |item: &Todo| item.id.to_string());

	assert!(*collection.is_empty().get_once());

	collection.add(todo(1, "write")).unwrap();
	collection
		.extend(vec![todo(2, "review"), todo(1, "rewrite")])
		.unwrap();

	let items = collection.get_once();
	assert_eq!(items.len(), 2);
	assert_eq!(items[0], todo(1, "rewrite"));
	assert_eq!(items[1], todo(2, "review"));

	assert!(!*collection.is_empty().get_once());

	// Each item is persisted under its own id.
	assert!(engine.get("1").is_some());
	assert!(engine.get("2").is_some());
}

#[test]
fn collection_removes_and_clears() {
	let engine = Rc::new(MemoryStorage::new("todos"));
	let collection: Collection<Todo> =
		Collection::new(engine.clone(), |item: &Todo| item.id.to_string());

	collection
		.extend(vec![todo(1, "a"), todo(2, "b"), todo(3, "c")])
		.unwrap();

	collection.remove(&todo(2, "b"));
	let items = collection.get_once();
	assert_eq!(items.len(), 2);
	assert!(engine.get("2").is_none());
	assert!(engine.get("1").is_some());

	collection.clear();
	assert!(collection.get_once().is_empty());
	assert!(engine.keys().is_empty());
}

/// Serialization fails on demand, so encode errors can be provoked.
#[derive(Clone, Hash, PartialEq, Debug, Deserialize)]
struct Brittle {
	id: u32,
	poisoned: bool,
}

impl Serialize for Brittle {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		if self.poisoned {
			return Err(serde::ser::Error::custom("poisoned"));
		}
		let mut state = serializer.serialize_struct("Brittle", 2)?;
		state.serialize_field("id", &self.id)?;
		state.serialize_field("poisoned", &self.poisoned)?;
		state.end()
	}
}

#[test]
fn failed_encode_persists_nothing() {
	let engine = Rc::new(MemoryStorage::new("brittle"));
	let collection: Collection<Brittle> =
		Collection::new(engine.clone(), |item: &Brittle| item.id.to_string());

	let result = collection.extend(vec![
		Brittle {
			id: 1,
			poisoned: false,
		},
		Brittle {
			id: 2,
			poisoned: true,
		},
	]);

	assert!(result.is_err());
	// Neither the engine nor the elements saw the partial batch.
	assert!(engine.keys().is_empty());
	assert!(collection.get_once().is_empty());
}

#[test]
fn collection_hydrates_from_engine() {
	let engine = Rc::new(MemoryStorage::new("todos"));

	{
		let collection: Collection<Todo> =
			Collection::new(engine.clone(), |item: &Todo| item.id.to_string());
		collection
			.extend(vec![todo(1, "persisted"), todo(2, "also persisted")])
			.unwrap();
	}

	// A corrupted entry is skipped, the rest hydrate.
	engine.set("3", "{not json".to_string());

	let reopened: Collection<Todo> =
		Collection::new(engine.clone(), |item: &Todo| item.id.to_string());
	let items = reopened.get_once();
	assert_eq!(items.len(), 2);
	assert!(items.contains(&todo(1, "persisted")));
	assert!(items.contains(&todo(2, "also persisted")));
}

#[test]
fn collection_with_initial_skips_hydration() {
	let engine = Rc::new(MemoryStorage::new("todos"));
	engine.set(
		"9",
		serde_json::to_string(&todo(9, "stale")).unwrap(),
	);

	let collection: Collection<Todo> = Collection::with_initial(
		engine.clone(),
		|item: &Todo| item.id.to_string(),
		vec![todo(1, "fresh")],
	);

	assert_eq!(collection.get_once(), vec![todo(1, "fresh")]);
}

#[test]
fn persisted_saves_on_change_and_hydrates() {
	let engine = Rc::new(MemoryStorage::new("settings"));

	{
		let counter: Persisted<u32> = Persisted::new(0, "counter", engine.clone());
		// Hydration alone must not echo a save.
		assert!(engine.get("counter").is_none());

		counter.set(5);
		assert_eq!(engine.get("counter"), Some("5".to_string()));

		counter.update(|value| *value += 1);
		assert_eq!(engine.get("counter"), Some("6".to_string()));
	}

	let reopened: Persisted<u32> = Persisted::new(0, "counter", engine.clone());
	assert_eq!(*reopened.get_once(), 6);
}

#[test]
fn persisted_ignores_corrupt_stored_value() {
	let engine = Rc::new(MemoryStorage::new("settings"));
	engine.set("counter", "garbage".to_string());

	let counter: Persisted<u32> = Persisted::new(3, "counter", engine.clone());
	assert_eq!(*counter.get_once(), 3);
}
