use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("failed to encode item for persistence")]
	Encode(#[source] serde_json::Error),
	#[error("failed to decode persisted item")]
	Decode(#[source] serde_json::Error),
}

/// Pluggable keyed persistence backend over string keys and serialized
/// string values. Engines own their key namespace; the in-memory engine
/// scopes keys with a `prefix:` the way a shared browser storage would.
pub trait StorageEngine {
	fn keys(&self) -> Vec<String>;
	fn get(&self, key: &str) -> Option<String>;
	fn set(&self, key: &str, value: String);
	fn delete(&self, key: &str);
	fn clear(&self);
}

pub struct MemoryStorage {
	prefix: String,
	memory: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
	pub fn new(prefix: impl Into<String>) -> Self {
		MemoryStorage {
			prefix: format!("{}:", prefix.into()),
			memory: RefCell::new(BTreeMap::new()),
		}
	}

	fn scoped(&self, key: &str) -> String {
		if key.starts_with(&self.prefix) {
			key.to_string()
		} else {
			format!("{}{}", self.prefix, key)
		}
	}
}

impl StorageEngine for MemoryStorage {
	fn keys(&self) -> Vec<String> {
		self.memory.borrow().keys().cloned().collect()
	}

	fn get(&self, key: &str) -> Option<String> {
		self.memory.borrow().get(&self.scoped(key)).cloned()
	}

	fn set(&self, key: &str, value: String) {
		self.memory.borrow_mut().insert(self.scoped(key), value);
	}

	fn delete(&self, key: &str) {
		self.memory.borrow_mut().remove(&self.scoped(key));
	}

	fn clear(&self) {
		self.memory.borrow_mut().clear();
	}
}
