pub mod macros;

mod addr;
mod batch;
mod collection;
mod computed;
mod r#const;
mod dependencies;
mod effect;
mod evaluation;
mod hashed;
mod list;
mod persisted;
mod resource;
mod selector;
mod signal;
mod store;
mod value;

use std::rc::{Rc, Weak};

pub use batch::{batch, in_batch};
pub use collection::Collection;
pub use computed::Computed;
pub use dependencies::Dependencies;
pub use effect::{Effect, Effects, Reactive};
pub use evaluation::Evaluation;
pub use hashed::Hashed;
pub use list::{reconcile, reconcile_indexed};
pub use persisted::Persisted;
pub use r#const::Const;
pub use resource::{Deferred, Fetch, FetchError, Resource, ResourceState};
pub use selector::{Selected, Selector};
pub use signal::Signal;
pub use store::{MemoryStorage, StorageEngine, StoreError};
pub use value::Value;

pub trait Derived: 'static {
	fn invalidate(self: Rc<Self>, invalid: Invalid);
}

pub trait Observable: 'static {
	/// This function is called when we want
	/// this observable to recompute itself.
	fn update(&self) -> Version;

	/// This function should return the current
	/// computed version.
	fn version(&self) -> Version;

	/// Notify this observable that `derived` started
	/// to listen.
	fn used_by(&self, derived: Weak<dyn Derived>);

	/// Notify this observable that `derived` stopped
	/// to listen.
	fn not_used_by(&self, derived: &Weak<dyn Derived>);
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum State {
	Valid,
	Invalid(Invalid),
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub enum Invalid {
	Maybe,
	Definitely,
}

#[derive(PartialEq, Eq)]
pub enum Version {
	Hash(u64),
}
