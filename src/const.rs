use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::value::{Access, Value};
use crate::{Evaluation, Observable, Version};

/// A cell that never changes. Useful as a fixed input where a [`Value`] is
/// expected, e.g. a resource with a constant key.
pub struct Const<T> {
	body: Rc<ConstBody<T>>,
}

impl<T> Clone for Const<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct ConstBody<T> {
	value: T,
}

impl<T> Const<T> {
	pub fn new(value: T) -> Self {
		Const {
			body: Rc::new(ConstBody { value }),
		}
	}

	pub fn get(&self) -> &T {
		&self.body.value
	}
}

impl<T> Observable for ConstBody<T>
where
	T: 'static,
{
	fn update(&self) -> Version {
		self.version()
	}

	fn version(&self) -> Version {
		Version::Hash(0)
	}

	fn used_by(&self, _: Weak<dyn crate::Derived>) {}
	fn not_used_by(&self, _: &Weak<dyn crate::Derived>) {}
}

impl<T> Access<T> for ConstBody<T>
where
	T: 'static,
{
	fn get(&self, _: &Evaluation) -> crate::value::Ref<'_, T> {
		crate::value::Ref::Ref(&self.value)
	}

	fn get_once(&self) -> crate::value::Ref<'_, T> {
		crate::value::Ref::Ref(&self.value)
	}
}

impl<T> From<Const<T>> for Value<T>
where
	T: 'static,
{
	fn from(value: Const<T>) -> Self {
		Value::new(value.body)
	}
}

impl<T> Debug for Const<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get().fmt(f)
	}
}
