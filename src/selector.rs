use std::cell::{Cell, RefCell};
use std::hash::Hash;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::effect::Effect;
use crate::signal::Signal;
use crate::value::Value;
use crate::Evaluation;

/// Turns a "current key" cell into per-key boolean cells with O(1) fan-out:
/// when the current key changes, only the tracker for the previous key and
/// the tracker for the new key are rewritten. Every other observed key is
/// left untouched, no matter how many there are.
pub struct Selector<K>
where
	K: Clone + Eq + Hash + 'static,
{
	body: Rc<SelectorBody<K>>,
	_effect: Effect,
}

struct SelectorBody<K>
where
	K: Clone + Eq + Hash + 'static,
{
	current: Value<K>,
	equals: Box<dyn Fn(&K, &K) -> bool>,
	trackers: RefCell<FxHashMap<K, Tracker>>,
	last: RefCell<Option<K>>,
}

struct Tracker {
	flag: Signal<bool>,
	readers: Cell<usize>,
}

impl<K> Selector<K>
where
	K: Clone + Eq + Hash + 'static,
{
	pub fn new(current: impl Into<Value<K>>) -> Self {
		Self::with_equals(current, |candidate, current| candidate == current)
	}

	pub fn with_equals(
		current: impl Into<Value<K>>,
		equals: impl Fn(&K, &K) -> bool + 'static,
	) -> Self {
		let body = Rc::new(SelectorBody {
			current: current.into(),
			equals: Box::new(equals),
			trackers: RefCell::new(FxHashMap::default()),
			last: RefCell::new(None),
		});

		let effect = Effect::new({
			let body = body.clone();
			move |cx: &Evaluation| body.on_change(cx)
		});

		Selector {
			body,
			_effect: effect,
		}
	}

	/// Acquires the tracker for `key`, creating it on first observation.
	/// The tracker's flag is computed eagerly against the current value at
	/// creation time. The returned handle is the liveness token: dropping
	/// it releases the tracker once no other reader holds it.
	pub fn select(&self, key: K) -> Selected<K> {
		let flag = {
			let mut trackers = self.body.trackers.borrow_mut();
			let tracker = trackers.entry(key.clone()).or_insert_with(|| {
				let current = self.body.current.get_once();
				Tracker {
					flag: Signal::new((self.body.equals)(&key, &current)),
					readers: Cell::new(0),
				}
			});
			tracker.readers.set(tracker.readers.get() + 1);
			tracker.flag.clone()
		};

		Selected {
			body: self.body.clone(),
			key,
			flag,
		}
	}

	/// Number of keys currently observed.
	pub fn tracked(&self) -> usize {
		self.body.trackers.borrow().len()
	}
}

impl<K> SelectorBody<K>
where
	K: Clone + Eq + Hash + 'static,
{
	fn on_change(&self, cx: &Evaluation) {
		let value = self.current.get(cx).clone();
		let mut last = self.last.borrow_mut();
		let trackers = self.trackers.borrow();

		if let Some(previous) = last.as_ref() {
			if let Some(tracker) = trackers.get(previous) {
				tracker.flag.set((self.equals)(previous, &value));
			}
		}

		if let Some(tracker) = trackers.get(&value) {
			tracker.flag.set((self.equals)(&value, &value));
		}

		*last = Some(value);
	}
}

/// A live reader of one key's membership. Cloning shares the tracker;
/// dropping the last handle for a key disposes its tracker.
pub struct Selected<K>
where
	K: Clone + Eq + Hash + 'static,
{
	body: Rc<SelectorBody<K>>,
	key: K,
	flag: Signal<bool>,
}

impl<K> Selected<K>
where
	K: Clone + Eq + Hash + 'static,
{
	#[inline]
	pub fn get(&self, cx: &impl AsRef<Evaluation>) -> bool {
		*self.flag.get(cx)
	}

	#[inline]
	pub fn get_once(&self) -> bool {
		*self.flag.get_once()
	}

	pub fn key(&self) -> &K {
		&self.key
	}
}

impl<K> Clone for Selected<K>
where
	K: Clone + Eq + Hash + 'static,
{
	fn clone(&self) -> Self {
		let trackers = self.body.trackers.borrow();
		if let Some(tracker) = trackers.get(&self.key) {
			tracker.readers.set(tracker.readers.get() + 1);
		}
		drop(trackers);

		Selected {
			body: self.body.clone(),
			key: self.key.clone(),
			flag: self.flag.clone(),
		}
	}
}

impl<K> Drop for Selected<K>
where
	K: Clone + Eq + Hash + 'static,
{
	fn drop(&mut self) {
		let mut trackers = self.body.trackers.borrow_mut();
		if let Some(tracker) = trackers.get(&self.key) {
			let readers = tracker.readers.get() - 1;
			tracker.readers.set(readers);
			if readers == 0 {
				trackers.remove(&self.key);
			}
		}
	}
}
