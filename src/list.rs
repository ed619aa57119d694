use std::cell::RefCell;
use std::hash::Hash;

use fxhash::FxHashMap;

use crate::signal::Signal;
use crate::value::Value;
use crate::{Computed, Evaluation};

/// Derives a sequence from a reactive source sequence, re-invoking `map`
/// only for elements that are new since the previous pass. Carried results
/// keep their identity across edits: an `Rc` result survives reorders and
/// splices as the same allocation.
///
/// Matching is plain value equality. Callers who want structural matching
/// should pre-map their elements to stable surrogate keys first.
pub fn reconcile<E, R>(
	source: impl Into<Value<Vec<E>>>,
	map: impl Fn(&E) -> R + 'static,
) -> Computed<Vec<R>>
where
	E: Clone + PartialEq + Hash + 'static,
	R: Clone + Hash + 'static,
{
	build(source.into(), Mapper::Plain(Box::new(map)))
}

/// Like [`reconcile`], but the mapping function also receives a position
/// cell holding the element's current index. When an element merely moves,
/// the carried cell is written in place and `map` is not called again.
///
/// Positional tracking is declared by choosing this entry point; it is
/// never inferred from the shape of the mapping function.
pub fn reconcile_indexed<E, R>(
	source: impl Into<Value<Vec<E>>>,
	map: impl Fn(&E, &Signal<usize>) -> R + 'static,
) -> Computed<Vec<R>>
where
	E: Clone + PartialEq + Hash + 'static,
	R: Clone + Hash + 'static,
{
	build(source.into(), Mapper::Indexed(Box::new(map)))
}

enum Mapper<E, R> {
	Plain(Box<dyn Fn(&E) -> R>),
	Indexed(Box<dyn Fn(&E, &Signal<usize>) -> R>),
}

struct Reconciler<E, R> {
	items: Vec<E>,
	mapped: Vec<R>,
	// Parallel to `mapped`; entries are `None` for the plain mapper.
	positions: Vec<Option<Signal<usize>>>,
	map: Mapper<E, R>,
}

/// Occurrence-chain key that deliberately keeps `PartialEq` semantics:
/// an element that is not equal to itself (NaN-like) never matches an
/// existing entry and is therefore always mapped fresh.
struct DiffKey<E>(E);

impl<E: PartialEq> PartialEq for DiffKey<E> {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl<E: PartialEq> Eq for DiffKey<E> {}

impl<E: Hash> Hash for DiffKey<E> {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.0.hash(state);
	}
}

fn build<E, R>(source: Value<Vec<E>>, map: Mapper<E, R>) -> Computed<Vec<R>>
where
	E: Clone + PartialEq + Hash + 'static,
	R: Clone + Hash + 'static,
{
	let state = RefCell::new(Reconciler {
		items: Vec::new(),
		mapped: Vec::new(),
		positions: Vec::new(),
		map,
	});

	Computed::new(move |cx: &Evaluation| {
		let new_items = source.get(cx).clone();
		state.borrow_mut().reconcile(new_items)
	})
}

impl<E, R> Reconciler<E, R>
where
	E: Clone + PartialEq + Hash + 'static,
	R: Clone + Hash + 'static,
{
	fn map_slot(&self, item: &E, index: usize) -> (R, Option<Signal<usize>>) {
		match &self.map {
			Mapper::Plain(map) => (map(item), None),
			Mapper::Indexed(map) => {
				let position = Signal::new(index);
				let result = map(item, &position);
				(result, Some(position))
			}
		}
	}

	fn reconcile(&mut self, new_items: Vec<E>) -> Vec<R> {
		let old_len = self.items.len();
		let new_len = new_items.len();

		// Fast path: everything is gone.
		if new_len == 0 {
			self.items.clear();
			self.mapped.clear();
			self.positions.clear();
			return Vec::new();
		}

		// Fast path: nothing existed before, map every element fresh.
		if old_len == 0 {
			let mut mapped = Vec::with_capacity(new_len);
			let mut positions = Vec::with_capacity(new_len);
			for (index, item) in new_items.iter().enumerate() {
				let (result, position) = self.map_slot(item, index);
				mapped.push(result);
				positions.push(position);
			}
			self.items = new_items;
			self.mapped = mapped;
			self.positions = positions;
			return self.mapped.clone();
		}

		let mut next_mapped: Vec<Option<R>> = vec![None; new_len];
		let mut next_positions: Vec<Option<Signal<usize>>> = vec![None; new_len];

		// Skip the common prefix.
		let mut start = 0;
		let max_start = old_len.min(new_len);
		while start < max_start && self.items[start] == new_items[start] {
			next_mapped[start] = Some(self.mapped[start].clone());
			next_positions[start] = self.positions[start].clone();
			start += 1;
		}

		// Skip the common suffix.
		let mut end = old_len as isize - 1;
		let mut new_end = new_len as isize - 1;
		while end >= start as isize
			&& new_end >= start as isize
			&& self.items[end as usize] == new_items[new_end as usize]
		{
			next_mapped[new_end as usize] = Some(self.mapped[end as usize].clone());
			next_positions[new_end as usize] = self.positions[end as usize].clone();
			end -= 1;
			new_end -= 1;
		}

		// Scan the remaining window of new elements back to front, chaining
		// duplicate occurrences so the earliest unmatched old slot claims
		// the earliest available new slot.
		let mut heads: FxHashMap<DiffKey<E>, usize> = FxHashMap::default();
		let mut next_occurrence: Vec<Option<usize>> = vec![None; (new_end + 1).max(0) as usize];
		let mut j = new_end;
		while j >= start as isize {
			let index = j as usize;
			let previous = heads.insert(DiffKey(new_items[index].clone()), index);
			next_occurrence[index] = previous;
			j -= 1;
		}

		// Walk old elements left to right; each match consumes its slot and
		// advances the chain so a duplicate cannot claim it twice.
		let mut i = start as isize;
		while i <= end {
			let index = i as usize;
			let key = DiffKey(self.items[index].clone());
			if let Some(&slot) = heads.get(&key) {
				next_mapped[slot] = Some(self.mapped[index].clone());
				next_positions[slot] = self.positions[index].clone();
				match next_occurrence[slot] {
					Some(next) => {
						heads.insert(key, next);
					}
					None => {
						heads.remove(&key);
					}
				}
			}
			i += 1;
		}

		// Map unmatched slots fresh. Carried position cells are written only
		// after the whole pass has mapped: a panicking `map` commits nothing.
		let mut fresh = 0usize;
		let mut moved: Vec<(Signal<usize>, usize)> = Vec::new();
		for slot in start..new_len {
			if next_mapped[slot].is_some() {
				if let Some(position) = &next_positions[slot] {
					moved.push((position.clone(), slot));
				}
			} else {
				let (result, position) = self.map_slot(&new_items[slot], slot);
				next_mapped[slot] = Some(result);
				next_positions[slot] = position;
				fresh += 1;
			}
		}

		tracing::trace!(
			old_len,
			new_len,
			prefix = start,
			fresh,
			"reconciled sequence"
		);

		for (position, index) in moved {
			position.set(index);
		}

		// Commit: every slot is filled at this point.
		self.items = new_items;
		self.mapped = next_mapped.into_iter().map(|slot| slot.unwrap()).collect();
		self.positions = next_positions;
		self.mapped.clone()
	}
}
