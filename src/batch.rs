use std::cell::{Cell, RefCell};
use std::rc::Weak;

use smallvec::SmallVec;

use crate::effect::Reactive;

thread_local! {
	static BATCH_DEPTH: Cell<u32> = Cell::new(0);
	static EVAL_DEPTH: Cell<u32> = Cell::new(0);
	static FLUSHING: Cell<bool> = Cell::new(false);
	static CHANGED: RefCell<SmallVec<[Weak<dyn Reactive>; 8]>> =
		RefCell::new(SmallVec::new_const());
}

pub fn in_batch() -> bool {
	BATCH_DEPTH.with(|depth| depth.get()) > 0
}

/// Groups several writes into one notification pass. Effects invalidated
/// inside the closure run once, after the outermost batch ends.
pub fn batch<R>(func: impl FnOnce() -> R) -> R {
	BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
	let result = func();
	BATCH_DEPTH.with(|depth| depth.set(depth.get() - 1));
	maybe_flush();
	result
}

/// Marks an evaluation (computed or effect body) on the stack. While any
/// evaluation is active, writes only queue their effects; the queue drains
/// when the outermost evaluation finishes. This is what makes it safe for a
/// recomputation to write cells (position cells, tracker flags) in place.
pub(crate) struct EvalGuard {
	_private: (),
}

impl EvalGuard {
	pub fn enter() -> EvalGuard {
		EVAL_DEPTH.with(|depth| depth.set(depth.get() + 1));
		EvalGuard { _private: () }
	}
}

impl Drop for EvalGuard {
	fn drop(&mut self) {
		EVAL_DEPTH.with(|depth| depth.set(depth.get() - 1));
		maybe_flush();
	}
}

/// Queues an effect for the next flush. Scheduling never flushes by itself:
/// the invalidation sweep that called us may still hold borrows, and every
/// dependent must be marked before any effect re-runs.
pub(crate) fn schedule(reactive: Weak<dyn Reactive>) {
	CHANGED.with(|changed| changed.borrow_mut().push(reactive));
}

pub(crate) fn maybe_flush() {
	let busy = in_batch()
		|| EVAL_DEPTH.with(|depth| depth.get()) > 0
		|| FLUSHING.with(|flushing| flushing.get());

	if !busy {
		flush();
	}
}

fn flush() {
	FLUSHING.with(|flushing| flushing.set(true));

	loop {
		let changed = CHANGED.with(|changed| std::mem::take(&mut *changed.borrow_mut()));

		if changed.is_empty() {
			break;
		}

		for reactive in changed {
			if let Some(reactive) = reactive.upgrade() {
				reactive.update();
			}
		}
	}

	FLUSHING.with(|flushing| flushing.set(false));
}
