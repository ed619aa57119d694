use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::batch::{schedule, EvalGuard};
use crate::dependencies::Dependencies;
use crate::{Derived, Evaluation, Invalid, State};

pub trait Reactive {
	fn update(&self);
}

/// A convenience holder for effects owned by one component. Keeps them
/// alive; dropping the holder stops all of them.
#[derive(Default, Clone)]
pub struct Effects<const N: usize> {
	vec: smallvec::SmallVec<[Effect; N]>,
}

impl<const N: usize> Effects<N> {
	pub fn add(&mut self, effect: Effect) {
		self.vec.push(effect);
	}

	pub fn update(&self) {
		for effect in &self.vec {
			effect.update()
		}
	}
}

/// Reactive subscriber. Runs once on creation and re-runs synchronously
/// whenever a dependency read during the previous run changes, unless the
/// change happens inside a `batch` or another evaluation, in which case the
/// re-run is queued and drained right after.
#[derive(Clone)]
pub struct Effect {
	pub(crate) body: Rc<EffectBody>,
}

pub struct EffectBody {
	pub(crate) inner: RefCell<EffectInner>,
}

pub struct EffectInner {
	state: State,
	#[allow(unused)]
	pub(crate) name: &'static str,
	func: Box<dyn Fn(&Evaluation)>,
	dependencies: Dependencies,
	this: Weak<EffectBody>,
}

impl Drop for EffectInner {
	fn drop(&mut self) {
		let refr = self.this.clone() as Weak<dyn Derived>;
		self.dependencies.drop(&refr)
	}
}

impl Effect {
	#[must_use]
	pub fn new(func: impl Fn(&Evaluation) + 'static) -> Self {
		Self::new_with_name("<unnamed>", func)
	}

	#[must_use]
	pub fn new_with_name(name: &'static str, func: impl Fn(&Evaluation) + 'static) -> Self {
		let effect = Effect {
			body: Rc::new_cyclic(|this| EffectBody {
				inner: RefCell::new(EffectInner {
					func: Box::new(func),
					name,
					state: State::Invalid(Invalid::Definitely),
					dependencies: Dependencies::new(),
					this: this.clone(),
				}),
			}),
		};

		effect.update();
		effect
	}

	pub fn update(&self) {
		self.body.update();
	}
}

impl Reactive for EffectBody {
	fn update(&self) {
		let _guard = EvalGuard::enter();
		let mut self_mut = self.inner.borrow_mut();

		let is_valid = match self_mut.state {
			State::Valid => true,
			State::Invalid(Invalid::Definitely) => false,
			State::Invalid(Invalid::Maybe) => self_mut.dependencies.are_valid(),
		};

		if is_valid {
			self_mut.state = State::Valid;
			return;
		}

		let this = self_mut.this.clone() as Weak<dyn Derived>;
		let tracker = Evaluation::new(this.clone());
		(self_mut.func)(&tracker);

		self_mut.dependencies.swap(tracker.take(), &this);
		self_mut.state = State::Valid;
	}
}

impl Derived for EffectBody {
	fn invalidate(self: Rc<Self>, invalid: Invalid) {
		let mut self_mut = self.inner.borrow_mut();
		if matches!(self_mut.state, State::Valid) {
			self_mut.state = State::Invalid(invalid);
			std::mem::drop(self_mut);

			schedule(Rc::downgrade(&self) as Weak<dyn Reactive>);
		}
	}
}

impl std::fmt::Debug for Effect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Effect")
			.field("name", &self.body.inner.borrow().name)
			.finish()
	}
}
