use finegrain::{batch, Computed, Effect, Signal};


use mock::Spy;

#[test]
fn computed() {
	let a = Signal::new(10);
	assert_eq!(*a.get_once(), 10);

	let b = Computed::new({
		let a = a.clone();
		move |cx| *a.get(cx) + 10
	});

	assert_eq!(*b.get_once(), 20);

	let mock = mock::SharedMock::new();

	mock.get().expect_trigger().times(1).return_const(());

	let _r = Effect::new({
		let a = a.clone();
		let b = b.clone();
		let mock = mock.clone();
		move |cx| {
			mock.get().trigger(*a.get(cx) + *b.get(cx));
		}
	});

	mock.get().checkpoint();

	mock.get().expect_trigger().times(1).return_const(());

	batch(|| {
		a.set(20);
		a.set(20);
		a.set(20);
		a.set(20);
	});

	assert_eq!(*b.get_once(), 30);

	mock.get().checkpoint();
}

#[test]
fn effect_runs_synchronously_outside_batch() {
	let a = Signal::new(1u64);

	let mock = mock::SharedMock::new();

	// Once on creation, once per distinct write.
	mock.get().expect_trigger().times(3).return_const(());

	let _effect = Effect::new({
		let a = a.clone();
		let mock = mock.clone();
		move |cx| {
			mock.get().trigger(*a.get(cx));
		}
	});

	a.set(2);
	a.set(3);

	mock.get().checkpoint();
}

#[test]
fn check_invalidation() {
	let a = Signal::new(1);

	let mock = mock::SharedMock::new();

	mock.get().expect_trigger().once().return_const(());

	let _effect = Effect::new({
		let a = a.clone();
		let mock = mock.clone();
		move |cx| {
			mock.get().trigger(*a.get(cx));
		}
	});

	mock.get().checkpoint();

	mock.get().expect_trigger().times(0).return_const(());

	// Same value, same hash: no notification.
	a.set(1);

	mock.get().checkpoint();
}

#[test]
fn batch_coalesces_writes() {
	let a = Signal::new(1u64);
	let b = Signal::new(10u64);

	let mock = mock::SharedMock::new();

	mock.get().expect_trigger().once().return_const(());

	let _effect = Effect::new({
		let a = a.clone();
		let b = b.clone();
		let mock = mock.clone();
		move |cx| {
			mock.get().trigger(*a.get(cx) + *b.get(cx));
		}
	});

	mock.get().checkpoint();

	// Two writes, one re-run.
	mock.get().expect_trigger().once().return_const(());

	batch(|| {
		a.set(2);
		b.set(20);
	});

	mock.get().checkpoint();
}

#[test]
fn macro_sugar() {
	let a = Signal::new(2u64);
	let b = finegrain::computed!((a) cx => *a.get(cx) * 10);
	assert_eq!(*b.get_once(), 20);

	let calls = mock::Calls::new();
	let _effect = finegrain::effect!((a, calls) cx => {
		let _ = a.get(cx);
		calls.bump();
	});
	assert_eq!(calls.count(), 1);

	finegrain::batch! {
		a.set(3);
	};
	assert_eq!(*b.get_once(), 30);
	assert_eq!(calls.count(), 2);
}

#[test]
fn computed_is_memoized() {
	let a = Signal::new(1u64);

	let calls = mock::Calls::new();

	let b = Computed::new({
		let a = a.clone();
		let calls = calls.clone();
		move |cx| {
			calls.bump();
			*a.get(cx) * 2
		}
	});

	assert_eq!(*b.get_once(), 2);
	assert_eq!(*b.get_once(), 2);
	assert_eq!(calls.count(), 1);

	a.set(5);
	assert_eq!(*b.get_once(), 10);
	assert_eq!(calls.count(), 2);
}
