use std::cell::RefCell;
use std::rc::Rc;

use finegrain::{Const, Deferred, Fetch, FetchError, Resource, ResourceState, Signal};

/// Collects issued fetches so tests can settle them out of band.
#[derive(Clone, Default)]
struct FetchLog {
	issued: Rc<RefCell<Vec<(u32, Deferred<String>)>>>,
}

impl FetchLog {
	fn fetcher(&self) -> impl Fn(&u32) -> Fetch<String> {
		let issued = self.issued.clone();
		move |key| {
			let deferred = Deferred::new();
			issued.borrow_mut().push((*key, deferred.clone()));
			Fetch::Deferred(deferred)
		}
	}

	fn len(&self) -> usize {
		self.issued.borrow().len()
	}

	fn settle(&self, index: usize, result: Result<String, FetchError>) {
		let (_, deferred) = self.issued.borrow()[index].clone();
		match result {
			Ok(value) => deferred.resolve(value),
			Err(error) => deferred.reject(error),
		}
	}

	fn key_of(&self, index: usize) -> u32 {
		self.issued.borrow()[index].0
	}
}

#[test]
fn synchronous_fetch_never_visits_pending() {
	let resource = Resource::new(Const::new(21u32), |key: &u32| Fetch::Value(key * 2));

	assert_eq!(resource.state_once(), ResourceState::Ready);
	assert!(!*resource.loading().get_once());
	assert_eq!(resource.value_once(), Ok(Some(42)));
	assert_eq!(resource.latest_once(), Ok(Some(42)));
}

#[test]
fn async_fetch_resolves() {
	let log = FetchLog::default();
	let resource = Resource::new(Const::new(1u32), log.fetcher());

	assert_eq!(resource.state_once(), ResourceState::Pending);
	assert!(*resource.loading().get_once());
	assert_eq!(resource.value_once(), Ok(None));

	log.settle(0, Ok("alpha".to_string()));

	assert_eq!(resource.state_once(), ResourceState::Ready);
	assert!(!*resource.loading().get_once());
	assert_eq!(resource.value_once(), Ok(Some("alpha".to_string())));
}

#[test]
fn async_rejection_is_reraised() {
	let log = FetchLog::default();
	let resource = Resource::new(Const::new(1u32), log.fetcher());

	assert_eq!(resource.state_once(), ResourceState::Pending);

	log.settle(0, Err(FetchError::msg("boom")));

	assert_eq!(resource.state_once(), ResourceState::Errored);
	assert_eq!(resource.value_once(), Err(FetchError::msg("boom")));
	// Nothing ever resolved, so `latest` raises too.
	assert_eq!(resource.latest_once(), Err(FetchError::msg("boom")));
}

#[test]
fn synchronous_failure_is_normalized() {
	let resource: Resource<u32, String> =
		Resource::new(Const::new(1u32), |_key: &u32| {
			Fetch::Fail(FetchError::msg("offline"))
		});

	assert_eq!(resource.state_once(), ResourceState::Errored);
	assert_eq!(resource.value_once(), Err(FetchError::msg("offline")));
}

#[test]
fn refresh_keeps_last_known_good_value() {
	let key = Signal::new(1u32);
	let log = FetchLog::default();
	let resource = Resource::new(key.clone(), log.fetcher());

	log.settle(0, Ok("alpha".to_string()));
	assert_eq!(resource.state_once(), ResourceState::Ready);

	// A new fetch while a value exists refreshes instead of going pending.
	key.set(2);
	assert_eq!(resource.state_once(), ResourceState::Refreshing);
	assert!(*resource.loading().get_once());
	assert_eq!(resource.value_once(), Ok(Some("alpha".to_string())));
	assert_eq!(resource.latest_once(), Ok(Some("alpha".to_string())));

	// The refresh fails: direct reads raise, `latest` stays usable.
	log.settle(1, Err(FetchError::msg("flaky")));
	assert_eq!(resource.state_once(), ResourceState::Errored);
	assert_eq!(resource.value_once(), Err(FetchError::msg("flaky")));
	assert_eq!(resource.latest_once(), Ok(Some("alpha".to_string())));

	// An explicit refetch recovers.
	resource.refetch();
	assert_eq!(resource.state_once(), ResourceState::Refreshing);
	log.settle(2, Ok("beta".to_string()));
	assert_eq!(resource.value_once(), Ok(Some("beta".to_string())));
}

#[test]
fn stale_completion_is_discarded() {
	let key = Signal::new(1u32);
	let log = FetchLog::default();
	let resource = Resource::new(key.clone(), log.fetcher());

	// Second fetch supersedes the first while both are outstanding.
	key.set(2);
	assert_eq!(log.len(), 2);
	assert_eq!(log.key_of(0), 1);
	assert_eq!(log.key_of(1), 2);

	// The newer fetch settles first and wins.
	log.settle(1, Ok("new".to_string()));
	assert_eq!(resource.value_once(), Ok(Some("new".to_string())));

	// The older fetch settles afterwards and must not touch anything.
	log.settle(0, Ok("old".to_string()));
	assert_eq!(resource.value_once(), Ok(Some("new".to_string())));
	assert_eq!(resource.state_once(), ResourceState::Ready);
}

#[test]
fn stale_rejection_is_discarded() {
	let key = Signal::new(1u32);
	let log = FetchLog::default();
	let resource = Resource::new(key.clone(), log.fetcher());

	key.set(2);
	log.settle(1, Ok("good".to_string()));

	log.settle(0, Err(FetchError::msg("too late")));
	assert_eq!(resource.state_once(), ResourceState::Ready);
	assert_eq!(resource.value_once(), Ok(Some("good".to_string())));
}

#[test]
fn manual_value_assignment() {
	let log = FetchLog::default();
	let resource = Resource::manual(Const::new(1u32), log.fetcher());

	// No auto-issued fetch in manual mode.
	assert_eq!(log.len(), 0);
	assert_eq!(resource.state_once(), ResourceState::Unresolved);

	resource.set_value("optimistic".to_string());
	assert_eq!(resource.state_once(), ResourceState::Ready);
	assert_eq!(resource.value_once(), Ok(Some("optimistic".to_string())));
	assert_eq!(log.len(), 0);

	resource.refetch();
	assert_eq!(log.len(), 1);
	assert_eq!(resource.state_once(), ResourceState::Refreshing);
}

#[test]
fn refetch_with_explicit_key() {
	let log = FetchLog::default();
	let resource = Resource::manual(Const::new(1u32), log.fetcher());

	resource.refetch_with(9);
	assert_eq!(log.key_of(0), 9);
	assert_eq!(resource.state_once(), ResourceState::Pending);

	log.settle(0, Ok("niner".to_string()));
	assert_eq!(resource.value_once(), Ok(Some("niner".to_string())));
}

#[test]
fn key_change_triggers_refetch() {
	let key = Signal::new(1u32);
	let log = FetchLog::default();
	let resource = Resource::new(key.clone(), log.fetcher());

	assert_eq!(log.len(), 1);
	log.settle(0, Ok("one".to_string()));

	key.set(2);
	assert_eq!(log.len(), 2);
	assert_eq!(log.key_of(1), 2);

	log.settle(1, Ok("two".to_string()));
	assert_eq!(resource.value_once(), Ok(Some("two".to_string())));

	// Writing the same key again is not a change.
	key.set(2);
	assert_eq!(log.len(), 2);
}

#[test]
fn loading_is_reactive() {
	let log = FetchLog::default();
	let resource = Resource::new(Const::new(1u32), log.fetcher());
	let loading = resource.loading();

	let seen = Rc::new(RefCell::new(Vec::new()));
	let _effect = finegrain::Effect::new({
		let loading = loading.clone();
		let seen = seen.clone();
		move |cx| {
			seen.borrow_mut().push(*loading.get(cx));
		}
	});

	log.settle(0, Ok("done".to_string()));

	assert_eq!(*seen.borrow(), vec![true, false]);
}
