use std::cmp::Ordering;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// `Rc` keyed by pointer identity, so trait objects can live in ordered
/// dependency maps.
pub struct RcAddr<T: ?Sized> {
	ptr: Rc<T>,
}

impl<T: ?Sized> RcAddr<T> {
	pub fn new(ptr: Rc<T>) -> Self {
		RcAddr { ptr }
	}
}

impl<T: ?Sized> Deref for RcAddr<T> {
	type Target = Rc<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for RcAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		// Compare data pointers only; vtable pointers are not stable.
		Rc::as_ptr(&self.ptr)
			.cast::<()>()
			.eq(&Rc::as_ptr(&other.ptr).cast::<()>())
	}
}

impl<T: ?Sized> Eq for RcAddr<T> {}

impl<T: ?Sized> Ord for RcAddr<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		Rc::as_ptr(&self.ptr)
			.cast::<()>()
			.cmp(&Rc::as_ptr(&other.ptr).cast::<()>())
	}
}

impl<T: ?Sized> PartialOrd for RcAddr<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// `Weak` counterpart of [`RcAddr`], used for reverse (`used_by`) edges.
pub struct WeakAddr<T: ?Sized> {
	ptr: Weak<T>,
}

impl<T: ?Sized> WeakAddr<T> {
	pub fn new(ptr: Weak<T>) -> Self {
		WeakAddr { ptr }
	}
}

impl<T: ?Sized> Deref for WeakAddr<T> {
	type Target = Weak<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for WeakAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		Weak::as_ptr(&self.ptr)
			.cast::<()>()
			.eq(&Weak::as_ptr(&other.ptr).cast::<()>())
	}
}

impl<T: ?Sized> Eq for WeakAddr<T> {}

impl<T: ?Sized> Ord for WeakAddr<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		Weak::as_ptr(&self.ptr)
			.cast::<()>()
			.cmp(&Weak::as_ptr(&other.ptr).cast::<()>())
	}
}

impl<T: ?Sized> PartialOrd for WeakAddr<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
