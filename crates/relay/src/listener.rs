#![forbid(unsafe_code)]

//! Type-erased, identity-comparable listener callbacks.
//!
//! A [`Listener<A>`] wraps a callback taking the argument tuple `A` by
//! reference. Listeners are compared by identity: a clone of a listener is
//! equal to the original, while two listeners built from identical closures
//! are not. Keep a clone around to remove the listener later.
//!
//! Plain closures of arity 0 to 4 are accepted through [`Callback`], which
//! unpacks the tuple so callers write `|a: &i32, b: &str| ..` instead of
//! `|args: &(i32, String)| ..`.

use std::fmt;
use std::rc::Rc;

use crate::error::ListenerError;

/// Outcome of one listener invocation.
pub type ListenerResult = Result<(), ListenerError>;

type Invoke<A> = dyn Fn(&A) -> ListenerResult;

/// A callable that accepts the argument tuple `A`.
///
/// Implemented for `Fn()`, `Fn(&T0)`, `Fn(&T0, &T1)`, `Fn(&T0, &T1, &T2)` and
/// `Fn(&T0, &T1, &T2, &T3)` with `A` being the matching tuple.
pub trait Callback<A>: 'static {
    /// Invoke the callback with the unpacked tuple.
    fn call(&self, args: &A);
}

macro_rules! impl_callback {
    ($($ty:ident $idx:tt),*) => {
        impl<F, $($ty,)*> Callback<($($ty,)*)> for F
        where
            F: Fn($(&$ty),*) + 'static,
        {
            #[inline]
            #[allow(unused_variables)]
            fn call(&self, args: &($($ty,)*)) {
                self($(&args.$idx),*)
            }
        }
    };
}

impl_callback!();
impl_callback!(T0 0);
impl_callback!(T0 0, T1 1);
impl_callback!(T0 0, T1 1, T2 2);
impl_callback!(T0 0, T1 1, T2 2, T3 3);

/// A registered (or registrable) callback.
pub struct Listener<A> {
    invoke: Rc<Invoke<A>>,
}

impl<A: 'static> Listener<A> {
    /// Wrap an infallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Callback<A>,
    {
        Self {
            invoke: Rc::new(move |args: &A| {
                callback.call(args);
                Ok(())
            }),
        }
    }

    /// Wrap a fallible callback receiving the whole argument tuple.
    ///
    /// An `Err` aborts the dispatch pass it was raised in.
    pub fn try_new<F>(callback: F) -> Self
    where
        F: Fn(&A) -> ListenerResult + 'static,
    {
        Self {
            invoke: Rc::new(callback),
        }
    }
}

impl<A> Listener<A> {
    #[inline]
    pub(crate) fn invoke(&self, args: &A) -> ListenerResult {
        (self.invoke)(args)
    }

    /// Whether `self` and `other` are the same callback.
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.invoke, &other.invoke)
    }
}

// Manual Clone: shares the same Rc, so the clone keeps the identity.
impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            invoke: Rc::clone(&self.invoke),
        }
    }
}

impl<A> PartialEq for Listener<A> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<A> Eq for Listener<A> {}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &Rc::as_ptr(&self.invoke).cast::<()>())
            .finish()
    }
}
