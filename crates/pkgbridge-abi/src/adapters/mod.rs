//! Report receivers that forward engine events to caller callbacks.
//!
//! Each adapter implements one or two engine report traits and holds a
//! [`Binding`] to the caller's callback struct. With no struct bound, or with
//! the matching slot left null, an adapter behaves exactly like the engine's
//! own receiver: notifications are dropped and decisions come from
//! `pkgbridge_engine::report::defaults`.

mod download;
mod install;
mod progress;
mod resolvable;
mod security;

pub use download::DownloadAdapter;
pub use install::InstallAdapter;
pub use progress::ProgressAdapter;
pub use resolvable::ResolvableAdapter;
pub use security::SecurityAdapter;

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

/// Registration state of one callback group: whether it is registered, and
/// the caller's struct while it is.
#[derive(Debug)]
pub struct Binding<C: 'static> {
    group: &'static str,
    registered: Cell<bool>,
    callbacks: Cell<*const C>,
}

impl<C: Copy> Binding<C> {
    pub const fn new(group: &'static str) -> Self {
        Self {
            group,
            registered: Cell::new(false),
            callbacks: Cell::new(ptr::null()),
        }
    }

    /// Register `callbacks`. Null registers the group with every slot empty.
    ///
    /// # Panics
    ///
    /// When the group is already registered.
    ///
    /// # Safety
    ///
    /// `callbacks` must be null or valid for reads until [`Binding::clear`].
    pub unsafe fn bind(&self, callbacks: *const C) {
        assert!(
            !self.registered.get(),
            "{} callbacks registered twice",
            self.group
        );
        self.callbacks.set(callbacks);
        self.registered.set(true);
    }

    pub fn clear(&self) {
        self.callbacks.set(ptr::null());
        self.registered.set(false);
    }

    pub fn is_bound(&self) -> bool {
        self.registered.get()
    }

    /// Copy of the bound struct.
    pub fn current(&self) -> Option<C> {
        let callbacks = self.callbacks.get();
        if callbacks.is_null() {
            return None;
        }
        // SAFETY: `bind` requires the struct to outlive the registration, and
        // `clear` nulls the pointer before the registration ends.
        Some(unsafe { *callbacks })
    }

    /// One slot of the bound struct with its user data, if the slot is set.
    pub fn slot<F>(&self, pick: impl FnOnce(&C) -> (Option<F>, *mut c_void)) -> Option<(F, *mut c_void)> {
        let callbacks = self.current()?;
        let (function, data) = pick(&callbacks);
        function.map(|f| (f, data))
    }
}
