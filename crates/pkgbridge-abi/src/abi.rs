//! ABI-stable enumerations and records.
//!
//! Numeric values are part of the contract with the caller and never change.
//! Values returned *by* the caller arrive as raw `c_uint` and are decoded with
//! `from_raw`, so an out-of-range answer is detected instead of being
//! undefined behavior.

use std::ffi::{c_char, c_longlong, c_uint};
use std::ptr;

use crate::strings::{BorrowedStr, OwnedStr};

/// An ABI enumeration decodable from a raw caller value.
pub trait AbiEnum: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn from_raw(raw: c_uint) -> Option<Self>;

    fn as_raw(self) -> c_uint;
}

macro_rules! abi_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value),+
        }

        impl AbiEnum for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn from_raw(raw: c_uint) -> Option<Self> {
                match raw {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_raw(self) -> c_uint {
                self as c_uint
            }
        }
    };
}

abi_enum! {
    /// Answer to a problem report.
    ProblemResponse { Retry = 0, Abort = 1, Ignore = 2 }
}

abi_enum! {
    /// [`ProblemResponse`] plus `None`, which leaves the decision to the engine.
    OptionalProblemResponse { Retry = 0, Abort = 1, Ignore = 2, None = 3 }
}

abi_enum! {
    DownloadProgressError { NoError = 0, NotFound = 1, Io = 2, AccessDenied = 3, Error = 4 }
}

abi_enum! {
    DownloadResolvableError { NoError = 0, NotFound = 1, Io = 2, Invalid = 3 }
}

abi_enum! {
    DownloadResolvableFileError { NoError = 0, NotFound = 1, Io = 2, AccessDenied = 3, Error = 4 }
}

abi_enum! {
    GpgCheckPackageResult {
        Ok = 0,
        NotFound = 1,
        Fail = 2,
        NotTrusted = 3,
        NoKey = 4,
        Error = 5,
        NoSig = 6,
    }
}

abi_enum! {
    /// What to do with a key the key ring does not know.
    GpgKeyTrust { Reject = 0, Temporary = 1, Import = 2 }
}

abi_enum! {
    InstallPackageError { NoError = 0, NotFound = 1, Io = 2, Invalid = 3 }
}

abi_enum! {
    ResolvableKind { Product = 0, Patch = 1, Package = 2, SrcPackage = 3, Pattern = 4 }
}

abi_enum! {
    /// Selection state of a resolvable, and the causer of a selection request.
    ResolvableSelected {
        NotSelected = 0,
        UserSelected = 1,
        ApplicationSelected = 2,
        SolverSelected = 3,
        UserRemoved = 4,
    }
}

/// One generic progress event. `value` is a percentage or -1 for
/// "still alive"; `name` is borrowed for the duration of the callback.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ProgressData<'a> {
    pub value: c_longlong,
    pub name: BorrowedStr<'a>,
}

#[repr(C)]
#[derive(Debug)]
pub struct Repository {
    pub enabled: bool,
    pub url: OwnedStr,
    pub alias: OwnedStr,
    pub user_name: OwnedStr,
    pub service_name: OwnedStr,
}

impl Repository {
    fn release(&mut self) {
        self.url.free();
        self.alias.free();
        self.user_name.free();
        self.service_name.free();
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct RepositoryList {
    pub size: c_uint,
    pub repos: *mut Repository,
}

impl RepositoryList {
    pub fn new(repos: Vec<Repository>) -> Self {
        let (repos, size) = into_raw_array(repos);
        Self { size, repos }
    }

    pub fn empty() -> Self {
        Self {
            size: 0,
            repos: ptr::null_mut(),
        }
    }

    /// # Safety
    ///
    /// The list must come from [`RepositoryList::new`] and not be released yet.
    pub unsafe fn release(&mut self) {
        let mut repos = from_raw_array(self.repos, self.size);
        for repo in repos.iter_mut() {
            repo.release();
        }
        drop(repos);
        *self = Self::empty();
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct PatternInfo {
    pub name: OwnedStr,
    pub category: OwnedStr,
    pub icon: OwnedStr,
    pub description: OwnedStr,
    pub summary: OwnedStr,
    pub order: OwnedStr,
    pub selected: ResolvableSelected,
}

impl PatternInfo {
    fn release(&mut self) {
        self.name.free();
        self.category.free();
        self.icon.free();
        self.description.free();
        self.summary.free();
        self.order.free();
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct PatternInfos {
    pub infos: *mut PatternInfo,
    pub size: c_uint,
}

impl PatternInfos {
    pub fn new(infos: Vec<PatternInfo>) -> Self {
        let (infos, size) = into_raw_array(infos);
        Self { infos, size }
    }

    pub fn empty() -> Self {
        Self {
            infos: ptr::null_mut(),
            size: 0,
        }
    }

    /// # Safety
    ///
    /// The array must come from [`PatternInfos::new`] and not be released yet.
    pub unsafe fn release(&mut self) {
        let mut infos = from_raw_array(self.infos, self.size);
        for info in infos.iter_mut() {
            info.release();
        }
        drop(infos);
        *self = Self::empty();
    }
}

/// Pattern names requested by the caller; borrowed for the call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PatternNames {
    pub names: *const *const c_char,
    pub size: c_uint,
}

/// A mount point supplied by the caller. `used_size` is written back.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MountPoint {
    pub directory: *const c_char,
    pub filesystem: *const c_char,
    pub grow_only: bool,
    pub used_size: i64,
}

fn into_raw_array<T>(items: Vec<T>) -> (*mut T, c_uint) {
    let size = items.len() as c_uint;
    let items = Box::into_raw(items.into_boxed_slice());
    (items.cast::<T>(), size)
}

unsafe fn from_raw_array<T>(items: *mut T, size: c_uint) -> Box<[T]> {
    if items.is_null() {
        return Box::default();
    }
    Box::from_raw(ptr::slice_from_raw_parts_mut(items, size as usize))
}
