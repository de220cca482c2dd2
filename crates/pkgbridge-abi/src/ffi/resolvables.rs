use std::ffi::{c_char, c_uint};

use pkgbridge_engine::{MountPoint as EngineMountPoint, Pattern, ResKind};

use super::{array, array_mut, context_mut, context_ref, guarded};
use crate::abi::{AbiEnum, MountPoint, PatternInfo, PatternInfos, PatternNames, ResolvableSelected};
use crate::context::selection_state;
use crate::status::Status;
use crate::strings::{c_arg, OwnedStr};
use crate::tables::KIND;
use crate::{BridgeError, Context};

fn kind_arg(raw: c_uint) -> Result<ResKind, BridgeError> {
    KIND.get_raw(raw).ok_or_else(|| {
        BridgeError::InvalidArgument(format!("unknown {} {raw}", KIND.name()))
    })
}

fn who_arg(raw: c_uint) -> Result<ResolvableSelected, BridgeError> {
    ResolvableSelected::from_raw(raw)
        .ok_or_else(|| BridgeError::InvalidArgument(format!("unknown selection causer {raw}")))
}

/// `kind` is a `ResolvableKind` value and `who` a `ResolvableSelected`
/// value. Selecting on behalf of `NotSelected` does nothing.
#[no_mangle]
pub unsafe extern "C" fn resolvable_select(
    ctx: *mut Context,
    name: *const c_char,
    kind: c_uint,
    who: c_uint,
    status: *mut Status,
) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        context.select(c_arg(name, "name")?, kind_arg(kind)?, who_arg(who)?)
    });
}

#[no_mangle]
pub unsafe extern "C" fn resolvable_unselect(
    ctx: *mut Context,
    name: *const c_char,
    kind: c_uint,
    who: c_uint,
    status: *mut Status,
) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        context.unselect(c_arg(name, "name")?, kind_arg(kind)?, who_arg(who)?)
    });
}

#[no_mangle]
pub unsafe extern "C" fn resolvable_reset_all(ctx: *mut Context) {
    if let Some(context) = ctx.as_mut() {
        context.reset_all();
    }
}

/// False when the solver left problems unresolved.
#[no_mangle]
pub unsafe extern "C" fn run_solver(
    ctx: *mut Context,
    only_required: bool,
    status: *mut Status,
) -> bool {
    guarded(status, false, || context_mut(ctx)?.run_solver(only_required))
}

#[no_mangle]
pub unsafe extern "C" fn packages_to_install(ctx: *mut Context, status: *mut Status) -> c_uint {
    guarded(status, 0, || {
        let count = context_ref(ctx)?.packages_to_install();
        Ok(c_uint::try_from(count).unwrap_or(c_uint::MAX))
    })
}

#[no_mangle]
pub unsafe extern "C" fn is_package_available(
    ctx: *mut Context,
    tag: *const c_char,
    status: *mut Status,
) -> bool {
    guarded(status, false, || {
        context_ref(ctx)?.is_package_available(c_arg(tag, "tag")?)
    })
}

#[no_mangle]
pub unsafe extern "C" fn is_package_selected(
    ctx: *mut Context,
    tag: *const c_char,
    status: *mut Status,
) -> bool {
    guarded(status, false, || {
        context_ref(ctx)?.is_package_selected(c_arg(tag, "tag")?)
    })
}

fn pattern_info(pattern: &Pattern) -> PatternInfo {
    PatternInfo {
        name: OwnedStr::new(&pattern.name),
        category: OwnedStr::new(&pattern.data.category),
        icon: OwnedStr::new(&pattern.data.icon),
        description: OwnedStr::new(&pattern.data.description),
        summary: OwnedStr::new(&pattern.data.summary),
        order: OwnedStr::new(&pattern.data.order),
        selected: selection_state(&pattern.status),
    }
}

/// Details of the named patterns. Unknown names are left out, so entries
/// are matched by name, not by index. Release with [`free_pattern_infos`].
#[no_mangle]
pub unsafe extern "C" fn get_patterns_info(
    ctx: *mut Context,
    names: PatternNames,
    status: *mut Status,
) -> PatternInfos {
    guarded(status, PatternInfos::empty(), || {
        let context = context_ref(ctx)?;
        let names = array(names.names, names.size, "pattern names")?
            .iter()
            .map(|&name| c_arg(name, "pattern name"))
            .collect::<Result<Vec<_>, _>>()?;
        let infos = context
            .patterns(names)
            .iter()
            .map(pattern_info)
            .collect();
        Ok(PatternInfos::new(infos))
    })
}

#[no_mangle]
pub unsafe extern "C" fn free_pattern_infos(infos: *mut PatternInfos) {
    if let Some(infos) = infos.as_mut() {
        infos.release();
    }
}

/// Fill in `used_size` of every entry. A null filesystem reads as empty.
#[no_mangle]
pub unsafe extern "C" fn get_space_usage(
    ctx: *mut Context,
    status: *mut Status,
    mount_points: *mut MountPoint,
    size: c_uint,
) {
    guarded(status, (), || {
        let context = context_ref(ctx)?;
        let entries = array_mut(mount_points, size, "mount points")?;
        let mut requested = entries
            .iter()
            .map(|entry| -> Result<EngineMountPoint, BridgeError> {
                let filesystem = if entry.filesystem.is_null() {
                    ""
                } else {
                    c_arg(entry.filesystem, "filesystem")?
                };
                Ok(EngineMountPoint {
                    directory: c_arg(entry.directory, "mount point directory")?.to_owned(),
                    filesystem: filesystem.to_owned(),
                    grow_only: entry.grow_only,
                    used_size: 0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        context.space_usage(&mut requested)?;
        for (entry, computed) in entries.iter_mut().zip(&requested) {
            entry.used_size = computed.used_size;
        }
        Ok(())
    });
}
