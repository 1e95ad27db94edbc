//! Engine and view-controller construction on top of the resolved
//! `flutter_windows.dll` symbol table.

use std::{
    ffi::{c_char, CString},
    path::Path,
    ptr,
};

use anyhow::{ensure, Context, Result};
use log::info;
use windows::Win32::Foundation::HWND;

use crate::{
    dynamic_flutter_windows_dll_loader::FlutterDll,
    flutter_bindings::{
        FlutterDesktopEngineProperties, FlutterDesktopEngineRef, FlutterDesktopViewControllerRef,
        FlutterDesktopViewRef,
    },
    path_utils,
};

/// Creates the engine from `root_dir/data`, forwarding `dart_args` to the
/// Dart entrypoint. The engine copies the properties during creation, so the
/// temporaries built here do not need to outlive the call.
pub fn create_flutter_engine(
    dll: &FlutterDll,
    root_dir: &Path,
    dart_args: &[String],
) -> Result<FlutterDesktopEngineRef> {
    let paths = path_utils::resolve_flutter_paths(root_dir)?;

    let arg_strings: Vec<CString> = dart_args
        .iter()
        .map(|a| CString::new(a.as_str()).with_context(|| format!("dart argument `{a}` contains NUL")))
        .collect::<Result<_>>()?;
    let mut arg_ptrs: Vec<*const c_char> = arg_strings.iter().map(|a| a.as_ptr()).collect();

    let props = FlutterDesktopEngineProperties {
        assets_path: paths.assets.as_ptr(),
        icu_data_path: paths.icu_data.as_ptr(),
        aot_library_path: paths
            .aot_library
            .as_ref()
            .map_or(ptr::null(), |p| p.as_ptr()),
        dart_entrypoint: ptr::null(),
        dart_entrypoint_argc: arg_ptrs.len() as i32,
        dart_entrypoint_argv: if arg_ptrs.is_empty() {
            ptr::null_mut()
        } else {
            arg_ptrs.as_mut_ptr()
        },
    };

    info!("[Flutter Utils] Initializing Flutter engine");
    let engine = unsafe { (dll.FlutterDesktopEngineCreate)(&props) };
    ensure!(!engine.is_null(), "FlutterDesktopEngineCreate failed");
    info!("[Flutter Utils] Engine created");
    Ok(engine)
}

/// Creates a view controller of the given size. On success the controller
/// owns `engine`; on failure the engine is destroyed here.
pub fn create_flutter_view_controller(
    dll: &FlutterDll,
    engine: FlutterDesktopEngineRef,
    width: i32,
    height: i32,
) -> Result<FlutterDesktopViewControllerRef> {
    info!("[Flutter Utils] Creating view controller ({width}x{height})");
    let controller = unsafe { (dll.FlutterDesktopViewControllerCreate)(width, height, engine) };
    if controller.is_null() {
        unsafe { (dll.FlutterDesktopEngineDestroy)(engine) };
        anyhow::bail!("FlutterDesktopViewControllerCreate failed");
    }
    Ok(controller)
}

/// Retrieves the Flutter view and the child HWND the engine renders into.
pub fn get_flutter_view_and_hwnd(
    dll: &FlutterDll,
    controller: FlutterDesktopViewControllerRef,
) -> Result<(FlutterDesktopViewRef, HWND)> {
    let view = unsafe { (dll.FlutterDesktopViewControllerGetView)(controller) };
    ensure!(!view.is_null(), "FlutterDesktopViewControllerGetView failed");

    let raw = unsafe { (dll.FlutterDesktopViewGetHWND)(view) };
    ensure!(!raw.is_null(), "FlutterDesktopViewGetHWND returned null");

    let hwnd = HWND(raw as isize);
    info!("[Flutter Utils] Flutter child HWND = {hwnd:?}");
    Ok((view, hwnd))
}
