//! Runtime loader for `flutter_windows.dll`.
//!
//! The host never links against the engine: the DLL shipped beside the
//! executable is opened with `libloading` and every `FlutterDesktop*` entry
//! point this host needs is resolved once into a typed symbol table. Tables
//! are cached per directory so repeated lookups hand back the same `Arc`.

#![allow(non_snake_case)]

use std::{
    collections::HashMap,
    ffi::c_void,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use libloading::{Library, Symbol};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::flutter_bindings as b;

/// Typed table of the engine entry points used by this host.
///
/// Field names mirror the exported symbol names so call sites read like the
/// embedding API docs.
pub struct FlutterDll {
    _lib: &'static Library,

    pub FlutterDesktopEngineCreate: Symbol<
        'static,
        unsafe extern "C" fn(*const b::FlutterDesktopEngineProperties) -> b::FlutterDesktopEngineRef,
    >,
    pub FlutterDesktopEngineDestroy:
        Symbol<'static, unsafe extern "C" fn(b::FlutterDesktopEngineRef) -> bool>,
    pub FlutterDesktopEngineGetPluginRegistrar: Symbol<
        'static,
        unsafe extern "C" fn(
            b::FlutterDesktopEngineRef,
            *const std::ffi::c_char,
        ) -> b::FlutterDesktopPluginRegistrarRef,
    >,
    pub FlutterDesktopEngineGetMessenger: Symbol<
        'static,
        unsafe extern "C" fn(b::FlutterDesktopEngineRef) -> b::FlutterDesktopMessengerRef,
    >,
    pub FlutterDesktopEngineSetNextFrameCallback: Symbol<
        'static,
        unsafe extern "C" fn(b::FlutterDesktopEngineRef, b::VoidCallback, *mut c_void),
    >,
    pub FlutterDesktopEngineReloadSystemFonts:
        Symbol<'static, unsafe extern "C" fn(b::FlutterDesktopEngineRef)>,
    pub FlutterDesktopEngineProcessExternalWindowMessage: Symbol<
        'static,
        unsafe extern "C" fn(
            b::FlutterDesktopEngineRef,
            b::HWND,
            b::UINT,
            b::WPARAM,
            b::LPARAM,
            *mut b::LRESULT,
        ) -> bool,
    >,
    pub FlutterDesktopViewControllerCreate: Symbol<
        'static,
        unsafe extern "C" fn(i32, i32, b::FlutterDesktopEngineRef) -> b::FlutterDesktopViewControllerRef,
    >,
    pub FlutterDesktopViewControllerDestroy:
        Symbol<'static, unsafe extern "C" fn(b::FlutterDesktopViewControllerRef)>,
    pub FlutterDesktopViewControllerGetEngine: Symbol<
        'static,
        unsafe extern "C" fn(b::FlutterDesktopViewControllerRef) -> b::FlutterDesktopEngineRef,
    >,
    pub FlutterDesktopViewControllerGetView: Symbol<
        'static,
        unsafe extern "C" fn(b::FlutterDesktopViewControllerRef) -> b::FlutterDesktopViewRef,
    >,
    pub FlutterDesktopViewControllerHandleTopLevelWindowProc: Symbol<
        'static,
        unsafe extern "C" fn(
            b::FlutterDesktopViewControllerRef,
            b::HWND,
            b::UINT,
            b::WPARAM,
            b::LPARAM,
            *mut b::LRESULT,
        ) -> bool,
    >,
    pub FlutterDesktopViewControllerForceRedraw:
        Symbol<'static, unsafe extern "C" fn(b::FlutterDesktopViewControllerRef)>,
    pub FlutterDesktopViewGetHWND:
        Symbol<'static, unsafe extern "C" fn(b::FlutterDesktopViewRef) -> b::HWND>,
    pub FlutterDesktopMessengerSetCallback: Symbol<
        'static,
        unsafe extern "C" fn(
            b::FlutterDesktopMessengerRef,
            *const std::ffi::c_char,
            b::FlutterDesktopMessageCallback,
            *mut c_void,
        ),
    >,
    pub FlutterDesktopMessengerSendResponse: Symbol<
        'static,
        unsafe extern "C" fn(
            b::FlutterDesktopMessengerRef,
            *const b::FlutterDesktopMessageResponseHandle,
            *const u8,
            usize,
        ),
    >,
}

impl std::fmt::Debug for FlutterDll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlutterDll").finish_non_exhaustive()
    }
}

static DLL_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<FlutterDll>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn resolve<T>(lib: &'static Library, name: &'static [u8]) -> Result<Symbol<'static, T>> {
    unsafe { lib.get(name) }.with_context(|| {
        format!(
            "missing symbol: {}",
            String::from_utf8_lossy(&name[..name.len() - 1])
        )
    })
}

impl FlutterDll {
    /// Loads `flutter_windows.dll` from `dir` (or the executable's directory)
    /// and resolves every entry point.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let dll_dir = match dir {
            Some(d) => d.to_path_buf(),
            None => exe_directory()?,
        };

        let dll_path = dll_dir.join("flutter_windows.dll");
        let lib = unsafe { Library::new(&dll_path) }
            .with_context(|| format!("failed to load {}", dll_path.display()))?;

        // The engine stays resident for the life of the process.
        let lib: &'static Library = Box::leak(Box::new(lib));

        Ok(FlutterDll {
            _lib: lib,
            FlutterDesktopEngineCreate: resolve(lib, b"FlutterDesktopEngineCreate\0")?,
            FlutterDesktopEngineDestroy: resolve(lib, b"FlutterDesktopEngineDestroy\0")?,
            FlutterDesktopEngineGetPluginRegistrar: resolve(
                lib,
                b"FlutterDesktopEngineGetPluginRegistrar\0",
            )?,
            FlutterDesktopEngineGetMessenger: resolve(lib, b"FlutterDesktopEngineGetMessenger\0")?,
            FlutterDesktopEngineSetNextFrameCallback: resolve(
                lib,
                b"FlutterDesktopEngineSetNextFrameCallback\0",
            )?,
            FlutterDesktopEngineReloadSystemFonts: resolve(
                lib,
                b"FlutterDesktopEngineReloadSystemFonts\0",
            )?,
            FlutterDesktopEngineProcessExternalWindowMessage: resolve(
                lib,
                b"FlutterDesktopEngineProcessExternalWindowMessage\0",
            )?,
            FlutterDesktopViewControllerCreate: resolve(
                lib,
                b"FlutterDesktopViewControllerCreate\0",
            )?,
            FlutterDesktopViewControllerDestroy: resolve(
                lib,
                b"FlutterDesktopViewControllerDestroy\0",
            )?,
            FlutterDesktopViewControllerGetEngine: resolve(
                lib,
                b"FlutterDesktopViewControllerGetEngine\0",
            )?,
            FlutterDesktopViewControllerGetView: resolve(
                lib,
                b"FlutterDesktopViewControllerGetView\0",
            )?,
            FlutterDesktopViewControllerHandleTopLevelWindowProc: resolve(
                lib,
                b"FlutterDesktopViewControllerHandleTopLevelWindowProc\0",
            )?,
            FlutterDesktopViewControllerForceRedraw: resolve(
                lib,
                b"FlutterDesktopViewControllerForceRedraw\0",
            )?,
            FlutterDesktopViewGetHWND: resolve(lib, b"FlutterDesktopViewGetHWND\0")?,
            FlutterDesktopMessengerSetCallback: resolve(
                lib,
                b"FlutterDesktopMessengerSetCallback\0",
            )?,
            FlutterDesktopMessengerSendResponse: resolve(
                lib,
                b"FlutterDesktopMessengerSendResponse\0",
            )?,
        })
    }

    /// Cached variant of [`FlutterDll::load`]; one table per directory.
    pub fn get_for(dir: Option<&Path>) -> Result<Arc<Self>> {
        let key = match dir {
            Some(d) => d.to_path_buf(),
            None => exe_directory()?,
        };

        let mut cache = DLL_CACHE.lock();
        if let Some(existing) = cache.get(&key) {
            return Ok(existing.clone());
        }

        let dll = Arc::new(FlutterDll::load(Some(&key))?);
        cache.insert(key, dll.clone());
        Ok(dll)
    }
}

/// Directory containing the running executable.
pub fn exe_directory() -> Result<PathBuf> {
    std::env::current_exe()
        .context("failed to get current exe path")?
        .parent()
        .map(PathBuf::from)
        .context("exe has no parent directory")
}
