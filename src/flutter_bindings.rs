//! Hand-maintained FFI types for the slice of `flutter_windows.h` this host
//! uses. All functions are resolved at runtime from `flutter_windows.dll`
//! (see `dynamic_flutter_windows_dll_loader`), so only the data layout lives
//! here.

#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::{c_char, c_int, c_void};

/// Opaque engine instance.
#[repr(C)]
pub struct FlutterDesktopEngine {
    _private: [u8; 0],
}
pub type FlutterDesktopEngineRef = *mut FlutterDesktopEngine;

/// Opaque view controller (owns the engine once created from it).
#[repr(C)]
pub struct FlutterDesktopViewController {
    _private: [u8; 0],
}
pub type FlutterDesktopViewControllerRef = *mut FlutterDesktopViewController;

/// Opaque view backing the Flutter child HWND.
#[repr(C)]
pub struct FlutterDesktopView {
    _private: [u8; 0],
}
pub type FlutterDesktopViewRef = *mut FlutterDesktopView;

/// Opaque per-plugin registrar.
#[repr(C)]
pub struct FlutterDesktopPluginRegistrar {
    _private: [u8; 0],
}
pub type FlutterDesktopPluginRegistrarRef = *mut FlutterDesktopPluginRegistrar;

/// Opaque binary messenger.
#[repr(C)]
pub struct FlutterDesktopMessenger {
    _private: [u8; 0],
}
pub type FlutterDesktopMessengerRef = *mut FlutterDesktopMessenger;

/// Opaque handle identifying one pending message response.
#[repr(C)]
pub struct FlutterDesktopMessageResponseHandle {
    _private: [u8; 0],
}

// Raw Win32 handle types as they cross the embedding ABI. The `windows`
// crate's wrappers are converted at the call sites.
pub type HWND = *mut c_void;
pub type WPARAM = usize;
pub type LPARAM = isize;
pub type LRESULT = isize;
pub type UINT = u32;

/// Properties for creating the engine. Paths are null-terminated UTF-16;
/// entrypoint arguments are null-terminated UTF-8.
#[repr(C)]
pub struct FlutterDesktopEngineProperties {
    pub assets_path: *const u16,
    pub icu_data_path: *const u16,
    pub aot_library_path: *const u16,
    pub dart_entrypoint: *const c_char,
    pub dart_entrypoint_argc: c_int,
    pub dart_entrypoint_argv: *mut *const c_char,
}

/// One inbound platform message, as delivered to a messenger callback.
#[repr(C)]
pub struct FlutterDesktopMessage {
    pub struct_size: usize,
    pub channel: *const c_char,
    pub message: *const u8,
    pub message_size: usize,
    pub response_handle: *const FlutterDesktopMessageResponseHandle,
}

/// Callback invoked for each message on a registered channel.
pub type FlutterDesktopMessageCallback = unsafe extern "C" fn(
    messenger: FlutterDesktopMessengerRef,
    message: *const FlutterDesktopMessage,
    user_data: *mut c_void,
);

/// Generic notification callback (used for the next-frame signal).
pub type VoidCallback = unsafe extern "C" fn(user_data: *mut c_void);
