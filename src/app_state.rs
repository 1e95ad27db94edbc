//! Long-lived handles for the embedded Flutter view, stashed behind the host
//! window's `GWLP_USERDATA` slot.

use std::sync::Arc;

use crate::{
    dynamic_flutter_windows_dll_loader::FlutterDll,
    flutter_bindings::FlutterDesktopViewControllerRef,
};
use windows::Win32::Foundation::HWND;

/// Everything the window procedure needs to drive the engine.
#[derive(Debug)]
pub struct AppState {
    /// View controller managing the Flutter UI lifecycle. Owns the engine;
    /// destroying it tears both down.
    pub controller: FlutterDesktopViewControllerRef,
    /// Child window the engine renders into.
    pub child_hwnd: HWND,
    /// Resolved engine entry points.
    pub dll: Arc<FlutterDll>,
}
