//! Win32 plumbing for the host window: class registration, layered-window
//! creation, embedding the Flutter child HWND, and the message loop.
//!
//! Message routing: while the engine is alive, every top-level message is
//! offered first to the engine (so plugins see raw events) and then to the
//! view controller. Only messages both decline are handled natively:
//!
//! - **WM_FONTCHANGE**: ask the engine to reload system fonts.
//! - **WM_SIZE**: keep the Flutter child filling the client area.
//! - **WM_ACTIVATE** / **WM_SETFOCUS**: hand keyboard focus to the child.
//! - **WM_DPICHANGED**: apply the suggested DPI-aware bounds.
//! - **WM_DWMCOLORIZATIONCOLORCHANGED**: re-sync the titlebar theme.
//! - **WM_CLOSE**: persist the placement, then destroy the window.
//! - **WM_DESTROY**: destroy the view controller *before* the rest of the
//!   teardown, drop the host state, quit the loop.

use std::{ffi::c_void, ffi::OsStr, os::windows::ffi::OsStrExt, sync::Once};

use anyhow::{ensure, Result};
use log::{debug, info, warn};
use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{GetLastError, BOOL, COLORREF, ERROR_SUCCESS, HWND, LPARAM, LRESULT, RECT, WPARAM},
        Graphics::{
            Dwm::{DwmSetWindowAttribute, DWMWA_USE_IMMERSIVE_DARK_MODE},
            Gdi::HBRUSH,
        },
        System::{
            Console::{AttachConsole, ATTACH_PARENT_PROCESS},
            LibraryLoader::GetModuleHandleW,
            Registry::{RegGetValueW, HKEY_CURRENT_USER, RRF_RT_REG_DWORD},
        },
        UI::{
            HiDpi::{EnableNonClientDpiScaling, GetDpiForSystem},
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
                GetMessageW, GetWindowLongPtrW, LoadCursorW, MoveWindow, PostQuitMessage,
                RegisterClassW, SetForegroundWindow, SetLayeredWindowAttributes, SetParent,
                SetWindowLongPtrW, SetWindowPos, ShowWindow, TranslateMessage, CS_HREDRAW,
                CS_VREDRAW, GWLP_USERDATA, GWL_STYLE, HICON, HMENU, IDC_ARROW, LWA_ALPHA, MSG,
                SWP_ASYNCWINDOWPOS, SWP_NOACTIVATE, SWP_NOZORDER, SW_SHOWNORMAL,
                WM_ACTIVATE, WM_CLOSE, WM_DESTROY, WM_DPICHANGED,
                WM_DWMCOLORIZATIONCOLORCHANGED, WM_FONTCHANGE, WM_NCCREATE, WM_SETFOCUS, WM_SIZE,
                WNDCLASSW, WS_CHILD, WS_CLIPCHILDREN, WS_EX_LAYERED, WS_OVERLAPPEDWINDOW,
                WS_POPUP, WS_VISIBLE,
            },
        },
    },
};

use crate::{
    app_state::AppState,
    constants,
    flutter_bindings::{HWND as RawHWND, LRESULT as RawLRESULT},
    window_placement::{self, WindowPlacement},
};

#[link(name = "user32")]
unsafe extern "system" {
    /// Forward keyboard focus to a child HWND.
    fn SetFocus(hWnd: HWND) -> HWND;
}

/// Our window proc:
/// 1. `WM_NCCREATE` opts into non-client DPI scaling.
/// 2. Everything else is offered to the engine, then the view controller.
/// 3. Declined messages get the native handling listed in the module docs.
///
/// # Safety
/// Must be registered via `WNDCLASSW::lpfnWndProc`. `GWLP_USERDATA` is either
/// zero or a valid `*mut AppState` owned by this module.
pub unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        let state_ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut AppState;

        if msg == WM_NCCREATE {
            EnableNonClientDpiScaling(hwnd);
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }

        // Engine first, view second; native handling only for declined
        // messages.
        if let Some(state) = state_ptr.as_mut() {
            let engine = (state.dll.FlutterDesktopViewControllerGetEngine)(state.controller);
            let raw_hwnd = hwnd.0 as RawHWND;
            let mut raw_out: RawLRESULT = 0;
            if (state.dll.FlutterDesktopEngineProcessExternalWindowMessage)(
                engine,
                raw_hwnd,
                msg,
                wparam.0,
                lparam.0,
                &mut raw_out,
            ) {
                return LRESULT(raw_out);
            }
            if (state.dll.FlutterDesktopViewControllerHandleTopLevelWindowProc)(
                state.controller,
                raw_hwnd,
                msg,
                wparam.0,
                lparam.0,
                &mut raw_out,
            ) {
                return LRESULT(raw_out);
            }
        }

        match msg {
            WM_FONTCHANGE => {
                if let Some(state) = state_ptr.as_mut() {
                    debug!("[WndProc] WM_FONTCHANGE → reloading system fonts");
                    let engine =
                        (state.dll.FlutterDesktopViewControllerGetEngine)(state.controller);
                    (state.dll.FlutterDesktopEngineReloadSystemFonts)(engine);
                }
                LRESULT(0)
            }

            WM_SIZE => {
                if let Some(state) = state_ptr.as_mut() {
                    let mut rc = RECT::default();
                    if GetClientRect(hwnd, &mut rc).as_bool() {
                        let w = rc.right - rc.left;
                        let h = rc.bottom - rc.top;
                        MoveWindow(state.child_hwnd, 0, 0, w, h, true);
                    }
                }
                LRESULT(0)
            }

            WM_ACTIVATE | WM_SETFOCUS => {
                if let Some(state) = state_ptr.as_mut() {
                    SetFocus(state.child_hwnd);
                }
                LRESULT(0)
            }

            WM_DPICHANGED => {
                // lParam points at the suggested new bounds.
                let new_rc = lparam.0 as *const RECT;
                if let Some(r) = new_rc.as_ref() {
                    SetWindowPos(
                        hwnd,
                        HWND(0),
                        r.left,
                        r.top,
                        r.right - r.left,
                        r.bottom - r.top,
                        SWP_NOZORDER | SWP_NOACTIVATE | SWP_ASYNCWINDOWPOS,
                    );
                }
                LRESULT(0)
            }

            WM_DWMCOLORIZATIONCOLORCHANGED => {
                sync_titlebar_theme(hwnd);
                LRESULT(0)
            }

            WM_CLOSE => {
                info!("[WndProc] WM_CLOSE → DestroyWindow");
                if let Some(placement) = window_placement::capture(hwnd) {
                    window_placement::save(&placement);
                }
                DestroyWindow(hwnd);
                LRESULT(0)
            }

            WM_DESTROY => {
                info!("[WndProc] WM_DESTROY");
                if !state_ptr.is_null() {
                    let state = Box::from_raw(state_ptr);
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                    // The controller owns the engine; it must go before the
                    // rest of the window teardown runs.
                    (state.dll.FlutterDesktopViewControllerDestroy)(state.controller);
                    debug!("[WndProc] View controller destroyed");
                }
                PostQuitMessage(0);
                LRESULT(0)
            }

            other => DefWindowProcW(hwnd, other, wparam, lparam),
        }
    }
}

static REGISTER_CLASS_ONCE: Once = Once::new();

/// Registers the host window class (once). Must precede
/// [`create_host_window`].
///
/// # Panics
/// Panics if `RegisterClassW` fails; nothing can run without a class.
pub fn register_window_class() {
    REGISTER_CLASS_ONCE.call_once(|| unsafe {
        let hinst = GetModuleHandleW(None).expect("GetModuleHandleW failed");
        let wc = WNDCLASSW {
            hInstance: hinst.into(),
            lpszClassName: constants::WINDOW_CLASS_NAME,
            lpfnWndProc: Some(wnd_proc),
            style: CS_HREDRAW | CS_VREDRAW,
            hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
            hbrBackground: HBRUSH::default(),
            lpszMenuName: PCWSTR::null(),
            hIcon: HICON::default(),
            cbClsExtra: 0,
            cbWndExtra: 0,
        };
        if RegisterClassW(&wc) == 0 {
            panic!("[Win32 Utils] RegisterClassW failed: {:?}", GetLastError());
        }
        info!("[Win32 Utils] Window class registered");
    });
}

/// Creates the host window: `WS_EX_LAYERED` from the start (both window
/// effects require it), hidden until the engine reports its first frame,
/// placed at the persisted geometry scaled to the system DPI.
pub fn create_host_window(placement: &WindowPlacement) -> Result<HWND> {
    let scale = unsafe { GetDpiForSystem() } as f64 / constants::BASE_DPI;
    let scaled = |v: i32| (v as f64 * scale).round() as i32;

    let hwnd = unsafe {
        CreateWindowExW(
            WS_EX_LAYERED,
            constants::WINDOW_CLASS_NAME,
            constants::WINDOW_TITLE,
            WS_OVERLAPPEDWINDOW | WS_CLIPCHILDREN,
            scaled(placement.x),
            scaled(placement.y),
            scaled(placement.width),
            scaled(placement.height),
            None,
            HMENU::default(),
            GetModuleHandleW(None)?,
            None,
        )
    };
    ensure!(hwnd.0 != 0, "CreateWindowExW failed: {:?}", unsafe {
        GetLastError()
    });

    // A layered window composites nothing until it has an alpha.
    unsafe {
        SetLayeredWindowAttributes(hwnd, COLORREF(0), 255, LWA_ALPHA);
    }
    sync_titlebar_theme(hwnd);

    info!("[Win32 Utils] Host window created: {hwnd:?}");
    Ok(hwnd)
}

/// Measures the window's client area.
pub fn client_size(hwnd: HWND) -> Result<(i32, i32)> {
    let mut rc = RECT::default();
    ensure!(
        unsafe { GetClientRect(hwnd, &mut rc) }.as_bool(),
        "GetClientRect failed: {:?}",
        unsafe { GetLastError() }
    );
    Ok((rc.right - rc.left, rc.bottom - rc.top))
}

/// Stores the host state in the window's user-data slot. Ownership moves to
/// the window; `wnd_proc` reclaims it on `WM_DESTROY`.
pub fn attach_app_state(hwnd: HWND, state: Box<AppState>) {
    let ptr = Box::into_raw(state);
    unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, ptr as isize) };
}

/// Embeds the Flutter `child` into `parent`: strips the popup styling the
/// engine creates the view with, re-parents, and fills the client area.
pub fn set_flutter_window_as_child(parent: HWND, child: HWND) {
    info!("[Win32 Utils] Embedding Flutter HWND {child:?} into {parent:?}");

    let old = unsafe { GetWindowLongPtrW(child, GWL_STYLE) };
    let new = (old & !(WS_POPUP.0 as isize | WS_OVERLAPPEDWINDOW.0 as isize))
        | WS_CHILD.0 as isize
        | WS_VISIBLE.0 as isize;
    unsafe { SetWindowLongPtrW(child, GWL_STYLE, new) };
    debug!("[Win32 Utils] Child style {old:#x} → {new:#x}");

    let prev = unsafe { SetParent(child, parent) };
    let err = unsafe { GetLastError() };
    if err.0 != 0 {
        warn!("[Win32 Utils] SetParent error: {err:?}");
    } else if prev.0 != 0 {
        debug!("[Win32 Utils] Child was previously under {prev:?}");
    }

    let mut rc = RECT::default();
    if unsafe { GetClientRect(parent, &mut rc) }.as_bool() {
        unsafe { MoveWindow(child, 0, 0, rc.right - rc.left, rc.bottom - rc.top, true) };
    }
}

/// First-frame callback target: the engine has content, so the window may
/// become visible.
pub unsafe extern "C" fn show_host_window(user_data: *mut c_void) {
    let hwnd = HWND(user_data as isize);
    unsafe {
        ShowWindow(hwnd, SW_SHOWNORMAL);
        SetForegroundWindow(hwnd);
    }
    info!("[Win32 Utils] First frame ready, window shown");
}

/// Runs the message loop until `WM_QUIT`, then drops any leftover state.
pub fn run_message_loop(parent: HWND) {
    info!("[Win32 Utils] Entering message loop");
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, HWND(0), 0, 0).as_bool() {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    info!("[Win32 Utils] Exited message loop");

    let ptr = unsafe { GetWindowLongPtrW(parent, GWLP_USERDATA) as *mut AppState };
    if !ptr.is_null() {
        debug!("[Win32 Utils] Cleaning up AppState after loop");
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

/// Matches the titlebar to the user's app theme, at creation and whenever the
/// DWM colorization changes.
pub fn sync_titlebar_theme(hwnd: HWND) {
    let dark = BOOL(!apps_use_light_theme() as i32);
    let _ = unsafe {
        DwmSetWindowAttribute(
            hwnd,
            DWMWA_USE_IMMERSIVE_DARK_MODE,
            &dark as *const BOOL as *const c_void,
            std::mem::size_of::<BOOL>() as u32,
        )
    };
}

fn apps_use_light_theme() -> bool {
    let mut value: u32 = 0;
    let mut size = std::mem::size_of::<u32>() as u32;
    let status = unsafe {
        RegGetValueW(
            HKEY_CURRENT_USER,
            w!("Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize"),
            w!("AppsUseLightTheme"),
            RRF_RT_REG_DWORD,
            None,
            Some(&mut value as *mut u32 as *mut c_void),
            Some(&mut size),
        )
    };
    if status == ERROR_SUCCESS {
        value != 0
    } else {
        // No key means the light theme default.
        true
    }
}

/// Attaches to the parent process console so logs appear when launched from a
/// shell; harmless no-op otherwise.
pub fn attach_parent_console() {
    unsafe {
        let _ = AttachConsole(ATTACH_PARENT_PROCESS);
    }
}

/// Build a null-terminated UTF-16 string for Win32 APIs.
pub fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}
