use windows::core::{w, PCWSTR};

/// The Win32 window class name used to register and create the host window.
pub const WINDOW_CLASS_NAME: PCWSTR = w!("TELEPROMPTER_HOST_WINDOW");

/// Title text for the host window.
pub const WINDOW_TITLE: PCWSTR = w!("teleprompter");

/// Default origin (in logical pixels) when no placement has been persisted.
pub const DEFAULT_WINDOW_X: i32 = 10;
pub const DEFAULT_WINDOW_Y: i32 = 10;

/// Default size (in logical pixels) when no placement has been persisted.
pub const DEFAULT_WINDOW_WIDTH: i32 = 1280;
pub const DEFAULT_WINDOW_HEIGHT: i32 = 720;

/// Method channel the Dart side uses for OS-level window effects.
pub const WINDOW_CHANNEL: &str = "com.teleprompter/window";

/// Baseline DPI; Win32 reports logical sizes relative to this.
pub const BASE_DPI: f64 = 96.0;
