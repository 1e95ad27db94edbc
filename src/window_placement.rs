//! Persistence of the host window's geometry.
//!
//! Stored as JSON in `%APPDATA%/teleprompter/window.json`, in logical pixels
//! so a DPI change between sessions does not shrink or grow the window.

use std::{fs, path::PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use windows::Win32::{
    Foundation::{HWND, RECT},
    UI::{HiDpi::GetDpiForWindow, WindowsAndMessaging::GetWindowRect},
};

use crate::constants;

/// Window geometry in logical pixels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WindowPlacement {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for WindowPlacement {
    fn default() -> Self {
        Self {
            x: constants::DEFAULT_WINDOW_X,
            y: constants::DEFAULT_WINDOW_Y,
            width: constants::DEFAULT_WINDOW_WIDTH,
            height: constants::DEFAULT_WINDOW_HEIGHT,
        }
    }
}

/// `%APPDATA%/teleprompter/window.json`
fn placement_path() -> PathBuf {
    let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(appdata).join("teleprompter").join("window.json")
}

/// Loads the persisted placement, falling back to defaults when the file is
/// missing or unreadable.
pub fn load() -> WindowPlacement {
    let path = placement_path();
    match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => WindowPlacement::default(),
    }
}

/// Persists `placement`, creating the directory if needed.
pub fn save(placement: &WindowPlacement) {
    let path = placement_path();
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("[Placement] Could not create {}: {e}", parent.display());
            return;
        }
    }
    match serde_json::to_string_pretty(placement) {
        Ok(json) => {
            if let Err(e) = fs::write(&path, json) {
                warn!("[Placement] Could not write {}: {e}", path.display());
            } else {
                debug!("[Placement] Saved {placement:?}");
            }
        }
        Err(e) => warn!("[Placement] Could not serialize placement: {e}"),
    }
}

/// Reads the window's current geometry back into logical pixels.
pub fn capture(hwnd: HWND) -> Option<WindowPlacement> {
    let mut rect = RECT::default();
    if !unsafe { GetWindowRect(hwnd, &mut rect) }.as_bool() {
        return None;
    }
    let scale = unsafe { GetDpiForWindow(hwnd) } as f64 / constants::BASE_DPI;
    if scale <= 0.0 {
        return None;
    }
    let unscale = |v: i32| (v as f64 / scale).round() as i32;
    Some(WindowPlacement {
        x: unscale(rect.left),
        y: unscale(rect.top),
        width: unscale(rect.right - rect.left),
        height: unscale(rect.bottom - rect.top),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_original_runner_geometry() {
        let p = WindowPlacement::default();
        assert_eq!((p.x, p.y), (10, 10));
        assert_eq!((p.width, p.height), (1280, 720));
    }

    #[test]
    fn json_roundtrip_preserves_geometry() {
        let p = WindowPlacement {
            x: -8,
            y: 200,
            width: 960,
            height: 540,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(serde_json::from_str::<WindowPlacement>(&json).unwrap(), p);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let p: WindowPlacement = serde_json::from_str(r#"{"width": 800}"#).unwrap();
        assert_eq!(p.width, 800);
        assert_eq!(p.height, 720);
        assert_eq!((p.x, p.y), (10, 10));
    }
}
