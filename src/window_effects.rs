//! The two OS-level effects exposed to Dart: click-through transparency and
//! whole-window opacity. Both rely on `WS_EX_LAYERED`, which the host window
//! carries from creation.

use log::debug;
use windows::Win32::{
    Foundation::{COLORREF, HWND},
    UI::WindowsAndMessaging::{
        GetWindowLongPtrW, SetLayeredWindowAttributes, SetWindowLongPtrW, SetWindowPos,
        GWL_EXSTYLE, LWA_ALPHA, SWP_FRAMECHANGED, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
        WS_EX_TRANSPARENT,
    },
};

/// Adds or removes `WS_EX_TRANSPARENT` so input lands on whatever is beneath
/// the window, then forces a frame-change update without moving, sizing, or
/// reordering it.
pub fn set_mouse_pass_through(hwnd: HWND, enabled: bool) {
    if hwnd.0 == 0 {
        return;
    }
    unsafe {
        let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
        let ex_style = if enabled {
            ex_style | WS_EX_TRANSPARENT.0 as isize
        } else {
            ex_style & !(WS_EX_TRANSPARENT.0 as isize)
        };
        SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style);
        SetWindowPos(
            hwnd,
            HWND(0),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_FRAMECHANGED,
        );
    }
    debug!("[Window Effects] mouse pass-through = {enabled}");
}

/// Applies a whole-window alpha via the layered-window attribute.
pub fn set_window_opacity(hwnd: HWND, opacity: f64) {
    if hwnd.0 == 0 {
        return;
    }
    let alpha = opacity_to_alpha(opacity);
    unsafe {
        SetLayeredWindowAttributes(hwnd, COLORREF(0), alpha, LWA_ALPHA);
    }
    debug!("[Window Effects] opacity = {opacity} (alpha {alpha})");
}

/// Maps an opacity in `[0.0, 1.0]` (clamped) to an 8-bit alpha.
pub fn opacity_to_alpha(opacity: f64) -> u8 {
    (255.0 * opacity.clamp(0.0, 1.0)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::opacity_to_alpha;

    #[test]
    fn full_range_maps_to_alpha_extremes() {
        assert_eq!(opacity_to_alpha(0.0), 0);
        assert_eq!(opacity_to_alpha(1.0), 255);
    }

    #[test]
    fn midpoint_rounds_up() {
        assert_eq!(opacity_to_alpha(0.5), 128);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(opacity_to_alpha(-0.25), 0);
        assert_eq!(opacity_to_alpha(1.75), 255);
        assert_eq!(opacity_to_alpha(f64::NAN), 0);
    }
}
