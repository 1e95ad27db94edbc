//! The `com.teleprompter/window` method channel.
//!
//! Dart invokes `setMousePassThrough(bool)` and `setWindowOpacity(double)`
//! here; everything else answers "not implemented" (a zero-length response).
//! Replies are sent synchronously from the messenger callback, on the
//! platform thread.

use std::{ffi::{c_void, CString}, slice, sync::Arc};

use anyhow::{ensure, Result};
use log::{debug, error, info, warn};
use windows::Win32::Foundation::HWND;

use crate::{
    constants,
    dynamic_flutter_windows_dll_loader::FlutterDll,
    flutter_bindings::{FlutterDesktopEngineRef, FlutterDesktopMessage, FlutterDesktopMessengerRef},
    standard_method_codec::{
        decode_method_call, encode_error_envelope, encode_success_envelope, EncodableValue,
        MethodCall,
    },
    window_effects,
};

struct ChannelState {
    hwnd: HWND,
    dll: Arc<FlutterDll>,
}

/// Registers the window channel on the engine's messenger. The channel state
/// is leaked: the callback stays registered as long as the engine lives.
pub fn register(dll: &Arc<FlutterDll>, engine: FlutterDesktopEngineRef, hwnd: HWND) -> Result<()> {
    let messenger = unsafe { (dll.FlutterDesktopEngineGetMessenger)(engine) };
    ensure!(!messenger.is_null(), "FlutterDesktopEngineGetMessenger failed");

    // The messenger copies the channel name into its dispatch table.
    let channel = CString::new(constants::WINDOW_CHANNEL)?;
    let state: &'static ChannelState = Box::leak(Box::new(ChannelState {
        hwnd,
        dll: dll.clone(),
    }));
    unsafe {
        (dll.FlutterDesktopMessengerSetCallback)(
            messenger,
            channel.as_ptr(),
            on_window_message,
            state as *const ChannelState as *mut c_void,
        );
    }
    info!("[Window Channel] Registered {}", constants::WINDOW_CHANNEL);
    Ok(())
}

unsafe extern "C" fn on_window_message(
    messenger: FlutterDesktopMessengerRef,
    message: *const FlutterDesktopMessage,
    user_data: *mut c_void,
) {
    unsafe {
        let state = match (user_data as *const ChannelState).as_ref() {
            Some(s) => s,
            None => return,
        };
        let message = match message.as_ref() {
            Some(m) => m,
            None => return,
        };

        let payload = if message.message.is_null() {
            &[][..]
        } else {
            slice::from_raw_parts(message.message, message.message_size)
        };

        let reply = handle_payload(state.hwnd, payload);

        // Fire-and-forget invocations carry no response handle.
        if !message.response_handle.is_null() {
            let (data, len) = match &reply {
                Some(bytes) => (bytes.as_ptr(), bytes.len()),
                None => (std::ptr::null(), 0),
            };
            (state.dll.FlutterDesktopMessengerSendResponse)(
                messenger,
                message.response_handle,
                data,
                len,
            );
        }
    }
}

/// Decodes, routes, and applies one inbound call. `None` means
/// "not implemented" (the empty response the Dart side maps to
/// `MissingPluginException`).
fn handle_payload(hwnd: HWND, payload: &[u8]) -> Option<Vec<u8>> {
    let call = match decode_method_call(payload) {
        Ok(call) => call,
        Err(e) => {
            error!("[Window Channel] Undecodable method call: {e:#}");
            return Some(encode_error_envelope(
                "MALFORMED_CALL",
                Some("Could not decode method call"),
                &EncodableValue::Null,
            ));
        }
    };

    match route(&call) {
        Routed::Apply(WindowCommand::SetMousePassThrough(enabled)) => {
            window_effects::set_mouse_pass_through(hwnd, enabled);
            Some(encode_success_envelope(&EncodableValue::Bool(true)))
        }
        Routed::Apply(WindowCommand::SetWindowOpacity(opacity)) => {
            window_effects::set_window_opacity(hwnd, opacity);
            Some(encode_success_envelope(&EncodableValue::Bool(true)))
        }
        Routed::BadArgument(msg) => {
            warn!("[Window Channel] {}: {msg}", call.method);
            Some(encode_error_envelope(
                "INVALID_ARGUMENT",
                Some(msg),
                &EncodableValue::Null,
            ))
        }
        Routed::NotImplemented => {
            debug!("[Window Channel] Unknown method {}", call.method);
            None
        }
    }
}

#[derive(Debug, PartialEq)]
enum WindowCommand {
    SetMousePassThrough(bool),
    SetWindowOpacity(f64),
}

#[derive(Debug, PartialEq)]
enum Routed {
    Apply(WindowCommand),
    BadArgument(&'static str),
    NotImplemented,
}

fn route(call: &MethodCall) -> Routed {
    match call.method.as_str() {
        "setMousePassThrough" => match call.args {
            EncodableValue::Bool(enabled) => {
                Routed::Apply(WindowCommand::SetMousePassThrough(enabled))
            }
            _ => Routed::BadArgument("Expected boolean argument"),
        },
        "setWindowOpacity" => match call.args {
            // Codec ints are not doubles; the check is deliberately strict.
            EncodableValue::F64(opacity) => {
                Routed::Apply(WindowCommand::SetWindowOpacity(opacity))
            }
            _ => Routed::BadArgument("Expected double argument"),
        },
        _ => Routed::NotImplemented,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard_method_codec::encode_method_call;

    fn call(method: &str, args: EncodableValue) -> MethodCall {
        MethodCall {
            method: method.to_string(),
            args,
        }
    }

    #[test]
    fn routes_pass_through_bool() {
        assert_eq!(
            route(&call("setMousePassThrough", EncodableValue::Bool(false))),
            Routed::Apply(WindowCommand::SetMousePassThrough(false))
        );
    }

    #[test]
    fn rejects_non_bool_pass_through_argument() {
        assert_eq!(
            route(&call("setMousePassThrough", EncodableValue::I32(1))),
            Routed::BadArgument("Expected boolean argument")
        );
        assert_eq!(
            route(&call("setMousePassThrough", EncodableValue::Null)),
            Routed::BadArgument("Expected boolean argument")
        );
    }

    #[test]
    fn routes_opacity_double() {
        assert_eq!(
            route(&call("setWindowOpacity", EncodableValue::F64(0.35))),
            Routed::Apply(WindowCommand::SetWindowOpacity(0.35))
        );
    }

    #[test]
    fn rejects_integer_opacity_argument() {
        // Dart `1` arrives as an int tag, not a double; the original host
        // rejected that and so does this one.
        assert_eq!(
            route(&call("setWindowOpacity", EncodableValue::I32(1))),
            Routed::BadArgument("Expected double argument")
        );
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        assert_eq!(
            route(&call("minimize", EncodableValue::Null)),
            Routed::NotImplemented
        );
    }

    #[test]
    fn unknown_method_yields_empty_reply() {
        let payload = encode_method_call("minimize", &EncodableValue::Null);
        assert_eq!(handle_payload(HWND(0), &payload), None);
    }

    #[test]
    fn malformed_payload_yields_error_envelope() {
        let reply = handle_payload(HWND(0), &[0xFF, 0xFF]).expect("reply");
        // Error envelopes start with 0x01.
        assert_eq!(reply[0], 1);
    }
}
