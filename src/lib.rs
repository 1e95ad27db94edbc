//! Native Windows host for the teleprompter Flutter app.
//!
//! - Initializes COM (STA) for Flutter plugins and Win32 operations
//! - Creates a layered Win32 host window and embeds the Flutter view in it
//! - Loads and registers plugin DLLs found beside the executable
//! - Bridges OS window effects to Dart over `com.teleprompter/window`
//! - Shows the window once the engine has rendered its first frame

mod app_state;
mod constants;
mod dynamic_flutter_windows_dll_loader;
mod flutter_bindings;
mod flutter_utils;
mod path_utils;
mod plugin_loader;
mod standard_method_codec;
mod win32_utils;
mod window_channel;
mod window_effects;
mod window_placement;

use std::{ffi::c_void, sync::Once};

use anyhow::Result;
use app_state::AppState;
use dynamic_flutter_windows_dll_loader::FlutterDll;
use env_logger::{Builder, Env};
use log::{error, info, LevelFilter};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};

/// Program entry point.
///
/// 1. Attach to the launching console and initialize logging + COM.
/// 2. Create the (hidden) layered host window at the persisted placement.
/// 3. Boot the engine with a view sized to the window's client area.
/// 4. Register plugins and the window-effects channel.
/// 5. Show on first frame, run the message loop, uninitialize COM.
pub fn run() {
    win32_utils::attach_parent_console();
    init_logging();

    unsafe {
        if let Err(e) = CoInitializeEx(None, COINIT_APARTMENTTHREADED) {
            error!("COM init failed (STA): {e:?}");
            std::process::exit(1);
        }
    }
    info!("COM initialized (STA)");

    if let Err(e) = host_main() {
        error!("Startup failed: {e:#}");
        unsafe { CoUninitialize() };
        std::process::exit(1);
    }

    unsafe { CoUninitialize() };
    info!("Application exiting");
}

fn host_main() -> Result<()> {
    let exe_dir = dynamic_flutter_windows_dll_loader::exe_directory()?;
    let dll = FlutterDll::get_for(None)?;
    info!("flutter_windows.dll loaded");

    let placement = window_placement::load();
    win32_utils::register_window_class();
    let hwnd = win32_utils::create_host_window(&placement)?;

    // The view must match the initial client area exactly, or the surface is
    // recreated on the first resize and the window flashes.
    let (width, height) = win32_utils::client_size(hwnd)?;
    let dart_args: Vec<String> = std::env::args().skip(1).collect();
    let engine = flutter_utils::create_flutter_engine(&dll, &exe_dir, &dart_args)?;
    let controller = flutter_utils::create_flutter_view_controller(&dll, engine, width, height)?;
    let (_view, child_hwnd) = flutter_utils::get_flutter_view_and_hwnd(&dll, controller)?;

    plugin_loader::load_and_register_plugins(&exe_dir, &dll, engine)?;

    win32_utils::set_flutter_window_as_child(hwnd, child_hwnd);
    win32_utils::attach_app_state(
        hwnd,
        Box::new(AppState {
            controller,
            child_hwnd,
            dll: dll.clone(),
        }),
    );

    window_channel::register(&dll, engine, hwnd)?;

    // Show only after the first rendered frame. The forced redraw covers the
    // race where the frame completed before this callback was registered.
    unsafe {
        (dll.FlutterDesktopEngineSetNextFrameCallback)(
            engine,
            win32_utils::show_host_window,
            hwnd.0 as *mut c_void,
        );
        (dll.FlutterDesktopViewControllerForceRedraw)(controller);
    }

    win32_utils::run_message_loop(hwnd);
    Ok(())
}

// Re-running `init` after an earlier host instance in the same process would
// panic, so the logger is initialized exactly once.
static LOGGER_INIT: Once = Once::new();

fn init_logging() {
    LOGGER_INIT.call_once(|| {
        Builder::from_env(Env::default().default_filter_or("debug"))
            .filter(None, LevelFilter::Debug)
            .filter_module("goblin", LevelFilter::Off)
            .init();
    });
}
