//! Discovery and registration of Flutter plugin DLLs.
//!
//! Built apps drop each plugin's DLL beside the executable. A plugin DLL is
//! recognized by its PE export table: it exports one or more
//! `<Plugin>RegisterWithRegistrar` functions. Each registrant is invoked with
//! the engine's registrar for that plugin, and the library is kept loaded for
//! the life of the process.

use anyhow::{Context, Result};
use goblin::Object;
use libloading::{Library, Symbol};
use log::{debug, info};
use std::{
    ffi::CString,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    dynamic_flutter_windows_dll_loader::FlutterDll,
    flutter_bindings::{FlutterDesktopEngineRef, FlutterDesktopPluginRegistrarRef},
};

const REG_SUFFIX: &str = "RegisterWithRegistrar";

/// Scans `release_dir` for DLLs exporting `*RegisterWithRegistrar`.
fn discover_plugins(release_dir: &Path) -> Result<Vec<(PathBuf, Vec<String>)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(release_dir)
        .with_context(|| format!("reading directory {}", release_dir.display()))?
    {
        let dll = entry?.path();
        let is_dll = dll
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("dll"));
        if !is_dll {
            continue;
        }
        // The engine itself exports no registrants, so it never matches.
        let data = fs::read(&dll).with_context(|| format!("reading {}", dll.display()))?;
        if let Object::PE(pe) = Object::parse(&data)? {
            let syms: Vec<String> = pe
                .exports
                .iter()
                .filter_map(|e| e.name)
                .filter(|n| n.ends_with(REG_SUFFIX))
                .map(|s| s.to_string())
                .collect();
            if !syms.is_empty() {
                out.push((dll, syms));
            }
        }
    }
    Ok(out)
}

/// Loads one DLL and invokes each registrant symbol.
fn load_and_register(
    dll: &Path,
    symbols: &[String],
    registrar: FlutterDesktopPluginRegistrarRef,
) -> Result<()> {
    let lib = unsafe { Library::new(dll) }.with_context(|| format!("loading {}", dll.display()))?;
    for sym in symbols {
        let cname = CString::new(sym.as_str()).context("registrant symbol contains NUL")?;
        let func: Symbol<unsafe extern "C" fn(FlutterDesktopPluginRegistrarRef)> = unsafe {
            lib.get(cname.as_bytes_with_nul())
                .with_context(|| format!("symbol {sym}"))?
        };
        debug!("[Plugin Loader] {} → {sym}", dll.display());
        unsafe { func(registrar) };
    }
    // Plugins must stay resident as long as the engine runs.
    std::mem::forget(lib);
    Ok(())
}

/// Discovers every plugin DLL in `release_dir` and registers it with the
/// engine. The Dart side assumes its plugins exist, so any failure aborts
/// startup.
pub fn load_and_register_plugins(
    release_dir: &Path,
    dll: &FlutterDll,
    engine: FlutterDesktopEngineRef,
) -> Result<()> {
    let plugins = discover_plugins(release_dir)
        .with_context(|| format!("discovering plugins in {}", release_dir.display()))?;
    for (dll_path, symbols) in plugins {
        let plugin_name = dll_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let c_name = CString::new(plugin_name)?;
        let registrar =
            unsafe { (dll.FlutterDesktopEngineGetPluginRegistrar)(engine, c_name.as_ptr()) };
        load_and_register(&dll_path, &symbols, registrar)?;
        info!("[Plugin Loader] Registered {plugin_name}");
    }
    Ok(())
}
