//! Resolution of the Flutter content the engine boots from.
//!
//! A built app ships a `data/` directory beside the executable:
//! `flutter_assets/` and `icudtl.dat` are always present, `app.so` only in
//! AOT (release) builds. Paths are handed to the engine as null-terminated
//! UTF-16.

use std::path::Path;

use anyhow::{ensure, Result};
use log::debug;

use crate::win32_utils::to_wide;

/// Asset locations for [`FlutterDesktopEngineProperties`], pre-encoded for
/// the engine ABI. `aot_library` is empty when running in JIT mode.
pub struct FlutterPaths {
    pub assets: Vec<u16>,
    pub icu_data: Vec<u16>,
    pub aot_library: Option<Vec<u16>>,
}

/// Validates `root_dir/data` and encodes the engine paths.
pub fn resolve_flutter_paths(root_dir: &Path) -> Result<FlutterPaths> {
    let data_dir = root_dir.join("data");
    let assets_dir = data_dir.join("flutter_assets");
    let icu_file = data_dir.join("icudtl.dat");
    let aot_lib = data_dir.join("app.so");

    ensure!(
        assets_dir.is_dir(),
        "missing `flutter_assets` at `{}`",
        assets_dir.display()
    );
    ensure!(
        icu_file.is_file(),
        "missing `icudtl.dat` at `{}`",
        icu_file.display()
    );

    // JIT builds carry the kernel snapshot inside flutter_assets instead.
    let aot_library = if aot_lib.is_file() {
        Some(to_wide(aot_lib.to_string_lossy().as_ref()))
    } else {
        debug!("[Path Utils] No `app.so` at `{}`, assuming JIT", aot_lib.display());
        None
    };

    debug!(
        "[Path Utils] Resolved paths: assets=`{}`, icu=`{}`",
        assets_dir.display(),
        icu_file.display(),
    );

    Ok(FlutterPaths {
        assets: to_wide(assets_dir.to_string_lossy().as_ref()),
        icu_data: to_wide(icu_file.to_string_lossy().as_ref()),
        aot_library,
    })
}
