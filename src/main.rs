// Keep for Release - the host attaches to the parent console for logs instead.
#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

fn main() {
    teleprompter_host::run();
}
