fn main() {
    // Only compile Windows resources on Windows targets
    #[cfg(target_os = "windows")]
    {
        // Embeds the app manifest (PerMonitorV2 DPI awareness)
        let _ = embed_resource::compile("resources/windows/runner.rc", embed_resource::NONE);
    }
}
