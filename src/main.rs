#![cfg_attr(all(target_os = "windows", not(debug_assertions)), windows_subsystem = "windows")]

mod backend;
mod clipboard;
mod config;
mod documents;
mod error;
mod languages;
mod logger;
mod runner;
mod state;
mod ui;
mod worker;

fn main() -> anyhow::Result<()> {
    // Init logger first
    logger::init();
    logger::install_panic_hook();
    log::info!("Translator Pro {} starting", env!("CARGO_PKG_VERSION"));

    let cfg = config::Config::load();
    log::info!(
        "Config loaded from {} (backend: {}, {} -> {})",
        config::Config::path().display(),
        cfg.backend,
        cfg.source_lang,
        cfg.target_lang
    );
    if cfg.backend.needs_api_key() && cfg.api_key().is_none() {
        log::warn!("DeepL selected but no API key configured");
    }

    // Run UI on main thread (blocks)
    ui::run(cfg)
}
