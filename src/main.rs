mod app;

fn main() -> eframe::Result<()> {
    let settings_path = app::settings::config_path();
    let settings = app::settings::load_settings(&settings_path)
        .or_else(|| app::settings::load_settings("settings.json"))
        .unwrap_or_default();
    planmark::logging::init(&settings.log_level);
    log::info!("event=startup settings={settings_path} project={}", settings.project_id);

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "planmark",
        native_options,
        Box::new(|cc| Ok(Box::new(app::BlueprintApp::new(cc, settings_path, settings)))),
    )
}
