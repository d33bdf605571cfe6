/// Installs the global logger. `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("event=logger_already_installed");
    }
}
