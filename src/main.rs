use inventory_desk::app::App;
use inventory_desk::config::settings::{webview_data_dir, AppSettings};
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &AppSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let settings = AppSettings::load();
    init_tracing(settings.as_ref().unwrap_or(&AppSettings::default()));
    if let Err(err) = &settings {
        tracing::warn!("failed to load settings: {err:#}");
    }

    let mut config = dioxus::desktop::Config::new()
        .with_window(dioxus::desktop::WindowBuilder::new().with_title("Inventory"));
    match webview_data_dir() {
        Ok(dir) => config = config.with_data_directory(dir),
        Err(err) => tracing::warn!("using the default webview directory: {err:#}"),
    }

    tracing::info!("starting inventory desk");
    dioxus::LaunchBuilder::desktop().with_cfg(config).launch(App);
}
