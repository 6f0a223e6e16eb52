use tracing_subscriber::EnvFilter;

fn main() -> Result<(), dolphin_gui::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting dolphin");
    dolphin_gui::run()
}
