/// Initialize `env_logger`. `RUST_LOG` wins, otherwise `MANGAHA_LOG=<level>`
/// sets the level of the mangaha crates only.
pub fn init() {
    let mut builder = env_logger::Builder::from_default_env();

    if std::env::var("RUST_LOG").is_err() {
        if let Ok(level) = std::env::var("MANGAHA_LOG") {
            builder.parse_filters(&filters(&level));
        }
    }

    builder.init();
}

fn filters(level: &str) -> String {
    format!("mangaha={level},mangaha_source={level},mangaha_cli={level}")
}
