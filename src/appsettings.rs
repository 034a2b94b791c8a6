use std::sync::OnceLock;

use config::{Config, ConfigError, Environment, File};

use metronom_models::settings::Settings;

fn load() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name("appsettings").required(true))
        .add_source(File::with_name("appsettings.local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    settings.try_deserialize()
}

pub fn get() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| load().expect("Settings should be present and well-formed."))
}
