use crate::config::AppConfig;
use anyhow::{anyhow, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration: defaults, then the TOML file, then `ZDTE_` env vars
    /// (nested keys split on `__`, e.g. `ZDTE_SCHWAB__ACCESS_TOKEN`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the result fails validation.
    pub fn load(path: &str) -> Result<AppConfig> {
        Self::extract(Self::figment(path))
    }

    /// Same as [`ConfigLoader::load`] with `Config.<profile>.toml` layered on top.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        let profile_path = match path.rsplit_once('.') {
            Some((stem, ext)) => format!("{stem}.{profile}.{ext}"),
            None => format!("{path}.{profile}"),
        };
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Toml::file(profile_path))
            .merge(Env::prefixed("ZDTE_").split("__"));
        Self::extract(figment)
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ZDTE_").split("__"))
    }

    fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment.extract()?;
        config.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }
}
