use rust_decimal::Decimal;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    AdvisorSettings, ClusteringSettings, ComplianceLimits, FeatureSettings, ForecastSettings,
    MetricsSettings, RuleScores, RuleToggles, Settings, WindowSettings,
};

/// Loads the analytics configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file, deserializes it into our strongly-typed `Settings`
/// struct, and validates it. Invalid configuration is rejected here, before
/// any computation runs against it.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from("config.toml")
}

/// Loads configuration from an explicit path (used by tests and the CLI's
/// `--config` flag).
pub fn load_settings_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        // Environment variables win over the file, e.g. EDGEWISE__CLUSTERING__SEED=7
        .add_source(config::Environment::with_prefix("EDGEWISE").separator("__"))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    validate(&settings)?;

    Ok(settings)
}

/// Rejects configuration values that would make downstream computation
/// meaningless. Every engine may assume a validated `Settings`.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let f = &settings.features;
    if f.low_vol_threshold <= Decimal::ZERO || f.high_vol_threshold <= f.low_vol_threshold {
        return Err(ConfigError::ValidationError(
            "volatility thresholds must satisfy 0 < low < high".to_string(),
        ));
    }

    if let settings::WindowSettings::Count { trades } = settings.metrics.window {
        if trades == 0 {
            return Err(ConfigError::ValidationError(
                "metrics.window.trades must be greater than 0".to_string(),
            ));
        }
    }
    if let settings::WindowSettings::Days { days } = settings.metrics.window {
        if days <= 0 {
            return Err(ConfigError::ValidationError(
                "metrics.window.days must be greater than 0".to_string(),
            ));
        }
    }

    let l = &settings.metrics.limits;
    if l.max_daily_loss <= Decimal::ZERO
        || l.max_drawdown <= Decimal::ZERO
        || l.max_position_size <= Decimal::ZERO
    {
        return Err(ConfigError::ValidationError(
            "compliance limits must be positive magnitudes".to_string(),
        ));
    }

    let c = &settings.clustering;
    if c.max_clusters == 0 {
        return Err(ConfigError::ValidationError(
            "clustering.max_clusters must be at least 1".to_string(),
        ));
    }
    if c.min_members == 0 {
        return Err(ConfigError::ValidationError(
            "clustering.min_members must be at least 1".to_string(),
        ));
    }
    if c.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "clustering.max_iterations must be at least 1".to_string(),
        ));
    }

    let fc = &settings.forecast;
    if fc.half_life_days <= 0.0 {
        return Err(ConfigError::ValidationError(
            "forecast.half_life_days must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&fc.low_confidence_ceiling) {
        return Err(ConfigError::ValidationError(
            "forecast.low_confidence_ceiling must lie in [0, 1]".to_string(),
        ));
    }

    let a = &settings.advisor;
    if !(0.0..=1.0).contains(&a.low_win_probability)
        || !(0.0..=1.0).contains(&a.strong_win_probability)
        || !(0.0..=1.0).contains(&a.high_confidence)
    {
        return Err(ConfigError::ValidationError(
            "advisor probability thresholds must lie in [0, 1]".to_string(),
        ));
    }
    if a.low_win_probability >= a.strong_win_probability {
        return Err(ConfigError::ValidationError(
            "advisor.low_win_probability must be below strong_win_probability".to_string(),
        ));
    }
    if a.pause_after_losses <= 0 {
        return Err(ConfigError::ValidationError(
            "advisor.pause_after_losses must be positive".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_settings_validate() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn zero_count_window_is_rejected() {
        let mut s = Settings::default();
        s.metrics.window = settings::WindowSettings::Count { trades: 0 };
        assert!(matches!(
            validate(&s),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn inverted_volatility_thresholds_are_rejected() {
        let mut s = Settings::default();
        s.features.low_vol_threshold = dec!(0.01);
        s.features.high_vol_threshold = dec!(0.001);
        assert!(validate(&s).is_err());
    }

    #[test]
    fn confidence_ceiling_outside_unit_interval_is_rejected() {
        let mut s = Settings::default();
        s.forecast.low_confidence_ceiling = 1.5;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn zero_min_members_is_rejected() {
        let mut s = Settings::default();
        s.clustering.min_members = 0;
        assert!(validate(&s).is_err());
    }
}
