use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::enhancement::VisionModel;
use crate::error::AppError;

const DEFAULT_CONFIG_NAME: &str = "solar-rooftop";
const ENV_PREFIX: &str = "SOLAR";
const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Runtime settings, layered from an optional config file and `SOLAR_*` env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enhancement: EnhancementSettings,
    pub sizing: SizingSettings,
    pub finance: FinanceSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnhancementSettings {
    pub enabled: bool,
    pub model: VisionModel,
    pub timeout_ms: u64,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub referer: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizingSettings {
    /// Upper bound the caller places on the recommended system, in kW.
    pub max_system_kw: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinanceSettings {
    pub panel_wattage: f64,
    /// INR per installed watt.
    pub cost_per_watt: f64,
    pub tax_credit: f64,
    pub sun_hours: f64,
    pub performance_ratio: f64,
    /// INR per kWh.
    pub electricity_rate: f64,
    pub lifetime_years: i64,
    /// Tonnes of CO2 offset per kWh produced.
    pub co2_per_kwh: f64,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: VisionModel::default(),
            timeout_ms: 30_000,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            max_tokens: 300,
            referer: "http://localhost:8501".to_string(),
            title: "Solar Analyzer".to_string(),
        }
    }
}

impl EnhancementSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SizingSettings {
    fn default() -> Self {
        Self {
            max_system_kw: 15.0,
        }
    }
}

impl Default for FinanceSettings {
    fn default() -> Self {
        Self {
            panel_wattage: 400.0,
            cost_per_watt: 200.0,
            tax_credit: 0.30,
            sun_hours: 1800.0,
            performance_ratio: 0.8,
            electricity_rate: 8.0,
            lifetime_years: 25,
            co2_per_kwh: 0.0004,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `solar-rooftop.*` in the working directory
    /// when present), then apply `SOLAR_` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let builder = Config::builder();
        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let mut settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if settings.enhancement.api_key.is_none() {
            settings.enhancement.api_key = std::env::var(API_KEY_VAR)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        settings.validate().map_err(AppError::InvalidConfig)?;
        Ok(settings)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(1.0..=20.0).contains(&self.sizing.max_system_kw) {
            return Err("Max system size must be between 1 and 20 kW".to_string());
        }

        if self.enhancement.timeout_ms == 0 {
            return Err("Enhancement timeout must be greater than 0".to_string());
        }

        if self.finance.panel_wattage <= 0.0 {
            return Err("Panel wattage must be greater than 0".to_string());
        }

        if !(0.0..1.0).contains(&self.finance.tax_credit) {
            return Err("Tax credit must be in [0.0, 1.0)".to_string());
        }

        if self.finance.lifetime_years <= 0 {
            return Err("Lifetime must be at least one year".to_string());
        }

        Ok(())
    }

    /// Set the sizing cap, clamped to the supported range.
    pub fn with_max_system_kw(mut self, max_system_kw: f64) -> Self {
        self.sizing.max_system_kw = max_system_kw.clamp(1.0, 20.0);
        self
    }

    pub fn with_model(mut self, model: VisionModel) -> Self {
        self.enhancement.model = model;
        self
    }

    pub fn without_enhancement(mut self) -> Self {
        self.enhancement.enabled = false;
        self
    }
}
