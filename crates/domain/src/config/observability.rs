use serde::{Deserialize, Serialize};

/// `[observability]`: where spans go besides the JSON log on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// OTLP/gRPC collector, e.g. `http://localhost:4317`. Unset or blank
    /// keeps export off.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    /// Fraction of traces exported.
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "linkbridge".into(),
            sample_rate: 1.0,
        }
    }
}

impl ObservabilityConfig {
    pub fn collector(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// `sample_rate` clamped to `0.0..=1.0`; NaN samples nothing.
    pub fn sample_ratio(&self) -> f64 {
        if self.sample_rate.is_nan() {
            0.0
        } else {
            self.sample_rate.clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_exports_nothing() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.collector(), None);
        assert_eq!(cfg.service_name, "linkbridge");
    }

    #[test]
    fn blank_endpoint_counts_as_unset() {
        let cfg: ObservabilityConfig = toml::from_str(r#"otlp_endpoint = "  ""#).unwrap();
        assert_eq!(cfg.collector(), None);

        let cfg: ObservabilityConfig =
            toml::from_str(r#"otlp_endpoint = "http://otel:4317""#).unwrap();
        assert_eq!(cfg.collector(), Some("http://otel:4317"));
    }

    #[test]
    fn sample_ratio_is_clamped() {
        let mut cfg = ObservabilityConfig {
            sample_rate: 3.0,
            ..ObservabilityConfig::default()
        };
        assert_eq!(cfg.sample_ratio(), 1.0);
        cfg.sample_rate = -1.0;
        assert_eq!(cfg.sample_ratio(), 0.0);
        cfg.sample_rate = 0.25;
        assert_eq!(cfg.sample_ratio(), 0.25);
    }
}
