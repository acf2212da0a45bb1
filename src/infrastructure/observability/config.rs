//! Observability configuration

use opentelemetry_sdk::trace::Sampler;
use serde::Deserialize;

use crate::domain::DomainError;

/// Route prefixes owned by the gateway; the metrics endpoint may not shadow them
const RESERVED_PREFIXES: &[&str] = &["/blacklist", "/admin", "/health", "/live", "/ready"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// OpenTelemetry span export
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    /// OTLP gRPC endpoint
    pub otlp_endpoint: String,
    pub service_name: String,
    /// Fraction of traces exported, clamped to [0, 1]
    pub sampling_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "blacklist-gateway".to_string(),
            sampling_ratio: 1.0,
        }
    }
}

impl TracingConfig {
    pub fn sampler(&self) -> Sampler {
        match self.sampling_ratio {
            ratio if ratio >= 1.0 => Sampler::AlwaysOn,
            ratio if ratio > 0.0 => Sampler::TraceIdRatioBased(ratio),
            // zero, negative and NaN
            _ => Sampler::AlwaysOff,
        }
    }
}

/// Prometheus exposition
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
    /// Histogram buckets in seconds for `http_request_duration_seconds`
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
            latency_buckets: vec![
                0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 3.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Reject paths that would collide with gateway routes and unusable buckets
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.enabled {
            return Ok(());
        }

        if !self.path.starts_with('/') || self.path.len() < 2 {
            return Err(DomainError::configuration(format!(
                "observability.metrics.path must be an absolute path, got '{}'",
                self.path
            )));
        }

        let shadowed = RESERVED_PREFIXES.iter().find(|prefix| {
            self.path == **prefix || self.path.starts_with(&format!("{}/", prefix))
        });
        if let Some(prefix) = shadowed {
            return Err(DomainError::configuration(format!(
                "observability.metrics.path '{}' collides with the {} routes",
                self.path, prefix
            )));
        }

        let ascending = self.latency_buckets.windows(2).all(|w| w[0] < w[1]);
        let positive = self.latency_buckets.iter().all(|b| *b > 0.0);
        if self.latency_buckets.is_empty() || !ascending || !positive {
            return Err(DomainError::configuration(
                "observability.metrics.latency_buckets must be positive and strictly ascending",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_clamps_ratio() {
        let mut config = TracingConfig::default();
        assert!(matches!(config.sampler(), Sampler::AlwaysOn));

        config.sampling_ratio = 7.0;
        assert!(matches!(config.sampler(), Sampler::AlwaysOn));

        config.sampling_ratio = 0.25;
        assert!(matches!(config.sampler(), Sampler::TraceIdRatioBased(r) if r == 0.25));

        config.sampling_ratio = f64::NAN;
        assert!(matches!(config.sampler(), Sampler::AlwaysOff));
    }

    #[test]
    fn test_metrics_path_may_not_shadow_gateway_routes() {
        for path in ["/health", "/admin/metrics", "/blacklist", "/ready"] {
            let config = MetricsConfig {
                path: path.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{} should be rejected", path);
        }

        let config = MetricsConfig {
            path: "/healthz-metrics".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(MetricsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_metrics_path_must_be_absolute() {
        let config = MetricsConfig {
            path: "metrics".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_latency_buckets_must_ascend() {
        let config = MetricsConfig {
            latency_buckets: vec![0.1, 0.05],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MetricsConfig {
            latency_buckets: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_metrics_skip_validation() {
        let config = MetricsConfig {
            enabled: false,
            path: "/admin".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: ObservabilityConfig = serde_json::from_str(
            r#"{"tracing": {"enabled": true, "sampling_ratio": 0.25}, "metrics": {"path": "/prom"}}"#,
        )
        .unwrap();

        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.service_name, "blacklist-gateway");
        assert_eq!(config.metrics.path, "/prom");
        assert_eq!(config.metrics.latency_buckets.len(), 11);
        assert!(config.metrics.enabled);
    }
}
