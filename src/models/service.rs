//! Service properties data models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default analytics version for logging and metrics.
pub const DEFAULT_ANALYTICS_VERSION: &str = "1.0";

/// Retention policy for logs and metrics.
///
/// `days` only carries meaning while the policy is enabled; a disabled
/// policy compares equal to any other disabled policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetentionPolicy {
    pub enabled: bool,
    pub days: Option<u32>,
}

impl RetentionPolicy {
    /// Creates an enabled policy retaining data for `days` days.
    pub fn days(days: u32) -> Self {
        Self {
            enabled: true,
            days: Some(days),
        }
    }

    /// Creates a disabled policy.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the retention days in effect.
    pub fn effective_days(&self) -> Option<u32> {
        if self.enabled {
            self.days
        } else {
            None
        }
    }

    /// Drops `days` when the policy is disabled.
    pub fn normalized(&self) -> Self {
        Self {
            enabled: self.enabled,
            days: self.effective_days(),
        }
    }
}

impl PartialEq for RetentionPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.enabled == other.enabled && self.effective_days() == other.effective_days()
    }
}

impl Eq for RetentionPolicy {}

/// Logging configuration for a storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub version: String,
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub retention_policy: RetentionPolicy,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            version: DEFAULT_ANALYTICS_VERSION.to_string(),
            read: false,
            write: false,
            delete: false,
            retention_policy: RetentionPolicy::default(),
        }
    }
}

/// Metrics configuration for a storage service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub version: String,
    pub enabled: bool,
    pub include_apis: Option<bool>,
    pub retention_policy: RetentionPolicy,
}

impl MetricsSettings {
    /// Returns the include-APIs flag in effect.
    pub fn effective_include_apis(&self) -> Option<bool> {
        if self.enabled {
            self.include_apis
        } else {
            None
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            version: DEFAULT_ANALYTICS_VERSION.to_string(),
            enabled: false,
            include_apis: None,
            retention_policy: RetentionPolicy::default(),
        }
    }
}

impl PartialEq for MetricsSettings {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.enabled == other.enabled
            && self.effective_include_apis() == other.effective_include_apis()
            && self.retention_policy == other.retention_policy
    }
}

impl Eq for MetricsSettings {}

/// HTTP methods a CORS rule may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CorsMethod {
    Delete,
    Get,
    Head,
    Merge,
    Post,
    Options,
    Put,
    Patch,
}

impl CorsMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorsMethod::Delete => "DELETE",
            CorsMethod::Get => "GET",
            CorsMethod::Head => "HEAD",
            CorsMethod::Merge => "MERGE",
            CorsMethod::Post => "POST",
            CorsMethod::Options => "OPTIONS",
            CorsMethod::Put => "PUT",
            CorsMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for CorsMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorsMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DELETE" => Ok(CorsMethod::Delete),
            "GET" => Ok(CorsMethod::Get),
            "HEAD" => Ok(CorsMethod::Head),
            "MERGE" => Ok(CorsMethod::Merge),
            "POST" => Ok(CorsMethod::Post),
            "OPTIONS" => Ok(CorsMethod::Options),
            "PUT" => Ok(CorsMethod::Put),
            "PATCH" => Ok(CorsMethod::Patch),
            other => Err(format!("unsupported CORS method '{}'", other)),
        }
    }
}

/// CORS rule for a storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CorsRule {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<CorsMethod>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub max_age_in_seconds: u32,
}

impl CorsRule {
    /// Returns how long a preflight response may be cached.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_age_in_seconds))
    }

    /// Sets the preflight cache duration, truncated to whole seconds.
    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age_in_seconds = u32::try_from(max_age.as_secs()).unwrap_or(u32::MAX);
    }
}

/// Service properties for a storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceProperties {
    pub logging: LoggingSettings,
    pub hour_metrics: MetricsSettings,
    pub minute_metrics: MetricsSettings,
    pub cors: Vec<CorsRule>,
    pub default_service_version: Option<String>,
}

/// A field whose value differs between two documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMismatch {
    /// Dotted path of the field, e.g. `hour_metrics.retention_policy.days`.
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for PropertyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.path, self.expected, self.actual
        )
    }
}

/// Collects field mismatches while walking two documents in parallel.
struct DiffCollector {
    mismatches: Vec<PropertyMismatch>,
}

impl DiffCollector {
    fn check<T: fmt::Debug + PartialEq>(
        &mut self,
        path: impl Into<String>,
        expected: T,
        actual: T,
    ) {
        if expected != actual {
            self.mismatches.push(PropertyMismatch {
                path: path.into(),
                expected: format!("{:?}", expected),
                actual: format!("{:?}", actual),
            });
        }
    }

    fn retention(&mut self, prefix: &str, expected: &RetentionPolicy, actual: &RetentionPolicy) {
        self.check(
            format!("{}.retention_policy.enabled", prefix),
            expected.enabled,
            actual.enabled,
        );
        self.check(
            format!("{}.retention_policy.days", prefix),
            expected.effective_days(),
            actual.effective_days(),
        );
    }

    fn metrics(&mut self, prefix: &str, expected: &MetricsSettings, actual: &MetricsSettings) {
        self.check(format!("{}.version", prefix), &expected.version, &actual.version);
        self.check(format!("{}.enabled", prefix), expected.enabled, actual.enabled);
        self.check(
            format!("{}.include_apis", prefix),
            expected.effective_include_apis(),
            actual.effective_include_apis(),
        );
        self.retention(prefix, &expected.retention_policy, &actual.retention_policy);
    }
}

impl ServiceProperties {
    /// Lists every field where `actual` differs from `self`.
    ///
    /// CORS rules are compared position by position; a length difference is
    /// reported once and the common prefix is still compared.
    pub fn diff(&self, actual: &ServiceProperties) -> Vec<PropertyMismatch> {
        let mut diff = DiffCollector {
            mismatches: Vec::new(),
        };

        let (e, a) = (&self.logging, &actual.logging);
        diff.check("logging.version", &e.version, &a.version);
        diff.check("logging.read", e.read, a.read);
        diff.check("logging.write", e.write, a.write);
        diff.check("logging.delete", e.delete, a.delete);
        diff.retention("logging", &e.retention_policy, &a.retention_policy);

        diff.metrics("hour_metrics", &self.hour_metrics, &actual.hour_metrics);
        diff.metrics("minute_metrics", &self.minute_metrics, &actual.minute_metrics);

        diff.check("cors.len", self.cors.len(), actual.cors.len());
        for (i, (e, a)) in self.cors.iter().zip(&actual.cors).enumerate() {
            let p = format!("cors[{}]", i);
            diff.check(format!("{p}.allowed_origins"), &e.allowed_origins, &a.allowed_origins);
            diff.check(format!("{p}.allowed_methods"), &e.allowed_methods, &a.allowed_methods);
            diff.check(format!("{p}.allowed_headers"), &e.allowed_headers, &a.allowed_headers);
            diff.check(format!("{p}.exposed_headers"), &e.exposed_headers, &a.exposed_headers);
            diff.check(
                format!("{p}.max_age_in_seconds"),
                e.max_age_in_seconds,
                a.max_age_in_seconds,
            );
        }

        diff.check(
            "default_service_version",
            &self.default_service_version,
            &actual.default_service_version,
        );

        diff.mismatches
    }

    /// Returns true when both documents are structurally equivalent.
    pub fn equivalent(&self, other: &ServiceProperties) -> bool {
        self.diff(other).is_empty()
    }
}
