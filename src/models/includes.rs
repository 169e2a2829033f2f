//! Property group selection and the partial-update patch built from it.

use serde::{Deserialize, Serialize};

use super::service::{CorsRule, LoggingSettings, MetricsSettings, ServiceProperties};

/// Which property groups take part in an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyGroupSelector {
    pub logging: bool,
    pub hour_metrics: bool,
    pub minute_metrics: bool,
    pub cors: bool,
    pub default_version: bool,
}

impl PropertyGroupSelector {
    /// Selects every property group.
    pub fn all() -> Self {
        Self {
            logging: true,
            hour_metrics: true,
            minute_metrics: true,
            cors: true,
            default_version: true,
        }
    }

    /// Selects no property group.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_logging(mut self, selected: bool) -> Self {
        self.logging = selected;
        self
    }

    pub fn with_hour_metrics(mut self, selected: bool) -> Self {
        self.hour_metrics = selected;
        self
    }

    pub fn with_minute_metrics(mut self, selected: bool) -> Self {
        self.minute_metrics = selected;
        self
    }

    pub fn with_cors(mut self, selected: bool) -> Self {
        self.cors = selected;
        self
    }

    pub fn with_default_version(mut self, selected: bool) -> Self {
        self.default_version = selected;
        self
    }

    /// Returns true when no group is selected.
    pub fn is_empty(&self) -> bool {
        !(self.logging
            || self.hour_metrics
            || self.minute_metrics
            || self.cors
            || self.default_version)
    }
}

/// The groups an upload replaces on the service.
///
/// A present group replaces the stored group wholesale; an absent group
/// leaves the stored value untouched. This mirrors the wire document, where
/// omitting an element is the only way to say "leave as is".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServicePropertiesPatch {
    pub logging: Option<LoggingSettings>,
    pub hour_metrics: Option<MetricsSettings>,
    pub minute_metrics: Option<MetricsSettings>,
    pub cors: Option<Vec<CorsRule>>,
    pub default_service_version: Option<String>,
}

impl ServicePropertiesPatch {
    /// Builds the patch carrying the selected groups of `props`.
    ///
    /// A selected default version that is unset or empty contributes
    /// nothing: there is no wire form for clearing it.
    pub fn from_selected(props: &ServiceProperties, selector: PropertyGroupSelector) -> Self {
        Self {
            logging: selector.logging.then(|| props.logging.clone()),
            hour_metrics: selector.hour_metrics.then(|| props.hour_metrics.clone()),
            minute_metrics: selector.minute_metrics.then(|| props.minute_metrics.clone()),
            cors: selector.cors.then(|| props.cors.clone()),
            default_service_version: props
                .default_service_version
                .as_ref()
                .filter(|v| selector.default_version && !v.is_empty())
                .cloned(),
        }
    }

    /// Builds a patch replacing every group of `props`.
    pub fn full(props: &ServiceProperties) -> Self {
        Self::from_selected(props, PropertyGroupSelector::all())
    }

    /// Returns the selector equivalent to the groups present in this patch.
    pub fn selector(&self) -> PropertyGroupSelector {
        PropertyGroupSelector {
            logging: self.logging.is_some(),
            hour_metrics: self.hour_metrics.is_some(),
            minute_metrics: self.minute_metrics.is_some(),
            cors: self.cors.is_some(),
            default_version: self.default_service_version.is_some(),
        }
    }

    /// Returns true when the patch pins a default service version.
    pub fn pins_default_version(&self) -> bool {
        self.default_service_version.is_some()
    }

    /// Replaces the present groups of `target`, normalizing retention days.
    pub fn apply_to(&self, target: &mut ServiceProperties) {
        if let Some(logging) = &self.logging {
            target.logging = logging.clone();
            target.logging.retention_policy = logging.retention_policy.normalized();
        }
        if let Some(metrics) = &self.hour_metrics {
            target.hour_metrics = normalize_metrics(metrics);
        }
        if let Some(metrics) = &self.minute_metrics {
            target.minute_metrics = normalize_metrics(metrics);
        }
        if let Some(cors) = &self.cors {
            target.cors = cors.clone();
        }
        if let Some(version) = &self.default_service_version {
            target.default_service_version = Some(version.clone());
        }
    }
}

fn normalize_metrics(metrics: &MetricsSettings) -> MetricsSettings {
    MetricsSettings {
        version: metrics.version.clone(),
        enabled: metrics.enabled,
        include_apis: metrics.effective_include_apis(),
        retention_policy: metrics.retention_policy.normalized(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CorsMethod, RetentionPolicy};

    fn sample() -> ServiceProperties {
        ServiceProperties {
            logging: LoggingSettings {
                read: true,
                retention_policy: RetentionPolicy::days(20),
                ..LoggingSettings::default()
            },
            hour_metrics: MetricsSettings {
                enabled: true,
                include_apis: Some(false),
                retention_policy: RetentionPolicy::days(5),
                ..MetricsSettings::default()
            },
            minute_metrics: MetricsSettings {
                enabled: true,
                include_apis: Some(true),
                ..MetricsSettings::default()
            },
            cors: vec![CorsRule {
                allowed_origins: vec!["*".into()],
                allowed_methods: vec![CorsMethod::Head],
                allowed_headers: vec!["x-ms-meta-ab*".into()],
                exposed_headers: vec!["x-ms-meta-abc*".into()],
                max_age_in_seconds: 25,
            }],
            default_service_version: Some("2013-08-15".into()),
        }
    }

    #[test]
    fn test_selector_all_and_none() {
        let all = PropertyGroupSelector::all();
        assert!(
            all.logging && all.hour_metrics && all.minute_metrics && all.cors && all.default_version
        );
        assert!(PropertyGroupSelector::none().is_empty());
        assert!(!PropertyGroupSelector::none().with_cors(true).is_empty());
    }

    #[test]
    fn test_patch_carries_only_selected_groups() {
        let selector = PropertyGroupSelector::none().with_logging(true).with_cors(true);
        let patch = ServicePropertiesPatch::from_selected(&sample(), selector);

        assert!(patch.logging.is_some());
        assert!(patch.hour_metrics.is_none());
        assert!(patch.minute_metrics.is_none());
        assert_eq!(patch.cors.as_ref().map(Vec::len), Some(1));
        assert!(patch.default_service_version.is_none());
        assert_eq!(patch.selector(), selector);
    }

    #[test]
    fn test_unset_version_is_not_sent() {
        let props = ServiceProperties {
            default_service_version: Some(String::new()),
            ..ServiceProperties::default()
        };
        let patch = ServicePropertiesPatch::full(&props);
        assert!(!patch.pins_default_version());
        assert!(!patch.selector().default_version);
    }

    #[test]
    fn test_apply_leaves_unselected_groups() {
        let mut stored = sample();
        let incoming = ServiceProperties::default();
        let patch = ServicePropertiesPatch::from_selected(
            &incoming,
            PropertyGroupSelector::none().with_hour_metrics(true),
        );

        patch.apply_to(&mut stored);

        let mut expected = sample();
        expected.hour_metrics = MetricsSettings::default();
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_apply_empty_cors_clears_rules() {
        let mut stored = sample();
        let patch = ServicePropertiesPatch::from_selected(
            &ServiceProperties::default(),
            PropertyGroupSelector::none().with_cors(true),
        );
        patch.apply_to(&mut stored);
        assert!(stored.cors.is_empty());
    }

    #[test]
    fn test_apply_drops_stale_retention_days() {
        let mut stored = ServiceProperties::default();
        let mut incoming = sample();
        incoming.logging.retention_policy = RetentionPolicy {
            enabled: false,
            days: Some(20),
        };
        incoming.minute_metrics.enabled = false;

        ServicePropertiesPatch::full(&incoming).apply_to(&mut stored);

        assert_eq!(stored.logging.retention_policy.days, None);
        assert_eq!(stored.minute_metrics.include_apis, None);
    }
}
