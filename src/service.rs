//! Service-side handling of the properties document.
//!
//! Both the HTTP handlers and the in-process transport go through
//! [`PropertiesService`], so capability gating and validation behave the
//! same whichever way a document arrives.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{
    CapabilityPolicy, MetricsSettings, RetentionPolicy, ServiceProperties,
    ServicePropertiesPatch, ServiceVariant,
};
use crate::storage::{MemoryPropertiesStore, PropertiesStore};
use crate::xml::{check_encodable, parse_properties_patch, serialize_service_properties};

/// Maximum number of CORS rules a service accepts.
pub const MAX_CORS_RULES: usize = 5;

/// Longest retention period, in days.
pub const MAX_RETENTION_DAYS: u32 = 365;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid version pattern"))
}

/// Reads and writes service properties documents against a store.
#[derive(Clone)]
pub struct PropertiesService {
    store: Arc<dyn PropertiesStore>,
    policy: CapabilityPolicy,
}

impl PropertiesService {
    pub fn new(store: Arc<dyn PropertiesStore>, policy: CapabilityPolicy) -> Self {
        Self { store, policy }
    }

    /// Creates a service over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPropertiesStore::new()), CapabilityPolicy::STANDARD)
    }

    pub fn policy(&self) -> CapabilityPolicy {
        self.policy
    }

    pub fn store(&self) -> Arc<dyn PropertiesStore> {
        self.store.clone()
    }

    /// Returns the complete stored document as XML.
    pub async fn get_document(
        &self,
        account: &str,
        variant: ServiceVariant,
    ) -> StorageResult<String> {
        let properties = self.store.get_properties(account, variant).await?;
        serialize_service_properties(&properties)
    }

    /// Applies an uploaded document.
    ///
    /// Every check runs before the store is touched, so a rejected document
    /// leaves all groups as they were.
    pub async fn set_document(
        &self,
        account: &str,
        variant: ServiceVariant,
        xml: &str,
    ) -> StorageResult<ServiceProperties> {
        let patch = parse_properties_patch(xml)?;
        self.apply(account, variant, &patch).await
    }

    /// Gates, validates and stores a patch.
    pub async fn apply(
        &self,
        account: &str,
        variant: ServiceVariant,
        patch: &ServicePropertiesPatch,
    ) -> StorageResult<ServiceProperties> {
        if let Err(violation) = self.policy.check(variant, patch) {
            warn!(
                %account,
                %variant,
                element = violation.element(),
                "rejecting unsupported property"
            );
            return Err(StorageError::with_message(
                ErrorCode::UnsupportedXmlNode,
                format!(
                    "XML node {} is not supported by the {} service.",
                    violation.element(),
                    variant
                ),
            ));
        }
        validate_patch(patch)?;

        let stored = self.store.apply_patch(account, variant, patch).await?;
        debug!(%account, %variant, groups = ?patch.selector(), "service properties updated");
        Ok(stored)
    }

    /// Preloads `props` on every service of `account`.
    ///
    /// Services that cannot pin a default version get the document without it.
    pub async fn seed(&self, account: &str, props: &ServiceProperties) -> StorageResult<()> {
        for variant in ServiceVariant::ALL {
            let mut patch = ServicePropertiesPatch::full(props);
            if patch.pins_default_version() && !self.policy.supports_default_version(variant) {
                info!(%variant, "skipping DefaultServiceVersion for seed");
                patch.default_service_version = None;
            }
            self.apply(account, variant, &patch).await?;
        }
        Ok(())
    }
}

/// Rejects values the storage service does not accept.
fn validate_patch(patch: &ServicePropertiesPatch) -> StorageResult<()> {
    check_encodable(patch)?;
    if let Some(ref logging) = patch.logging {
        validate_retention("Logging", &logging.retention_policy)?;
    }
    if let Some(ref metrics) = patch.hour_metrics {
        validate_metrics("HourMetrics", metrics)?;
    }
    if let Some(ref metrics) = patch.minute_metrics {
        validate_metrics("MinuteMetrics", metrics)?;
    }
    if let Some(ref cors) = patch.cors {
        if cors.len() > MAX_CORS_RULES {
            return Err(StorageError::with_message(
                ErrorCode::InvalidXmlNodeValue,
                format!("At most {} CORS rules are allowed, got {}.", MAX_CORS_RULES, cors.len()),
            ));
        }
        let incomplete = cors
            .iter()
            .find(|r| r.allowed_origins.is_empty() || r.allowed_methods.is_empty());
        if let Some(rule) = incomplete {
            return Err(StorageError::with_message(
                ErrorCode::InvalidXmlNodeValue,
                format!(
                    "CORS rule {:?} needs at least one origin and one method.",
                    rule.allowed_origins
                ),
            ));
        }
    }
    if let Some(ref version) = patch.default_service_version {
        if !version_pattern().is_match(version) {
            return Err(StorageError::with_message(
                ErrorCode::InvalidXmlNodeValue,
                format!("'{}' is not a valid service version.", version),
            ));
        }
    }
    Ok(())
}

fn validate_metrics(group: &str, metrics: &MetricsSettings) -> StorageResult<()> {
    if metrics.enabled && metrics.include_apis.is_none() {
        return Err(StorageError::with_message(
            ErrorCode::MissingRequiredXmlNode,
            format!("{}/IncludeAPIs is required when metrics are enabled.", group),
        ));
    }
    validate_retention(group, &metrics.retention_policy)
}

fn validate_retention(group: &str, policy: &RetentionPolicy) -> StorageResult<()> {
    match policy.effective_days() {
        None if policy.enabled => Err(StorageError::with_message(
            ErrorCode::MissingRequiredXmlNode,
            format!("{}/RetentionPolicy/Days is required when the policy is enabled.", group),
        )),
        Some(days) if days == 0 || days > MAX_RETENTION_DAYS => Err(StorageError::with_message(
            ErrorCode::OutOfRangeInput,
            format!(
                "{}/RetentionPolicy/Days must be between 1 and {}, got {}.",
                group, MAX_RETENTION_DAYS, days
            ),
        )),
        _ => Ok(()),
    }
}
