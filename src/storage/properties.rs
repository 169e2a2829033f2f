//! Store for the service properties of every account and service.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::StorageResult;
use crate::models::{ServiceProperties, ServicePropertiesPatch, ServiceVariant};

/// Trait for service properties storage.
///
/// `apply_patch` must replace the present groups of a patch in one step: readers
/// never observe a document with only some of them replaced. Nothing orders
/// concurrent writers; two clients patching disjoint groups of the same
/// service each keep their own groups, but a writer computing its patch
/// from a stale download can still overwrite a newer value.
#[async_trait]
pub trait PropertiesStore: Send + Sync {
    /// Returns the stored document, or the default document if none exists.
    async fn get_properties(
        &self,
        account: &str,
        variant: ServiceVariant,
    ) -> StorageResult<ServiceProperties>;

    /// Replaces the groups present in `patch` and returns the new document.
    async fn apply_patch(
        &self,
        account: &str,
        variant: ServiceVariant,
        patch: &ServicePropertiesPatch,
    ) -> StorageResult<ServiceProperties>;
}

/// Key type for service properties - uses Arc<str> to avoid allocations.
type PropertiesKey = (Arc<str>, ServiceVariant);

/// In-memory implementation of the properties store.
#[derive(Default)]
pub struct MemoryPropertiesStore {
    /// Documents indexed by (account, service).
    properties: DashMap<PropertiesKey, ServiceProperties>,
}

impl MemoryPropertiesStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn key(account: &str, variant: ServiceVariant) -> PropertiesKey {
        (Arc::from(account), variant)
    }
}

#[async_trait]
impl PropertiesStore for MemoryPropertiesStore {
    async fn get_properties(
        &self,
        account: &str,
        variant: ServiceVariant,
    ) -> StorageResult<ServiceProperties> {
        Ok(self
            .properties
            .get(&Self::key(account, variant))
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn apply_patch(
        &self,
        account: &str,
        variant: ServiceVariant,
        patch: &ServicePropertiesPatch,
    ) -> StorageResult<ServiceProperties> {
        // The entry guard holds the shard lock for the whole replacement.
        let mut entry = self
            .properties
            .entry(Self::key(account, variant))
            .or_default();
        patch.apply_to(entry.value_mut());
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoggingSettings, PropertyGroupSelector, RetentionPolicy};

    #[tokio::test]
    async fn test_unknown_service_returns_defaults() {
        let store = MemoryPropertiesStore::new();
        let props = store
            .get_properties("devstoreaccount1", ServiceVariant::Table)
            .await
            .unwrap();
        assert_eq!(props, ServiceProperties::default());
    }

    #[tokio::test]
    async fn test_services_are_isolated() {
        let store = MemoryPropertiesStore::new();
        let mut props = ServiceProperties::default();
        props.logging = LoggingSettings {
            read: true,
            retention_policy: RetentionPolicy::days(3),
            ..LoggingSettings::default()
        };

        store
            .apply_patch("acct", ServiceVariant::Blob, &ServicePropertiesPatch::full(&props))
            .await
            .unwrap();

        assert_eq!(
            store.get_properties("acct", ServiceVariant::Blob).await.unwrap(),
            props
        );
        assert_eq!(
            store.get_properties("acct", ServiceVariant::Queue).await.unwrap(),
            ServiceProperties::default()
        );
        assert_eq!(
            store.get_properties("other", ServiceVariant::Blob).await.unwrap(),
            ServiceProperties::default()
        );
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_patches_both_land() {
        let store = Arc::new(MemoryPropertiesStore::new());
        let mut props = ServiceProperties::default();
        props.logging.write = true;
        props.hour_metrics.enabled = true;
        props.hour_metrics.include_apis = Some(true);

        let logging = ServicePropertiesPatch::from_selected(
            &props,
            PropertyGroupSelector::none().with_logging(true),
        );
        let metrics = ServicePropertiesPatch::from_selected(
            &props,
            PropertyGroupSelector::none().with_hour_metrics(true),
        );

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store.apply_patch("acct", ServiceVariant::Blob, &logging).await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store.apply_patch("acct", ServiceVariant::Blob, &metrics).await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let stored = store.get_properties("acct", ServiceVariant::Blob).await.unwrap();
        assert_eq!(stored, props);
    }
}
