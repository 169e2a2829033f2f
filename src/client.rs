//! Client for uploading and downloading service properties.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult, ErrorCode, TransportError};
use crate::models::{
    CapabilityPolicy, PropertyGroupSelector, ServiceProperties, ServicePropertiesPatch,
    ServiceVariant,
};
use crate::service::PropertiesService;
use crate::transport::{AccountCredentials, HttpTransport, LocalTransport, Transport};
use crate::xml::{parse_service_properties, serialize_properties_patch};

/// Configures the analytics and CORS properties of one storage service.
///
/// Each call is a fresh round trip: nothing is cached between an upload and
/// the following download.
#[derive(Clone)]
pub struct ServicePropertiesClient {
    transport: Arc<dyn Transport>,
    variant: ServiceVariant,
    policy: CapabilityPolicy,
}

impl ServicePropertiesClient {
    /// Creates a client for `variant` over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, variant: ServiceVariant) -> Self {
        Self {
            transport,
            variant,
            policy: CapabilityPolicy::STANDARD,
        }
    }

    /// Replaces the capability table used to gate uploads.
    pub fn with_policy(mut self, policy: CapabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Creates a client talking HTTP to `endpoint`.
    pub fn http(
        variant: ServiceVariant,
        endpoint: &str,
        credentials: AccountCredentials,
    ) -> ClientResult<Self> {
        let transport = HttpTransport::new(endpoint, credentials)?;
        Ok(Self::new(Arc::new(transport), variant))
    }

    /// Creates a client driving `service` in process.
    pub fn local(
        service: PropertiesService,
        account: impl Into<String>,
        variant: ServiceVariant,
    ) -> Self {
        let policy = service.policy();
        let transport = LocalTransport::new(service, account, variant);
        Self::new(Arc::new(transport), variant).with_policy(policy)
    }

    pub fn variant(&self) -> ServiceVariant {
        self.variant
    }

    /// Replaces every selected group of the service's properties with the
    /// matching group of `props`. Unselected groups keep their stored values.
    ///
    /// A pinned default version is refused before anything is sent when the
    /// variant cannot honor it, so a rejected upload changes no group.
    pub async fn upload(
        &self,
        props: &ServiceProperties,
        selector: PropertyGroupSelector,
    ) -> ClientResult<()> {
        let patch = ServicePropertiesPatch::from_selected(props, selector);

        if let Err(violation) = self.policy.check(self.variant, &patch) {
            warn!(
                variant = %self.variant,
                element = violation.element(),
                "refusing upload the service cannot honor"
            );
            return Err(ClientError::CapabilityRejected {
                variant: self.variant,
            });
        }

        let body = serialize_properties_patch(&patch)
            .map_err(|e| ClientError::InvalidProperties(e.message))?;
        debug!(variant = %self.variant, groups = ?selector, "uploading service properties");

        match self.transport.put_properties(body).await {
            Ok(()) => {
                info!(variant = %self.variant, "service properties uploaded");
                Ok(())
            }
            // The service's own table may be stricter than ours.
            Err(TransportError::Rejected { ref code, .. })
                if patch.pins_default_version()
                    && ErrorCode::from_wire(code) == Some(ErrorCode::UnsupportedXmlNode) =>
            {
                Err(ClientError::CapabilityRejected {
                    variant: self.variant,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches the complete current properties of the service.
    pub async fn download(&self) -> ClientResult<ServiceProperties> {
        let xml = self.transport.get_properties().await?;
        parse_service_properties(&xml).map_err(|e| ClientError::MalformedResponse(e.message))
    }
}
