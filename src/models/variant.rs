//! Service variants and their capability table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::includes::ServicePropertiesPatch;

/// Default blob service port.
pub const DEFAULT_BLOB_PORT: u16 = 10000;

/// Default queue service port.
pub const DEFAULT_QUEUE_PORT: u16 = 10001;

/// Default table service port.
pub const DEFAULT_TABLE_PORT: u16 = 10002;

/// The storage services that expose service properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceVariant {
    Blob,
    Queue,
    Table,
}

impl ServiceVariant {
    pub const ALL: [ServiceVariant; 3] = [
        ServiceVariant::Blob,
        ServiceVariant::Queue,
        ServiceVariant::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceVariant::Blob => "blob",
            ServiceVariant::Queue => "queue",
            ServiceVariant::Table => "table",
        }
    }

    /// Returns the port the emulator listens on by default.
    pub fn default_port(&self) -> u16 {
        match self {
            ServiceVariant::Blob => DEFAULT_BLOB_PORT,
            ServiceVariant::Queue => DEFAULT_QUEUE_PORT,
            ServiceVariant::Table => DEFAULT_TABLE_PORT,
        }
    }
}

impl fmt::Display for ServiceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blob" => Ok(ServiceVariant::Blob),
            "queue" => Ok(ServiceVariant::Queue),
            "table" => Ok(ServiceVariant::Table),
            other => Err(format!("unknown service variant '{}'", other)),
        }
    }
}

/// Feature support of one service variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_default_version: bool,
}

/// Capability table keyed by service variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityPolicy {
    pub blob: Capabilities,
    pub queue: Capabilities,
    pub table: Capabilities,
}

/// A patch asked for a feature the target variant does not offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityViolation {
    DefaultServiceVersion,
}

impl CapabilityViolation {
    /// Returns the wire element carrying the unsupported feature.
    pub fn element(&self) -> &'static str {
        match self {
            CapabilityViolation::DefaultServiceVersion => "DefaultServiceVersion",
        }
    }
}

impl CapabilityPolicy {
    /// The storage service's table: only blob accepts version pinning.
    pub const STANDARD: CapabilityPolicy = CapabilityPolicy {
        blob: Capabilities {
            supports_default_version: true,
        },
        queue: Capabilities {
            supports_default_version: false,
        },
        table: Capabilities {
            supports_default_version: false,
        },
    };

    pub fn capabilities(&self, variant: ServiceVariant) -> Capabilities {
        match variant {
            ServiceVariant::Blob => self.blob,
            ServiceVariant::Queue => self.queue,
            ServiceVariant::Table => self.table,
        }
    }

    pub fn supports_default_version(&self, variant: ServiceVariant) -> bool {
        self.capabilities(variant).supports_default_version
    }

    /// Checks a patch against the capabilities of `variant`.
    pub fn check(
        &self,
        variant: ServiceVariant,
        patch: &ServicePropertiesPatch,
    ) -> Result<(), CapabilityViolation> {
        if patch.pins_default_version() && !self.supports_default_version(variant) {
            return Err(CapabilityViolation::DefaultServiceVersion);
        }
        Ok(())
    }
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}
