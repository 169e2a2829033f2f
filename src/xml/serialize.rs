//! XML serialization of service properties documents.

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{
    CorsRule, LoggingSettings, MetricsSettings, RetentionPolicy, ServiceProperties,
    ServicePropertiesPatch,
};

/// Escapes special XML characters.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Serializes the complete service properties document.
pub fn serialize_service_properties(props: &ServiceProperties) -> StorageResult<String> {
    serialize_properties_patch(&ServicePropertiesPatch::full(props))
}

/// Serializes only the groups present in `patch`.
///
/// Absent groups produce no element at all. A present but empty CORS list
/// is written as `<Cors />` so the service clears its rules. Values the
/// document cannot carry unchanged are rejected, see [`check_encodable`].
pub fn serialize_properties_patch(patch: &ServicePropertiesPatch) -> StorageResult<String> {
    check_encodable(patch)?;

    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    xml.push_str("<StorageServiceProperties>");

    if let Some(ref logging) = patch.logging {
        xml.push_str(&serialize_logging(logging));
    }
    if let Some(ref metrics) = patch.hour_metrics {
        xml.push_str(&serialize_metrics("HourMetrics", metrics));
    }
    if let Some(ref metrics) = patch.minute_metrics {
        xml.push_str(&serialize_metrics("MinuteMetrics", metrics));
    }

    if let Some(ref cors) = patch.cors {
        if cors.is_empty() {
            xml.push_str("<Cors />");
        } else {
            xml.push_str("<Cors>");
            for rule in cors {
                xml.push_str(&serialize_cors_rule(rule));
            }
            xml.push_str("</Cors>");
        }
    }

    if let Some(ref version) = patch.default_service_version {
        xml.push_str(&format!(
            "<DefaultServiceVersion>{}</DefaultServiceVersion>",
            xml_escape(version)
        ));
    }

    xml.push_str("</StorageServiceProperties>");
    Ok(xml)
}

/// Checks that every text value of `patch` reads back unchanged.
///
/// Element text is trimmed on parse and CORS lists are comma-joined, so a
/// padded value or a list item that is empty or holds a comma would come
/// back altered.
pub fn check_encodable(patch: &ServicePropertiesPatch) -> StorageResult<()> {
    if let Some(ref logging) = patch.logging {
        check_text("Logging/Version", &logging.version)?;
    }
    if let Some(ref metrics) = patch.hour_metrics {
        check_text("HourMetrics/Version", &metrics.version)?;
    }
    if let Some(ref metrics) = patch.minute_metrics {
        check_text("MinuteMetrics/Version", &metrics.version)?;
    }
    for rule in patch.cors.iter().flatten() {
        check_list("Cors/CorsRule/AllowedOrigins", &rule.allowed_origins)?;
        check_list("Cors/CorsRule/ExposedHeaders", &rule.exposed_headers)?;
        check_list("Cors/CorsRule/AllowedHeaders", &rule.allowed_headers)?;
    }
    if let Some(ref version) = patch.default_service_version {
        if version.is_empty() {
            return Err(unencodable("DefaultServiceVersion", version));
        }
        check_text("DefaultServiceVersion", version)?;
    }
    Ok(())
}

fn check_text(node: &str, value: &str) -> StorageResult<()> {
    if value.trim() != value {
        return Err(unencodable(node, value));
    }
    Ok(())
}

fn check_list(node: &str, items: &[String]) -> StorageResult<()> {
    for item in items {
        if item.is_empty() || item.contains(',') {
            return Err(unencodable(node, item));
        }
        check_text(node, item)?;
    }
    Ok(())
}

fn unencodable(node: &str, value: &str) -> StorageError {
    StorageError::with_message(
        ErrorCode::InvalidXmlNodeValue,
        format!("Value '{value}' for XML node {node} would not read back unchanged."),
    )
}

fn serialize_logging(logging: &LoggingSettings) -> String {
    let mut xml = String::from("<Logging>");
    xml.push_str(&format!("<Version>{}</Version>", xml_escape(&logging.version)));
    xml.push_str(&format!("<Delete>{}</Delete>", logging.delete));
    xml.push_str(&format!("<Read>{}</Read>", logging.read));
    xml.push_str(&format!("<Write>{}</Write>", logging.write));
    xml.push_str(&serialize_retention_policy(&logging.retention_policy));
    xml.push_str("</Logging>");
    xml
}

fn serialize_metrics(element: &str, metrics: &MetricsSettings) -> String {
    let mut xml = format!("<{}>", element);
    xml.push_str(&format!("<Version>{}</Version>", xml_escape(&metrics.version)));
    xml.push_str(&format!("<Enabled>{}</Enabled>", metrics.enabled));
    if let Some(include_apis) = metrics.effective_include_apis() {
        xml.push_str(&format!("<IncludeAPIs>{}</IncludeAPIs>", include_apis));
    }
    xml.push_str(&serialize_retention_policy(&metrics.retention_policy));
    xml.push_str(&format!("</{}>", element));
    xml
}

fn serialize_retention_policy(policy: &RetentionPolicy) -> String {
    let mut xml = String::from("<RetentionPolicy>");
    xml.push_str(&format!("<Enabled>{}</Enabled>", policy.enabled));
    if let Some(days) = policy.effective_days() {
        xml.push_str(&format!("<Days>{}</Days>", days));
    }
    xml.push_str("</RetentionPolicy>");
    xml
}

fn serialize_cors_rule(rule: &CorsRule) -> String {
    let methods: Vec<&str> = rule.allowed_methods.iter().map(|m| m.as_str()).collect();

    let mut xml = String::from("<CorsRule>");
    xml.push_str(&format!(
        "<AllowedOrigins>{}</AllowedOrigins>",
        xml_escape(&rule.allowed_origins.join(","))
    ));
    xml.push_str(&format!("<AllowedMethods>{}</AllowedMethods>", methods.join(",")));
    xml.push_str(&format!(
        "<MaxAgeInSeconds>{}</MaxAgeInSeconds>",
        rule.max_age_in_seconds
    ));
    xml.push_str(&format!(
        "<ExposedHeaders>{}</ExposedHeaders>",
        xml_escape(&rule.exposed_headers.join(","))
    ));
    xml.push_str(&format!(
        "<AllowedHeaders>{}</AllowedHeaders>",
        xml_escape(&rule.allowed_headers.join(","))
    ));
    xml.push_str("</CorsRule>");
    xml
}
