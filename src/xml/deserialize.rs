//! XML deserialization of service properties documents.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{
    CorsMethod, CorsRule, LoggingSettings, MetricsSettings, RetentionPolicy, ServiceProperties,
    ServicePropertiesPatch,
};

const ROOT: &str = "StorageServiceProperties";

const LOGGING_CHILDREN: &[&str] = &[
    "Version",
    "Delete",
    "Read",
    "Write",
    "RetentionPolicy/Enabled",
];
const METRICS_CHILDREN: &[&str] = &["Version", "Enabled", "RetentionPolicy/Enabled"];
const CORS_RULE_CHILDREN: &[&str] = &[
    "AllowedOrigins",
    "AllowedMethods",
    "MaxAgeInSeconds",
    "ExposedHeaders",
    "AllowedHeaders",
];

/// Parses a request document into the groups it carries.
///
/// Groups whose element is absent stay `None`. Retention days sent with a
/// disabled policy are tolerated here; applying the patch drops them.
pub fn parse_properties_patch(xml: &str) -> StorageResult<ServicePropertiesPatch> {
    let reader = PropertiesReader::read(xml)?;
    reader.require_children()?;
    Ok(reader.patch)
}

/// Parses a complete document as returned by the service.
///
/// Logging and both metrics groups must be present, an absent `Cors`
/// element means no rules, and fields that contradict their enabling flag
/// are rejected.
pub fn parse_service_properties(xml: &str) -> StorageResult<ServiceProperties> {
    let reader = PropertiesReader::read(xml)?;
    reader.require_children()?;

    let patch = reader.patch;
    let logging = patch.logging.ok_or_else(|| missing("Logging"))?;
    let hour_metrics = patch.hour_metrics.ok_or_else(|| missing("HourMetrics"))?;
    let minute_metrics = patch.minute_metrics.ok_or_else(|| missing("MinuteMetrics"))?;

    check_retention("Logging", &logging.retention_policy)?;
    check_retention("HourMetrics", &hour_metrics.retention_policy)?;
    check_retention("MinuteMetrics", &minute_metrics.retention_policy)?;

    Ok(ServiceProperties {
        logging,
        hour_metrics,
        minute_metrics,
        cors: patch.cors.unwrap_or_default(),
        default_service_version: patch.default_service_version,
    })
}

fn check_retention(group: &str, policy: &RetentionPolicy) -> StorageResult<()> {
    match (policy.enabled, policy.days) {
        (false, Some(days)) => Err(StorageError::with_message(
            ErrorCode::InvalidXmlNodeValue,
            format!("{group}/RetentionPolicy carries Days={days} while disabled"),
        )),
        (true, None) => Err(missing(&format!("{group}/RetentionPolicy/Days"))),
        _ => Ok(()),
    }
}

fn missing(node: &str) -> StorageError {
    StorageError::with_message(
        ErrorCode::MissingRequiredXmlNode,
        format!("Missing required XML node {node}."),
    )
}

fn invalid_value(node: &str, text: &str) -> StorageError {
    StorageError::with_message(
        ErrorCode::InvalidXmlNodeValue,
        format!("Value '{text}' is not valid for XML node {node}."),
    )
}

fn parse_bool(node: &str, text: &str) -> StorageResult<bool> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid_value(node, text))
    }
}

fn parse_u32(node: &str, text: &str) -> StorageResult<u32> {
    text.trim().parse().map_err(|_| invalid_value(node, text))
}

/// Splits a comma-separated list. An empty element is an empty list, but
/// an empty item inside a list is malformed.
fn parse_list(node: &str, text: &str) -> StorageResult<Vec<String>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(str::trim)
        .map(|item| {
            if item.is_empty() {
                Err(invalid_value(node, text))
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

fn parse_methods(text: &str) -> StorageResult<Vec<CorsMethod>> {
    parse_list("AllowedMethods", text)?
        .iter()
        .map(|m| m.parse().map_err(|_| invalid_value("AllowedMethods", m)))
        .collect()
}

fn set_retention_field(
    policy: &mut RetentionPolicy,
    node: &str,
    field: &str,
    text: &str,
) -> StorageResult<()> {
    match field {
        "Enabled" => policy.enabled = parse_bool(node, text)?,
        "Days" => policy.days = Some(parse_u32(node, text)?),
        _ => {}
    }
    Ok(())
}

fn set_metrics_field(metrics: &mut MetricsSettings, field: &str, text: &str) -> StorageResult<()> {
    match field {
        "Version" => metrics.version = text.to_string(),
        "Enabled" => metrics.enabled = parse_bool(field, text)?,
        "IncludeAPIs" => metrics.include_apis = Some(parse_bool(field, text)?),
        _ => {}
    }
    Ok(())
}

/// Event-driven reader collecting groups into a patch.
#[derive(Default)]
struct PropertiesReader {
    patch: ServicePropertiesPatch,
    rule: Option<CorsRule>,
    rule_fields: HashSet<String>,
    /// Closed element paths below the root, e.g. `Logging/RetentionPolicy/Enabled`.
    seen: HashSet<String>,
}

impl PropertiesReader {
    fn read(xml: &str) -> StorageResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut state = Self::default();
        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut current_text = String::new();
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                    let path_str: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
                    state.open(&path_str)?;
                    saw_root = true;
                    current_text.clear();
                }
                Ok(Event::Empty(e)) => {
                    path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                    let path_str: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
                    state.open(&path_str)?;
                    state.close(&path_str, "")?;
                    saw_root = true;
                    path.pop();
                    current_text.clear();
                }
                Ok(Event::End(_)) => {
                    let path_str: Vec<&str> = path.iter().map(|s| s.as_str()).collect();
                    state.close(&path_str, &current_text)?;
                    path.pop();
                    current_text.clear();
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|_| StorageError::new(ErrorCode::InvalidXmlDocument))?;
                    current_text.push_str(&text);
                }
                Ok(Event::CData(e)) => {
                    let text = std::str::from_utf8(&e)
                        .map_err(|_| StorageError::new(ErrorCode::InvalidXmlDocument))?;
                    current_text.push_str(text);
                }
                Ok(Event::Eof) => break,
                Err(_) => return Err(StorageError::new(ErrorCode::InvalidXmlDocument)),
                _ => {}
            }
            buf.clear();
        }

        if !saw_root || !path.is_empty() {
            return Err(StorageError::new(ErrorCode::InvalidXmlDocument));
        }

        Ok(state)
    }

    fn open(&mut self, path: &[&str]) -> StorageResult<()> {
        match path {
            [root] if *root != ROOT => {
                return Err(StorageError::with_message(
                    ErrorCode::InvalidXmlDocument,
                    format!("Unexpected root element {root}."),
                ))
            }
            [_, "Logging"] => {
                self.patch.logging.get_or_insert_with(LoggingSettings::default);
            }
            [_, "HourMetrics"] => {
                self.patch.hour_metrics.get_or_insert_with(MetricsSettings::default);
            }
            [_, "MinuteMetrics"] => {
                self.patch.minute_metrics.get_or_insert_with(MetricsSettings::default);
            }
            [_, "Cors"] => {
                self.patch.cors.get_or_insert_with(Vec::new);
            }
            [_, "Cors", "CorsRule"] => {
                self.rule = Some(CorsRule::default());
                self.rule_fields.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, path: &[&str], text: &str) -> StorageResult<()> {
        if path.len() > 1 {
            self.seen.insert(path[1..].join("/"));
        }

        match path {
            [_, "Logging", field] => {
                let logging = self.patch.logging.get_or_insert_with(LoggingSettings::default);
                match *field {
                    "Version" => logging.version = text.to_string(),
                    "Read" => logging.read = parse_bool(field, text)?,
                    "Write" => logging.write = parse_bool(field, text)?,
                    "Delete" => logging.delete = parse_bool(field, text)?,
                    _ => {}
                }
            }
            [_, "Logging", "RetentionPolicy", field] => {
                let logging = self.patch.logging.get_or_insert_with(LoggingSettings::default);
                set_retention_field(
                    &mut logging.retention_policy,
                    "Logging/RetentionPolicy",
                    field,
                    text,
                )?;
            }
            [_, group @ ("HourMetrics" | "MinuteMetrics"), field] => {
                set_metrics_field(self.metrics_mut(group), field, text)?;
            }
            [_, group @ ("HourMetrics" | "MinuteMetrics"), "RetentionPolicy", field] => {
                let metrics = self.metrics_mut(group);
                set_retention_field(&mut metrics.retention_policy, "RetentionPolicy", field, text)?;
            }
            [_, "Cors", "CorsRule", field] => {
                if let Some(rule) = self.rule.as_mut() {
                    match *field {
                        "AllowedOrigins" => rule.allowed_origins = parse_list(field, text)?,
                        "AllowedMethods" => rule.allowed_methods = parse_methods(text)?,
                        "AllowedHeaders" => rule.allowed_headers = parse_list(field, text)?,
                        "ExposedHeaders" => rule.exposed_headers = parse_list(field, text)?,
                        "MaxAgeInSeconds" => rule.max_age_in_seconds = parse_u32(field, text)?,
                        _ => {}
                    }
                    self.rule_fields.insert(field.to_string());
                }
            }
            [_, "Cors", "CorsRule"] => {
                if let Some(child) = CORS_RULE_CHILDREN
                    .iter()
                    .find(|c| !self.rule_fields.contains(**c))
                {
                    return Err(missing(&format!("Cors/CorsRule/{child}")));
                }
                if let Some(rule) = self.rule.take() {
                    self.patch.cors.get_or_insert_with(Vec::new).push(rule);
                }
            }
            [_, "DefaultServiceVersion"] => {
                let version = text.trim();
                self.patch.default_service_version =
                    (!version.is_empty()).then(|| version.to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn metrics_mut(&mut self, group: &str) -> &mut MetricsSettings {
        let slot = if group == "HourMetrics" {
            &mut self.patch.hour_metrics
        } else {
            &mut self.patch.minute_metrics
        };
        slot.get_or_insert_with(MetricsSettings::default)
    }

    /// Every present group must carry its mandatory children.
    fn require_children(&self) -> StorageResult<()> {
        let groups = [
            ("Logging", self.patch.logging.is_some(), LOGGING_CHILDREN),
            ("HourMetrics", self.patch.hour_metrics.is_some(), METRICS_CHILDREN),
            ("MinuteMetrics", self.patch.minute_metrics.is_some(), METRICS_CHILDREN),
        ];
        for (group, present, children) in groups {
            if !present {
                continue;
            }
            for child in children {
                let node = format!("{group}/{child}");
                if !self.seen.contains(&node) {
                    return Err(missing(&node));
                }
            }
        }
        Ok(())
    }
}
