use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ReportSection {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            header: string_field(object, "header"),
            body: string_field(object, "body"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCollectionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_tracking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_encryption: Option<String>,
}

impl DataCollectionDetails {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            location_tracking: string_field(object, "location_tracking"),
            contact_access: string_field(object, "contact_access"),
            data_encryption: string_field(object, "data_encryption"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_risk: Option<ReportSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<ReportSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sharing: Option<ReportSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_collection_details: Option<DataCollectionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<BTreeMap<String, String>>,
}

impl AnalysisReport {
    /// Builds a report from an already unwrapped payload. Anything that is not
    /// an object yields an empty report.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self {
            privacy_risk: object.get("privacy_risk").and_then(ReportSection::from_value),
            security: object.get("security").and_then(ReportSection::from_value),
            data_sharing: object.get("data_sharing").and_then(ReportSection::from_value),
            data_collection_details: object
                .get("data_collection_details")
                .and_then(DataCollectionDetails::from_value),
            recommendations: object.get("recommendations").and_then(recommendations),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.privacy_risk.is_none()
            && self.security.is_none()
            && self.data_sharing.is_none()
            && self.data_collection_details.is_none()
            && self.recommendations.is_none()
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

// Non-string advice entries are dropped.
fn recommendations(value: &Value) -> Option<BTreeMap<String, String>> {
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(key, advice)| advice.as_str().map(|text| (key.clone(), text.to_string())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn builds_full_report() {
        let value = json!({
            "privacy_risk": { "header": "Medium", "body": "Collects usage data" },
            "security": { "header": "Strong", "body": "TLS everywhere" },
            "data_sharing": { "header": "Limited", "body": "Shares with partners" },
            "data_collection_details": {
                "location_tracking": "Precise location when in use",
                "contact_access": "Optional",
                "data_encryption": "At rest and in transit"
            },
            "recommendations": {
                "review_app_permissions": "Turn off location",
                "consider_alternatives": "Try Signal"
            }
        });
        let report = AnalysisReport::from_value(&value);

        assert_eq!(
            report.privacy_risk,
            Some(ReportSection {
                header: Some("Medium".to_string()),
                body: Some("Collects usage data".to_string()),
            })
        );
        assert_eq!(
            report
                .data_collection_details
                .as_ref()
                .and_then(|details| details.contact_access.as_deref()),
            Some("Optional")
        );
        let keys: Vec<&str> = report
            .recommendations
            .as_ref()
            .expect("recommendations")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["consider_alternatives", "review_app_permissions"]);
        assert!(!report.is_empty());
    }

    #[test]
    fn misshapen_fields_are_absent() {
        let value = json!({
            "privacy_risk": "high",
            "security": { "header": 3, "body": "ok" },
            "recommendations": { "a": "keep", "b": 7 }
        });
        let report = AnalysisReport::from_value(&value);

        assert_eq!(report.privacy_risk, None);
        assert_eq!(
            report.security,
            Some(ReportSection {
                header: None,
                body: Some("ok".to_string()),
            })
        );
        assert_eq!(
            report.recommendations,
            Some(BTreeMap::from([("a".to_string(), "keep".to_string())]))
        );
        assert_eq!(report.data_sharing, None);
    }

    #[test]
    fn non_object_payload_is_empty() {
        assert!(AnalysisReport::from_value(&json!([1, 2, 3])).is_empty());
        assert!(AnalysisReport::from_value(&json!("text")).is_empty());
        assert!(AnalysisReport::from_value(&json!({ "a": 1 })).is_empty());
    }
}
