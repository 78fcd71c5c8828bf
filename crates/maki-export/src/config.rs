//! Export configuration (`sushi-config.yaml` subset)
//!
//! Only the properties the instance exporter consults are modelled here.
//! Anything else in the file is ignored on deserialization.
//!
//! # Example
//!
//! ```yaml
//! fhirVersion: 4.0.1
//! instanceOptions:
//!   setMetaProfile: inline-only
//!   setId: standalone-only
//! ```

use crate::fshtypes::InstanceUsage;
use semver::Version;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfiguration {
    /// FHIR version(s); a single string is accepted as a one-element list
    #[serde(default, deserialize_with = "deserialize_fhir_version")]
    pub fhir_version: Vec<String>,

    #[serde(default)]
    pub instance_options: InstanceOptions,
}

fn deserialize_fhir_version<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FhirVersionValue {
        Single(String),
        Multiple(Vec<String>),
    }

    match FhirVersionValue::deserialize(deserializer)? {
        FhirVersionValue::Single(s) => Ok(vec![s]),
        FhirVersionValue::Multiple(v) if v.is_empty() => {
            Err(D::Error::custom("fhirVersion array cannot be empty"))
        }
        FhirVersionValue::Multiple(v) => Ok(v),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOptions {
    /// When to set meta.profile on constraint instances
    #[serde(default)]
    pub set_meta_profile: MetaProfileSetting,

    /// When to copy the authored id onto the instance
    #[serde(default)]
    pub set_id: IdSetting,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MetaProfileSetting {
    #[default]
    Always,
    Never,
    InlineOnly,
    StandaloneOnly,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IdSetting {
    #[default]
    Always,
    StandaloneOnly,
}

impl InstanceOptions {
    pub fn sets_meta_profile(&self, usage: InstanceUsage) -> bool {
        match self.set_meta_profile {
            MetaProfileSetting::Always => true,
            MetaProfileSetting::Never => false,
            MetaProfileSetting::InlineOnly => usage.is_inline(),
            MetaProfileSetting::StandaloneOnly => !usage.is_inline(),
        }
    }

    pub fn sets_id(&self, usage: InstanceUsage) -> bool {
        match self.set_id {
            IdSetting::Always => true,
            IdSetting::StandaloneOnly => !usage.is_inline(),
        }
    }
}

impl ExportConfiguration {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

/// Parse a FHIR version, accepting `major.minor` as well as full semver
pub fn parse_fhir_version(version: &str) -> Option<Version> {
    Version::parse(version)
        .or_else(|_| Version::parse(&format!("{version}.0")))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let yaml = r#"
canonical: http://example.org/fhir/example-ig
fhirVersion: 4.0.1
"#;

        let config = ExportConfiguration::from_yaml(yaml).unwrap();
        assert_eq!(config.fhir_version, vec!["4.0.1"]);
        assert_eq!(config.instance_options, InstanceOptions::default());
    }

    #[test]
    fn test_full_config_keeps_exporter_properties() {
        let yaml = r#"
canonical: http://example.org/fhir/example-ig
fhirVersion:
  - 4.0.1
  - 4.3.0
id: example.fhir.ig
status: draft
dependencies:
  hl7.fhir.us.core: 5.0.1
instanceOptions:
  setMetaProfile: inline-only
  setId: standalone-only
"#;

        let config = ExportConfiguration::from_yaml(yaml).unwrap();
        assert_eq!(config.fhir_version, vec!["4.0.1", "4.3.0"]);
        assert_eq!(
            config.instance_options.set_meta_profile,
            MetaProfileSetting::InlineOnly
        );
        assert_eq!(config.instance_options.set_id, IdSetting::StandaloneOnly);
    }

    #[test]
    fn test_empty_fhir_version_list_is_rejected() {
        let yaml = r#"
fhirVersion: []
"#;
        assert!(ExportConfiguration::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_instance_option_usage_matrix() {
        let inline_only = InstanceOptions {
            set_meta_profile: MetaProfileSetting::InlineOnly,
            set_id: IdSetting::StandaloneOnly,
        };
        assert!(inline_only.sets_meta_profile(InstanceUsage::Inline));
        assert!(!inline_only.sets_meta_profile(InstanceUsage::Example));
        assert!(!inline_only.sets_id(InstanceUsage::Inline));
        assert!(inline_only.sets_id(InstanceUsage::Definition));

        let never = InstanceOptions {
            set_meta_profile: MetaProfileSetting::Never,
            ..Default::default()
        };
        assert!(!never.sets_meta_profile(InstanceUsage::Example));
        assert!(never.sets_id(InstanceUsage::Inline));
    }

    #[test]
    fn test_parse_fhir_version() {
        assert_eq!(parse_fhir_version("4.0.1"), Some(Version::new(4, 0, 1)));
        assert_eq!(parse_fhir_version("3.0"), Some(Version::new(3, 0, 0)));
        assert!(parse_fhir_version("4").is_none());
        assert!(parse_fhir_version("invalid").is_none());
    }
}
