use crate::fshtypes::InstanceUsage;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// An exported instance: a FHIR JSON document plus the authoring metadata
/// the exporter needs
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDefinition {
    /// Name of the authored instance
    pub instance_name: String,
    pub usage: InstanceUsage,
    content: Value,
}

impl InstanceDefinition {
    pub fn new(
        resource_type: impl Into<String>,
        instance_name: impl Into<String>,
        usage: InstanceUsage,
    ) -> Self {
        let mut content = Map::new();
        content.insert("resourceType".to_string(), json!(resource_type.into()));
        Self {
            instance_name: instance_name.into(),
            usage,
            content: Value::Object(content),
        }
    }

    pub fn resource_type(&self) -> &str {
        self.content["resourceType"].as_str().unwrap_or_default()
    }

    pub fn id(&self) -> Option<&str> {
        self.content.get("id").and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.content["id"] = json!(id.into());
    }

    pub fn meta_profiles(&self) -> Vec<&str> {
        self.content
            .pointer("/meta/profile")
            .and_then(Value::as_array)
            .map(|profiles| profiles.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn set_meta_profile(&mut self, url: impl Into<String>) {
        self.content["meta"] = json!({ "profile": [url.into()] });
    }

    /// A top-level field of the document
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    pub(crate) fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    pub fn to_json(&self) -> Value {
        self.content.clone()
    }

    pub fn into_json(self) -> Value {
        self.content
    }
}

impl Serialize for InstanceDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.content.serialize(serializer)
    }
}
