//! Implied cross-version extensions
//!
//! `http://hl7.org/fhir/3.0/StructureDefinition/extension-Patient.animal.species`
//! names an extension that represents the STU3 element `Patient.animal.species`
//! in another FHIR version. No package defines it; it is built on request
//! from the element in the matching supplemental FHIR core.

use super::definitions::FhirDefinitions;
use super::fishable::{FhirType, Fishable};
use crate::config::parse_fhir_version;
use crate::fhirtypes::StructureDefinition;
use crate::result::ResultExt;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use tracing::warn;

static IMPLIED_EXTENSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^http://hl7\.org/fhir/(1\.0|3\.0|4\.0|4\.3|5\.0)/StructureDefinition/extension-([A-Za-z][A-Za-z0-9]*(?:\.[A-Za-z][A-Za-z0-9]*(?:\[x\])?)*)$",
    )
    .unwrap()
});

const EXTENSION_URL: &str = "http://hl7.org/fhir/StructureDefinition/Extension";

pub fn is_implied_extension(url: &str) -> bool {
    IMPLIED_EXTENSION_REGEX.is_match(url)
}

/// Build the Extension StructureDefinition an implied extension URL stands for
///
/// Returns `None` (after logging why) when the FHIR version is not loaded as
/// a supplemental core, the element does not exist, or the element has
/// children of its own.
pub fn materialize_implied_extension(url: &str, defs: &FhirDefinitions) -> Option<Value> {
    let captures = IMPLIED_EXTENSION_REGEX.captures(url)?;
    let version_label = captures.get(1)?.as_str();
    let element_id = captures.get(2)?.as_str();
    let version = parse_fhir_version(version_label)?;

    let Some(supplemental) = defs.supplemental_for_version(version.major, version.minor) else {
        warn!(
            "Cannot materialize implied extension {url}: FHIR {version_label} definitions are not loaded"
        );
        return None;
    };

    let Some((root, element_path)) = element_id.split_once('.') else {
        warn!("Cannot materialize implied extension {url}: {element_id} is not an element");
        return None;
    };
    let Some(definition) = supplemental.fish_for_fhir(root, &[FhirType::Resource, FhirType::Type])
    else {
        warn!("Cannot materialize implied extension {url}: FHIR {version_label} has no {root}");
        return None;
    };

    let mut structure = StructureDefinition::from_json(&definition).log_and_continue()?;
    let element = structure
        .find_element_by_path(element_path, supplemental)
        .log_and_continue()?
        .clone();
    if !structure.children(&element.id, true).is_empty() {
        warn!(
            "Cannot materialize implied extension {url}: {} has child elements",
            element.id
        );
        return None;
    }

    let name = format!(
        "Extension_{}",
        element_id.replace("[x]", "").replace('.', "_")
    );
    let context = element_id
        .rsplit_once('.')
        .map_or(root, |(parent, _)| parent);
    let description = element
        .property("definition")
        .or_else(|| element.property("short"))
        .cloned()
        .unwrap_or_else(|| json!(format!("Implied extension for {element_id}")));

    Some(json!({
        "resourceType": "StructureDefinition",
        "id": format!("extension-{element_id}"),
        "url": url,
        "version": version.to_string(),
        "name": name,
        "title": format!("Implied extension for {element_id}"),
        "status": "active",
        "description": description,
        "kind": "complex-type",
        "abstract": false,
        "context": [{ "type": "element", "expression": context }],
        "type": "Extension",
        "baseDefinition": EXTENSION_URL,
        "derivation": "constraint",
        "snapshot": {
            "element": [
                {
                    "id": "Extension",
                    "path": "Extension",
                    "short": element.property("short").cloned().unwrap_or(Value::Null),
                    "min": 0,
                    "max": element.max.clone().unwrap_or_else(|| "*".to_string())
                },
                {
                    "id": "Extension.url",
                    "path": "Extension.url",
                    "min": 1,
                    "max": "1",
                    "type": [{ "code": "uri" }],
                    "fixedUri": url
                },
                {
                    "id": "Extension.value[x]",
                    "path": "Extension.value[x]",
                    "min": element.min.unwrap_or(0).min(1),
                    "max": "1",
                    "type": element.types
                }
            ]
        }
    }))
}
