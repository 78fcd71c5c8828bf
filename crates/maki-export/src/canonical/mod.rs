//! Definition registry and fishing
//!
//! [`FhirDefinitions`] stores every loaded StructureDefinition, ValueSet,
//! CodeSystem and ImplementationGuide in kind-specific buckets and answers
//! [`Fishable`] lookups by id, canonical URL or name.

mod definitions;
mod fishable;
mod implied_extension;

pub use definitions::{FhirDefinitions, KindRestriction, SupplementalDefinitions};
pub use fishable::{DEFAULT_FISHING_ORDER, FhirMetadata, FhirType, Fishable};
pub use implied_extension::{is_implied_extension, materialize_implied_extension};

use serde_json::Value;

pub(crate) const ELEMENT_BASE_DEFINITION: &str = "http://hl7.org/fhir/StructureDefinition/Element";

/// Closed set of definition kinds the registry distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
    Profile,
    Extension,
    ValueSet,
    CodeSystem,
    ImplementationGuide,
}

impl DefinitionKind {
    /// Classify a raw definition, or `None` if the registry does not keep it
    pub fn classify(definition: &Value) -> Option<Self> {
        let field = |name: &str| definition.get(name).and_then(Value::as_str);

        match field("resourceType")? {
            "StructureDefinition" => {
                if field("type") == Some("Extension")
                    && field("baseDefinition") != Some(ELEMENT_BASE_DEFINITION)
                {
                    return Some(DefinitionKind::Extension);
                }
                match (field("kind")?, field("derivation")) {
                    ("primitive-type", _) => Some(DefinitionKind::PrimitiveType),
                    ("complex-type" | "datatype", _) => Some(DefinitionKind::ComplexType),
                    ("resource", Some("constraint")) => Some(DefinitionKind::Profile),
                    ("resource", _) => Some(DefinitionKind::Resource),
                    ("logical", Some("specialization")) => Some(DefinitionKind::Logical),
                    ("logical", _) => Some(DefinitionKind::Profile),
                    _ => None,
                }
            }
            "ValueSet" => Some(DefinitionKind::ValueSet),
            "CodeSystem" => Some(DefinitionKind::CodeSystem),
            "ImplementationGuide" => Some(DefinitionKind::ImplementationGuide),
            _ => None,
        }
    }

    /// Which fishing type finds definitions of this kind
    pub fn fhir_type(self) -> Option<FhirType> {
        match self {
            DefinitionKind::PrimitiveType | DefinitionKind::ComplexType => Some(FhirType::Type),
            DefinitionKind::Resource => Some(FhirType::Resource),
            DefinitionKind::Logical => Some(FhirType::Logical),
            DefinitionKind::Profile => Some(FhirType::Profile),
            DefinitionKind::Extension => Some(FhirType::Extension),
            DefinitionKind::ValueSet => Some(FhirType::ValueSet),
            DefinitionKind::CodeSystem => Some(FhirType::CodeSystem),
            DefinitionKind::ImplementationGuide => None,
        }
    }
}
