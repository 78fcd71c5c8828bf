//! Fishable trait for definition lookups
//!
//! "Fishing" resolves an identifier (id, canonical URL or name) to a
//! definition, searching the requested kinds in the order given. Every hit is
//! an owned copy; callers are free to mutate what they get back.
//!
//! # Example
//!
//! ```rust
//! use maki_export::canonical::{FhirDefinitions, FhirType, Fishable};
//! use serde_json::json;
//!
//! let mut defs = FhirDefinitions::new();
//! defs.add(json!({
//!     "resourceType": "StructureDefinition",
//!     "id": "Patient",
//!     "url": "http://hl7.org/fhir/StructureDefinition/Patient",
//!     "name": "Patient",
//!     "kind": "resource",
//!     "derivation": "specialization",
//!     "type": "Patient"
//! }));
//!
//! let patient = defs.fish_for_fhir("Patient", &[FhirType::Resource]);
//! assert!(patient.is_some());
//!
//! let metadata = defs.fish_for_metadata("Patient", &[]).unwrap();
//! assert_eq!(metadata.sd_type.as_deref(), Some("Patient"));
//! ```

use serde_json::Value;

/// Definition type filter for fishing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FhirType {
    /// StructureDefinition with kind=resource, not a constraint
    Resource,
    /// Primitive and complex datatypes
    Type,
    /// StructureDefinition constraining a resource or logical model
    Profile,
    /// StructureDefinition constraining Extension
    Extension,
    ValueSet,
    CodeSystem,
    /// Logical model (kind=logical, derivation=specialization)
    Logical,
    /// Authored instance; never resolves against the definition registry
    Instance,
}

/// Search order used when no types are requested
pub const DEFAULT_FISHING_ORDER: [FhirType; 7] = [
    FhirType::Resource,
    FhirType::Logical,
    FhirType::Type,
    FhirType::Profile,
    FhirType::Extension,
    FhirType::ValueSet,
    FhirType::CodeSystem,
];

impl FhirType {
    /// Get a display name for this FHIR type
    pub fn display_name(&self) -> &'static str {
        match self {
            FhirType::Resource => "Resource",
            FhirType::Type => "Type",
            FhirType::Profile => "Profile",
            FhirType::Extension => "Extension",
            FhirType::ValueSet => "ValueSet",
            FhirType::CodeSystem => "CodeSystem",
            FhirType::Logical => "Logical",
            FhirType::Instance => "Instance",
        }
    }

    /// Expand an empty filter to the default order
    pub fn search_order(types: &[FhirType]) -> &[FhirType] {
        if types.is_empty() {
            &DEFAULT_FISHING_ORDER
        } else {
            types
        }
    }
}

/// Lightweight projection of a fished definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FhirMetadata {
    pub id: Option<String>,
    pub name: Option<String>,
    /// StructureDefinition `type`
    pub sd_type: Option<String>,
    pub url: Option<String>,
    /// StructureDefinition `baseDefinition`
    pub parent: Option<String>,
    pub is_abstract: Option<bool>,
    pub resource_type: Option<String>,
}

impl FhirMetadata {
    pub fn from_definition(definition: &Value) -> Self {
        let text = |name: &str| {
            definition
                .get(name)
                .and_then(Value::as_str)
                .map(String::from)
        };

        Self {
            id: text("id"),
            name: text("name"),
            sd_type: text("type"),
            url: text("url"),
            parent: text("baseDefinition"),
            is_abstract: definition.get("abstract").and_then(Value::as_bool),
            resource_type: text("resourceType"),
        }
    }
}

/// Unified interface for definition lookups
pub trait Fishable: Send + Sync {
    /// Fish for a definition by id, canonical URL or name
    ///
    /// `types` is searched in order; an empty slice means
    /// [`DEFAULT_FISHING_ORDER`]. Returns an owned copy of the first match.
    fn fish_for_fhir(&self, item: &str, types: &[FhirType]) -> Option<Value>;

    /// Fish for metadata only
    fn fish_for_metadata(&self, item: &str, types: &[FhirType]) -> Option<FhirMetadata> {
        self.fish_for_fhir(item, types)
            .map(|definition| FhirMetadata::from_definition(&definition))
    }
}
