//! In-memory definition registry

use super::fishable::{FhirMetadata, FhirType, Fishable};
use super::implied_extension::{is_implied_extension, materialize_implied_extension};
use super::DefinitionKind;
use crate::config::parse_fhir_version;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

const ALIAS_KEYS: [&str; 3] = ["id", "url", "name"];

/// One kind-specific bucket
///
/// Definitions are appended and addressed through their id, url and name.
/// Re-adding a definition whose aliases all name the same entry overwrites it.
/// Otherwise the shared aliases are re-pointed, and an entry no alias points
/// at any more no longer counts as stored.
#[derive(Debug, Clone, Default)]
struct DefinitionBucket {
    entries: Vec<Value>,
    aliases: HashMap<String, usize>,
}

impl DefinitionBucket {
    fn insert(&mut self, definition: Value) -> bool {
        let keys: Vec<String> = ALIAS_KEYS
            .iter()
            .filter_map(|key| definition.get(*key).and_then(Value::as_str))
            .map(String::from)
            .collect();
        if keys.is_empty() {
            return false;
        }

        let previous: Vec<Option<usize>> = keys
            .iter()
            .map(|key| self.aliases.get(key).copied())
            .collect();
        let replaced = previous[0]
            .filter(|&first| previous.iter().all(|&index| index == Some(first)));
        let index = match replaced {
            Some(index) => {
                self.entries[index] = definition;
                index
            }
            None => {
                self.entries.push(definition);
                self.entries.len() - 1
            }
        };
        for key in keys {
            self.aliases.insert(key, index);
        }
        true
    }

    fn get(&self, item: &str) -> Option<&Value> {
        self.aliases.get(item).map(|&index| &self.entries[index])
    }

    fn live_indices(&self) -> BTreeSet<usize> {
        self.aliases.values().copied().collect()
    }

    fn len(&self) -> usize {
        self.live_indices().len()
    }

    fn all(&self) -> Vec<Value> {
        self.live_indices()
            .into_iter()
            .map(|index| self.entries[index].clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct DefinitionBuckets {
    resources: DefinitionBucket,
    logicals: DefinitionBucket,
    profiles: DefinitionBucket,
    extensions: DefinitionBucket,
    types: DefinitionBucket,
    value_sets: DefinitionBucket,
    code_systems: DefinitionBucket,
    implementation_guides: DefinitionBucket,
}

impl DefinitionBuckets {
    fn insert(&mut self, kind: DefinitionKind, definition: Value) -> bool {
        let bucket = match kind {
            DefinitionKind::PrimitiveType | DefinitionKind::ComplexType => &mut self.types,
            DefinitionKind::Resource => &mut self.resources,
            DefinitionKind::Logical => &mut self.logicals,
            DefinitionKind::Profile => &mut self.profiles,
            DefinitionKind::Extension => &mut self.extensions,
            DefinitionKind::ValueSet => &mut self.value_sets,
            DefinitionKind::CodeSystem => &mut self.code_systems,
            DefinitionKind::ImplementationGuide => &mut self.implementation_guides,
        };
        bucket.insert(definition)
    }

    fn bucket(&self, fhir_type: FhirType) -> Option<&DefinitionBucket> {
        match fhir_type {
            FhirType::Resource => Some(&self.resources),
            FhirType::Logical => Some(&self.logicals),
            FhirType::Type => Some(&self.types),
            FhirType::Profile => Some(&self.profiles),
            FhirType::Extension => Some(&self.extensions),
            FhirType::ValueSet => Some(&self.value_sets),
            FhirType::CodeSystem => Some(&self.code_systems),
            FhirType::Instance => None,
        }
    }

    fn fish(&self, item: &str, types: &[FhirType]) -> Option<Value> {
        FhirType::search_order(types)
            .iter()
            .filter_map(|fhir_type| self.bucket(*fhir_type))
            .find_map(|bucket| bucket.get(item))
            .cloned()
    }

    fn size(&self) -> usize {
        [
            &self.resources,
            &self.logicals,
            &self.profiles,
            &self.extensions,
            &self.types,
            &self.value_sets,
            &self.code_systems,
            &self.implementation_guides,
        ]
        .iter()
        .map(|bucket| bucket.len())
        .sum()
    }
}

/// Which definition kinds a registry accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindRestriction {
    #[default]
    All,
    /// Resources and datatypes only; used for other-version FHIR cores
    ResourcesAndTypes,
}

impl KindRestriction {
    pub fn allows(self, kind: DefinitionKind) -> bool {
        match self {
            KindRestriction::All => true,
            KindRestriction::ResourcesAndTypes => matches!(
                kind,
                DefinitionKind::PrimitiveType
                    | DefinitionKind::ComplexType
                    | DefinitionKind::Resource
            ),
        }
    }
}

/// A version-pinned FHIR core (e.g. R3 while exporting R4) consulted for
/// implied extensions
#[derive(Debug, Clone)]
pub struct SupplementalDefinitions {
    restriction: KindRestriction,
    buckets: DefinitionBuckets,
    pub packages: Vec<String>,
}

impl Default for SupplementalDefinitions {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplementalDefinitions {
    pub fn new() -> Self {
        Self {
            restriction: KindRestriction::ResourcesAndTypes,
            buckets: DefinitionBuckets::default(),
            packages: Vec::new(),
        }
    }

    pub fn restriction(&self) -> KindRestriction {
        self.restriction
    }

    pub fn add(&mut self, definition: Value) -> bool {
        match DefinitionKind::classify(&definition) {
            Some(kind) if self.restriction.allows(kind) => self.buckets.insert(kind, definition),
            _ => false,
        }
    }

    pub fn size(&self) -> usize {
        self.buckets.size()
    }
}

impl Fishable for SupplementalDefinitions {
    fn fish_for_fhir(&self, item: &str, types: &[FhirType]) -> Option<Value> {
        self.buckets.fish(item, types)
    }
}

/// The main definition registry
#[derive(Debug, Clone, Default)]
pub struct FhirDefinitions {
    buckets: DefinitionBuckets,
    predefined_resources: IndexMap<String, Value>,
    supplemental: IndexMap<String, SupplementalDefinitions>,
    package_jsons: HashMap<String, Value>,
    /// Package ids loaded into this registry
    pub packages: Vec<String>,
}

impl FhirDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and store a definition under its id, url and name
    ///
    /// Returns `false` if the definition is not of a kind the registry keeps
    /// or has none of the three alias keys.
    pub fn add(&mut self, definition: Value) -> bool {
        match DefinitionKind::classify(&definition) {
            Some(kind) => self.buckets.insert(kind, definition),
            None => {
                trace!(
                    "Ignoring definition with resourceType {:?}",
                    definition.get("resourceType")
                );
                false
            }
        }
    }

    /// Number of distinct definitions across all buckets
    pub fn size(&self) -> usize {
        self.buckets.size()
    }

    pub fn all_resources(&self) -> Vec<Value> {
        self.buckets.resources.all()
    }

    pub fn all_logicals(&self) -> Vec<Value> {
        self.buckets.logicals.all()
    }

    pub fn all_profiles(&self) -> Vec<Value> {
        self.buckets.profiles.all()
    }

    pub fn all_extensions(&self) -> Vec<Value> {
        self.buckets.extensions.all()
    }

    pub fn all_types(&self) -> Vec<Value> {
        self.buckets.types.all()
    }

    pub fn all_value_sets(&self) -> Vec<Value> {
        self.buckets.value_sets.all()
    }

    pub fn all_code_systems(&self) -> Vec<Value> {
        self.buckets.code_systems.all()
    }

    pub fn all_implementation_guides(&self) -> Vec<Value> {
        self.buckets.implementation_guides.all()
    }

    // === Predefined resources (keyed by originating file) ===

    pub fn add_predefined_resource(&mut self, file: impl Into<String>, definition: Value) {
        self.predefined_resources.insert(file.into(), definition);
    }

    pub fn get_predefined_resource(&self, file: &str) -> Option<Value> {
        self.predefined_resources.get(file).cloned()
    }

    pub fn all_predefined_resources(&self) -> Vec<Value> {
        self.predefined_resources.values().cloned().collect()
    }

    pub fn reset_predefined_resources(&mut self) {
        self.predefined_resources.clear();
    }

    /// Fish, but only accept a hit that is also registered as a predefined resource
    pub fn fish_for_predefined_resource(&self, item: &str, types: &[FhirType]) -> Option<Value> {
        let resource = self.fish_for_fhir(item, types)?;
        let field = |value: &Value, name: &str| value.get(name).cloned();
        self.predefined_resources
            .values()
            .any(|predefined| {
                ["id", "resourceType", "url"]
                    .iter()
                    .all(|name| field(predefined, name) == field(&resource, name))
            })
            .then_some(resource)
    }

    pub fn fish_for_predefined_resource_metadata(
        &self,
        item: &str,
        types: &[FhirType],
    ) -> Option<FhirMetadata> {
        self.fish_for_predefined_resource(item, types)
            .map(|resource| FhirMetadata::from_definition(&resource))
    }

    // === Supplemental FHIR versions ===

    pub fn add_supplemental_fhir_definitions(
        &mut self,
        version_key: impl Into<String>,
        definitions: SupplementalDefinitions,
    ) {
        self.supplemental.insert(version_key.into(), definitions);
    }

    pub fn get_supplemental_fhir_definitions(
        &self,
        version_key: &str,
    ) -> Option<&SupplementalDefinitions> {
        self.supplemental.get(version_key)
    }

    pub fn reset_supplemental_fhir_definitions(&mut self) {
        self.supplemental.clear();
    }

    /// Packages loaded into all supplemental registries
    pub fn supplemental_fhir_packages(&self) -> Vec<String> {
        self.supplemental
            .values()
            .flat_map(|defs| defs.packages.iter().cloned())
            .collect()
    }

    /// Find the supplemental registry for a FHIR `major.minor` version
    ///
    /// Version keys are package coordinates such as `hl7.fhir.r3.core#3.0.2`
    /// or bare versions.
    pub fn supplemental_for_version(
        &self,
        major: u64,
        minor: u64,
    ) -> Option<&SupplementalDefinitions> {
        self.supplemental.iter().find_map(|(key, defs)| {
            let version = key.rsplit('#').next().and_then(parse_fhir_version)?;
            (version.major == major && version.minor == minor).then_some(defs)
        })
    }

    // === package.json store ===

    pub fn add_package_json(&mut self, id: impl Into<String>, package_json: Value) {
        self.package_jsons.insert(id.into(), package_json);
    }

    pub fn get_package_json(&self, id: &str) -> Option<Value> {
        self.package_jsons.get(id).cloned()
    }
}

impl Fishable for FhirDefinitions {
    fn fish_for_fhir(&self, item: &str, types: &[FhirType]) -> Option<Value> {
        if let Some(definition) = self.buckets.fish(item, types) {
            return Some(definition);
        }
        if FhirType::search_order(types).contains(&FhirType::Extension) && is_implied_extension(item)
        {
            return materialize_implied_extension(item, self);
        }
        None
    }
}
