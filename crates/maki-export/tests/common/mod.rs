//! Shared helpers for the integration tests

#![allow(dead_code)]

use maki_export::canonical::{FhirDefinitions, FhirType, Fishable};
use maki_export::fhirtypes::StructureDefinition;
use maki_export::load::load_from_path;
use std::path::PathBuf;

pub const TEST_PACKAGE: &str = "test.defs#1.0.0";

pub fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/testdefs")
}

/// Registry loaded with the fixture package
pub fn load_test_definitions() -> FhirDefinitions {
    let mut defs = FhirDefinitions::new();
    load_from_path(&fixture_root(), TEST_PACKAGE, &mut defs).expect("fixture package loads");
    defs
}

/// Element tree of a fixture StructureDefinition
pub fn structure(defs: &FhirDefinitions, name: &str) -> StructureDefinition {
    let json = defs
        .fish_for_fhir(
            name,
            &[FhirType::Resource, FhirType::Type, FhirType::Profile, FhirType::Extension],
        )
        .unwrap_or_else(|| panic!("{name} is in the fixture package"));
    StructureDefinition::from_json(&json).expect("fixture definitions are valid")
}
