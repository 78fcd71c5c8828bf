//! End-to-end instance export against the fixture package

mod common;

use common::load_test_definitions;
use maki_export::config::{ExportConfiguration, IdSetting, InstanceOptions, MetaProfileSetting};
use maki_export::error::ErrorKind;
use maki_export::export::{InstanceExporter, Package};
use maki_export::fhirtypes::InstanceDefinition;
use maki_export::fshtypes::{
    FixedValueRule, FshCode, FshDocument, FshQuantity, FshReference, FshTank, Instance,
    InstanceUsage, SourceInfo, TextLocation,
};
use serde_json::{Value, json};

const BP_PROFILE: &str = "http://example.org/fhir/StructureDefinition/blood-pressure-obs";
const LOINC: &str = "http://loinc.org";
const UCUM: &str = "http://unitsofmeasure.org";

fn mm_hg(value: f64) -> FshQuantity {
    FshQuantity::new(value).with_unit(
        FshCode::new("mm[Hg]")
            .with_system(UCUM)
            .with_display("mmHg"),
    )
}

fn patient_example() -> Instance {
    Instance::new("PatientExample", "Patient")
        .with_id("pat-1")
        .with_rule(FixedValueRule::new("name[+].family", "Smith"))
        .with_rule(FixedValueRule::new("name[=].given[+]", "John"))
        .with_rule(FixedValueRule::new("name[=].given[+]", "Q"))
        .with_rule(FixedValueRule::new("gender", FshCode::new("male")))
        .with_rule(FixedValueRule::new("birthDate", "1970-01-01"))
        .with_rule(FixedValueRule::new("active", true))
}

fn blood_pressure_example() -> Instance {
    Instance::new("BloodPressureExample", "BloodPressureObservation")
        .with_id("bp-example")
        .with_rule(FixedValueRule::new("status", FshCode::new("final")))
        .with_rule(FixedValueRule::new(
            "subject",
            FshReference::new("PatientExample"),
        ))
        .with_rule(FixedValueRule::new("effectiveDateTime", "2024-01-15"))
        .with_rule(FixedValueRule::new(
            "component[systolic].valueQuantity",
            mm_hg(120.0),
        ))
        .with_rule(FixedValueRule::new(
            "component[diastolic].valueQuantity",
            mm_hg(80.0),
        ))
}

fn bad_observation() -> Instance {
    Instance::new("BadObs", "blood-pressure-obs")
        .with_rule(FixedValueRule::new("status", FshCode::new("final")))
        .with_rule(
            FixedValueRule::new("code", FshCode::new("1234-5").with_system(LOINC))
                .with_source_info(SourceInfo::new(
                    "observations.fsh",
                    TextLocation::lines(12, 12),
                )),
        )
        .with_source_info(SourceInfo::new(
            "observations.fsh",
            TextLocation::lines(9, 12),
        ))
}

fn inline_observation() -> Instance {
    Instance::new("InlineObs", "BloodPressureObservation")
        .with_usage(InstanceUsage::Inline)
        .with_rule(FixedValueRule::new("status", FshCode::new("final")))
}

fn tank_with(options: InstanceOptions) -> FshTank {
    let mut patients = FshDocument::new("patients.fsh");
    patients.add_instance(patient_example());

    let mut observations = FshDocument::new("observations.fsh");
    observations.add_instance(blood_pressure_example());
    observations.add_instance(bad_observation());
    observations.add_instance(Instance::new("Orphan", "NoSuchProfile"));
    observations.add_instance(inline_observation());

    let config = ExportConfiguration {
        fhir_version: vec!["4.0.1".to_string()],
        instance_options: options,
        ..Default::default()
    };
    FshTank::new(vec![patients, observations], config)
}

fn export_one(tank: &FshTank, name: &str) -> InstanceDefinition {
    let defs = load_test_definitions();
    let exporter = InstanceExporter::new(tank, &defs);
    exporter
        .export_instance(tank.fish_for_instance(name).unwrap())
        .unwrap()
}

fn loinc_concept(code: &str) -> Value {
    json!({ "coding": [{ "system": LOINC, "code": code }] })
}

#[test]
fn test_patient_with_soft_indexing() {
    let tank = tank_with(InstanceOptions::default());
    let patient = export_one(&tank, "PatientExample");

    assert!(patient.meta_profiles().is_empty());
    insta::assert_json_snapshot!(patient.to_json(), @r#"
    {
      "resourceType": "Patient",
      "id": "pat-1",
      "name": [
        {
          "family": "Smith",
          "given": [
            "John",
            "Q"
          ]
        }
      ],
      "gender": "male",
      "birthDate": "1970-01-01",
      "active": true
    }
    "#);
}

#[test]
fn test_profile_instance_gets_cascaded_values() {
    let tank = tank_with(InstanceOptions::default());
    let observation = export_one(&tank, "BloodPressureExample");

    assert_eq!(
        observation.to_json(),
        json!({
            "resourceType": "Observation",
            "id": "bp-example",
            "meta": { "profile": [BP_PROFILE] },
            "status": "final",
            "subject": { "reference": "Patient/pat-1" },
            "effectiveDateTime": "2024-01-15",
            "component": [
                {
                    "valueQuantity": {
                        "value": 120.0,
                        "code": "mm[Hg]",
                        "system": UCUM,
                        "unit": "mmHg"
                    },
                    "code": loinc_concept("8480-6")
                },
                {
                    "valueQuantity": {
                        "value": 80.0,
                        "code": "mm[Hg]",
                        "system": UCUM,
                        "unit": "mmHg"
                    },
                    "code": loinc_concept("8462-4")
                }
            ],
            "category": [{
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/observation-category",
                    "code": "vital-signs"
                }]
            }],
            "code": loinc_concept("85354-9")
        })
    );
}

#[test]
fn test_no_slice_markers_remain() {
    let tank = tank_with(InstanceOptions::default());
    let observation = export_one(&tank, "BloodPressureExample");
    let text = serde_json::to_string(&observation).unwrap();
    assert!(!text.contains("_sliceName"));
}

#[test]
fn test_export_is_repeatable() {
    let defs = load_test_definitions();
    let tank = tank_with(InstanceOptions::default());
    let exporter = InstanceExporter::new(&tank, &defs);
    let instance = tank.fish_for_instance("BloodPressureExample").unwrap();

    let first = exporter.export_instance(instance).unwrap();
    let second = exporter.export_instance(instance).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_matching_pattern_rule_is_accepted() {
    let mut doc = FshDocument::new("observations.fsh");
    doc.add_instance(
        Instance::new("Explicit", "blood-pressure-obs")
            .with_rule(FixedValueRule::new("code", FshCode::new("85354-9").with_system(LOINC))),
    );
    let tank = FshTank::new(vec![doc], ExportConfiguration::default());
    let observation = export_one(&tank, "Explicit");

    assert_eq!(observation.get("code"), Some(&loinc_concept("85354-9")));
}

#[test]
fn test_pattern_code_with_display_is_accepted() {
    let mut doc = FshDocument::new("observations.fsh");
    doc.add_instance(
        Instance::new("WithDisplay", "blood-pressure-obs").with_rule(FixedValueRule::new(
            "code",
            FshCode::new("85354-9")
                .with_system(LOINC)
                .with_display("Blood pressure panel"),
        )),
    );
    let tank = FshTank::new(vec![doc], ExportConfiguration::default());
    let observation = export_one(&tank, "WithDisplay");

    let coding = &observation.get("code").unwrap()["coding"];
    assert_eq!(coding.as_array().map(Vec::len), Some(1));
    assert_eq!(coding[0]["system"], LOINC);
    assert_eq!(coding[0]["code"], "85354-9");
    assert_eq!(coding[0]["display"], "Blood pressure panel");
}

#[test]
fn test_extension_url_cascades_from_fhirpath_typed_element() {
    let mut doc = FshDocument::new("extensions.fsh");
    doc.add_instance(
        Instance::new("ExtInst", "PatientNickname")
            .with_rule(FixedValueRule::new("valueString", "hi")),
    );
    let tank = FshTank::new(vec![doc], ExportConfiguration::default());
    let extension = export_one(&tank, "ExtInst");

    assert_eq!(extension.get("valueString"), Some(&json!("hi")));
    assert_eq!(
        extension.get("url"),
        Some(&json!("http://example.org/fhir/StructureDefinition/patient-nickname"))
    );
}

#[test]
fn test_failed_rule_reports_location() {
    let defs = load_test_definitions();
    let tank = tank_with(InstanceOptions::default());
    let exporter = InstanceExporter::new(&tank, &defs);

    let err = exporter
        .export_instance(tank.fish_for_instance("BadObs").unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let message = err.to_string();
    assert!(message.contains("observations.fsh:12 - 12"), "{message}");
    assert!(
        message.contains("Cannot fix http://loinc.org#1234-5 to this element"),
        "{message}"
    );
}

#[test]
fn test_failures_only_drop_the_failing_instance() {
    let defs = load_test_definitions();
    let tank = tank_with(InstanceOptions::default());
    let exporter = InstanceExporter::new(&tank, &defs);
    let mut package = Package::new(tank.config.clone());

    let summary = exporter.export(&mut package);

    assert_eq!(summary.exported, 3);
    assert_eq!(summary.failed, vec!["BadObs".to_string(), "Orphan".to_string()]);
    assert!(summary.has_failures());
    let names: Vec<&str> = package
        .instances
        .iter()
        .map(|instance| instance.instance_name.as_str())
        .collect();
    assert_eq!(names, vec!["PatientExample", "BloodPressureExample", "InlineObs"]);
}

#[test]
fn test_already_exported_instances_are_skipped() {
    let defs = load_test_definitions();
    let tank = tank_with(InstanceOptions::default());
    let exporter = InstanceExporter::new(&tank, &defs);
    let mut package = Package::default();
    package.add_instance(InstanceDefinition::new(
        "Patient",
        "PatientExample",
        InstanceUsage::Example,
    ));

    let summary = exporter.export(&mut package);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.exported, 2);
    assert!(package.find_instance("PatientExample").unwrap().id().is_none());
}

#[test]
fn test_parallel_export_matches_sequential() {
    let defs = load_test_definitions();
    let tank = tank_with(InstanceOptions::default());

    let mut sequential = Package::default();
    let sequential_summary = InstanceExporter::new(&tank, &defs).export(&mut sequential);
    let mut parallel = Package::default();
    let parallel_summary = InstanceExporter::new(&tank, &defs).export_parallel(&mut parallel);

    assert_eq!(sequential_summary, parallel_summary);
    assert_eq!(sequential.instances_json(), parallel.instances_json());
}

#[test]
fn test_instance_options() {
    let cases = [
        (MetaProfileSetting::Always, IdSetting::Always, true, true, true),
        (MetaProfileSetting::Never, IdSetting::Always, false, false, true),
        (MetaProfileSetting::InlineOnly, IdSetting::Always, false, true, true),
        (MetaProfileSetting::StandaloneOnly, IdSetting::StandaloneOnly, true, false, false),
    ];

    for (set_meta_profile, set_id, standalone_meta, inline_meta, inline_id) in cases {
        let tank = tank_with(InstanceOptions {
            set_meta_profile,
            set_id,
        });
        let standalone = export_one(&tank, "BloodPressureExample");
        let inline = export_one(&tank, "InlineObs");

        assert_eq!(
            !standalone.meta_profiles().is_empty(),
            standalone_meta,
            "{set_meta_profile:?}"
        );
        assert_eq!(!inline.meta_profiles().is_empty(), inline_meta, "{set_meta_profile:?}");
        assert_eq!(inline.id().is_some(), inline_id, "{set_id:?}");
        assert_eq!(standalone.id(), Some("bp-example"));
    }
}

#[test]
fn test_code_system_names_and_padding() {
    let mut doc = FshDocument::new("misc.fsh");
    doc.add_instance(
        Instance::new("ClinicalObs", "Observation")
            .with_id("obs-clinical")
            .with_rule(FixedValueRule::new("status", FshCode::new("final")))
            .with_rule(FixedValueRule::new(
                "valueCodeableConcept",
                FshCode::new("active").with_system("AllergyIntoleranceClinicalStatusCodes"),
            )),
    );
    doc.add_instance(
        Instance::new("SecondName", "Patient")
            .with_rule(FixedValueRule::new("name[1].family", "Doe")),
    );
    let tank = FshTank::new(vec![doc], ExportConfiguration::default());

    let observation = export_one(&tank, "ClinicalObs");
    assert_eq!(
        observation.to_json(),
        json!({
            "resourceType": "Observation",
            "id": "obs-clinical",
            "status": "final",
            "valueCodeableConcept": {
                "coding": [{
                    "code": "active",
                    "system": "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical"
                }]
            }
        })
    );

    // Padding entries that never get content are exported as null
    let patient = export_one(&tank, "SecondName");
    assert_eq!(
        patient.get("name"),
        Some(&json!([null, { "family": "Doe" }]))
    );
}
