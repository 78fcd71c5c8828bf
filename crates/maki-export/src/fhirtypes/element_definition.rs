//! One node of an element tree and value fixing onto it

use super::type_table::{
    CODE_TYPES, DATE_TIME_TYPES, QUANTITY_TYPES, STRING_TYPES, fixed_value_keys,
};
use crate::error::MakiExportError;
use crate::fshtypes::{FshCode, FshValue};
use crate::result::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;

static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12][0-9]|3[01]))?)?$").unwrap()
});

static DATE_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9]{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12][0-9]|3[01])(T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?(Z|[+-]((0[0-9]|1[0-3]):[0-5][0-9]|14:00)))?)?)?$",
    )
    .unwrap()
});

static TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?$").unwrap()
});

static INSTANT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?(Z|[+-]((0[0-9]|1[0-3]):[0-5][0-9]|14:00))$",
    )
    .unwrap()
});

const FHIR_TYPE_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type";

/// `ElementDefinition.type` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionType {
    pub code: String,

    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub profile: Vec<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub target_profile: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ElementDefinitionType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// FHIR type name, resolving FHIRPath system types through the
    /// `structuredefinition-fhir-type` extension
    ///
    /// R4 snapshots type `Extension.url` and every `.id` as
    /// `http://hl7.org/fhirpath/System.String` and carry `uri`/`string` there.
    pub fn fhir_type(&self) -> &str {
        self.extra
            .get("extension")
            .and_then(Value::as_array)
            .and_then(|extensions| {
                extensions.iter().find(|extension| {
                    extension.get("url").and_then(Value::as_str) == Some(FHIR_TYPE_EXTENSION)
                })
            })
            .and_then(|extension| extension.get("valueUrl").or_else(|| extension.get("valueUri")))
            .and_then(Value::as_str)
            .unwrap_or(&self.code)
    }
}

/// STU3 writes `profile`/`targetProfile` as a single uri
fn deserialize_one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(uri) => vec![uri],
        OneOrMany::Many(uris) => uris,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedMode {
    Fixed,
    Pattern,
}

/// The single fixed[x] or pattern[x] slot of an element
#[derive(Debug, Clone, PartialEq)]
pub struct FixedValue {
    pub mode: FixedMode,
    pub type_code: String,
    pub value: Value,
}

impl FixedValue {
    pub fn fixed(type_code: impl Into<String>, value: Value) -> Self {
        Self {
            mode: FixedMode::Fixed,
            type_code: type_code.into(),
            value,
        }
    }

    pub fn pattern(type_code: impl Into<String>, value: Value) -> Self {
        Self {
            mode: FixedMode::Pattern,
            type_code: type_code.into(),
            value,
        }
    }

    /// ElementDefinition property name, e.g. `patternCodeableConcept`
    pub fn key(&self) -> Option<&'static str> {
        fixed_value_keys(&self.type_code).map(|keys| match self.mode {
            FixedMode::Fixed => keys.fixed,
            FixedMode::Pattern => keys.pattern,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementDefinition {
    pub id: String,
    pub path: String,
    pub slice_name: Option<String>,
    pub min: Option<u32>,
    pub max: Option<String>,
    pub types: Vec<ElementDefinitionType>,
    pub content_reference: Option<String>,
    fixed: Option<FixedValue>,
    /// Every other property of the source JSON, untouched
    extra: Map<String, Value>,
}

impl ElementDefinition {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            slice_name: None,
            min: None,
            max: None,
            types: Vec::new(),
            content_reference: None,
            fixed: None,
            extra: Map::new(),
        }
    }

    pub fn from_json(json: &Value) -> Result<Self> {
        let mut extra = json
            .as_object()
            .cloned()
            .ok_or_else(|| MakiExportError::invalid_definition("element is not a JSON object"))?;

        let path = take_string(&mut extra, "path")
            .ok_or_else(|| MakiExportError::invalid_definition("element has no path"))?;
        let id = take_string(&mut extra, "id").unwrap_or_else(|| path.clone());
        let slice_name = take_string(&mut extra, "sliceName");
        let min = extra
            .shift_remove("min")
            .and_then(|min| min.as_u64())
            .and_then(|min| u32::try_from(min).ok());
        let max = take_string(&mut extra, "max");
        let types: Vec<ElementDefinitionType> = match extra.shift_remove("type") {
            Some(types) => serde_json::from_value(types)?,
            None => Vec::new(),
        };
        let content_reference = take_string(&mut extra, "contentReference");

        let fixed = match types.as_slice() {
            [single] => {
                let type_code = single.fhir_type();
                fixed_value_keys(type_code).and_then(|keys| {
                    if let Some(value) = extra.shift_remove(keys.fixed) {
                        Some(FixedValue::fixed(type_code, value))
                    } else {
                        extra
                            .shift_remove(keys.pattern)
                            .map(|value| FixedValue::pattern(type_code, value))
                    }
                })
            }
            _ => None,
        };

        Ok(Self {
            id,
            path,
            slice_name,
            min,
            max,
            types,
            content_reference,
            fixed,
            extra,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert("id".to_string(), json!(self.id));
        json.insert("path".to_string(), json!(self.path));
        if let Some(slice_name) = &self.slice_name {
            json.insert("sliceName".to_string(), json!(slice_name));
        }
        if let Some(min) = self.min {
            json.insert("min".to_string(), json!(min));
        }
        if let Some(max) = &self.max {
            json.insert("max".to_string(), json!(max));
        }
        if !self.types.is_empty() {
            json.insert("type".to_string(), json!(self.types));
        }
        if let Some(content_reference) = &self.content_reference {
            json.insert("contentReference".to_string(), json!(content_reference));
        }
        if let Some((key, fixed)) = self
            .fixed
            .as_ref()
            .and_then(|fixed| fixed.key().map(|key| (key, fixed)))
        {
            json.insert(key.to_string(), fixed.value.clone());
        }
        for (key, value) in &self.extra {
            json.insert(key.clone(), value.clone());
        }
        Value::Object(json)
    }

    /// Any other property of the source element (`short`, `binding`, ...)
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn fixed_value(&self) -> Option<&FixedValue> {
        self.fixed.as_ref()
    }

    pub fn fixed_json(&self) -> Option<&Value> {
        self.fixed.as_ref().map(|fixed| &fixed.value)
    }

    /// Whether the element repeats (max other than 0 or 1)
    pub fn is_array(&self) -> bool {
        self.max
            .as_deref()
            .is_some_and(|max| max != "0" && max != "1")
    }

    /// Last id segment without its slice name, e.g. `value[x]` for
    /// `Observation.value[x]:valueQuantity`
    pub fn base_name(&self) -> &str {
        let last = self.id.rsplit('.').next().unwrap_or(&self.id);
        last.split(':').next().unwrap_or(last)
    }

    /// JSON property this element occupies in an instance
    ///
    /// Choice elements only have one once they are down to a single type.
    pub fn instance_property_name(&self) -> Option<String> {
        let base = self.base_name();
        match base.strip_suffix("[x]") {
            Some(prefix) => match self.types.as_slice() {
                [single] => Some(format!("{prefix}{}", upper_first(&single.code))),
                _ => None,
            },
            None => Some(base.to_string()),
        }
    }

    /// Fix a code, as `#code` or `system#code`
    pub fn fix_fsh_code(&mut self, code: &FshCode) -> Result<()> {
        self.fix_value(&FshValue::Code(code.clone()))
    }

    /// Fix any authored value; the element is unchanged on error
    pub fn fix_value(&mut self, value: &FshValue) -> Result<()> {
        let candidate = self.coerce(value)?;
        self.assign_fixed(candidate, value)
    }

    /// Type-check and convert a value into the fixed/pattern slot it would occupy
    pub fn coerce(&self, value: &FshValue) -> Result<FixedValue> {
        let type_code = match self.types.as_slice() {
            [single] => single.fhir_type(),
            _ => return Err(MakiExportError::no_single_type(value.type_name())),
        };
        let mismatch = || MakiExportError::type_mismatch(value.to_string(), value.type_name(), type_code);

        match value {
            FshValue::Code(code) => coerce_code(type_code, code),
            FshValue::String(text) if STRING_TYPES.contains(&type_code) => {
                Ok(FixedValue::fixed(type_code, json!(text)))
            }
            FshValue::String(text) if DATE_TIME_TYPES.contains(&type_code) => {
                if is_valid_date_time(type_code, text) {
                    Ok(FixedValue::fixed(type_code, json!(text)))
                } else {
                    Err(mismatch())
                }
            }
            FshValue::Boolean(flag) if type_code == "boolean" => {
                Ok(FixedValue::fixed(type_code, json!(flag)))
            }
            FshValue::Integer(number) => match type_code {
                "integer" | "decimal" => Ok(FixedValue::fixed(type_code, json!(number))),
                "unsignedInt" if *number >= 0 => Ok(FixedValue::fixed(type_code, json!(number))),
                "positiveInt" if *number > 0 => Ok(FixedValue::fixed(type_code, json!(number))),
                "integer64" => Ok(FixedValue::fixed(type_code, json!(number.to_string()))),
                _ => Err(mismatch()),
            },
            FshValue::Decimal(number) if type_code == "decimal" => serde_json::Number::from_f64(*number)
                .map(|number| FixedValue::fixed(type_code, Value::Number(number)))
                .ok_or_else(mismatch),
            FshValue::Quantity(quantity) if QUANTITY_TYPES.contains(&type_code) => quantity
                .to_quantity_json()
                .map(|json| FixedValue::pattern(type_code, json))
                .ok_or_else(mismatch),
            FshValue::Reference(reference) if type_code == "Reference" => Ok(FixedValue::pattern(
                type_code,
                reference.to_reference_json(),
            )),
            _ => Err(mismatch()),
        }
    }

    /// Store a coerced value, or accept it when it agrees with what is already there
    ///
    /// A pattern only constrains the properties it names, so a value carrying
    /// extra properties (a display, a quantity value) still satisfies it.
    pub(crate) fn assign_fixed(&mut self, candidate: FixedValue, attempted: &FshValue) -> Result<()> {
        if let Some(existing) = &self.fixed {
            let agrees = match existing.mode {
                FixedMode::Fixed => existing.value == candidate.value,
                FixedMode::Pattern => contains_pattern(&candidate.value, &existing.value),
            };
            if agrees {
                return Ok(());
            }
            let existing_value = match attempted {
                FshValue::Code(_) => render_as_code(&existing.value),
                _ => None,
            }
            .unwrap_or_else(|| existing.value.to_string());
            return Err(MakiExportError::value_already_fixed(
                attempted.to_string(),
                existing_value,
            ));
        }
        self.fixed = Some(candidate);
        Ok(())
    }
}

fn coerce_code(type_code: &str, code: &FshCode) -> Result<FixedValue> {
    match type_code {
        "CodeableConcept" => Ok(FixedValue::pattern(
            type_code,
            json!({ "coding": [code.to_coding_json()] }),
        )),
        "Coding" => Ok(FixedValue::pattern(type_code, code.to_coding_json())),
        _ if QUANTITY_TYPES.contains(&type_code) => {
            let mut quantity = Map::new();
            quantity.insert("code".to_string(), json!(code.code));
            if let Some(system) = &code.system {
                quantity.insert("system".to_string(), json!(system));
            }
            if let Some(display) = &code.display {
                quantity.insert("unit".to_string(), json!(display));
            }
            Ok(FixedValue::pattern(type_code, Value::Object(quantity)))
        }
        _ if CODE_TYPES.contains(&type_code) => Ok(FixedValue::fixed(type_code, json!(code.code))),
        other => Err(MakiExportError::unsupported_coded_type(other)),
    }
}

/// Whether `value` carries every property `pattern` names, recursively
///
/// Arrays are compared position by position, the way cascaded patterns merge.
fn contains_pattern(value: &Value, pattern: &Value) -> bool {
    match (value, pattern) {
        (Value::Object(value), Value::Object(pattern)) => pattern.iter().all(|(key, expected)| {
            value
                .get(key)
                .is_some_and(|actual| contains_pattern(actual, expected))
        }),
        (Value::Array(values), Value::Array(patterns)) => {
            patterns.len() <= values.len()
                && values
                    .iter()
                    .zip(patterns)
                    .all(|(actual, expected)| contains_pattern(actual, expected))
        }
        _ => value == pattern,
    }
}

fn is_valid_date_time(type_code: &str, text: &str) -> bool {
    match type_code {
        "date" => DATE_REGEX.is_match(text),
        "dateTime" => DATE_TIME_REGEX.is_match(text),
        "time" => TIME_REGEX.is_match(text),
        "instant" => INSTANT_REGEX.is_match(text),
        _ => false,
    }
}

/// `system#code` rendering of a fixed code, CodeableConcept, Coding or Quantity
fn render_as_code(value: &Value) -> Option<String> {
    match value {
        Value::String(code) => Some(format!("#{code}")),
        Value::Object(object) => {
            let coding = object
                .get("coding")
                .and_then(|coding| coding.get(0))
                .unwrap_or(value);
            let code = coding.get("code")?.as_str()?;
            let system = coding
                .get("system")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(format!("{system}#{code}"))
        }
        _ => None,
    }
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    object
        .shift_remove(key)
        .and_then(|value| value.as_str().map(String::from))
}

pub(crate) fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fshtypes::{FshQuantity, FshReference};

    fn element(type_code: &str) -> ElementDefinition {
        ElementDefinition::from_json(&json!({
            "id": "Observation.foo",
            "path": "Observation.foo",
            "min": 0,
            "max": "1",
            "type": [{"code": type_code}]
        }))
        .unwrap()
    }

    #[test]
    fn test_from_json_extracts_fixed_slot() {
        let element = ElementDefinition::from_json(&json!({
            "id": "Observation.status",
            "path": "Observation.status",
            "short": "registered | preliminary | final | amended +",
            "min": 1,
            "max": "1",
            "type": [{"code": "code"}],
            "fixedCode": "final"
        }))
        .unwrap();

        let fixed = element.fixed_value().unwrap();
        assert_eq!(fixed.mode, FixedMode::Fixed);
        assert_eq!(fixed.key(), Some("fixedCode"));
        assert_eq!(fixed.value, json!("final"));
        assert_eq!(element.min, Some(1));
        assert_eq!(
            element.property("short"),
            Some(&json!("registered | preliminary | final | amended +"))
        );
        assert_eq!(element.to_json()["fixedCode"], "final");
    }

    #[test]
    fn test_stu3_single_profile_uri() {
        let element = ElementDefinition::from_json(&json!({
            "id": "Patient.animal.species",
            "path": "Patient.animal.species",
            "type": [{
                "code": "Reference",
                "targetProfile": "http://hl7.org/fhir/StructureDefinition/Patient"
            }]
        }))
        .unwrap();
        assert_eq!(
            element.types[0].target_profile,
            vec!["http://hl7.org/fhir/StructureDefinition/Patient"]
        );
    }

    #[test]
    fn test_fix_code_on_code() {
        let mut status = element("code");
        status.fix_fsh_code(&FshCode::new("final")).unwrap();
        assert_eq!(status.fixed_json(), Some(&json!("final")));
        assert_eq!(status.to_json()["fixedCode"], "final");
    }

    #[test]
    fn test_fix_code_on_coding_and_quantity() {
        let mut coding = element("Coding");
        coding
            .fix_fsh_code(&FshCode::new("foo").with_system("http://foo.com"))
            .unwrap();
        assert_eq!(
            coding.to_json()["patternCoding"],
            json!({"code": "foo", "system": "http://foo.com"})
        );

        let mut quantity = element("Quantity");
        quantity
            .fix_fsh_code(&FshCode::new("mg").with_system("http://unitsofmeasure.org"))
            .unwrap();
        assert_eq!(
            quantity.to_json()["patternQuantity"],
            json!({"code": "mg", "system": "http://unitsofmeasure.org"})
        );
    }

    #[test]
    fn test_fix_string_and_dates() {
        let mut text = element("string");
        text.fix_value(&FshValue::from("hello")).unwrap();
        assert_eq!(text.to_json()["fixedString"], "hello");

        let mut date = element("date");
        assert!(date.fix_value(&FshValue::from("2024-13-01")).is_err());
        date.fix_value(&FshValue::from("2024-02-29")).unwrap();

        let mut instant = element("instant");
        let err = instant.fix_value(&FshValue::from("2024-01-01")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        instant
            .fix_value(&FshValue::from("2024-01-01T10:00:00Z"))
            .unwrap();
    }

    #[test]
    fn test_fix_numbers() {
        let mut positive = element("positiveInt");
        assert!(positive.fix_value(&FshValue::Integer(0)).is_err());
        positive.fix_value(&FshValue::Integer(3)).unwrap();
        assert_eq!(positive.to_json()["fixedPositiveInt"], 3);

        let mut decimal = element("decimal");
        decimal.fix_value(&FshValue::Decimal(1.5)).unwrap();
        assert_eq!(decimal.to_json()["fixedDecimal"], 1.5);

        let mut flag = element("boolean");
        assert!(flag.fix_value(&FshValue::Integer(1)).is_err());
        flag.fix_value(&FshValue::Boolean(true)).unwrap();
        assert_eq!(flag.to_json()["fixedBoolean"], true);
    }

    #[test]
    fn test_fix_quantity_and_reference() {
        let mut quantity = element("Quantity");
        quantity
            .fix_value(&FshValue::Quantity(FshQuantity::new(5.0).with_unit(
                FshCode::new("mg").with_system("http://unitsofmeasure.org"),
            )))
            .unwrap();
        assert_eq!(quantity.to_json()["patternQuantity"]["code"], "mg");

        let mut reference = element("Reference");
        reference
            .fix_value(&FshValue::Reference(FshReference::new("Patient/bob")))
            .unwrap();
        assert_eq!(
            reference.to_json()["patternReference"],
            json!({"reference": "Patient/bob"})
        );
    }

    #[test]
    fn test_refix_same_value_is_silent() {
        let mut status = element("code");
        status.fix_fsh_code(&FshCode::new("final")).unwrap();
        status.fix_fsh_code(&FshCode::new("final")).unwrap();
        assert_eq!(status.fixed_json(), Some(&json!("final")));
    }

    #[test]
    fn test_refix_different_string_conflicts() {
        let mut text = element("string");
        text.fix_value(&FshValue::from("a")).unwrap();
        let err = text.fix_value(&FshValue::from("b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("\"a\""));
        assert!(err.to_string().contains("\"b\""));
        assert_eq!(text.fixed_json(), Some(&json!("a")));
    }

    #[test]
    fn test_fix_code_on_instant_is_unsupported() {
        let mut issued = element("instant");
        let err = issued.fix_fsh_code(&FshCode::new("foo")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCodedType);
        assert!(err.to_string().contains("instant"));
        assert_eq!(issued.fixed_value(), None);
    }

    #[test]
    fn test_fix_code_on_choice_needs_single_type() {
        let mut choice = element("Quantity");
        choice.types.push(ElementDefinitionType::new("CodeableConcept"));
        let err = choice.fix_fsh_code(&FshCode::new("foo")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousType);
        assert_eq!(choice.fixed_value(), None);
    }

    #[test]
    fn test_refix_different_code_conflicts_and_keeps_element() {
        let foo = FshCode::new("foo").with_system("http://foo.com");
        let bar = FshCode::new("bar").with_system("http://bar.com");

        for type_code in ["CodeableConcept", "Coding", "Quantity"] {
            let mut coded = element(type_code);
            coded.fix_fsh_code(&foo).unwrap();
            let before = coded.clone();

            let err = coded.fix_fsh_code(&bar).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict, "{type_code}");
            let message = err.to_string();
            assert!(message.contains("http://bar.com#bar"), "{message}");
            assert!(message.contains("http://foo.com#foo"), "{message}");
            assert_eq!(coded, before, "{type_code}");
        }
    }

    #[test]
    fn test_refix_code_with_display_satisfies_pattern() {
        let mut concept = element("CodeableConcept");
        concept
            .fix_fsh_code(&FshCode::new("85354-9").with_system("http://loinc.org"))
            .unwrap();
        concept
            .fix_fsh_code(
                &FshCode::new("85354-9")
                    .with_system("http://loinc.org")
                    .with_display("Blood pressure panel"),
            )
            .unwrap();
        assert_eq!(
            concept.to_json()["patternCodeableConcept"],
            json!({"coding": [{"code": "85354-9", "system": "http://loinc.org"}]})
        );

        let mut coding = element("Coding");
        coding.fix_fsh_code(&FshCode::new("foo").with_system("http://foo.com")).unwrap();
        let err = coding
            .fix_fsh_code(&FshCode::new("foo").with_system("http://other.com").with_display("Foo"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_quantity_value_satisfies_unit_pattern() {
        let mut dose = element("Quantity");
        dose.fix_fsh_code(&FshCode::new("mg").with_system("http://unitsofmeasure.org"))
            .unwrap();
        dose.fix_value(&FshValue::Quantity(FshQuantity::new(5.0).with_unit(
            FshCode::new("mg").with_system("http://unitsofmeasure.org"),
        )))
        .unwrap();
        assert_eq!(
            dose.fixed_json(),
            Some(&json!({"code": "mg", "system": "http://unitsofmeasure.org"}))
        );

        let err = dose
            .fix_value(&FshValue::Quantity(FshQuantity::new(5.0).with_unit(
                FshCode::new("kg").with_system("http://unitsofmeasure.org"),
            )))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_fixed_slot_still_needs_equal_value() {
        let mut status = element("code");
        status.fix_fsh_code(&FshCode::new("final")).unwrap();
        let err = status.fix_fsh_code(&FshCode::new("amended")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("#final"));
    }

    #[test]
    fn test_fhirpath_system_type_uses_fhir_type_extension() {
        let url = ElementDefinition::from_json(&json!({
            "id": "Extension.url",
            "path": "Extension.url",
            "min": 1,
            "max": "1",
            "type": [{
                "extension": [{
                    "url": "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type",
                    "valueUrl": "uri"
                }],
                "code": "http://hl7.org/fhirpath/System.String"
            }],
            "fixedUri": "http://example.org/fhir/StructureDefinition/nickname"
        }))
        .unwrap();

        assert_eq!(url.types[0].fhir_type(), "uri");
        let fixed = url.fixed_value().unwrap();
        assert_eq!(fixed.key(), Some("fixedUri"));
        assert_eq!(
            fixed.value,
            json!("http://example.org/fhir/StructureDefinition/nickname")
        );
        assert!(url.property("fixedUri").is_none());

        let mut id = ElementDefinition::from_json(&json!({
            "id": "Extension.id",
            "path": "Extension.id",
            "type": [{
                "extension": [{
                    "url": "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type",
                    "valueUri": "string"
                }],
                "code": "http://hl7.org/fhirpath/System.String"
            }]
        }))
        .unwrap();
        id.fix_value(&FshValue::from("ext-1")).unwrap();
        assert_eq!(id.to_json()["fixedString"], "ext-1");

        assert_eq!(ElementDefinitionType::new("Coding").fhir_type(), "Coding");
    }

    #[test]
    fn test_instance_property_name() {
        let mut choice = ElementDefinition::new("Observation.value[x]", "Observation.value[x]");
        choice.types = vec![
            ElementDefinitionType::new("Quantity"),
            ElementDefinitionType::new("string"),
        ];
        assert_eq!(choice.instance_property_name(), None);

        let mut narrowed = choice.clone();
        narrowed.id = "Observation.value[x]:valueQuantity".to_string();
        narrowed.types.truncate(1);
        assert_eq!(narrowed.base_name(), "value[x]");
        assert_eq!(
            narrowed.instance_property_name().as_deref(),
            Some("valueQuantity")
        );

        let slice = ElementDefinition::new("Observation.component:systolic", "Observation.component");
        assert_eq!(
            slice.instance_property_name().as_deref(),
            Some("component")
        );
    }

    #[test]
    fn test_is_array() {
        let mut element = ElementDefinition::new("Patient.name", "Patient.name");
        assert!(!element.is_array());
        element.max = Some("*".to_string());
        assert!(element.is_array());
        element.max = Some("1".to_string());
        assert!(!element.is_array());
    }
}
