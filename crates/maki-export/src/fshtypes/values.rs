//! Authored values that can appear on the right-hand side of a fixed-value rule

use serde_json::{Map, Number, Value, json};
use std::fmt;

/// A code with optional system and display, written `system#code "display"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FshCode {
    pub code: String,
    pub system: Option<String>,
    pub display: Option<String>,
}

impl FshCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// FHIR Coding shape: `{code, system?, display?}`
    pub fn to_coding_json(&self) -> Value {
        let mut coding = Map::new();
        coding.insert("code".to_string(), json!(self.code));
        if let Some(system) = &self.system {
            coding.insert("system".to_string(), json!(system));
        }
        if let Some(display) = &self.display {
            coding.insert("display".to_string(), json!(display));
        }
        Value::Object(coding)
    }
}

impl fmt::Display for FshCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.system.as_deref().unwrap_or_default(), self.code)?;
        if let Some(display) = &self.display {
            write!(f, " \"{display}\"")?;
        }
        Ok(())
    }
}

/// A numeric value with an optional UCUM (or other) unit code
#[derive(Debug, Clone, PartialEq)]
pub struct FshQuantity {
    pub value: f64,
    pub unit: Option<FshCode>,
}

impl FshQuantity {
    pub fn new(value: f64) -> Self {
        Self { value, unit: None }
    }

    pub fn with_unit(mut self, unit: FshCode) -> Self {
        self.unit = Some(unit);
        self
    }

    /// FHIR Quantity shape; the unit display becomes `unit`
    pub fn to_quantity_json(&self) -> Option<Value> {
        let mut quantity = Map::new();
        quantity.insert(
            "value".to_string(),
            Value::Number(Number::from_f64(self.value)?),
        );
        if let Some(unit) = &self.unit {
            quantity.insert("code".to_string(), json!(unit.code));
            if let Some(system) = &unit.system {
                quantity.insert("system".to_string(), json!(system));
            }
            if let Some(display) = &unit.display {
                quantity.insert("unit".to_string(), json!(display));
            }
        }
        Some(Value::Object(quantity))
    }
}

impl fmt::Display for FshQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(unit) = &self.unit {
            write!(f, " '{}'", unit.code)?;
        }
        Ok(())
    }
}

/// `Reference(target)`; `sd_type` is filled in once the target is resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FshReference {
    pub reference: String,
    pub display: Option<String>,
    pub sd_type: Option<String>,
}

impl FshReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn to_reference_json(&self) -> Value {
        let mut reference = Map::new();
        reference.insert("reference".to_string(), json!(self.reference));
        if let Some(display) = &self.display {
            reference.insert("display".to_string(), json!(display));
        }
        Value::Object(reference)
    }
}

impl fmt::Display for FshReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self.reference)?;
        if let Some(display) = &self.display {
            write!(f, " \"{display}\"")?;
        }
        Ok(())
    }
}

/// Any value a fixed-value rule can assign
#[derive(Debug, Clone, PartialEq)]
pub enum FshValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Code(FshCode),
    Quantity(FshQuantity),
    Reference(FshReference),
}

impl FshValue {
    /// Name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FshValue::String(_) => "String",
            FshValue::Boolean(_) => "Boolean",
            FshValue::Integer(_) => "Integer",
            FshValue::Decimal(_) => "Decimal",
            FshValue::Code(_) => "Code",
            FshValue::Quantity(_) => "Quantity",
            FshValue::Reference(_) => "Reference",
        }
    }
}

impl fmt::Display for FshValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FshValue::String(value) => write!(f, "\"{value}\""),
            FshValue::Boolean(value) => write!(f, "{value}"),
            FshValue::Integer(value) => write!(f, "{value}"),
            FshValue::Decimal(value) => write!(f, "{value}"),
            FshValue::Code(code) => write!(f, "{code}"),
            FshValue::Quantity(quantity) => write!(f, "{quantity}"),
            FshValue::Reference(reference) => write!(f, "{reference}"),
        }
    }
}

impl From<FshCode> for FshValue {
    fn from(code: FshCode) -> Self {
        FshValue::Code(code)
    }
}

impl From<FshQuantity> for FshValue {
    fn from(quantity: FshQuantity) -> Self {
        FshValue::Quantity(quantity)
    }
}

impl From<FshReference> for FshValue {
    fn from(reference: FshReference) -> Self {
        FshValue::Reference(reference)
    }
}

impl From<&str> for FshValue {
    fn from(value: &str) -> Self {
        FshValue::String(value.to_string())
    }
}

impl From<bool> for FshValue {
    fn from(value: bool) -> Self {
        FshValue::Boolean(value)
    }
}

impl From<i64> for FshValue {
    fn from(value: i64) -> Self {
        FshValue::Integer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        let code = FshCode::new("bar").with_system("http://foo.com");
        assert_eq!(code.to_string(), "http://foo.com#bar");
        assert_eq!(FshCode::new("bar").to_string(), "#bar");
        assert_eq!(
            FshCode::new("bar").with_display("Bar").to_string(),
            "#bar \"Bar\""
        );
    }

    #[test]
    fn test_coding_json_keeps_code_first() {
        let code = FshCode::new("foo").with_system("http://foo.com");
        assert_eq!(
            serde_json::to_string(&code.to_coding_json()).unwrap(),
            r#"{"code":"foo","system":"http://foo.com"}"#
        );
    }

    #[test]
    fn test_quantity_json() {
        let quantity = FshQuantity::new(5.5).with_unit(
            FshCode::new("mg")
                .with_system("http://unitsofmeasure.org")
                .with_display("milligram"),
        );
        assert_eq!(
            quantity.to_quantity_json().unwrap(),
            json!({
                "value": 5.5,
                "code": "mg",
                "system": "http://unitsofmeasure.org",
                "unit": "milligram"
            })
        );
        assert!(FshQuantity::new(f64::NAN).to_quantity_json().is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(FshValue::from("hi").to_string(), "\"hi\"");
        assert_eq!(FshValue::from(true).to_string(), "true");
        assert_eq!(
            FshValue::from(FshReference::new("Patient/1")).to_string(),
            "Reference(Patient/1)"
        );
    }
}
