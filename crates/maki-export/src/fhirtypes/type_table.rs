//! Datatype → fixed/pattern property names
//!
//! The ElementDefinition property that carries a fixed or pattern value is
//! named after the datatype (`fixedCode`, `patternCodeableConcept`, ...). The
//! table below is the complete list of datatypes that can carry one.

/// Names of the two ElementDefinition slots for one datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedValueKeys {
    pub fixed: &'static str,
    pub pattern: &'static str,
}

const FIXED_VALUE_TABLE: &[(&str, &str, &str)] = &[
    ("base64Binary", "fixedBase64Binary", "patternBase64Binary"),
    ("boolean", "fixedBoolean", "patternBoolean"),
    ("canonical", "fixedCanonical", "patternCanonical"),
    ("code", "fixedCode", "patternCode"),
    ("date", "fixedDate", "patternDate"),
    ("dateTime", "fixedDateTime", "patternDateTime"),
    ("decimal", "fixedDecimal", "patternDecimal"),
    ("id", "fixedId", "patternId"),
    ("instant", "fixedInstant", "patternInstant"),
    ("integer", "fixedInteger", "patternInteger"),
    ("integer64", "fixedInteger64", "patternInteger64"),
    ("markdown", "fixedMarkdown", "patternMarkdown"),
    ("oid", "fixedOid", "patternOid"),
    ("positiveInt", "fixedPositiveInt", "patternPositiveInt"),
    ("string", "fixedString", "patternString"),
    ("time", "fixedTime", "patternTime"),
    ("unsignedInt", "fixedUnsignedInt", "patternUnsignedInt"),
    ("uri", "fixedUri", "patternUri"),
    ("url", "fixedUrl", "patternUrl"),
    ("uuid", "fixedUuid", "patternUuid"),
    ("xhtml", "fixedXhtml", "patternXhtml"),
    ("Address", "fixedAddress", "patternAddress"),
    ("Age", "fixedAge", "patternAge"),
    ("Annotation", "fixedAnnotation", "patternAnnotation"),
    ("Attachment", "fixedAttachment", "patternAttachment"),
    ("CodeableConcept", "fixedCodeableConcept", "patternCodeableConcept"),
    ("CodeableReference", "fixedCodeableReference", "patternCodeableReference"),
    ("Coding", "fixedCoding", "patternCoding"),
    ("ContactDetail", "fixedContactDetail", "patternContactDetail"),
    ("ContactPoint", "fixedContactPoint", "patternContactPoint"),
    ("Contributor", "fixedContributor", "patternContributor"),
    ("Count", "fixedCount", "patternCount"),
    ("DataRequirement", "fixedDataRequirement", "patternDataRequirement"),
    ("Distance", "fixedDistance", "patternDistance"),
    ("Dosage", "fixedDosage", "patternDosage"),
    ("Duration", "fixedDuration", "patternDuration"),
    ("Expression", "fixedExpression", "patternExpression"),
    ("HumanName", "fixedHumanName", "patternHumanName"),
    ("Identifier", "fixedIdentifier", "patternIdentifier"),
    ("Meta", "fixedMeta", "patternMeta"),
    ("Money", "fixedMoney", "patternMoney"),
    ("ParameterDefinition", "fixedParameterDefinition", "patternParameterDefinition"),
    ("Period", "fixedPeriod", "patternPeriod"),
    ("Quantity", "fixedQuantity", "patternQuantity"),
    ("Range", "fixedRange", "patternRange"),
    ("Ratio", "fixedRatio", "patternRatio"),
    ("RatioRange", "fixedRatioRange", "patternRatioRange"),
    ("Reference", "fixedReference", "patternReference"),
    ("RelatedArtifact", "fixedRelatedArtifact", "patternRelatedArtifact"),
    ("SampledData", "fixedSampledData", "patternSampledData"),
    ("Signature", "fixedSignature", "patternSignature"),
    ("Timing", "fixedTiming", "patternTiming"),
    ("TriggerDefinition", "fixedTriggerDefinition", "patternTriggerDefinition"),
    ("UsageContext", "fixedUsageContext", "patternUsageContext"),
];

/// Look up the fixed/pattern slot names for a datatype code
pub fn fixed_value_keys(type_code: &str) -> Option<FixedValueKeys> {
    FIXED_VALUE_TABLE
        .iter()
        .find(|(code, _, _)| *code == type_code)
        .map(|&(_, fixed, pattern)| FixedValueKeys { fixed, pattern })
}

/// Primitives a bare string can be fixed onto
pub const STRING_TYPES: &[&str] = &[
    "string",
    "markdown",
    "id",
    "uri",
    "url",
    "canonical",
    "oid",
    "uuid",
    "base64Binary",
    "xhtml",
];

/// Primitives whose lexical form is checked before a string is accepted
pub const DATE_TIME_TYPES: &[&str] = &["date", "dateTime", "time", "instant"];

/// Primitives a code fixes onto as its bare `code` string
pub const CODE_TYPES: &[&str] = &["code", "string", "uri", "url", "canonical", "markdown", "id"];

/// Quantity and its specializations
pub const QUANTITY_TYPES: &[&str] = &[
    "Quantity",
    "Age",
    "Count",
    "Distance",
    "Duration",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            fixed_value_keys("code"),
            Some(FixedValueKeys {
                fixed: "fixedCode",
                pattern: "patternCode"
            })
        );
        assert_eq!(
            fixed_value_keys("CodeableConcept").map(|keys| keys.pattern),
            Some("patternCodeableConcept")
        );
        assert!(fixed_value_keys("BackboneElement").is_none());
        assert!(fixed_value_keys("Code").is_none());
    }

    #[test]
    fn test_every_slot_is_named_after_its_type() {
        for (code, fixed, pattern) in FIXED_VALUE_TABLE {
            let suffix = fixed.trim_start_matches("fixed");
            assert_eq!(suffix.to_lowercase(), code.to_lowercase());
            assert_eq!(pattern.trim_start_matches("pattern"), suffix);
        }
    }
}
