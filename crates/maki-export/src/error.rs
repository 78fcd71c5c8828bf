//! Error types for definition fishing, path resolution and instance export

use crate::fshtypes::SourceInfo;
use thiserror::Error;

/// Main error type for the export pipeline
///
/// Every variant is scoped to a single authored instance: the exporter logs
/// it, drops that instance and carries on with the rest of the tank.
#[derive(Debug, Error)]
pub enum MakiExportError {
    /// The `instanceOf` of an authored instance does not resolve to a definition
    #[error("Cannot find definition for Instance: {instance_of}. Skipping Instance {instance}.")]
    InstanceOfNotDefined {
        instance: String,
        instance_of: String,
    },

    /// A path segment has no matching element, even after unfolding
    #[error("Cannot resolve element from path: {path} ({reason})")]
    PathResolution { path: String, reason: String },

    /// The element already carries a different fixed or pattern value
    #[error(
        "Cannot fix {new_value} to this element; a different value is already fixed: {existing_value}."
    )]
    ValueAlreadyFixed {
        new_value: String,
        existing_value: String,
    },

    /// Fixing onto an element that still allows more than one type
    #[error(
        "Cannot fix {value_type} value on this element since this element does not have a single type"
    )]
    NoSingleType { value_type: String },

    /// Coded value onto a type that has no coded representation
    #[error(
        "Cannot fix Code value on this element since this element is of type {type_code}. Codes can only be fixed on CodeableConcept, Coding, Quantity and code-like primitives"
    )]
    UnsupportedCodedType { type_code: String },

    /// A non-code value whose shape does not fit the element type
    #[error("Cannot fix {value_type} value {value} on this element of type {type_code}")]
    TypeMismatch {
        value: String,
        value_type: String,
        type_code: String,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A registry definition is missing properties the element tree needs
    #[error("Invalid definition: {message}")]
    InvalidDefinition { message: String },

    /// Wraps a failure with the rule that triggered it
    #[error("Rule on path '{path}' at {source_info} failed: {source}")]
    RuleFailed {
        path: String,
        source_info: SourceInfo,
        #[source]
        source: Box<MakiExportError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PathResolution,
    Conflict,
    AmbiguousType,
    UnsupportedCodedType,
    TypeMismatch,
    InvalidPath,
    InvalidDefinition,
    Serialization,
}

impl MakiExportError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MakiExportError::InstanceOfNotDefined { .. } => ErrorKind::NotFound,
            MakiExportError::PathResolution { .. } => ErrorKind::PathResolution,
            MakiExportError::ValueAlreadyFixed { .. } => ErrorKind::Conflict,
            MakiExportError::NoSingleType { .. } => ErrorKind::AmbiguousType,
            MakiExportError::UnsupportedCodedType { .. } => ErrorKind::UnsupportedCodedType,
            MakiExportError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            MakiExportError::InvalidPath { .. } => ErrorKind::InvalidPath,
            MakiExportError::InvalidDefinition { .. } => ErrorKind::InvalidDefinition,
            MakiExportError::RuleFailed { source, .. } => source.kind(),
            MakiExportError::Json(_) => ErrorKind::Serialization,
        }
    }

    /// Check if this error is recoverable (the export can move on to the next instance)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Serialization)
    }

    pub fn instance_of_not_defined(
        instance: impl Into<String>,
        instance_of: impl Into<String>,
    ) -> Self {
        Self::InstanceOfNotDefined {
            instance: instance.into(),
            instance_of: instance_of.into(),
        }
    }

    pub fn path_resolution(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn value_already_fixed(
        new_value: impl Into<String>,
        existing_value: impl Into<String>,
    ) -> Self {
        Self::ValueAlreadyFixed {
            new_value: new_value.into(),
            existing_value: existing_value.into(),
        }
    }

    pub fn no_single_type(value_type: impl Into<String>) -> Self {
        Self::NoSingleType {
            value_type: value_type.into(),
        }
    }

    pub fn unsupported_coded_type(type_code: impl Into<String>) -> Self {
        Self::UnsupportedCodedType {
            type_code: type_code.into(),
        }
    }

    pub fn type_mismatch(
        value: impl Into<String>,
        value_type: impl Into<String>,
        type_code: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            value: value.into(),
            value_type: value_type.into(),
            type_code: type_code.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    /// Attach the authored rule location to an error
    pub fn at_rule(self, path: impl Into<String>, source_info: &SourceInfo) -> Self {
        Self::RuleFailed {
            path: path.into(),
            source_info: source_info.clone(),
            source: Box::new(self),
        }
    }
}
