use super::FshValue;
use std::fmt;
use std::path::PathBuf;

/// Line/column span of an authored construct (1-based)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLocation {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl TextLocation {
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            start_column: 1,
            end_line,
            end_column: 1,
        }
    }
}

/// Where an authored construct came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub file: Option<PathBuf>,
    pub location: Option<TextLocation>,
}

impl SourceInfo {
    pub fn new(file: impl Into<PathBuf>, location: TextLocation) -> Self {
        Self {
            file: Some(file.into()),
            location: Some(location),
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}", file.display())?,
            None => write!(f, "<unknown file>")?,
        }
        if let Some(location) = &self.location {
            write!(f, ":{} - {}", location.start_line, location.end_line)?;
        }
        Ok(())
    }
}

/// `* path = value`
#[derive(Debug, Clone, PartialEq)]
pub struct FixedValueRule {
    pub path: String,
    pub fixed_value: FshValue,
    pub source_info: SourceInfo,
}

impl FixedValueRule {
    pub fn new(path: impl Into<String>, fixed_value: impl Into<FshValue>) -> Self {
        Self {
            path: path.into(),
            fixed_value: fixed_value.into(),
            source_info: SourceInfo::default(),
        }
    }

    pub fn with_source_info(mut self, source_info: SourceInfo) -> Self {
        self.source_info = source_info;
        self
    }
}

/// `Usage:` keyword of an instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstanceUsage {
    #[default]
    Example,
    Definition,
    Inline,
}

impl InstanceUsage {
    pub fn is_inline(self) -> bool {
        matches!(self, InstanceUsage::Inline)
    }
}

/// An authored `Instance:` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: String,
    pub id: String,
    pub instance_of: String,
    pub usage: InstanceUsage,
    pub rules: Vec<FixedValueRule>,
    pub source_info: SourceInfo,
}

impl Instance {
    /// New instance whose id defaults to its name
    pub fn new(name: impl Into<String>, instance_of: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            instance_of: instance_of.into(),
            usage: InstanceUsage::default(),
            rules: Vec::new(),
            source_info: SourceInfo::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_usage(mut self, usage: InstanceUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_rule(mut self, rule: FixedValueRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_source_info(mut self, source_info: SourceInfo) -> Self {
        self.source_info = source_info;
        self
    }
}
