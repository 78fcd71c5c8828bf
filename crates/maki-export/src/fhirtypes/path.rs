//! FSH path parsing
//!
//! A path such as `component[systolic].code.coding[0]` is a list of
//! [`PathPart`]s. Each part has a base name and the bracket qualifiers that
//! follow it: numeric indices, slice names, or unresolved soft indices
//! (`[+]`, `[=]`). A `[x]` directly after a name belongs to the name itself
//! (`value[x]`).

use crate::error::MakiExportError;
use crate::result::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftIndexOp {
    /// `[+]`
    Increment,
    /// `[=]`
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bracket {
    Index(usize),
    Slice(String),
    Soft(SoftIndexOp),
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bracket::Index(index) => write!(f, "[{index}]"),
            Bracket::Slice(name) => write!(f, "[{name}]"),
            Bracket::Soft(SoftIndexOp::Increment) => write!(f, "[+]"),
            Bracket::Soft(SoftIndexOp::Repeat) => write!(f, "[=]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPart {
    pub base: String,
    pub brackets: Vec<Bracket>,
}

impl PathPart {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            brackets: Vec::new(),
        }
    }

    pub fn with_bracket(mut self, bracket: Bracket) -> Self {
        self.brackets.push(bracket);
        self
    }

    /// The numeric index of this part, if any
    pub fn index(&self) -> Option<usize> {
        self.brackets.iter().rev().find_map(|bracket| match bracket {
            Bracket::Index(index) => Some(*index),
            _ => None,
        })
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.brackets.iter().filter_map(|bracket| match bracket {
            Bracket::Slice(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Slice (and reslice) names joined with `/`
    pub fn slice_name(&self) -> Option<String> {
        let names: Vec<&str> = self.slice_names().collect();
        (!names.is_empty()).then(|| names.join("/"))
    }

    pub fn has_soft_index(&self) -> bool {
        self.brackets
            .iter()
            .any(|bracket| matches!(bracket, Bracket::Soft(_)))
    }
}

impl fmt::Display for PathPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for bracket in &self.brackets {
            write!(f, "{bracket}")?;
        }
        Ok(())
    }
}

/// Join parts back into a FSH path
pub fn assemble_path(parts: &[PathPart]) -> String {
    parts
        .iter()
        .map(PathPart::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// The path with numeric and soft indices dropped, i.e. the element it addresses
pub fn structural_path(parts: &[PathPart]) -> String {
    parts
        .iter()
        .map(|part| {
            let mut segment = part.base.clone();
            for name in part.slice_names() {
                segment.push_str(&format!("[{name}]"));
            }
            segment
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse a FSH path into parts
pub fn parse_fsh_path(path: &str) -> Result<Vec<PathPart>> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(MakiExportError::invalid_path(path, "path is empty"));
    }

    let mut parts = Vec::new();
    let mut current = PathPart::new(String::new());
    let mut bracket: Option<String> = None;

    for ch in trimmed.chars() {
        match bracket.take() {
            Some(content) if ch == ']' => {
                if content == "x" && current.brackets.is_empty() {
                    current.base.push_str("[x]");
                } else {
                    current.brackets.push(parse_bracket(path, &content)?);
                }
            }
            Some(mut content) => {
                content.push(ch);
                bracket = Some(content);
            }
            None => match ch {
                '[' => bracket = Some(String::new()),
                '.' => parts.push(finish_part(path, &mut current)?),
                ']' => {
                    return Err(MakiExportError::invalid_path(path, "unmatched ']'"));
                }
                _ if !current.brackets.is_empty() => {
                    return Err(MakiExportError::invalid_path(
                        path,
                        format!("unexpected '{ch}' after bracket"),
                    ));
                }
                _ => current.base.push(ch),
            },
        }
    }

    if bracket.is_some() {
        return Err(MakiExportError::invalid_path(path, "unclosed bracket"));
    }
    parts.push(finish_part(path, &mut current)?);
    Ok(parts)
}

fn finish_part(path: &str, current: &mut PathPart) -> Result<PathPart> {
    let part = std::mem::replace(current, PathPart::new(String::new()));
    let base = part.base.trim();
    if base.is_empty() {
        return Err(MakiExportError::invalid_path(path, "empty path segment"));
    }
    Ok(PathPart {
        base: base.to_string(),
        brackets: part.brackets,
    })
}

fn parse_bracket(path: &str, content: &str) -> Result<Bracket> {
    match content.trim() {
        "" => Err(MakiExportError::invalid_path(path, "empty bracket")),
        "+" => Ok(Bracket::Soft(SoftIndexOp::Increment)),
        "=" => Ok(Bracket::Soft(SoftIndexOp::Repeat)),
        other => Ok(other
            .parse::<usize>()
            .map(Bracket::Index)
            .unwrap_or_else(|_| Bracket::Slice(other.to_string()))),
    }
}
