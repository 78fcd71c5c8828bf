//! Soft indexing (`[+]`, `[=]`)
//!
//! Within one instance, `name[+]` means "the entry after the last one
//! addressed under `name`" and `name[=]` means "the last one addressed".
//! Counters are kept per array path, including the indices of the arrays
//! that contain it, so `name[0].given[+]` and `name[1].given[+]` count
//! independently.

use crate::fhirtypes::{Bracket, SoftIndexOp, assemble_path, parse_fsh_path};
use crate::fshtypes::FixedValueRule;
use crate::result::Result;
use std::collections::HashMap;

/// Rewrite the paths of `rules` so that every soft index is numeric
pub fn resolve_soft_indexing(rules: &mut [FixedValueRule]) -> Result<()> {
    let mut counters: HashMap<String, usize> = HashMap::new();

    for rule in rules.iter_mut() {
        let mut parts = parse_fsh_path(&rule.path)?;
        let mut prefix = String::new();

        for part in parts.iter_mut() {
            let mut key = if prefix.is_empty() {
                part.base.clone()
            } else {
                format!("{prefix}.{}", part.base)
            };

            for bracket in part.brackets.iter_mut() {
                match *bracket {
                    Bracket::Soft(op) => {
                        let index = match (op, counters.get(&key)) {
                            (SoftIndexOp::Increment, Some(current)) => current + 1,
                            (SoftIndexOp::Repeat, Some(current)) => *current,
                            (_, None) => 0,
                        };
                        counters.insert(key.clone(), index);
                        *bracket = Bracket::Index(index);
                    }
                    Bracket::Index(index) => {
                        let current = counters.entry(key.clone()).or_insert(index);
                        *current = (*current).max(index);
                    }
                    Bracket::Slice(_) => {}
                }
                key.push_str(&bracket.to_string());
            }
            prefix = key;
        }

        rule.path = assemble_path(&parts);
    }
    Ok(())
}
