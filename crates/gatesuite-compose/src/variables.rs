//! Extraction of `${NAME}` / `${NAME:-default}` references.
//!
//! The reference grammar is parsed with `nom`; the scanner walks a whole
//! compose document and builds the variable table consumed by the
//! environment synthesizer.

use std::collections::BTreeMap;

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::opt,
    sequence::preceded,
};

use crate::document::{ComposeDocument, string_list};

/// Variable name to default value. A reference without `:-` has an empty default.
pub type VariableTable = BTreeMap<String, String>;

/// One `${...}` reference found in a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableRef<'a> {
    /// Variable name, trimmed.
    pub name: &'a str,
    /// Text after `:-`, if present.
    pub default: Option<&'a str>,
}

/// Parses a single reference starting at `${`.
fn reference(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, _) = tag("${")(input)?;
    let (input, name) = take_while1(|c: char| c != '}' && c != ':')(input)?;
    let (input, default) = opt(preceded(tag(":-"), take_while(|c: char| c != '}'))).parse(input)?;
    let (input, _) = char('}')(input)?;
    Ok((input, (name, default)))
}

/// Returns every reference in `text`, left to right.
#[must_use]
pub fn references(text: &str) -> Vec<VariableRef<'_>> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find("${") {
        let candidate = &rest[idx..];
        match reference(candidate) {
            Ok((after, (name, default))) => {
                let name = name.trim();
                if !name.is_empty() {
                    found.push(VariableRef { name, default });
                }
                rest = after;
            }
            // Not a well-formed reference; resume after the `$`.
            Err(_) => rest = &candidate[1..],
        }
    }
    found
}

/// Builds the variable table of a document.
///
/// Services are visited in sorted name order and, within a service, the
/// `image`, then `environment` entries, then `labels` entries. The first
/// default seen for a name wins.
#[must_use]
pub fn extract_variables(doc: &ComposeDocument) -> VariableTable {
    let mut table = VariableTable::new();
    let mut record = |text: &str| {
        for r in references(text) {
            let _ = table
                .entry(r.name.to_owned())
                .or_insert_with(|| r.default.unwrap_or_default().to_owned());
        }
    };

    for name in doc.service_names() {
        let Some(svc) = doc.service(&name) else {
            continue;
        };
        if let Some(image) = svc.get("image").and_then(serde_yaml::Value::as_str) {
            record(image);
        }
        for key in ["environment", "labels"] {
            for entry in string_list(svc, key).unwrap_or_default() {
                record(&entry);
            }
        }
    }
    tracing::debug!(count = table.len(), "extracted compose variables");
    table
}
