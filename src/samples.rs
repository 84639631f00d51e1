// src/samples.rs

//! The sample registry: parsed sample records and column-based lookups.
//!
//! Records keep the sheet's original ordering. Lookups take a tagged
//! [`Selector`] instead of inspecting the predicate's type at runtime.

use crate::config::SampleConfig;
use crate::errors::{PipelineError, Result};

/// Read layout of a sample, derived from its populated reads fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLayout {
    /// Only `reads` is set.
    Single,
    /// Both `reads` and `reads2` are set.
    Paired,
}

/// Column match criterion for [`SampleRegistry::lookup`].
pub enum Selector<'a> {
    /// Field value equals this string exactly.
    Exact(&'a str),
    /// Field value satisfies this test.
    Predicate(&'a dyn Fn(&str) -> bool),
}

impl<'a> Selector<'a> {
    fn matches(&self, value: &str) -> bool {
        match self {
            Selector::Exact(expected) => value == *expected,
            Selector::Predicate(test) => test(value),
        }
    }
}

/// One immutable sample record.
#[derive(Debug, Clone)]
pub struct SampleRecord {
    pub name: String,
    pub reads: Option<String>,
    pub reads2: Option<String>,
    pub extra: std::collections::BTreeMap<String, String>,
}

impl SampleRecord {
    /// Value of a named column, or `None` if the column does not exist on
    /// this record. The reads columns always exist and read as empty strings
    /// when unset, matching sheet semantics.
    pub fn field(&self, column: &str) -> Option<&str> {
        match column {
            "name" => Some(&self.name),
            "reads" => Some(self.reads.as_deref().unwrap_or("")),
            "reads2" => Some(self.reads2.as_deref().unwrap_or("")),
            other => self.extra.get(other).map(|s| s.as_str()),
        }
    }

    /// Read layout. The registry constructor rejects records with zero
    /// populated reads fields, so this cannot fail after construction.
    pub fn layout(&self) -> ReadLayout {
        if self.reads2.as_deref().is_some_and(|s| !s.is_empty()) {
            ReadLayout::Paired
        } else {
            ReadLayout::Single
        }
    }

    /// Populated reads file names, first mate first.
    pub fn reads_files(&self) -> Vec<&str> {
        [self.reads.as_deref(), self.reads2.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Ordered, immutable set of sample records.
#[derive(Debug, Clone)]
pub struct SampleRegistry {
    records: Vec<SampleRecord>,
}

impl SampleRegistry {
    /// Build the registry from validated `[[sample]]` config tables.
    pub fn from_config(samples: &[SampleConfig]) -> Result<Self> {
        let records = samples
            .iter()
            .map(|s| {
                let record = SampleRecord {
                    name: s.name.clone(),
                    reads: s.reads.clone().filter(|r| !r.is_empty()),
                    reads2: s.reads2.clone().filter(|r| !r.is_empty()),
                    extra: s.extra.clone(),
                };
                if record.reads.is_none() {
                    return Err(PipelineError::SchemaError(format!(
                        "sample '{}' has no populated reads field",
                        record.name
                    )));
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Sample names in sheet order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleRecord> {
        self.records.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SampleRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Read layout of a named sample.
    pub fn layout_of(&self, name: &str) -> Option<ReadLayout> {
        self.get(name).map(|r| r.layout())
    }

    /// Values of `fields` from every record whose `column` matches the
    /// selector, flattened in sheet order.
    ///
    /// Fails with a `SchemaError` if `column` exists on no record; an empty
    /// result for an existing column is not an error.
    pub fn lookup(&self, column: &str, selector: Selector<'_>, fields: &[&str]) -> Result<Vec<String>> {
        if !self.records.iter().any(|r| r.field(column).is_some()) {
            return Err(PipelineError::SchemaError(format!(
                "sample sheet has no column '{}'",
                column
            )));
        }

        let mut values = Vec::new();
        for record in &self.records {
            let matched = record
                .field(column)
                .is_some_and(|value| selector.matches(value));
            if !matched {
                continue;
            }
            for field in fields {
                if let Some(value) = record.field(field) {
                    values.push(value.to_string());
                }
            }
        }
        Ok(values)
    }
}
