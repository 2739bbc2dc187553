use crate::error::{PipelineError, Result};
use crate::record::{FieldKind, Record, Schema};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Canonicalizes one categorical field.
///
/// Synonyms are substituted first, then the canonical value is checked
/// against the allow-list. The allow-list therefore holds canonical
/// spellings only; a raw synonym is admitted through its canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    field: String,
    synonyms: BTreeMap<String, String>,
    allow: Option<BTreeSet<String>>,
}

impl Normalizer {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), ..Default::default() }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn synonym(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.synonyms.insert(raw.into(), canonical.into());
        self
    }

    /// Extend the allow-list. Creates it on first call.
    pub fn allow<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow
            .get_or_insert_with(BTreeSet::new)
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Canonical categories, when an allow-list is declared.
    pub fn canonical_set(&self) -> Option<&BTreeSet<String>> {
        self.allow.as_ref()
    }

    /// Reject synonym cycles and synonyms whose target the allow-list would drop.
    pub fn validate(&self) -> Result<()> {
        for raw in self.synonyms.keys() {
            let mut seen = BTreeSet::new();
            let mut current = raw.as_str();
            while let Some(next) = self.synonyms.get(current) {
                if !seen.insert(current) {
                    return Err(PipelineError::Config(format!(
                        "synonym cycle on field '{}' through '{}'",
                        self.field, raw
                    )));
                }
                current = next.as_str();
            }
            if let Some(allow) = &self.allow {
                if !allow.contains(current) {
                    return Err(PipelineError::Config(format!(
                        "synonym '{}' -> '{}' on field '{}' targets a value outside the allow-list",
                        raw, current, self.field
                    )));
                }
            }
        }
        Ok(())
    }

    /// Follow the synonym chain to its end. Values with no entry pass through.
    pub fn canonical<'a>(&'a self, raw: &'a str) -> &'a str {
        let mut current = raw;
        // Bounded so an unvalidated cycle cannot spin forever.
        for _ in 0..=self.synonyms.len() {
            match self.synonyms.get(current) {
                Some(next) if next != current => current = next.as_str(),
                _ => break,
            }
        }
        current
    }

    pub fn admits(&self, canonical: &str) -> bool {
        self.allow.as_ref().map_or(true, |allow| allow.contains(canonical))
    }

    /// Substitute then filter the category stored at `slot`.
    pub fn apply(&self, slot: usize, mut record: Record) -> Option<Record> {
        let canonical = self.canonical(record.category(slot));
        if !self.admits(canonical) {
            return None;
        }
        if canonical != record.category(slot) {
            let canonical = canonical.to_string();
            record.set_category(slot, canonical);
        }
        Some(record)
    }

    /// Resolve this normalizer's field to a record slot.
    pub fn slot(&self, schema: &Schema) -> Result<usize> {
        match (schema.index_of(&self.field), schema.kind_of(&self.field)) {
            (Some(slot), Some(FieldKind::Category)) => Ok(slot),
            (Some(_), _) => Err(PipelineError::Config(format!(
                "cannot normalize numeric field '{}'",
                self.field
            ))),
            (None, _) => Err(PipelineError::Config(format!(
                "normalizer field '{}' is not declared in fields(...)",
                self.field
            ))),
        }
    }
}

/// Apply each normalizer in order, dropping records any of them rejects.
pub fn normalize(records: Vec<Record>, schema: &Schema, normalizers: &[Normalizer]) -> Result<Vec<Record>> {
    let mut bound = Vec::with_capacity(normalizers.len());
    for n in normalizers {
        n.validate()?;
        bound.push((n.slot(schema)?, n));
    }

    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter_map(|record| {
            bound
                .iter()
                .try_fold(record, |record, (slot, n)| n.apply(*slot, record))
        })
        .collect();

    debug!(before, after = kept.len(), "normalized records");
    Ok(kept)
}
