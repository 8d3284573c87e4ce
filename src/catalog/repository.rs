//! # Response Repository
//!
//! Holds every [`ResponseVariant`] keyed by [`Label`] and picks one per request.
//!
//! ## Load-time Invariant:
//! Every label has at least one variant. A catalog that breaks this is
//! rejected while loading, so the server never starts with a hole in it and
//! `select` only comes up empty if that guarantee is somehow bypassed.
//!
//! ## Sources:
//! - The built-in catalog compiled into the binary (`data/responses.toml`)
//! - A replacement TOML file named in configuration, read once at startup

use crate::catalog::variant::ResponseVariant;
use crate::classification::{Label, RandomSource};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

const BUILTIN_CATALOG: &str = include_str!("../../data/responses.toml");

/// Immutable label → variants mapping, shared freely across requests.
#[derive(Debug, Clone)]
pub struct ResponseCatalog {
    variants: BTreeMap<Label, Vec<ResponseVariant>>,
}

/// Variant counts reported by `GET /api/translate/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_variants: usize,
    pub labels: BTreeMap<Label, usize>,
}

impl ResponseCatalog {
    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG).context("built-in response catalog is invalid")
    }

    /// Load from `path` when given, otherwise fall back to the built-in catalog.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading response catalog {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("response catalog {} is invalid", path.display()))
            }
            None => Self::builtin(),
        }
    }

    /// Parse a TOML document whose top-level keys are labels and whose values
    /// are arrays of variant tables.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<ResponseVariant>> =
            toml::from_str(text).context("parsing response catalog TOML")?;

        let mut variants = BTreeMap::new();
        for (key, entries) in raw {
            let label = Label::from_str(&key).map_err(|e| anyhow!(e))?;
            variants.insert(label, entries);
        }

        Self::from_variants(variants)
    }

    /// Build a catalog, enforcing completeness and non-blank fields.
    pub fn from_variants(variants: BTreeMap<Label, Vec<ResponseVariant>>) -> Result<Self> {
        for label in Label::ALL {
            let entries = variants.get(&label).map(Vec::as_slice).unwrap_or_default();
            if entries.is_empty() {
                return Err(anyhow!("no response variants defined for label '{}'", label));
            }
            for (index, variant) in entries.iter().enumerate() {
                let blank = variant.blank_fields();
                if !blank.is_empty() {
                    return Err(anyhow!(
                        "variant {} of label '{}' has blank fields: {}",
                        index,
                        label,
                        blank.join(", ")
                    ));
                }
            }
        }

        Ok(Self { variants })
    }

    /// Skips validation; lets tests build the incomplete catalogs `load` refuses.
    #[cfg(test)]
    pub(crate) fn unchecked(variants: BTreeMap<Label, Vec<ResponseVariant>>) -> Self {
        Self { variants }
    }

    /// Pick one of the label's variants uniformly at random.
    pub fn select(&self, label: Label, random: &dyn RandomSource) -> Option<&ResponseVariant> {
        let entries = self.variants.get(&label)?;
        if entries.is_empty() {
            return None;
        }
        entries.get(random.pick_index(entries.len()))
    }

    pub fn variants_for(&self, label: Label) -> &[ResponseVariant] {
        self.variants.get(&label).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn stats(&self) -> CatalogStats {
        let labels: BTreeMap<Label, usize> = Label::ALL
            .iter()
            .map(|label| (*label, self.variants_for(*label).len()))
            .collect();
        CatalogStats {
            total_variants: labels.values().sum(),
            labels,
        }
    }
}
