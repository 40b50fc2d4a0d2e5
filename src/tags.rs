use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    candidate::{Candidate, VariantStore},
    utils::vectors::Vec4,
    FinalStateError, FinalStateResult,
};

/// Token which selects the nominal object.
pub const NOMINAL_TOKEN: &str = "@";
/// Token which removes a daughter from a sequence.
pub const SKIP_TOKEN: &str = "#";

/// The variant selected for one daughter by a tag string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagSelector {
    /// Leave the daughter out of the operation.
    Skip,
    /// Use the daughter's own four-momentum.
    Nominal,
    /// Use the systematic variant registered under this label.
    Named(String),
}

impl TagSelector {
    /// Interpret one token of a comma-separated tag string.
    ///
    /// `""` and `"@"` select the nominal daughter, `"#"` skips it, and anything else names a
    /// variant.
    pub fn from_token(token: &str) -> Self {
        match token {
            "" | NOMINAL_TOKEN => Self::Nominal,
            SKIP_TOKEN => Self::Skip,
            label => Self::Named(label.to_string()),
        }
    }

    /// Interpret the tag of a single object (one side of a pairwise observable, or the
    /// missing energy).
    ///
    /// Skipping makes no sense for a single object, so `"#"` is looked up as an ordinary
    /// variant label here.
    pub fn single(tag: &str) -> Self {
        match tag.trim() {
            "" | NOMINAL_TOKEN => Self::Nominal,
            label => Self::Named(label.to_string()),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl Display for TagSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagSelector::Skip => write!(f, "{SKIP_TOKEN}"),
            TagSelector::Nominal => write!(f, "{NOMINAL_TOKEN}"),
            TagSelector::Named(label) => write!(f, "{label}"),
        }
    }
}

/// Parser for comma-separated systematic tag strings.
///
/// A tag string holds one token per daughter, in daughter order, e.g. `"es+, @, #"` for a
/// three-daughter final state. Whitespace is ignored.
pub struct SysTags;

impl SysTags {
    /// Parse `tags` into one [`TagSelector`] per daughter.
    ///
    /// The empty string is a shortcut for "all nominal" and is accepted for any arity.
    /// Otherwise the number of comma-separated tokens must equal `arity`.
    pub fn parse(tags: &str, arity: usize) -> FinalStateResult<Vec<TagSelector>> {
        if tags.is_empty() {
            return Ok(vec![TagSelector::Nominal; arity]);
        }
        let clean: String = tags.chars().filter(|c| !c.is_whitespace()).collect();
        let selectors: Vec<TagSelector> = clean.split(',').map(TagSelector::from_token).collect();
        if selectors.len() != arity {
            debug!(
                tags,
                expected = arity,
                found = selectors.len(),
                "tag string does not match final-state arity"
            );
            return Err(FinalStateError::ArityMismatch {
                expected: arity,
                found: selectors.len(),
                tags: tags.to_string(),
            });
        }
        Ok(selectors)
    }

    /// Render selectors back into a canonical tag string.
    pub fn format(selectors: &[TagSelector]) -> String {
        selectors
            .iter()
            .map(|selector| selector.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Resolve the four-momentum selected for an object.
///
/// `index` identifies the daughter in error messages (`None` for the missing energy).
/// Returns `Ok(None)` for [`TagSelector::Skip`].
pub fn resolve_p4<V: VariantStore + ?Sized>(
    store: &V,
    index: Option<usize>,
    selector: &TagSelector,
) -> FinalStateResult<Option<Vec4>> {
    match selector {
        TagSelector::Skip => Ok(None),
        TagSelector::Nominal => Ok(Some(store.nominal_p4())),
        TagSelector::Named(label) => match store.variant_p4(label) {
            Some(p4) => {
                trace!(?index, label = label.as_str(), "resolved systematic variant");
                Ok(Some(p4))
            }
            None => Err(missing_variant(index, label)),
        },
    }
}

/// Resolve the candidate selected for the daughter at `index`: the daughter itself, its
/// variant, or `None` when skipped.
pub fn resolve_candidate(
    daughter: &Arc<Candidate>,
    index: usize,
    selector: &TagSelector,
) -> FinalStateResult<Option<Arc<Candidate>>> {
    match selector {
        TagSelector::Skip => Ok(None),
        TagSelector::Nominal => Ok(Some(Arc::clone(daughter))),
        TagSelector::Named(label) => daughter
            .user_cand(label)
            .map(|variant| Some(Arc::clone(variant)))
            .ok_or_else(|| missing_variant(Some(index), label)),
    }
}

/// Resolve an object which can never be skipped (one side of a pairwise observable, or the
/// missing energy).
pub fn resolve_single<V: VariantStore + ?Sized>(
    store: &V,
    index: Option<usize>,
    tag: &str,
) -> FinalStateResult<Vec4> {
    let selector = TagSelector::single(tag);
    resolve_p4(store, index, &selector)?.ok_or_else(|| missing_variant(index, tag))
}

fn missing_variant(index: Option<usize>, label: &str) -> FinalStateError {
    debug!(?index, label, "requested systematic variant is not registered");
    FinalStateError::MissingVariant {
        index,
        label: label.to_string(),
    }
}
