use std::{fmt::Debug, sync::Arc};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    candidate::{Candidate, CompositeCandidate, MissingEnergy},
    config::FinalStateConfig,
    event::{EventContext, Vertex},
    expression::{flag, p4_attribute, Attributes, Evaluator},
    tags::{resolve_candidate, resolve_p4, resolve_single, SysTags, TagSelector},
    utils::{
        enums::CandidateKind,
        kinematics::{delta_phi, delta_r, transverse_mass},
        vectors::Vec4,
    },
    FinalStateError, FinalStateResult,
};

/// A composite of a fixed number of daughter candidates, with the event-level objects it
/// was built from.
///
/// Implementors only provide access to their daughters and the shared event objects; every
/// observable is a provided method written against that interface, so it works for any
/// arity. Daughter indices are 0-based positions in the order the final state was built
/// with, which is also the order of the tokens in a tag string.
///
/// Tag strings hold one comma-separated token per daughter:
/// - `""` or `"@"`: the nominal daughter,
/// - `"#"`: skip the daughter,
/// - anything else: the systematic variant registered under that label.
///
/// The empty string `""` means "all nominal" for every arity. Single-daughter tags (the
/// `tag_i`/`tag_j` arguments of pairwise observables and the missing-energy tag) accept only
/// the nominal tokens or a label.
pub trait FinalState: Send + Sync {
    /// The (fixed) number of daughters.
    fn number_of_daughters(&self) -> usize;
    /// The daughter at position `i`, or `None` if the slot is empty or out of range.
    fn daughter_unsafe(&self, i: usize) -> Option<&Arc<Candidate>>;
    /// The missing energy of the event.
    fn met(&self) -> &Arc<MissingEnergy>;
    /// The primary vertex of the event.
    fn vertex_object(&self) -> &Arc<Vertex>;
    /// The event context used for trigger matching.
    fn evt(&self) -> &Arc<dyn EventContext>;
    /// The external candidates ("extras") stored under `label`; empty if there are none.
    fn overlaps(&self, label: &str) -> &[Arc<Candidate>];
    /// The nominal four-momentum of the final state itself.
    fn p4(&self) -> Vec4;
    /// The nominal charge of the final state itself.
    fn charge(&self) -> i32;
    /// Defaults used by the observables.
    fn config(&self) -> FinalStateConfig {
        FinalStateConfig::default()
    }

    /// The daughter at position `i`.
    ///
    /// # Errors
    ///
    /// [`FinalStateError::IndexOutOfRange`] if `i` is not smaller than the arity and
    /// [`FinalStateError::NullDaughter`] if the slot is empty.
    fn daughter(&self, i: usize) -> FinalStateResult<&Candidate> {
        self.daughter_ptr_ref(i).map(|daughter| &**daughter)
    }

    /// A shared handle to the daughter at position `i`. Fails like [`FinalState::daughter`].
    fn daughter_ptr(&self, i: usize) -> FinalStateResult<Arc<Candidate>> {
        self.daughter_ptr_ref(i).map(Arc::clone)
    }

    #[doc(hidden)]
    fn daughter_ptr_ref(&self, i: usize) -> FinalStateResult<&Arc<Candidate>> {
        let arity = self.number_of_daughters();
        if i >= arity {
            return Err(FinalStateError::IndexOutOfRange { index: i, arity });
        }
        self.daughter_unsafe(i)
            .ok_or(FinalStateError::NullDaughter { index: i })
    }

    /// All nominal daughters in order.
    fn all_daughters(&self) -> FinalStateResult<Vec<Arc<Candidate>>> {
        (0..self.number_of_daughters())
            .map(|i| self.daughter_ptr(i))
            .collect()
    }

    /// The daughters selected by a tag string, paired with their positions. Skipped
    /// daughters are omitted.
    fn indexed_daughters(&self, tags: &str) -> FinalStateResult<Vec<(usize, Arc<Candidate>)>> {
        let selectors = SysTags::parse(tags, self.number_of_daughters())?;
        let mut output = Vec::with_capacity(selectors.len());
        for (i, selector) in selectors.iter().enumerate() {
            if selector.is_skip() {
                continue;
            }
            let daughter = self.daughter_ptr_ref(i)?;
            if let Some(resolved) = resolve_candidate(daughter, i, selector)? {
                output.push((i, resolved));
            }
        }
        Ok(output)
    }

    /// The daughters selected by a tag string, in daughter order with skipped daughters
    /// omitted.
    fn daughters(&self, tags: &str) -> FinalStateResult<Vec<Arc<Candidate>>> {
        Ok(self
            .indexed_daughters(tags)?
            .into_iter()
            .map(|(_, daughter)| daughter)
            .collect())
    }

    /// Check whether the `i`th daughter carries a systematic variant named `tag`. The
    /// nominal tokens always count as present.
    fn daughter_has_user_cand(&self, i: usize, tag: &str) -> FinalStateResult<bool> {
        let daughter = self.daughter(i)?;
        Ok(match TagSelector::single(tag) {
            TagSelector::Named(label) => daughter.has_user_cand(&label),
            _ => true,
        })
    }

    /// The `i`th daughter under a single tag: the daughter itself for `""`/`"@"`, otherwise
    /// its variant named `tag`.
    fn daughter_user_cand(&self, i: usize, tag: &str) -> FinalStateResult<Arc<Candidate>> {
        let daughter = self.daughter_ptr_ref(i)?;
        resolve_candidate(daughter, i, &TagSelector::single(tag))?
            .ok_or_else(|| FinalStateError::MissingVariant {
                index: Some(i),
                label: tag.to_string(),
            })
    }

    /// The four-momentum of the `i`th daughter under a single tag.
    fn daughter_user_cand_p4(&self, i: usize, tag: &str) -> FinalStateResult<Vec4> {
        resolve_single(self.daughter(i)?, Some(i), tag)
    }

    /// The `i`th daughter if it is of the given kind, `None` otherwise.
    fn daughter_as(&self, i: usize, kind: CandidateKind) -> FinalStateResult<Option<Arc<Candidate>>> {
        let daughter = self.daughter_ptr(i)?;
        Ok(daughter.is(kind).then_some(daughter))
    }
    /// The `i`th daughter if it is a muon.
    fn daughter_as_muon(&self, i: usize) -> FinalStateResult<Option<Arc<Candidate>>> {
        self.daughter_as(i, CandidateKind::Muon)
    }
    /// The `i`th daughter if it is an electron.
    fn daughter_as_electron(&self, i: usize) -> FinalStateResult<Option<Arc<Candidate>>> {
        self.daughter_as(i, CandidateKind::Electron)
    }
    /// The `i`th daughter if it is a tau.
    fn daughter_as_tau(&self, i: usize) -> FinalStateResult<Option<Arc<Candidate>>> {
        self.daughter_as(i, CandidateKind::Tau)
    }
    /// The `i`th daughter if it is a jet.
    fn daughter_as_jet(&self, i: usize) -> FinalStateResult<Option<Arc<Candidate>>> {
        self.daughter_as(i, CandidateKind::Jet)
    }

    /// Positions of the daughters selected by `tags`, ordered by descending transverse
    /// momentum of the resolved daughters. Ties keep daughter order; skipped daughters are
    /// left out.
    fn indices_by_pt(&self, tags: &str) -> FinalStateResult<Vec<usize>> {
        let mut selected = self.indexed_daughters(tags)?;
        selected.sort_by(|(_, a), (_, b)| b.pt().total_cmp(&a.pt()));
        Ok(selected.into_iter().map(|(i, _)| i).collect())
    }

    /// The daughters selected by `tags`, ordered by descending transverse momentum.
    fn daughters_by_pt(&self, tags: &str) -> FinalStateResult<Vec<Arc<Candidate>>> {
        let mut selected = self.daughters(tags)?;
        selected.sort_by(|a, b| b.pt().total_cmp(&a.pt()));
        Ok(selected)
    }

    /// The `i`th-hardest daughter selected by `tags`.
    fn daughter_by_pt(&self, i: usize, tags: &str) -> FinalStateResult<Arc<Candidate>> {
        let sorted = self.daughters_by_pt(tags)?;
        let arity = sorted.len();
        sorted
            .into_iter()
            .nth(i)
            .ok_or(FinalStateError::IndexOutOfRange { index: i, arity })
    }

    /// Check whether the `i`th selected daughter is harder than the `j`th, where `i` and `j`
    /// index the daughters left after applying `tags`.
    fn pt_ordered(&self, i: usize, j: usize, tags: &str) -> FinalStateResult<bool> {
        let selected = self.daughters(tags)?;
        let arity = selected.len();
        let pt = |k: usize| {
            selected
                .get(k)
                .map(|d| d.pt())
                .ok_or(FinalStateError::IndexOutOfRange { index: k, arity })
        };
        Ok(pt(i)? > pt(j)?)
    }

    /// Signed azimuthal separation between daughters `i` and `j` under their own tags.
    fn d_phi_tagged(&self, i: usize, tag_i: &str, j: usize, tag_j: &str) -> FinalStateResult<f64> {
        Ok(delta_phi(
            &self.daughter_user_cand_p4(i, tag_i)?,
            &self.daughter_user_cand_p4(j, tag_j)?,
        ))
    }
    /// Signed azimuthal separation between the nominal daughters `i` and `j`.
    fn d_phi(&self, i: usize, j: usize) -> FinalStateResult<f64> {
        self.d_phi_tagged(i, "", j, "")
    }

    /// $`\Delta R`$ between daughters `i` and `j` under their own tags.
    fn d_r_tagged(&self, i: usize, tag_i: &str, j: usize, tag_j: &str) -> FinalStateResult<f64> {
        Ok(delta_r(
            &self.daughter_user_cand_p4(i, tag_i)?,
            &self.daughter_user_cand_p4(j, tag_j)?,
        ))
    }
    /// $`\Delta R`$ between the nominal daughters `i` and `j`.
    fn d_r(&self, i: usize, j: usize) -> FinalStateResult<f64> {
        self.d_r_tagged(i, "", j, "")
    }

    /// Transverse mass of daughters `i` and `j` under their own tags.
    fn mt_tagged(&self, i: usize, tag_i: &str, j: usize, tag_j: &str) -> FinalStateResult<f64> {
        Ok(transverse_mass(
            &self.daughter_user_cand_p4(i, tag_i)?,
            &self.daughter_user_cand_p4(j, tag_j)?,
        ))
    }
    /// Transverse mass of the nominal daughters `i` and `j`.
    fn mt(&self, i: usize, j: usize) -> FinalStateResult<f64> {
        self.mt_tagged(i, "", j, "")
    }

    /// The smallest $`|\Delta\phi|`$ over all pairs of nominal daughters, or the configured
    /// sentinel when there are fewer than two daughters.
    fn smallest_delta_phi(&self) -> FinalStateResult<f64> {
        let mut smallest = self.config().pair_scan_sentinel;
        for (i, j) in daughter_pairs(self.number_of_daughters()) {
            smallest = smallest.min(self.d_phi(i, j)?.abs());
        }
        Ok(smallest)
    }

    /// The smallest $`\Delta R`$ over all pairs of nominal daughters, or the configured
    /// sentinel when there are fewer than two daughters.
    fn smallest_delta_r(&self) -> FinalStateResult<f64> {
        let mut smallest = self.config().pair_scan_sentinel;
        for (i, j) in daughter_pairs(self.number_of_daughters()) {
            smallest = smallest.min(self.d_r(i, j)?);
        }
        Ok(smallest)
    }

    /// The missing-energy four-momentum under `met_tag` (`""` or `"@"` for nominal).
    fn met_p4(&self, met_tag: &str) -> FinalStateResult<Vec4> {
        resolve_single(self.met().as_ref(), None, met_tag)
    }

    /// Signed azimuthal separation between daughter `i` (under `tag`) and the missing energy
    /// (under `met_tag`).
    fn delta_phi_to_met_tagged(&self, i: usize, tag: &str, met_tag: &str) -> FinalStateResult<f64> {
        Ok(delta_phi(
            &self.daughter_user_cand_p4(i, tag)?,
            &self.met_p4(met_tag)?,
        ))
    }
    /// Signed azimuthal separation between the nominal daughter `i` and the nominal missing
    /// energy.
    fn delta_phi_to_met(&self, i: usize) -> FinalStateResult<f64> {
        self.delta_phi_to_met_tagged(i, "", "")
    }

    /// Transverse mass of daughter `i` (under `tag`) and the missing energy (under `met_tag`).
    fn mt_met_tagged(&self, i: usize, tag: &str, met_tag: &str) -> FinalStateResult<f64> {
        Ok(transverse_mass(
            &self.daughter_user_cand_p4(i, tag)?,
            &self.met_p4(met_tag)?,
        ))
    }
    /// Transverse mass of the nominal daughter `i` and the missing energy under `met_tag`.
    fn mt_met(&self, i: usize, met_tag: &str) -> FinalStateResult<f64> {
        self.mt_met_tagged(i, "", met_tag)
    }

    /// Sum of the four-momenta of the daughters selected by `tags`.
    fn vis_p4_tagged(&self, tags: &str) -> FinalStateResult<Vec4> {
        let selectors = SysTags::parse(tags, self.number_of_daughters())?;
        let mut output = Vec4::zero();
        for (i, selector) in selectors.iter().enumerate() {
            if selector.is_skip() {
                continue;
            }
            if let Some(p4) = resolve_p4(self.daughter(i)?, Some(i), selector)? {
                output += p4;
            }
        }
        Ok(output)
    }
    /// Sum of the nominal daughter four-momenta.
    fn vis_p4(&self) -> FinalStateResult<Vec4> {
        self.vis_p4_tagged("")
    }

    /// Visible four-momentum under `tags` plus the missing energy under `met_tag`.
    fn total_p4_tagged(&self, tags: &str, met_tag: &str) -> FinalStateResult<Vec4> {
        Ok(self.vis_p4_tagged(tags)? + self.met_p4(met_tag)?)
    }
    /// Nominal visible four-momentum plus the nominal missing energy.
    fn total_p4(&self) -> FinalStateResult<Vec4> {
        self.total_p4_tagged("", "")
    }

    /// Scalar sum of the transverse momenta of the daughters selected by `tags`.
    fn ht_tagged(&self, tags: &str) -> FinalStateResult<f64> {
        Ok(self.daughters(tags)?.iter().map(|d| d.pt()).sum())
    }
    /// Scalar sum of the nominal daughter transverse momenta.
    fn ht(&self) -> FinalStateResult<f64> {
        self.ht_tagged("")
    }

    /// Check whether daughters `i` and `j` have charges of the same sign (neutral daughters
    /// are never like-signed).
    fn like_signed(&self, i: usize, j: usize) -> FinalStateResult<bool> {
        Ok(self.daughter(i)?.charge() * self.daughter(j)?.charge() > 0)
    }

    /// Check whether daughters `i` and `j` have the same particle type, ignoring the sign of
    /// the PDG code.
    fn like_flavor(&self, i: usize, j: usize) -> FinalStateResult<bool> {
        Ok(self.daughter(i)?.pdg_id().abs() == self.daughter(j)?.pdg_id().abs())
    }

    /// The extras stored under `label` which pass `filter` (an empty filter keeps all).
    fn extras(
        &self,
        label: &str,
        filter: &str,
        evaluator: &dyn Evaluator,
    ) -> FinalStateResult<Vec<Arc<Candidate>>> {
        let unfiltered = self.overlaps(label);
        if filter.trim().is_empty() {
            return Ok(unfiltered.to_vec());
        }
        let mut output = Vec::with_capacity(unfiltered.len());
        for candidate in unfiltered {
            if evaluator.select(filter, candidate.as_ref())? {
                output.push(Arc::clone(candidate));
            }
        }
        debug!(
            label,
            filter,
            kept = output.len(),
            total = unfiltered.len(),
            "filtered extras"
        );
        Ok(output)
    }

    /// A composite of the nominal daughters at the given positions.
    fn subcand(&self, indices: &[usize]) -> FinalStateResult<CompositeCandidate> {
        let daughters = indices
            .iter()
            .map(|&i| self.daughter_ptr(i))
            .collect::<FinalStateResult<Vec<_>>>()?;
        Ok(CompositeCandidate::from_daughters(daughters))
    }

    /// A composite of the daughters selected by `tags`.
    fn subcand_tagged(&self, tags: &str) -> FinalStateResult<CompositeCandidate> {
        Ok(CompositeCandidate::from_daughters(self.daughters(tags)?))
    }

    /// A composite of the extras stored under `label` which pass `filter`, followed by the
    /// daughters selected by `tags`.
    fn subcand_with_extras(
        &self,
        tags: &str,
        label: &str,
        filter: &str,
        evaluator: &dyn Evaluator,
    ) -> FinalStateResult<CompositeCandidate> {
        let daughters = self.daughters(tags)?;
        let extras = self.extras(label, filter, evaluator)?;
        Ok(CompositeCandidate::from_daughters(
            extras.into_iter().chain(daughters),
        ))
    }

    /// Check whether the nominal daughter `i` matches an object which passed a trigger
    /// filter, within `max_delta_r` (the configured default if `None`).
    fn match_to_hlt_filter(
        &self,
        i: usize,
        filter: &str,
        max_delta_r: Option<f64>,
    ) -> FinalStateResult<bool> {
        let max_delta_r = max_delta_r.unwrap_or(self.config().trigger_match_delta_r);
        Ok(self
            .evt()
            .matched_to_filter(&self.daughter(i)?.p4(), filter, max_delta_r))
    }

    /// Check whether the nominal daughter `i` matches an object which fired a trigger path,
    /// within `max_delta_r` (the configured default if `None`).
    fn match_to_hlt_path(
        &self,
        i: usize,
        path: &str,
        max_delta_r: Option<f64>,
    ) -> FinalStateResult<bool> {
        let max_delta_r = max_delta_r.unwrap_or(self.config().trigger_match_delta_r);
        Ok(self
            .evt()
            .matched_to_path(&self.daughter(i)?.p4(), path, max_delta_r))
    }

    /// Look up a named attribute of this final state.
    ///
    /// Besides the kinematics of the final state itself (`pt`, `eta`, `phi`, `mass`, ...),
    /// the names `charge`, `numberOfDaughters`, `ht`, `visPt`, `visMass`, `totalMass`,
    /// `smallestDeltaR`, `smallestDeltaPhi`, `metPt`, `metPhi`, `vertexZ` and
    /// `vertexNdof` are available, as are the attributes of each daughter through
    /// `daughter<i>.<name>` (for example `daughter0.pt` or `daughter1.isMuon`). Each daughter
    /// also exposes the derived attributes `mtMET` and `deltaPhiToMEt`.
    fn attribute_value(&self, name: &str) -> Option<f64> {
        if let Some(rest) = name.strip_prefix("daughter") {
            let (index, attribute) = rest.split_once('.')?;
            let i: usize = index.parse().ok()?;
            return match attribute {
                "mtMET" => self.mt_met(i, "").ok(),
                "deltaPhiToMEt" => self.delta_phi_to_met(i).ok(),
                _ => self.daughter(i).ok()?.attribute(attribute),
            };
        }
        match name {
            "charge" => Some(self.charge() as f64),
            "numberOfDaughters" => Some(self.number_of_daughters() as f64),
            "ht" => self.ht().ok(),
            "visPt" => self.vis_p4().ok().map(|p4| p4.pt()),
            "visMass" => self.vis_p4().ok().map(|p4| p4.m()),
            "totalMass" => self.total_p4().ok().map(|p4| p4.m()),
            "smallestDeltaR" => self.smallest_delta_r().ok(),
            "smallestDeltaPhi" => self.smallest_delta_phi().ok(),
            "metPt" => Some(self.met().pt()),
            "metPhi" => Some(self.met().phi()),
            "vertexZ" => Some(self.vertex_object().z),
            "vertexNdof" => Some(self.vertex_object().ndof),
            "likeSigned01" => self.like_signed(0, 1).ok().map(flag),
            _ => p4_attribute(&self.p4(), name),
        }
    }

    /// Evaluate a numeric expression against the attributes of this final state.
    fn eval(&self, evaluator: &dyn Evaluator, expression: &str) -> FinalStateResult<f64> {
        evaluator.evaluate(expression, &FinalStateAttributes(self))
    }

    /// Evaluate a selection against the attributes of this final state.
    fn filter(&self, evaluator: &dyn Evaluator, cut: &str) -> FinalStateResult<bool> {
        evaluator.select(cut, &FinalStateAttributes(self))
    }
}

/// Unordered pairs `(i, j)` with `i < j` over `n` daughters.
fn daughter_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}

/// Adapter exposing any [`FinalState`] to an [`Evaluator`].
pub struct FinalStateAttributes<'a, F: FinalState + ?Sized>(pub &'a F);

impl<F: FinalState + ?Sized> Attributes for FinalStateAttributes<'_, F> {
    fn attribute(&self, name: &str) -> Option<f64> {
        self.0.attribute_value(name)
    }
}

/// A final state with `N` daughters, `2 <= N <= 5`.
///
/// The four-momentum and charge of the final state are the sums over its nominal daughters.
#[derive(Clone)]
pub struct FixedFinalState<const N: usize> {
    daughters: [Arc<Candidate>; N],
    met: Arc<MissingEnergy>,
    vertex: Arc<Vertex>,
    event: Arc<dyn EventContext>,
    overlaps: IndexMap<String, Vec<Arc<Candidate>>>,
    p4: Vec4,
    charge: i32,
    config: FinalStateConfig,
}

/// A final state with two daughters.
pub type FinalState2 = FixedFinalState<2>;
/// A final state with three daughters.
pub type FinalState3 = FixedFinalState<3>;
/// A final state with four daughters.
pub type FinalState4 = FixedFinalState<4>;
/// A final state with five daughters.
pub type FinalState5 = FixedFinalState<5>;

impl<const N: usize> FixedFinalState<N> {
    const VALID_ARITY: () = assert!(
        N >= 2 && N <= 5,
        "a final state must have between two and five daughters"
    );

    /// Build a final state from its daughters (in tag-string order) and the shared event
    /// objects.
    pub fn new(
        daughters: [Arc<Candidate>; N],
        met: Arc<MissingEnergy>,
        vertex: Arc<Vertex>,
        event: Arc<dyn EventContext>,
    ) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_ARITY;
        let p4 = daughters.iter().map(|d| d.p4()).sum();
        let charge = daughters.iter().map(|d| d.charge()).sum();
        Self {
            daughters,
            met,
            vertex,
            event,
            overlaps: IndexMap::new(),
            p4,
            charge,
            config: FinalStateConfig::default(),
        }
    }

    /// Attach a labelled collection of external candidates (isolation particles, jets, ...).
    pub fn with_overlaps<S: Into<String>>(mut self, label: S, candidates: Vec<Arc<Candidate>>) -> Self {
        self.overlaps.insert(label.into(), candidates);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: FinalStateConfig) -> Self {
        self.config = config;
        self
    }

    /// Labels of the attached overlap collections.
    pub fn overlap_labels(&self) -> impl Iterator<Item = &str> {
        self.overlaps.keys().map(String::as_str)
    }
}

impl<const N: usize> FinalState for FixedFinalState<N> {
    fn number_of_daughters(&self) -> usize {
        N
    }
    fn daughter_unsafe(&self, i: usize) -> Option<&Arc<Candidate>> {
        self.daughters.get(i)
    }
    fn met(&self) -> &Arc<MissingEnergy> {
        &self.met
    }
    fn vertex_object(&self) -> &Arc<Vertex> {
        &self.vertex
    }
    fn evt(&self) -> &Arc<dyn EventContext> {
        &self.event
    }
    fn overlaps(&self, label: &str) -> &[Arc<Candidate>] {
        self.overlaps.get(label).map(Vec::as_slice).unwrap_or(&[])
    }
    fn p4(&self) -> Vec4 {
        self.p4
    }
    fn charge(&self) -> i32 {
        self.charge
    }
    fn config(&self) -> FinalStateConfig {
        self.config
    }
}

impl<const N: usize> Attributes for FixedFinalState<N> {
    fn attribute(&self, name: &str) -> Option<f64> {
        self.attribute_value(name)
    }
}

impl<const N: usize> Debug for FixedFinalState<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedFinalState")
            .field("daughters", &self.daughters)
            .field("met", &self.met)
            .field("vertex", &self.vertex)
            .field("p4", &self.p4)
            .field("charge", &self.charge)
            .finish_non_exhaustive()
    }
}
