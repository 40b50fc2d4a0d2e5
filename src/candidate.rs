use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    expression::{flag, p4_attribute, Attributes},
    utils::{enums::CandidateKind, vectors::Vec4},
};

/// Objects which carry a nominal four-momentum and any number of named systematic
/// variants of it.
pub trait VariantStore {
    /// The nominal four-momentum.
    fn nominal_p4(&self) -> Vec4;
    /// The four-momentum of the variant registered under `label`, if any.
    fn variant_p4(&self, label: &str) -> Option<Vec4>;
    /// Check whether a variant is registered under `label`.
    fn has_variant(&self, label: &str) -> bool {
        self.variant_p4(label).is_some()
    }
}

/// A reconstructed physics candidate (lepton, jet, isolation particle, ...).
///
/// Candidates are assembled once by the reconstruction pipeline using the `with_*` builder
/// methods and are read-only afterwards. Systematic variants ("user candidates") are complete
/// alternate candidates representing the same physical object under a shift, e.g. an
/// energy-scale variation stored under the label `"es+"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    p4: Vec4,
    charge: i32,
    pdg_id: i32,
    kind: CandidateKind,
    user_cands: IndexMap<String, Arc<Candidate>>,
    user_floats: IndexMap<String, f64>,
}

impl Candidate {
    /// Create a candidate whose kind is inferred from the PDG code (see
    /// [`CandidateKind::from_pdg_id`]).
    pub fn new(p4: Vec4, charge: i32, pdg_id: i32) -> Self {
        Self {
            p4,
            charge,
            pdg_id,
            kind: CandidateKind::from_pdg_id(pdg_id),
            user_cands: IndexMap::new(),
            user_floats: IndexMap::new(),
        }
    }

    /// Create a jet candidate.
    pub fn jet(p4: Vec4) -> Self {
        Self::new(p4, 0, 0).with_kind(CandidateKind::Jet)
    }

    /// Override the kind of the candidate.
    pub fn with_kind(mut self, kind: CandidateKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a systematic variant under `label`, replacing any previous one.
    pub fn with_user_cand<S: Into<String>>(self, label: S, variant: Candidate) -> Self {
        self.with_user_cand_ptr(label, Arc::new(variant))
    }

    /// Attach an already-shared systematic variant under `label`.
    pub fn with_user_cand_ptr<S: Into<String>>(mut self, label: S, variant: Arc<Candidate>) -> Self {
        self.user_cands.insert(label.into(), variant);
        self
    }

    /// Attach a variant which differs from this candidate only by its four-momentum.
    pub fn with_shifted_p4<S: Into<String>>(self, label: S, p4: Vec4) -> Self {
        let mut variant = self.clone();
        variant.p4 = p4;
        variant.user_cands.clear();
        self.with_user_cand(label, variant)
    }

    /// Attach a named scalar (identification score, isolation, flag, ...).
    pub fn with_user_float<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.user_floats.insert(name.into(), value);
        self
    }

    pub fn p4(&self) -> Vec4 {
        self.p4
    }
    pub fn pt(&self) -> f64 {
        self.p4.pt()
    }
    pub fn eta(&self) -> f64 {
        self.p4.eta()
    }
    pub fn phi(&self) -> f64 {
        self.p4.phi()
    }
    pub fn mass(&self) -> f64 {
        self.p4.m()
    }
    pub fn charge(&self) -> i32 {
        self.charge
    }
    pub fn pdg_id(&self) -> i32 {
        self.pdg_id
    }
    pub fn kind(&self) -> CandidateKind {
        self.kind
    }
    /// Check whether the candidate is of the given kind.
    pub fn is(&self, kind: CandidateKind) -> bool {
        self.kind == kind
    }

    /// Check whether a systematic variant is registered under `label`.
    pub fn has_user_cand(&self, label: &str) -> bool {
        self.user_cands.contains_key(label)
    }
    /// The systematic variant registered under `label`.
    pub fn user_cand(&self, label: &str) -> Option<&Arc<Candidate>> {
        self.user_cands.get(label)
    }
    /// Labels of all registered variants, in insertion order.
    pub fn user_cand_labels(&self) -> impl Iterator<Item = &str> {
        self.user_cands.keys().map(String::as_str)
    }
    /// A named scalar attached by the pipeline.
    pub fn user_float(&self, name: &str) -> Option<f64> {
        self.user_floats.get(name).copied()
    }
}

impl VariantStore for Candidate {
    fn nominal_p4(&self) -> Vec4 {
        self.p4
    }
    fn variant_p4(&self, label: &str) -> Option<Vec4> {
        self.user_cand(label).map(|variant| variant.p4)
    }
    fn has_variant(&self, label: &str) -> bool {
        self.has_user_cand(label)
    }
}

impl Attributes for Candidate {
    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "charge" => Some(self.charge as f64),
            "pdgId" => Some(self.pdg_id as f64),
            "isMuon" => Some(flag(self.is(CandidateKind::Muon))),
            "isElectron" => Some(flag(self.is(CandidateKind::Electron))),
            "isTau" => Some(flag(self.is(CandidateKind::Tau))),
            "isJet" => Some(flag(self.is(CandidateKind::Jet))),
            "isPhoton" => Some(flag(self.is(CandidateKind::Photon))),
            _ => p4_attribute(&self.p4, name).or_else(|| self.user_float(name)),
        }
    }
}

/// The per-event missing transverse energy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingEnergy {
    p4: Vec4,
    variants: IndexMap<String, Vec4>,
}

impl MissingEnergy {
    pub fn new(p4: Vec4) -> Self {
        Self {
            p4,
            variants: IndexMap::new(),
        }
    }

    /// Attach a systematic variant under `label`, replacing any previous one.
    pub fn with_variant<S: Into<String>>(mut self, label: S, p4: Vec4) -> Self {
        self.variants.insert(label.into(), p4);
        self
    }

    pub fn p4(&self) -> Vec4 {
        self.p4
    }
    /// Magnitude of the missing transverse momentum.
    pub fn pt(&self) -> f64 {
        self.p4.pt()
    }
    pub fn phi(&self) -> f64 {
        self.p4.phi()
    }
    /// Labels of all registered variants, in insertion order.
    pub fn variant_labels(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

impl VariantStore for MissingEnergy {
    fn nominal_p4(&self) -> Vec4 {
        self.p4
    }
    fn variant_p4(&self, label: &str) -> Option<Vec4> {
        self.variants.get(label).copied()
    }
}

/// A candidate built from constituents, whose four-momentum and charge are the sums over
/// those constituents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeCandidate {
    daughters: Vec<Arc<Candidate>>,
    p4: Vec4,
    charge: i32,
}

impl CompositeCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a composite from constituents, summing their momenta and charges.
    pub fn from_daughters<I>(daughters: I) -> Self
    where
        I: IntoIterator<Item = Arc<Candidate>>,
    {
        let mut output = Self::new();
        for daughter in daughters {
            output.add_daughter(daughter);
        }
        output.add_four_momenta();
        output
    }

    /// Append a constituent. The aggregate momentum is not updated until
    /// [`CompositeCandidate::add_four_momenta`] is called.
    pub fn add_daughter(&mut self, daughter: Arc<Candidate>) {
        self.daughters.push(daughter);
    }

    /// Recompute the four-momentum and charge as the sums over all constituents.
    pub fn add_four_momenta(&mut self) {
        self.p4 = self.daughters.iter().map(|d| d.p4()).sum();
        self.charge = self.daughters.iter().map(|d| d.charge()).sum();
    }

    pub fn number_of_daughters(&self) -> usize {
        self.daughters.len()
    }
    pub fn daughter(&self, i: usize) -> Option<&Arc<Candidate>> {
        self.daughters.get(i)
    }
    pub fn daughters(&self) -> &[Arc<Candidate>] {
        &self.daughters
    }
    pub fn p4(&self) -> Vec4 {
        self.p4
    }
    pub fn charge(&self) -> i32 {
        self.charge
    }
    pub fn pt(&self) -> f64 {
        self.p4.pt()
    }
    pub fn mass(&self) -> f64 {
        self.p4.m()
    }
}

impl Attributes for CompositeCandidate {
    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "charge" => Some(self.charge as f64),
            "numberOfDaughters" => Some(self.daughters.len() as f64),
            _ => p4_attribute(&self.p4, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_candidate_variants() {
        let mu = Candidate::new(Vec4::new(10.0, 0.0, 0.0, 10.0), -1, 13)
            .with_shifted_p4("es+", Vec4::new(12.0, 0.0, 0.0, 12.0));
        assert_eq!(mu.kind(), CandidateKind::Muon);
        assert!(mu.has_user_cand("es+"));
        assert!(!mu.has_user_cand("es-"));
        assert_eq!(mu.variant_p4("es+"), Some(Vec4::new(12.0, 0.0, 0.0, 12.0)));
        assert_eq!(mu.variant_p4("es-"), None);
        let variant = mu.user_cand("es+").unwrap();
        assert_eq!(variant.charge(), -1);
        assert_eq!(variant.pdg_id(), 13);
        assert_eq!(mu.user_cand_labels().collect::<Vec<_>>(), vec!["es+"]);
    }

    #[test]
    fn test_candidate_attributes() {
        let jet = Candidate::jet(Vec4::new(30.0, 40.0, 0.0, 51.0)).with_user_float("btag", 0.9);
        assert_eq!(jet.attribute("isJet"), Some(1.0));
        assert_eq!(jet.attribute("isMuon"), Some(0.0));
        assert_relative_eq!(jet.attribute("pt").unwrap(), 50.0);
        assert_eq!(jet.attribute("btag"), Some(0.9));
        assert_eq!(jet.attribute("charge"), Some(0.0));
        assert_eq!(jet.attribute("nonsense"), None);
    }

    #[test]
    fn test_missing_energy_variants() {
        let met = MissingEnergy::new(Vec4::new(3.0, 4.0, 0.0, 5.0))
            .with_variant("jes+", Vec4::new(6.0, 8.0, 0.0, 10.0));
        assert_relative_eq!(met.pt(), 5.0);
        assert!(met.has_variant("jes+"));
        assert!(!met.has_variant("jes-"));
        assert_eq!(met.variant_p4("jes+").unwrap().pt(), 10.0);
        assert_eq!(met.variant_labels().collect::<Vec<_>>(), vec!["jes+"]);
    }

    #[test]
    fn test_composite_sums_constituents() {
        let composite = CompositeCandidate::from_daughters([
            Arc::new(Candidate::new(Vec4::new(10.0, 0.0, 0.0, 10.0), 1, -13)),
            Arc::new(Candidate::new(Vec4::new(0.0, 10.0, 0.0, 10.0), 1, -11)),
            Arc::new(Candidate::new(Vec4::new(0.0, 0.0, 5.0, 5.0), -1, 11)),
        ]);
        assert_eq!(composite.number_of_daughters(), 3);
        assert_eq!(composite.p4(), Vec4::new(10.0, 10.0, 5.0, 25.0));
        assert_eq!(composite.charge(), 1);
        assert_eq!(composite.attribute("numberOfDaughters"), Some(3.0));
    }

    #[test]
    fn test_composite_requires_explicit_update() {
        let mut composite = CompositeCandidate::new();
        composite.add_daughter(Arc::new(Candidate::new(Vec4::new(1.0, 0.0, 0.0, 1.0), 1, -11)));
        assert_eq!(composite.p4(), Vec4::zero());
        composite.add_four_momenta();
        assert_eq!(composite.p4(), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(composite.charge(), 1);
    }
}
