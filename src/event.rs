use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::utils::{kinematics::delta_r, vectors::Vec4};

/// Event-level services consumed by a final state.
///
/// The only services the final state needs are trigger-object matching by filter label or by
/// path name.
pub trait EventContext: Send + Sync {
    /// Check whether `p4` lies within `max_delta_r` of an object which passed the trigger
    /// filter `filter`.
    fn matched_to_filter(&self, p4: &Vec4, filter: &str, max_delta_r: f64) -> bool;
    /// Check whether `p4` lies within `max_delta_r` of an object which fired the trigger
    /// path `path`.
    fn matched_to_path(&self, p4: &Vec4, path: &str, max_delta_r: f64) -> bool;
}

/// The primary vertex of the event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Position in cm.
    pub x: f64,
    /// Position in cm.
    pub y: f64,
    /// Position in cm.
    pub z: f64,
    /// Number of degrees of freedom of the vertex fit.
    pub ndof: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64, ndof: f64) -> Self {
        Self { x, y, z, ndof }
    }
    /// Transverse distance from the beam line.
    pub fn rho(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// A per-event record of trigger objects and event weights.
///
/// Trigger objects are stored under each filter label they passed and each path they
/// fired, so matching is a delta-R search over a short list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
    filter_objects: IndexMap<String, Vec<Vec4>>,
    path_objects: IndexMap<String, Vec<Vec4>>,
    weights: IndexMap<String, f64>,
    rho: f64,
}

impl TriggerEvent {
    pub fn new(rho: f64) -> Self {
        Self {
            rho,
            ..Default::default()
        }
    }

    /// Record a trigger object which passed `filter`.
    pub fn with_filter_object<S: Into<String>>(mut self, filter: S, p4: Vec4) -> Self {
        self.filter_objects.entry(filter.into()).or_default().push(p4);
        self
    }

    /// Record a trigger object which fired `path`.
    pub fn with_path_object<S: Into<String>>(mut self, path: S, p4: Vec4) -> Self {
        self.path_objects.entry(path.into()).or_default().push(p4);
        self
    }

    /// Attach a named event weight (pileup, efficiency corrections, ...).
    pub fn with_weight<S: Into<String>>(mut self, name: S, weight: f64) -> Self {
        self.weights.insert(name.into(), weight);
        self
    }

    /// A named event weight.
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    /// The product of all named event weights (1 when none are attached).
    pub fn total_weight(&self) -> f64 {
        self.weights.values().product()
    }

    /// The median energy density of the event.
    pub fn rho(&self) -> f64 {
        self.rho
    }

    fn any_within(objects: Option<&Vec<Vec4>>, p4: &Vec4, max_delta_r: f64) -> bool {
        objects.is_some_and(|objects| {
            objects
                .iter()
                .any(|object| delta_r(object, p4) < max_delta_r)
        })
    }
}

impl EventContext for TriggerEvent {
    fn matched_to_filter(&self, p4: &Vec4, filter: &str, max_delta_r: f64) -> bool {
        let matched = Self::any_within(self.filter_objects.get(filter), p4, max_delta_r);
        trace!(filter, max_delta_r, matched, "trigger filter matching");
        matched
    }

    fn matched_to_path(&self, p4: &Vec4, path: &str, max_delta_r: f64) -> bool {
        let matched = Self::any_within(self.path_objects.get(path), p4, max_delta_r);
        trace!(path, max_delta_r, matched, "trigger path matching");
        matched
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_filter_matching_window() {
        let event = TriggerEvent::default()
            .with_filter_object("hltL3MuonFilter", Vec4::from_pt_eta_phi_m(20.0, 0.0, 0.0, 0.0));
        let near = Vec4::from_pt_eta_phi_m(25.0, 0.1, 0.1, 0.0);
        let far = Vec4::from_pt_eta_phi_m(25.0, 0.5, 0.5, 0.0);
        assert!(event.matched_to_filter(&near, "hltL3MuonFilter", 0.3));
        assert!(!event.matched_to_filter(&far, "hltL3MuonFilter", 0.3));
        assert!(event.matched_to_filter(&far, "hltL3MuonFilter", 1.0));
        assert!(!event.matched_to_filter(&near, "hltEleFilter", 0.3));
    }

    #[test]
    fn test_path_matching() {
        let event = TriggerEvent::default()
            .with_path_object("HLT_Mu17_Mu8", Vec4::from_pt_eta_phi_m(18.0, 1.0, -2.0, 0.0))
            .with_path_object("HLT_Mu17_Mu8", Vec4::from_pt_eta_phi_m(9.0, -1.0, 1.0, 0.0));
        let second = Vec4::from_pt_eta_phi_m(10.0, -1.05, 1.0, 0.0);
        assert!(event.matched_to_path(&second, "HLT_Mu17_Mu8", 0.3));
        assert!(!event.matched_to_filter(&second, "HLT_Mu17_Mu8", 0.3));
    }

    #[test]
    fn test_weights() {
        let event = TriggerEvent::new(7.5)
            .with_weight("pu", 0.8)
            .with_weight("trigger", 0.5);
        assert_eq!(event.weight("pu"), Some(0.8));
        assert_eq!(event.weight("btag"), None);
        assert_relative_eq!(event.total_weight(), 0.4);
        assert_eq!(event.rho(), 7.5);
        assert_eq!(TriggerEvent::default().total_weight(), 1.0);
    }

    #[test]
    fn test_vertex_rho() {
        assert_relative_eq!(Vertex::new(0.3, 0.4, 1.0, 20.0).rho(), 0.5);
    }
}
