use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::debug;

use crate::{
    expression::Evaluator, final_state::FinalState, utils::vectors::Vec4, FinalStateResult,
};

/// The final states built from one event (every combination of daughters which the
/// reconstruction produced), with batch selection and evaluation over all of them.
///
/// With the `rayon` feature enabled, batch operations run over the final states in parallel;
/// each final state is still evaluated on a single thread.
#[derive(Clone, Default)]
pub struct FinalStateCollection {
    final_states: Vec<Arc<dyn FinalState>>,
}

impl FinalStateCollection {
    pub fn new(final_states: Vec<Arc<dyn FinalState>>) -> Self {
        Self { final_states }
    }

    pub fn push(&mut self, final_state: Arc<dyn FinalState>) {
        self.final_states.push(final_state);
    }

    pub fn len(&self) -> usize {
        self.final_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.final_states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FinalState>> {
        self.final_states.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn FinalState>> {
        self.final_states.get(index)
    }

    /// Keep the final states which pass `cut`, preserving order.
    ///
    /// The first evaluation error aborts the whole selection.
    pub fn filter(&self, evaluator: &dyn Evaluator, cut: &str) -> FinalStateResult<Self> {
        #[cfg(feature = "rayon")]
        let selected: Vec<Option<Arc<dyn FinalState>>> = self
            .final_states
            .par_iter()
            .map(|fs| -> FinalStateResult<Option<Arc<dyn FinalState>>> {
                Ok(fs.filter(evaluator, cut)?.then(|| Arc::clone(fs)))
            })
            .collect::<FinalStateResult<_>>()?;
        #[cfg(not(feature = "rayon"))]
        let selected: Vec<Option<Arc<dyn FinalState>>> = self
            .final_states
            .iter()
            .map(|fs| -> FinalStateResult<Option<Arc<dyn FinalState>>> {
                Ok(fs.filter(evaluator, cut)?.then(|| Arc::clone(fs)))
            })
            .collect::<FinalStateResult<_>>()?;
        let final_states: Vec<Arc<dyn FinalState>> = selected.into_iter().flatten().collect();
        debug!(
            cut,
            kept = final_states.len(),
            total = self.len(),
            "selected final states"
        );
        Ok(Self { final_states })
    }

    /// Evaluate `expression` for every final state.
    pub fn evaluate(&self, evaluator: &dyn Evaluator, expression: &str) -> FinalStateResult<Vec<f64>> {
        #[cfg(feature = "rayon")]
        return self
            .final_states
            .par_iter()
            .map(|fs| fs.eval(evaluator, expression))
            .collect();
        #[cfg(not(feature = "rayon"))]
        return self
            .final_states
            .iter()
            .map(|fs| fs.eval(evaluator, expression))
            .collect();
    }

    /// The visible four-momentum of every final state under `tags`.
    pub fn vis_p4s(&self, tags: &str) -> FinalStateResult<Vec<Vec4>> {
        #[cfg(feature = "rayon")]
        return self
            .final_states
            .par_iter()
            .map(|fs| fs.vis_p4_tagged(tags))
            .collect();
        #[cfg(not(feature = "rayon"))]
        return self
            .final_states
            .iter()
            .map(|fs| fs.vis_p4_tagged(tags))
            .collect();
    }

    /// The final state with the largest value of `expression`, keeping the first one on ties.
    /// NaN values never win.
    pub fn best_by(
        &self,
        evaluator: &dyn Evaluator,
        expression: &str,
    ) -> FinalStateResult<Option<Arc<dyn FinalState>>> {
        let values = self.evaluate(evaluator, expression)?;
        let mut best: Option<(usize, f64)> = None;
        for (index, value) in values.into_iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, current)| value > current) {
                best = Some((index, value));
            }
        }
        Ok(best.map(|(index, _)| Arc::clone(&self.final_states[index])))
    }
}

impl FromIterator<Arc<dyn FinalState>> for FinalStateCollection {
    fn from_iter<I: IntoIterator<Item = Arc<dyn FinalState>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        expression::AttributeLookup,
        tests::{lepton_pair_state, state_with_pts, CutEvaluator},
        FinalStateError,
    };

    fn collection() -> FinalStateCollection {
        [
            Arc::new(state_with_pts([5.0, 20.0, 10.0])) as Arc<dyn FinalState>,
            Arc::new(lepton_pair_state()),
            Arc::new(state_with_pts([30.0, 1.0])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_filter_preserves_order() {
        let all = collection();
        assert_eq!(all.len(), 3);
        let selected = all.filter(&CutEvaluator, "ht > 25").unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.get(0).unwrap().number_of_daughters(), 3);
        assert_eq!(selected.get(1).unwrap().number_of_daughters(), 2);
        assert!(all.filter(&CutEvaluator, "ht > 100").unwrap().is_empty());
    }

    #[test]
    fn test_evaluate() {
        let values = collection().evaluate(&AttributeLookup, "ht").unwrap();
        assert_eq!(values.len(), 3);
        assert_relative_eq!(values[0], 35.0);
        assert_relative_eq!(values[1], 20.0);
        assert_relative_eq!(values[2], 31.0);
        assert_eq!(
            collection().evaluate(&AttributeLookup, "daughter2.pt"),
            Err(FinalStateError::UnknownAttribute {
                name: "daughter2.pt".to_string()
            })
        );
    }

    #[test]
    fn test_vis_p4s() {
        let p4s = collection().vis_p4s("").unwrap();
        assert_eq!(p4s[1], Vec4::new(10.0, 10.0, 0.0, 20.0));
        // tag strings must fit every final state
        assert!(collection().vis_p4s("@,@").is_err());
    }

    #[test]
    fn test_best_by() {
        let best = collection().best_by(&AttributeLookup, "ht").unwrap().unwrap();
        assert_relative_eq!(best.ht().unwrap(), 35.0);
        assert!(FinalStateCollection::default()
            .best_by(&AttributeLookup, "ht")
            .unwrap()
            .is_none());
    }
}
