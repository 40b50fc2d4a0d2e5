use dyn_clone::DynClone;

use crate::{utils::vectors::Vec4, FinalStateError, FinalStateResult};

/// Objects which expose named scalar attributes to an [`Evaluator`].
///
/// Boolean attributes are reported as `1.0` (true) or `0.0` (false).
pub trait Attributes {
    /// Look up the value of an attribute, returning `None` if the object has no attribute by
    /// that name.
    fn attribute(&self, name: &str) -> Option<f64>;

    /// Look up the value of an attribute, failing with
    /// [`FinalStateError::UnknownAttribute`] if it does not exist.
    fn require(&self, name: &str) -> FinalStateResult<f64> {
        self.attribute(name)
            .ok_or_else(|| FinalStateError::UnknownAttribute {
                name: name.to_string(),
            })
    }
}

/// A string-expression evaluator.
///
/// Implementors parse an expression (such as `"pt > 20 && abs(eta) < 2.1"`) and evaluate it
/// against the [`Attributes`] of an object. The crate never interprets expressions itself;
/// it only forwards them together with the object being queried.
pub trait Evaluator: DynClone + Send + Sync {
    /// Evaluate a numeric expression.
    fn evaluate(&self, expression: &str, object: &dyn Attributes) -> FinalStateResult<f64>;

    /// Evaluate a boolean selection. By default, any non-zero numeric result passes.
    fn select(&self, cut: &str, object: &dyn Attributes) -> FinalStateResult<bool> {
        Ok(self.evaluate(cut, object)? != 0.0)
    }
}

dyn_clone::clone_trait_object!(Evaluator);

/// The simplest [`Evaluator`]: every expression is the name of a single attribute.
///
/// Selections pass when the attribute is non-zero, which makes this useful for flags
/// stored as user floats (`"isolated"`, `"passesId"`).
#[derive(Clone, Copy, Debug, Default)]
pub struct AttributeLookup;

impl Evaluator for AttributeLookup {
    fn evaluate(&self, expression: &str, object: &dyn Attributes) -> FinalStateResult<f64> {
        object.require(expression.trim())
    }
}

/// Kinematic attributes shared by everything that carries a four-momentum.
pub(crate) fn p4_attribute(p4: &Vec4, name: &str) -> Option<f64> {
    match name {
        "pt" => Some(p4.pt()),
        "eta" => Some(p4.eta()),
        "phi" => Some(p4.phi()),
        "mass" => Some(p4.m()),
        "energy" => Some(p4.e()),
        "et" => Some(p4.et()),
        "px" => Some(p4.px()),
        "py" => Some(p4.py()),
        "pz" => Some(p4.pz()),
        _ => None,
    }
}

/// Convert a boolean attribute to its numeric form.
pub(crate) fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    struct Point(Vec4);

    impl Attributes for Point {
        fn attribute(&self, name: &str) -> Option<f64> {
            match name {
                "massive" => Some(flag(self.0.m() > 0.0)),
                _ => p4_attribute(&self.0, name),
            }
        }
    }

    #[test]
    fn test_attribute_lookup() {
        let point = Point(Vec4::new(3.0, 4.0, 0.0, 6.0));
        assert_relative_eq!(AttributeLookup.evaluate("pt", &point).unwrap(), 5.0);
        assert_relative_eq!(AttributeLookup.evaluate(" energy ", &point).unwrap(), 6.0);
        assert!(AttributeLookup.select("massive", &point).unwrap());
    }

    #[test]
    fn test_unknown_attribute() {
        let point = Point(Vec4::new(3.0, 4.0, 0.0, 5.0));
        assert!(!AttributeLookup.select("massive", &point).unwrap());
        assert_eq!(
            AttributeLookup.evaluate("charge", &point),
            Err(FinalStateError::UnknownAttribute {
                name: "charge".to_string()
            })
        );
    }

    #[test]
    fn test_boxed_evaluator_clones() {
        let boxed: Box<dyn Evaluator> = Box::new(AttributeLookup);
        let cloned = boxed.clone();
        let point = Point(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_relative_eq!(cloned.evaluate("px", &point).unwrap(), 1.0);
    }
}
