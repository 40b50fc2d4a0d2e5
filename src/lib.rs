//! # finalstate
//!
//! Kinematics over fixed-arity final states of reconstructed candidates, with systematic
//! variations selected by compact tag strings.
//!
//! A final state holds two to five daughter [`Candidate`]s together with the event's
//! [`MissingEnergy`], primary [`Vertex`] and an [`EventContext`](event::EventContext) used for
//! trigger matching. Every observable can be computed either with the nominal daughter
//! four-momenta or under a tag string such as `"es+,@,#"`, which reads as "use the `es+`
//! variant of the first daughter, the nominal second daughter, and skip the third".
//!
//! ```
//! use std::sync::Arc;
//! use finalstate::prelude::*;
//!
//! let shifted = Candidate::new(Vec4::new(12.0, 0.0, 0.0, 12.0), -1, 13);
//! let mu = Candidate::new(Vec4::new(10.0, 0.0, 0.0, 10.0), -1, 13).with_user_cand("es+", shifted);
//! let e = Candidate::new(Vec4::new(0.0, 10.0, 0.0, 10.0), 1, -11);
//! let fs = FinalState2::new(
//!     [Arc::new(mu), Arc::new(e)],
//!     Arc::new(MissingEnergy::new(Vec4::new(-5.0, -5.0, 0.0, 50.0_f64.sqrt()))),
//!     Arc::new(Vertex::default()),
//!     Arc::new(TriggerEvent::default()),
//! );
//! let nominal = fs.vis_p4().unwrap();
//! let shifted = fs.vis_p4_tagged("es+,").unwrap();
//! assert_eq!(shifted.px() - nominal.px(), 2.0);
//! ```
#![warn(clippy::perf, clippy::style)]
// #![warn(missing_docs)]
#![allow(clippy::excessive_precision)]

use thiserror::Error;

/// Reconstructed candidates, missing energy and their systematic variants.
pub mod candidate;
/// Batch evaluation over the final states of one event.
pub mod collection;
/// Per-final-state configuration.
pub mod config;
/// Event-level collaborators: trigger matching context and the primary vertex.
pub mod event;
/// The interface to external string-expression evaluators.
pub mod expression;
/// The fixed-arity final state and its observables.
pub mod final_state;
/// Parsing of systematic tag strings and resolution of variants.
pub mod tags;
/// Vectors, kinematic functions and enums.
pub mod utils;

/// Useful traits for all crate structs
pub mod traits {
    pub use crate::candidate::VariantStore;
    pub use crate::event::EventContext;
    pub use crate::expression::{Attributes, Evaluator};
    pub use crate::final_state::FinalState;
}

/// Everything needed to build and query a final state.
pub mod prelude {
    pub use crate::candidate::{Candidate, CompositeCandidate, MissingEnergy};
    pub use crate::collection::FinalStateCollection;
    pub use crate::config::FinalStateConfig;
    pub use crate::event::{TriggerEvent, Vertex};
    pub use crate::final_state::{
        FinalState2, FinalState3, FinalState4, FinalState5, FixedFinalState,
    };
    pub use crate::tags::{SysTags, TagSelector};
    pub use crate::traits::*;
    pub use crate::utils::enums::CandidateKind;
    pub use crate::utils::vectors::{Vec3, Vec4};
    pub use crate::{FinalStateError, FinalStateResult};
}

pub use crate::candidate::{Candidate, CompositeCandidate, MissingEnergy};
pub use crate::collection::FinalStateCollection;
pub use crate::config::FinalStateConfig;
pub use crate::event::{TriggerEvent, Vertex};
pub use crate::final_state::{FinalState, FixedFinalState};
pub use crate::tags::{SysTags, TagSelector};
pub use crate::utils::enums::CandidateKind;
pub use crate::utils::vectors::{Vec3, Vec4};

/// Shorthand for results returned by this crate.
pub type FinalStateResult<T> = Result<T, FinalStateError>;

/// The error type used by all `finalstate` methods
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FinalStateError {
    /// A daughter slot which should be populated holds no candidate.
    #[error("Daughter {index} of the final state is null!")]
    NullDaughter {
        /// Position of the missing daughter
        index: usize,
    },
    /// A tag string does not contain one token per daughter.
    #[error(
        "The number of parsed tokens ({found}) from the tag string \"{tags}\" does not match the number of daughters ({expected})!"
    )]
    ArityMismatch {
        /// Number of daughters in the final state
        expected: usize,
        /// Number of tokens parsed from the tag string
        found: usize,
        /// The offending tag string
        tags: String,
    },
    /// A named variant was requested which is not attached to the object.
    #[error("No systematic variant \"{label}\" registered on {}!", variant_owner(.index))]
    MissingVariant {
        /// Position of the daughter, or `None` for the missing-energy object
        index: Option<usize>,
        /// Label of the requested variant
        label: String,
    },
    /// A daughter index is not smaller than the arity of the final state.
    #[error("Daughter index {index} is out of range for a final state with {arity} daughters!")]
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// Number of daughters in the final state
        arity: usize,
    },
    /// An expression referenced an attribute which the object does not expose.
    #[error("No attribute named \"{name}\"!")]
    UnknownAttribute {
        /// Name of the attribute which failed lookup
        name: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// An error reported by an external expression evaluator.
    #[error("Failed to evaluate expression: {0}")]
    Evaluation(String),
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}

fn variant_owner(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("daughter {i}"),
        None => "the missing energy".to_string(),
    }
}
