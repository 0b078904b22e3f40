//! Verifier for compiled usage-control formulas.
//!
//! [`verify`] decides a [`StateFormula`](dsc_policy::StateFormula) on a
//! [`PetriNet`](dsc_petrinet::PetriNet) by exploring its reachability graph.
//! `MODAL(f)` holds when some firing sequence from the initial marking
//! matches the path formula `f`; the compiled rules wrap it in `NOT` so a
//! rule is satisfied exactly when no violating sequence is reachable.
//!
//! A violation comes with a [`Witness`]: the shortest offending firing
//! sequence and the description of the predicate that completed it.
//!
//! ```ignore
//! let formula = compile(PolicyPattern::NTimesUsage, &rule, &target)?;
//! match verify(&formula, &net, &EvalEnv::now())? {
//!     VerificationResult::Satisfied => release(),
//!     VerificationResult::Violated(w) => deny(w.description),
//! }
//! ```

#![deny(unsafe_code)]

mod checker;
pub mod env;
pub mod error;
pub mod predicate;
pub mod result;
pub mod verifier;

pub use env::{EvalEnv, VerifyOptions};
pub use error::{VerifyError, VerifyResult};
pub use predicate::holds;
pub use result::{VerificationResult, Witness};
pub use verifier::{verify, verify_rule, Verifier};
