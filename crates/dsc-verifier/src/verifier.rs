use dsc_petrinet::PetriNet;
use dsc_policy::{compile, PolicyPattern, Rule, StateFormula, Target};
use tracing::debug;

use crate::checker::find_path;
use crate::env::{EvalEnv, VerifyOptions};
use crate::error::VerifyResult;
use crate::result::{VerificationResult, Witness};

/// Decides whether state formulas hold on a net.
///
/// The net is only inspected; verification never changes it.
#[derive(Clone, Debug, Default)]
pub struct Verifier {
    options: VerifyOptions,
}

/// Truth value of a state formula plus the path that explains it.
struct Verdict {
    holds: bool,
    evidence: Option<Witness>,
}

impl Verifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    pub fn verify(
        &self,
        formula: &StateFormula,
        net: &PetriNet,
        env: &EvalEnv,
    ) -> VerifyResult<VerificationResult> {
        let verdict = self.eval(formula, net, env)?;
        let result = if verdict.holds {
            VerificationResult::Satisfied
        } else {
            VerificationResult::Violated(verdict.evidence.unwrap_or_else(|| Witness {
                transitions: Vec::new(),
                transition_names: Vec::new(),
                description: format!("no execution of {} satisfies {}", net.id(), formula),
            }))
        };
        debug!(net = %net.id(), formula = %formula, result = %result, "Verified formula");
        Ok(result)
    }

    /// Compile and verify one classified rule.
    ///
    /// Patterns without a formula impose no constraint and are satisfied.
    pub fn verify_rule(
        &self,
        pattern: PolicyPattern,
        rule: &Rule,
        target: &Target,
        net: &PetriNet,
        env: &EvalEnv,
    ) -> VerifyResult<VerificationResult> {
        match compile(pattern, rule, target)? {
            Some(formula) => self.verify(&formula, net, env),
            None => Ok(VerificationResult::Satisfied),
        }
    }

    fn eval(&self, formula: &StateFormula, net: &PetriNet, env: &EvalEnv) -> VerifyResult<Verdict> {
        Ok(match formula {
            StateFormula::True => Verdict {
                holds: true,
                evidence: None,
            },
            StateFormula::Not(inner) => {
                let v = self.eval(inner, net, env)?;
                Verdict {
                    holds: !v.holds,
                    evidence: v.evidence,
                }
            }
            StateFormula::Modal(tf) => {
                let path = find_path(tf, net, env, self.options.max_states)?;
                Verdict {
                    holds: path.is_some(),
                    evidence: path,
                }
            }
        })
    }
}

/// [`Verifier::verify`] with default options.
pub fn verify(
    formula: &StateFormula,
    net: &PetriNet,
    env: &EvalEnv,
) -> VerifyResult<VerificationResult> {
    Verifier::default().verify(formula, net, env)
}

/// [`Verifier::verify_rule`] with default options.
pub fn verify_rule(
    pattern: PolicyPattern,
    rule: &Rule,
    target: &Target,
    net: &PetriNet,
    env: &EvalEnv,
) -> VerifyResult<VerificationResult> {
    Verifier::default().verify_rule(pattern, rule, target, net, env)
}
