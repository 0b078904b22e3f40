//! Temporal formula trees produced by the compiler.
//!
//! Two syntactic levels: [`StateFormula`] is evaluated at the initial marking
//! of a net, [`TransitionFormula`] along a path of fired transitions. Leaves
//! are [`ArcPredicate`]s: plain data with a description, so a verdict can be
//! explained and two formulas can be compared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::duration::UsageDuration;
use crate::rule::{Target, TimeInterval};

/// What an arc predicate checks on a single transition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredicateKind {
    /// The transition reads `target`.
    Reads { target: Target },
    /// The transition erases `target`.
    Erases { target: Target },
    /// The transition reads `target` and its context lacks `label`.
    ReadsWithoutLabel { target: Target, label: String },
    /// The transition reads `target` while the evaluation instant lies
    /// outside `interval`.
    ReadsOutsideInterval {
        target: Target,
        interval: TimeInterval,
    },
    /// The transition reads `target` after `duration` has elapsed since
    /// usage began.
    ReadsAfterElapsed {
        target: Target,
        duration: UsageDuration,
    },
}

impl PredicateKind {
    pub fn target(&self) -> &Target {
        match self {
            PredicateKind::Reads { target }
            | PredicateKind::Erases { target }
            | PredicateKind::ReadsWithoutLabel { target, .. }
            | PredicateKind::ReadsOutsideInterval { target, .. }
            | PredicateKind::ReadsAfterElapsed { target, .. } => target,
        }
    }
}

/// A named, side-effect-free predicate over a transition context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcPredicate {
    pub kind: PredicateKind,
    pub description: String,
}

impl ArcPredicate {
    pub fn new(kind: PredicateKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn reads(target: &Target) -> Self {
        Self::new(
            PredicateKind::Reads {
                target: target.clone(),
            },
            format!("check if transition reads {}", target),
        )
    }

    pub fn erases(target: &Target) -> Self {
        Self::new(
            PredicateKind::Erases {
                target: target.clone(),
            },
            format!("check if transition erases {}", target),
        )
    }

    pub fn reads_without_flag(target: &Target, flag: &str) -> Self {
        Self::new(
            PredicateKind::ReadsWithoutLabel {
                target: target.clone(),
                label: flag.to_string(),
            },
            format!(
                "check if transition reads {} without {} flag set",
                target, flag
            ),
        )
    }

    pub fn reads_outside_connector(target: &Target, connector: &str) -> Self {
        Self::new(
            PredicateKind::ReadsWithoutLabel {
                target: target.clone(),
                label: connector.to_string(),
            },
            format!(
                "check if transition reads {} outside connector {}",
                target, connector
            ),
        )
    }

    pub fn reads_outside_interval(target: &Target, interval: TimeInterval) -> Self {
        Self::new(
            PredicateKind::ReadsOutsideInterval {
                target: target.clone(),
                interval,
            },
            format!(
                "check if transition reads {} outside interval {}..{}",
                target,
                interval.start.to_rfc3339(),
                interval.end.to_rfc3339()
            ),
        )
    }

    pub fn reads_after_elapsed(target: &Target, duration: UsageDuration) -> Self {
        Self::new(
            PredicateKind::ReadsAfterElapsed {
                target: target.clone(),
                duration,
            },
            format!(
                "check if transition reads {} after {} of usage",
                target, duration
            ),
        )
    }

    /// Compact symbol used when rendering formulas.
    pub fn symbol(&self) -> String {
        match &self.kind {
            PredicateKind::Reads { target } => format!("read({})", target),
            PredicateKind::Erases { target } => format!("erase({})", target),
            PredicateKind::ReadsWithoutLabel { target, label } => {
                format!("read({})&!{}", target, label)
            }
            PredicateKind::ReadsOutsideInterval { target, interval } => format!(
                "read({})&!during({},{})",
                target,
                interval.start.to_rfc3339(),
                interval.end.to_rfc3339()
            ),
            PredicateKind::ReadsAfterElapsed { target, duration } => {
                format!("read({})&elapsed>{}", target, duration)
            }
        }
    }
}

impl fmt::Display for ArcPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

/// Formula evaluated at a marking.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFormula {
    True,
    Not(Box<StateFormula>),
    /// There exists a path on which the transition formula holds.
    Modal(TransitionFormula),
}

impl StateFormula {
    pub fn not(inner: StateFormula) -> Self {
        StateFormula::Not(Box::new(inner))
    }

    pub fn modal(inner: TransitionFormula) -> Self {
        StateFormula::Modal(inner)
    }

    /// Number of nodes in the tree, transition formulas included.
    pub fn size(&self) -> usize {
        match self {
            StateFormula::True => 1,
            StateFormula::Not(inner) => 1 + inner.size(),
            StateFormula::Modal(tf) => 1 + tf.size(),
        }
    }
}

/// Formula evaluated along a path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionFormula {
    /// Some later transition on the path satisfies the predicate.
    Af(ArcPredicate),
    /// The left formula matches, then the right one on the continuation.
    And(Box<TransitionFormula>, Box<TransitionFormula>),
    /// The rest of the path contains no match.
    Not(Box<TransitionFormula>),
    /// The formula matches now or at any later position.
    Ev(Box<TransitionFormula>),
    /// The formula matches from the current position.
    Pos(Box<TransitionFormula>),
    /// The next transition satisfies the predicate.
    Leaf(ArcPredicate),
}

impl TransitionFormula {
    pub fn af(predicate: ArcPredicate) -> Self {
        TransitionFormula::Af(predicate)
    }

    pub fn leaf(predicate: ArcPredicate) -> Self {
        TransitionFormula::Leaf(predicate)
    }

    pub fn and(left: TransitionFormula, right: TransitionFormula) -> Self {
        TransitionFormula::And(Box::new(left), Box::new(right))
    }

    pub fn not(inner: TransitionFormula) -> Self {
        TransitionFormula::Not(Box::new(inner))
    }

    pub fn ev(inner: TransitionFormula) -> Self {
        TransitionFormula::Ev(Box::new(inner))
    }

    pub fn pos(inner: TransitionFormula) -> Self {
        TransitionFormula::Pos(Box::new(inner))
    }

    pub fn size(&self) -> usize {
        let mut size = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            size += 1;
            node.push_children(&mut stack);
        }
        size
    }

    /// All predicates in the tree, left to right.
    pub fn predicates(&self) -> Vec<&ArcPredicate> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                TransitionFormula::Af(p) | TransitionFormula::Leaf(p) => out.push(p),
                _ => node.push_children(&mut stack),
            }
        }
        out
    }

    /// Children in reverse order, so that popping visits them left to right.
    fn push_children<'a>(&'a self, stack: &mut Vec<&'a TransitionFormula>) {
        match self {
            TransitionFormula::Af(_) | TransitionFormula::Leaf(_) => {}
            TransitionFormula::And(l, r) => {
                stack.push(r);
                stack.push(l);
            }
            TransitionFormula::Not(inner)
            | TransitionFormula::Ev(inner)
            | TransitionFormula::Pos(inner) => stack.push(inner),
        }
    }

    /// Move composite children out, leaving empty leaves in their place.
    fn detach_children(&mut self, out: &mut Vec<TransitionFormula>) {
        let mut detach = |child: &mut Box<TransitionFormula>| {
            if !matches!(**child, TransitionFormula::Af(_) | TransitionFormula::Leaf(_)) {
                out.push(std::mem::replace(&mut **child, TransitionFormula::hole()));
            }
        };
        match self {
            TransitionFormula::Af(_) | TransitionFormula::Leaf(_) => {}
            TransitionFormula::And(l, r) => {
                detach(l);
                detach(r);
            }
            TransitionFormula::Not(inner)
            | TransitionFormula::Ev(inner)
            | TransitionFormula::Pos(inner) => detach(inner),
        }
    }

    fn hole() -> Self {
        TransitionFormula::Leaf(ArcPredicate::new(
            PredicateKind::Reads {
                target: Target::new(String::new()),
            },
            String::new(),
        ))
    }
}

/// Count chains nest thousands of boxes deep; tear them down without
/// recursing once per level.
impl Drop for TransitionFormula {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl fmt::Display for StateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFormula::True => write!(f, "TT"),
            StateFormula::Not(inner) => write!(f, "NOT({})", inner),
            StateFormula::Modal(tf) => write!(f, "MODAL({})", tf),
        }
    }
}

/// Rendering step: a subtree still to print or literal text.
enum Piece<'a> {
    Node(&'a TransitionFormula),
    Text(&'static str),
}

impl fmt::Display for TransitionFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Node(self)];
        while let Some(piece) = stack.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node) => node,
            };
            match node {
                TransitionFormula::Af(p) => write!(f, "AF({})", p)?,
                TransitionFormula::Leaf(p) => write!(f, "{}", p)?,
                TransitionFormula::And(l, r) => {
                    f.write_str("AND(")?;
                    stack.push(Piece::Text(")"));
                    stack.push(Piece::Node(r));
                    stack.push(Piece::Text(", "));
                    stack.push(Piece::Node(l));
                }
                TransitionFormula::Not(inner) => {
                    f.write_str("NOT(")?;
                    stack.push(Piece::Text(")"));
                    stack.push(Piece::Node(inner));
                }
                TransitionFormula::Ev(inner) => {
                    f.write_str("EV(")?;
                    stack.push(Piece::Text(")"));
                    stack.push(Piece::Node(inner));
                }
                TransitionFormula::Pos(inner) => {
                    f.write_str("POS(")?;
                    stack.push(Piece::Text(")"));
                    stack.push(Piece::Node(inner));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_formula() {
        let target = Target::new("artifact://42");
        let f = StateFormula::not(StateFormula::modal(TransitionFormula::pos(
            TransitionFormula::af(ArcPredicate::reads(&target)),
        )));
        assert_eq!(f.to_string(), "NOT(MODAL(POS(AF(read(artifact://42)))))");
        assert_eq!(f.size(), 4);
    }

    #[test]
    fn descriptions_name_target_and_flag() {
        let target = Target::new("artifact://7");
        let p = ArcPredicate::reads_without_flag(&target, "logging");
        assert_eq!(
            p.description,
            "check if transition reads artifact://7 without logging flag set"
        );
        assert_eq!(p.symbol(), "read(artifact://7)&!logging");
    }

    #[test]
    fn predicates_listed_in_order() {
        let target = Target::new("t");
        let tf = TransitionFormula::and(
            TransitionFormula::af(ArcPredicate::reads(&target)),
            TransitionFormula::not(TransitionFormula::ev(TransitionFormula::af(
                ArcPredicate::erases(&target),
            ))),
        );
        let preds: Vec<_> = tf.predicates().into_iter().map(|p| p.symbol()).collect();
        assert_eq!(preds, vec!["read(t)", "erase(t)"]);
    }

    #[test]
    fn deep_chains_render_count_and_drop() {
        let target = Target::new("t");
        let mut chain = TransitionFormula::pos(TransitionFormula::af(ArcPredicate::reads(&target)));
        for _ in 0..200_000 {
            chain = TransitionFormula::pos(TransitionFormula::and(
                TransitionFormula::af(ArcPredicate::reads(&target)),
                chain,
            ));
        }
        assert_eq!(chain.predicates().len(), 200_001);
        assert_eq!(chain.size(), 2 + 200_000 * 3);

        let text = chain.to_string();
        assert!(text.starts_with("POS(AND(AF(read(t)), POS(AND("));
        assert!(text.ends_with(&")".repeat(2 * 200_000 + 2)));
        drop(chain);
    }

    #[test]
    fn formulas_serialize() {
        let target = Target::new("t");
        let f = StateFormula::modal(TransitionFormula::leaf(ArcPredicate::erases(&target)));
        let json = serde_json::to_string(&f).unwrap();
        let back: StateFormula = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
