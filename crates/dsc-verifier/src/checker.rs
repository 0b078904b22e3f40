//! Explicit-state model checking over the reachability graph.
//!
//! A transition formula is flattened into an arena and tracked along a path
//! as an *obligation*: a stack of formula nodes still to be matched, the top
//! being the next one. Negated sub-formulas spawn negated obligations that
//! must never be fulfilled on the rest of the path. The search explores the
//! product of markings and obligations breadth-first, so the first witness
//! found is a shortest one, and a product state is never expanded twice, so
//! cyclic nets terminate. A transition of multiplicity `n` advances the
//! obligations `n` times in one edge.
//!
//! Path semantics:
//!
//! | node | matches from position `i` when |
//! |---|---|
//! | `AF(p)` | some transition at or after `i` satisfies `p`; matching continues after it |
//! | leaf `p` | the transition at `i` satisfies `p` |
//! | `POS(f)` | `f` matches from `i` |
//! | `AND(a, b)` | `a` matches, then `b` matches from where `a` stopped |
//! | `EV(f)` | `f` matches from `i` or from any later position |
//! | `NOT(f)` | some maximal continuation from `i` contains no match of `f` |

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use dsc_petrinet::{Marking, PetriNet, Transition, TransitionContext, TransitionId};
use dsc_policy::{ArcPredicate, TransitionFormula};
use tracing::debug;

use crate::env::EvalEnv;
use crate::error::{VerifyError, VerifyResult};
use crate::predicate::holds;
use crate::result::Witness;

type NodeId = usize;

enum Node<'f> {
    Af(&'f ArcPredicate),
    Leaf(&'f ArcPredicate),
    And(NodeId, NodeId),
    Not(NodeId),
    Ev(NodeId),
    Pos(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Item {
    Node(NodeId),
    /// An `EV` node that lets the next transition pass before retrying.
    Skip(NodeId),
}

/// Stack of items still to match; the last element is matched next.
type Obligation = Vec<Item>;

#[derive(Clone)]
struct Closed {
    obligation: Obligation,
    negated: Vec<Obligation>,
}

/// One successor of a product state, before the marking is attached.
struct Successor<'f> {
    obligation: Obligation,
    negated: BTreeSet<Obligation>,
    matched: Option<&'f ArcPredicate>,
}

type Frontier<'f> = BTreeMap<(Obligation, BTreeSet<Obligation>), Option<&'f ArcPredicate>>;

struct Arena<'f> {
    nodes: Vec<Node<'f>>,
    /// Subtree built from `AF`, `AND`, `POS` and `EV` only. Matching such a
    /// subtree later never succeeds where matching it earlier fails.
    monotone: Vec<bool>,
}

impl<'f> Arena<'f> {
    fn flatten(formula: &'f TransitionFormula) -> (Self, NodeId) {
        let mut arena = Arena {
            nodes: Vec::new(),
            monotone: Vec::new(),
        };
        // Post-order without recursion: children are pushed before parents.
        let mut ids: Vec<NodeId> = Vec::new();
        let mut work = vec![(formula, false)];
        while let Some((f, expanded)) = work.pop() {
            if !expanded {
                work.push((f, true));
                match f {
                    TransitionFormula::Af(_) | TransitionFormula::Leaf(_) => {}
                    TransitionFormula::And(l, r) => {
                        work.push((r, false));
                        work.push((l, false));
                    }
                    TransitionFormula::Not(inner)
                    | TransitionFormula::Ev(inner)
                    | TransitionFormula::Pos(inner) => work.push((inner, false)),
                }
                continue;
            }
            let (node, monotone) = match f {
                TransitionFormula::Af(p) => (Node::Af(p), true),
                TransitionFormula::Leaf(p) => (Node::Leaf(p), false),
                TransitionFormula::And(..) => {
                    let (Some(r), Some(l)) = (ids.pop(), ids.pop()) else {
                        continue;
                    };
                    (Node::And(l, r), arena.monotone[l] && arena.monotone[r])
                }
                TransitionFormula::Not(_) => {
                    let Some(inner) = ids.pop() else { continue };
                    (Node::Not(inner), false)
                }
                TransitionFormula::Ev(_) => {
                    let Some(inner) = ids.pop() else { continue };
                    (Node::Ev(inner), arena.monotone[inner])
                }
                TransitionFormula::Pos(_) => {
                    let Some(inner) = ids.pop() else { continue };
                    (Node::Pos(inner), arena.monotone[inner])
                }
            };
            arena.nodes.push(node);
            arena.monotone.push(monotone);
            ids.push(arena.nodes.len() - 1);
        }
        let root = ids.pop().unwrap_or_default();
        (arena, root)
    }

    fn is_monotone(&self, obligation: &[Item]) -> bool {
        obligation.iter().all(|item| match item {
            Item::Node(id) | Item::Skip(id) => self.monotone[*id],
        })
    }

    /// Unfold non-consuming nodes until every alternative is either empty
    /// or has a consuming item (`AF`, leaf, skip) on top.
    fn close(&self, start: Obligation, allow_negation: bool) -> VerifyResult<Vec<Closed>> {
        let mut out = Vec::new();
        let mut work = vec![Closed {
            obligation: start,
            negated: Vec::new(),
        }];

        while let Some(mut c) = work.pop() {
            let id = match c.obligation.last() {
                Some(Item::Node(id)) => *id,
                _ => {
                    out.push(c);
                    continue;
                }
            };
            match self.nodes[id] {
                Node::Af(_) | Node::Leaf(_) => out.push(c),
                Node::Pos(inner) => {
                    replace_top(&mut c.obligation, Item::Node(inner));
                    work.push(c);
                }
                Node::And(l, r) => {
                    c.obligation.pop();
                    c.obligation.push(Item::Node(r));
                    c.obligation.push(Item::Node(l));
                    work.push(c);
                }
                Node::Ev(inner) => {
                    let mut later = c.clone();
                    replace_top(&mut later.obligation, Item::Skip(id));
                    work.push(later);
                    replace_top(&mut c.obligation, Item::Node(inner));
                    work.push(c);
                }
                Node::Not(inner) => {
                    if !allow_negation {
                        return Err(VerifyError::NestedNegation);
                    }
                    c.obligation.pop();
                    c.negated.push(vec![Item::Node(inner)]);
                    work.push(c);
                }
            }
        }
        Ok(out)
    }

    /// Successor obligations after a transition with `ctx` fires, paired
    /// with the predicate the transition matched, if it advanced the stack.
    fn step(
        &self,
        obligation: &Obligation,
        ctx: &TransitionContext,
        env: &EvalEnv,
    ) -> Vec<(Obligation, Option<&'f ArcPredicate>)> {
        let mut rest = obligation.clone();
        match rest.pop() {
            None => vec![(rest, None)],
            Some(Item::Skip(ev)) => {
                rest.push(Item::Node(ev));
                vec![(rest, None)]
            }
            Some(Item::Node(id)) => match self.nodes[id] {
                // The earliest match is enough when the rest cannot fail on
                // a longer path. Otherwise later matches stay open.
                Node::Af(p) if holds(p, ctx, env) => {
                    if self.is_monotone(&rest) {
                        vec![(rest, Some(p))]
                    } else {
                        vec![(rest, Some(p)), (obligation.clone(), None)]
                    }
                }
                Node::Af(_) => vec![(obligation.clone(), None)],
                Node::Leaf(p) if holds(p, ctx, env) => vec![(rest, Some(p))],
                // A closed obligation only exposes consuming items.
                _ => Vec::new(),
            },
        }
    }

    /// Close a negated obligation; `None` when it is already fulfilled.
    fn close_negated(&self, seed: Obligation) -> VerifyResult<Option<Vec<Obligation>>> {
        let mut out = Vec::new();
        for c in self.close(seed, false)? {
            if c.obligation.is_empty() {
                return Ok(None);
            }
            out.push(c.obligation);
        }
        Ok(Some(out))
    }

    fn seed_negated(
        &self,
        mut set: BTreeSet<Obligation>,
        seeds: Vec<Obligation>,
    ) -> VerifyResult<Option<BTreeSet<Obligation>>> {
        for seed in seeds {
            match self.close_negated(seed)? {
                Some(obligations) => set.extend(obligations),
                None => return Ok(None),
            }
        }
        Ok(Some(set))
    }

    fn step_negated(
        &self,
        set: &BTreeSet<Obligation>,
        ctx: &TransitionContext,
        env: &EvalEnv,
    ) -> VerifyResult<Option<BTreeSet<Obligation>>> {
        let mut next = BTreeSet::new();
        for obligation in set {
            for (stepped, _) in self.step(obligation, ctx, env) {
                match self.close_negated(stepped)? {
                    Some(obligations) => next.extend(obligations),
                    None => return Ok(None),
                }
            }
        }
        Ok(Some(next))
    }

    /// Every way one firing of `ctx` moves `(obligation, negated)` on.
    fn successors(
        &self,
        obligation: &Obligation,
        negated: &BTreeSet<Obligation>,
        ctx: &TransitionContext,
        env: &EvalEnv,
    ) -> VerifyResult<Vec<Successor<'f>>> {
        let Some(stepped) = self.step_negated(negated, ctx, env)? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (obligation, matched) in self.step(obligation, ctx, env) {
            for closed in self.close(obligation, true)? {
                let Some(negated) = self.seed_negated(stepped.clone(), closed.negated)? else {
                    continue;
                };
                out.push(Successor {
                    obligation: closed.obligation,
                    negated,
                    matched,
                });
            }
        }
        Ok(out)
    }

    /// Successors after `transition` fires, repeated `multiplicity` times.
    ///
    /// The set of reachable obligation pairs only depends on the previous
    /// set, so once a set repeats the remaining firings are skipped modulo
    /// the cycle length.
    fn advance(
        &self,
        obligation: &Obligation,
        negated: &BTreeSet<Obligation>,
        transition: &Transition,
        env: &EvalEnv,
    ) -> VerifyResult<Vec<Successor<'f>>> {
        let ctx = &transition.context;
        if transition.multiplicity <= 1 {
            return self.successors(obligation, negated, ctx, env);
        }

        let mut frontier: Frontier<'f> = BTreeMap::new();
        frontier.insert((obligation.clone(), negated.clone()), None);
        let mut seen: HashMap<Vec<(Obligation, BTreeSet<Obligation>)>, u64> = HashMap::new();
        let mut fired = 0;
        while fired < transition.multiplicity {
            let keys: Vec<_> = frontier.keys().cloned().collect();
            if let Some(&first) = seen.get(&keys) {
                let remaining = (transition.multiplicity - fired) % (fired - first);
                for _ in 0..remaining {
                    frontier = self.advance_once(&frontier, ctx, env)?;
                }
                break;
            }
            seen.insert(keys, fired);
            frontier = self.advance_once(&frontier, ctx, env)?;
            fired += 1;
        }

        Ok(frontier
            .into_iter()
            .map(|((obligation, negated), matched)| Successor {
                obligation,
                negated,
                matched,
            })
            .collect())
    }

    fn advance_once(
        &self,
        frontier: &Frontier<'f>,
        ctx: &TransitionContext,
        env: &EvalEnv,
    ) -> VerifyResult<Frontier<'f>> {
        let mut next: Frontier<'f> = BTreeMap::new();
        for ((obligation, negated), matched) in frontier {
            for succ in self.successors(obligation, negated, ctx, env)? {
                next.entry((succ.obligation, succ.negated))
                    .or_insert(succ.matched.or(*matched));
            }
        }
        Ok(next)
    }
}

fn replace_top(obligation: &mut Obligation, item: Item) {
    obligation.pop();
    obligation.push(item);
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct ProductState {
    marking: Marking,
    obligation: Obligation,
    negated: BTreeSet<Obligation>,
}

impl ProductState {
    fn matched(&self) -> bool {
        self.obligation.is_empty()
    }

    /// Matched with nothing left to avoid: any continuation will do.
    fn accepting(&self) -> bool {
        self.matched() && self.negated.is_empty()
    }
}

struct Edge<'f> {
    from: usize,
    transition: TransitionId,
    matched: Option<&'f ArcPredicate>,
}

struct Search<'f> {
    max_states: usize,
    states: Vec<ProductState>,
    index: HashMap<ProductState, usize>,
    parents: Vec<Option<Edge<'f>>>,
}

impl<'f> Search<'f> {
    fn new(max_states: usize) -> Self {
        Self {
            max_states,
            states: Vec::new(),
            index: HashMap::new(),
            parents: Vec::new(),
        }
    }

    /// Index of `state`, and whether it was seen for the first time.
    fn insert(
        &mut self,
        state: ProductState,
        parent: Option<Edge<'f>>,
    ) -> VerifyResult<(usize, bool)> {
        if let Some(&idx) = self.index.get(&state) {
            return Ok((idx, false));
        }
        if self.states.len() >= self.max_states {
            return Err(VerifyError::StateSpaceExceeded {
                limit: self.max_states,
            });
        }
        let idx = self.states.len();
        self.index.insert(state.clone(), idx);
        self.states.push(state);
        self.parents.push(parent);
        Ok((idx, true))
    }

    fn witness(&self, net: &PetriNet, mut idx: usize, fallback: String) -> Witness {
        let mut transitions = Vec::new();
        let mut description = None;
        while let Some(Some(edge)) = self.parents.get(idx) {
            transitions.push(edge.transition);
            if description.is_none() {
                description = edge.matched.map(|p| p.description.clone());
            }
            idx = edge.from;
        }
        transitions.reverse();
        Witness {
            transition_names: net.transition_names(&transitions),
            transitions,
            description: description.unwrap_or(fallback),
        }
    }
}

/// Search for a path of `net` on which `formula` matches.
///
/// Returns the shortest such path, or `None` if no path matches.
pub(crate) fn find_path(
    formula: &TransitionFormula,
    net: &PetriNet,
    env: &EvalEnv,
    max_states: usize,
) -> VerifyResult<Option<Witness>> {
    let (arena, root) = Arena::flatten(formula);
    let fallback = || format!("execution matches {}", formula);
    let mut search = Search::new(max_states);
    let mut queue = VecDeque::new();

    for closed in arena.close(vec![Item::Node(root)], true)? {
        let Some(negated) = arena.seed_negated(BTreeSet::new(), closed.negated)? else {
            continue;
        };
        let state = ProductState {
            marking: net.initial_marking(),
            obligation: closed.obligation,
            negated,
        };
        let (idx, new) = search.insert(state, None)?;
        if new {
            if search.states[idx].accepting() {
                return Ok(Some(search.witness(net, idx, fallback())));
            }
            queue.push_back(idx);
        }
    }

    // Successors of matched states, needed to decide which of them admit a
    // maximal continuation that avoids every negated obligation.
    let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();

    while let Some(idx) = queue.pop_front() {
        let state = search.states[idx].clone();
        for t in net.enabled(&state.marking) {
            let (Some(marking), Some(transition)) =
                (net.fire(&state.marking, t), net.transition(t))
            else {
                continue;
            };
            for succ in arena.advance(&state.obligation, &state.negated, transition, env)? {
                let next = ProductState {
                    marking: marking.clone(),
                    obligation: succ.obligation,
                    negated: succ.negated,
                };
                let edge = Edge {
                    from: idx,
                    transition: t,
                    matched: succ.matched,
                };
                let (next_idx, new) = search.insert(next, Some(edge))?;
                if state.matched() {
                    successors.entry(idx).or_default().push(next_idx);
                }
                if new {
                    if search.states[next_idx].accepting() {
                        debug!(states = search.states.len(), "Matching path found");
                        return Ok(Some(search.witness(net, next_idx, fallback())));
                    }
                    queue.push_back(next_idx);
                }
            }
        }
    }

    // Greatest fixpoint: a matched state is kept while it is a dead marking
    // or can move to another kept state.
    let matched: Vec<usize> = (0..search.states.len())
        .filter(|&i| search.states[i].matched())
        .collect();
    let dead: HashMap<usize, bool> = matched
        .iter()
        .map(|&i| (i, net.is_dead(&search.states[i].marking)))
        .collect();
    let mut kept = vec![false; search.states.len()];
    for &i in &matched {
        kept[i] = true;
    }
    let mut changed = true;
    while changed {
        changed = false;
        for &i in &matched {
            if !kept[i] || dead.get(&i).copied().unwrap_or(false) {
                continue;
            }
            let continues = successors
                .get(&i)
                .is_some_and(|next| next.iter().any(|&n| kept[n]));
            if !continues {
                kept[i] = false;
                changed = true;
            }
        }
    }

    debug!(
        states = search.states.len(),
        matched = matched.len(),
        "Reachability search exhausted"
    );
    Ok(matched
        .into_iter()
        .find(|&i| kept[i])
        .map(|i| search.witness(net, i, fallback())))
}
