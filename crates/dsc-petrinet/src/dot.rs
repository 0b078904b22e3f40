use std::fmt::Write;

use crate::model::{ArcDirection, PetriNet};

/// Render `net` as a GraphViz digraph.
///
/// Places are circles labelled with their initial token count, transitions
/// are boxes listing what they read and erase.
pub fn to_dot(net: &PetriNet) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_dot(net, &mut out);
    out
}

fn write_dot(net: &PetriNet, out: &mut String) -> std::fmt::Result {
    writeln!(out, "digraph \"{}\" {{", escape(net.id()))?;
    writeln!(out, "  rankdir=LR;")?;

    for (i, place) in net.places().iter().enumerate() {
        writeln!(
            out,
            "  p{} [shape=circle, label=\"{}\\n{}\"];",
            i,
            escape(&place.id),
            place.initial_tokens
        )?;
    }

    for (i, transition) in net.transitions().iter().enumerate() {
        let mut label = escape(&transition.id);
        for target in &transition.context.read {
            label.push_str(&format!("\\nread {}", escape(target.as_str())));
        }
        for target in &transition.context.erase {
            label.push_str(&format!("\\nerase {}", escape(target.as_str())));
        }
        if transition.multiplicity > 1 {
            label.push_str(&format!("\\nx{}", transition.multiplicity));
        }
        writeln!(out, "  t{} [shape=box, label=\"{}\"];", i, label)?;
    }

    for arc in net.arcs() {
        match arc.direction {
            ArcDirection::PlaceToTransition => {
                writeln!(out, "  p{} -> t{};", arc.place.0, arc.transition.0)?
            }
            ArcDirection::TransitionToPlace => {
                writeln!(out, "  t{} -> p{};", arc.transition.0, arc.place.0)?
            }
        }
    }

    writeln!(out, "}}")
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{LifecycleNet, LifecycleSpec};

    #[test]
    fn renders_nodes_and_arcs() {
        let net = LifecycleNet::build(
            &LifecycleSpec::new("artifact://42", "connector://self").with_erase(true),
        )
        .unwrap();
        let dot = to_dot(&net);

        assert!(dot.starts_with("digraph \"net://lifecycle/artifact://42\" {"));
        assert!(dot.contains("p0 [shape=circle, label=\"place://start\\n1\"];"));
        assert!(dot.contains("read artifact://42"));
        assert!(dot.contains("erase artifact://42"));
        assert!(dot.contains("p0 -> t0;"));
        assert!(dot.contains("t0 -> p1;"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn repeated_reads_show_multiplicity() {
        let net = LifecycleNet::build(
            &LifecycleSpec::new("artifact://42", "connector://self").with_prior_reads(7),
        )
        .unwrap();
        let dot = to_dot(&net);
        assert!(dot.contains("label=\"transition://read/history\\nread artifact://42\\nx7\""));
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(escape("a\"b"), "a\\\"b");
    }
}
