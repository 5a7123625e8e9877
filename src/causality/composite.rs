use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::{ActorCausality, Dependency, PortSignature, SharedCausality};
use crate::kernel::{EntityId, Graph, PortId};
use crate::utils::errors::ModalError;

/// The input and output port names of an entity, in port order.  A port
/// flagged both ways appears in both lists.
pub fn port_signature(graph: &Graph, entity: EntityId) -> Result<PortSignature, ModalError> {
    let mut signature = PortSignature::default();
    for port in graph.entity(entity)?.ports() {
        let port = graph.port(*port)?;
        if port.is_input() {
            signature.inputs.push(port.name().to_string());
        }
        if port.is_output() {
            signature.outputs.push(port.name().to_string());
        }
    }
    Ok(signature)
}

/// Analyze the causality of `composite` from the causality of the entities
/// it contains.  Starting at each input of the composite, dependencies are
/// followed through inside relations and contained entities (combined in
/// series with `otimes`) until they reach an output of the composite, where
/// alternative paths are combined with `oplus`.
///
/// Two inputs of the composite are equivalent when they feed inputs of an
/// inside entity that that entity considers equivalent.
pub fn composite_causality(
    graph: &Graph,
    composite: EntityId,
    default: Dependency,
    child_causality: &mut dyn FnMut(EntityId) -> Result<SharedCausality, ModalError>,
) -> Result<ActorCausality, ModalError> {
    let signature = port_signature(graph, composite)?;
    let mut result = ActorCausality::new(signature.clone(), default);
    let mut children: BTreeMap<EntityId, SharedCausality> = BTreeMap::new();
    let mut reached: BTreeMap<String, BTreeSet<(EntityId, String)>> = BTreeMap::new();

    for input in &signature.inputs {
        let source = match graph.find_port(composite, input) {
            Some(port) => port,
            None => continue,
        };
        let mut best: BTreeMap<PortId, Dependency> = BTreeMap::new();
        let mut pending: Vec<(PortId, Dependency)> = inside_sinks(graph, composite, source)?
            .into_iter()
            .map(|sink| (sink, default.otimes_identity()))
            .collect();

        let classes = reached.entry(input.clone()).or_default();
        for (sink, _) in &pending {
            let sink = graph.port(*sink)?;
            let causality = causality_of(&mut children, child_causality, sink.container())?;
            for member in causality.equivalent_ports(sink.name()) {
                classes.insert((sink.container(), member));
            }
        }

        while let Some((sink, so_far)) = pending.pop() {
            let improved = match best.get(&sink) {
                Some(known) => known.oplus(so_far) != *known,
                None => true,
            };
            if !improved {
                continue;
            }
            let combined = best.get(&sink).map_or(so_far, |known| known.oplus(so_far));
            best.insert(sink, combined);

            let (child, name) = {
                let port = graph.port(sink)?;
                (port.container(), port.name().to_string())
            };
            let causality = causality_of(&mut children, child_causality, child)?;
            for output in causality.signature().outputs.clone() {
                let through = causality.dependency(&name, &output);
                if !through.is_dependent() {
                    continue;
                }
                let total = combined.otimes(through);
                let output_port = match graph.find_port(child, &output) {
                    Some(port) => port,
                    None => continue,
                };
                for relation in graph.port(output_port)?.relations() {
                    let relation = graph.relation(*relation)?;
                    if relation.container() != composite {
                        continue;
                    }
                    for linked in relation.ports() {
                        if *linked == output_port {
                            continue;
                        }
                        let linked_port = graph.port(*linked)?;
                        if linked_port.container() == composite {
                            if linked_port.is_output() {
                                result.add_dependency(input, linked_port.name(), total);
                            }
                        } else if linked_port.is_input() {
                            pending.push((*linked, total));
                        }
                    }
                }
            }
        }
        trace!(
            composite = %graph.full_name(composite),
            input = %input,
            sinks = best.len(),
            "analyzed input"
        );
    }

    let inputs = signature.inputs.clone();
    for (i, a) in inputs.iter().enumerate() {
        for b in inputs.iter().skip(i + 1) {
            let shared = match (reached.get(a), reached.get(b)) {
                (Some(left), Some(right)) => !left.is_disjoint(right),
                _ => false,
            };
            if shared {
                result.merge_equivalent(a, b);
            }
        }
    }
    Ok(result)
}

/// The input ports of contained entities linked to a port of the composite.
fn inside_sinks(graph: &Graph, composite: EntityId, source: PortId) -> Result<Vec<PortId>, ModalError> {
    let mut sinks = Vec::new();
    for relation in graph.port(source)?.relations() {
        let relation = graph.relation(*relation)?;
        if relation.container() != composite {
            continue;
        }
        for linked in relation.ports() {
            let port = graph.port(*linked)?;
            if *linked != source && port.container() != composite && port.is_input() {
                sinks.push(*linked);
            }
        }
    }
    Ok(sinks)
}

fn causality_of(
    children: &mut BTreeMap<EntityId, SharedCausality>,
    child_causality: &mut dyn FnMut(EntityId) -> Result<SharedCausality, ModalError>,
    child: EntityId,
) -> Result<SharedCausality, ModalError> {
    if let Some(causality) = children.get(&child) {
        return Ok(causality.clone());
    }
    let causality = child_causality(child)?;
    children.insert(child, causality.clone());
    Ok(causality)
}
