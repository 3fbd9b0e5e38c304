//! Render plan: execution order for the engine's object graph.

use super::EngineNode;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Execution order and per-object inputs for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// Objects in dependency order; every object appears after its inputs.
    pub order: Vec<EngineNode>,
    /// Objects feeding each object.
    pub inputs: BTreeMap<EngineNode, Vec<EngineNode>>,
}

/// Errors during plan compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The attachments contain a cycle; the listed objects are on or behind it.
    CycleDetected(Vec<EngineNode>),
}

impl RenderPlan {
    /// Compile a plan from the live objects and their attachments.
    ///
    /// Attachments naming objects outside `objects` are ignored.
    pub fn compile(
        objects: &BTreeSet<EngineNode>,
        attachments: &BTreeSet<(EngineNode, EngineNode)>,
    ) -> Result<Self, PlanError> {
        let mut in_degree: BTreeMap<EngineNode, usize> =
            objects.iter().map(|&o| (o, 0)).collect();
        let mut adjacency: BTreeMap<EngineNode, Vec<EngineNode>> = BTreeMap::new();
        let mut inputs: BTreeMap<EngineNode, Vec<EngineNode>> = BTreeMap::new();

        for &(from, to) in attachments {
            if !objects.contains(&from) || !objects.contains(&to) {
                continue;
            }
            adjacency.entry(from).or_default().push(to);
            inputs.entry(to).or_default().push(from);
            if let Some(deg) = in_degree.get_mut(&to) {
                *deg += 1;
            }
        }

        // Kahn's algorithm; BTreeMap iteration keeps the order stable.
        let mut queue: VecDeque<EngineNode> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&o, _)| o)
            .collect();

        let mut order = Vec::with_capacity(objects.len());
        while let Some(object) = queue.pop_front() {
            order.push(object);
            if let Some(next) = adjacency.get(&object) {
                for &neighbor in next {
                    if let Some(deg) = in_degree.get_mut(&neighbor) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }

        if order.len() == objects.len() {
            Ok(Self { order, inputs })
        } else {
            let stuck = in_degree
                .into_iter()
                .filter(|(_, deg)| *deg > 0)
                .map(|(o, _)| o)
                .collect();
            Err(PlanError::CycleDetected(stuck))
        }
    }
}
