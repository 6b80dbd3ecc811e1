//! Plan de aprovisionamiento: steps declarados más su orden topológico.
//!
//! Las dependencias salen de `reads()`: un step que lee la clave `K` corre
//! después del step que la produce. Los empates se resuelven por orden de
//! declaración, así que un plan ya ordenado conserva su orden.

use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::constants::ENGINE_VERSION;
use crate::errors::CoreEngineError;
use crate::hashing::hash_value;
use crate::step::{OutputBinding, StepDefinition};

pub struct ProvisionPlan {
    steps: Vec<Box<dyn StepDefinition>>,
    order: Vec<usize>,
    producers: HashMap<String, usize>,
    definition_hash: String,
}

impl std::fmt::Debug for ProvisionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionPlan")
         .field("order", &self.step_ids())
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}

#[derive(Default)]
pub struct PlanBuilder {
    steps: Vec<Box<dyn StepDefinition>>,
}

impl PlanBuilder {
    pub fn step<S: StepDefinition + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Agrega sólo si `condition` se cumple (steps exclusivos de redes de prueba).
    pub fn step_if<S: StepDefinition + 'static>(self, condition: bool, step: S) -> Self {
        if condition {
            self.step(step)
        } else {
            self
        }
    }

    pub fn build(self) -> Result<ProvisionPlan, CoreEngineError> {
        ProvisionPlan::build(self.steps)
    }
}

impl ProvisionPlan {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    pub fn build(steps: Vec<Box<dyn StepDefinition>>) -> Result<Self, CoreEngineError> {
        let mut ids = HashSet::new();
        let mut producers: HashMap<String, usize> = HashMap::new();
        for (idx, step) in steps.iter().enumerate() {
            if !ids.insert(step.id().to_string()) {
                return Err(CoreEngineError::InvalidPlan(format!("duplicate step id {}", step.id())));
            }
            let outputs = step.outputs();
            if outputs.is_empty() {
                return Err(CoreEngineError::InvalidPlan(format!("step {} declares no outputs", step.id())));
            }
            if step.binding() == OutputBinding::IntentHash && outputs.len() != 1 {
                return Err(CoreEngineError::InvalidPlan(format!("step {} binds the intent hash to {} outputs",
                                                                step.id(),
                                                                outputs.len())));
            }
            for key in outputs {
                if let Some(prev) = producers.insert(key.clone(), idx) {
                    return Err(CoreEngineError::InvalidPlan(format!("output {key} declared by both {} and {}",
                                                                    steps[prev].id(),
                                                                    step.id())));
                }
            }
        }
        for (idx, step) in steps.iter().enumerate() {
            if let Some(key) = step.reads().into_iter().find(|k| producers.get(k) == Some(&idx)) {
                return Err(CoreEngineError::InvalidPlan(format!("step {} reads its own output {key}", step.id())));
            }
        }

        let order = topological_order(&steps, &producers)?;
        let definition_hash = definition_hash(&steps);
        Ok(Self { steps,
                  order,
                  producers,
                  definition_hash })
    }

    /// Steps en orden de ejecución.
    pub fn ordered(&self) -> impl Iterator<Item = &dyn StepDefinition> + '_ {
        self.order.iter().map(move |&i| self.steps[i].as_ref())
    }

    pub fn step_ids(&self) -> Vec<String> {
        self.ordered().map(|s| s.id().to_string()).collect()
    }

    /// `true` si algún step del plan produce la clave.
    pub fn produces(&self, key: &str) -> bool {
        self.producers.contains_key(key)
    }

    /// Todas las claves de output, en orden de ejecución.
    pub fn output_keys(&self) -> Vec<String> {
        self.ordered().flat_map(|s| s.outputs()).collect()
    }

    /// Claves leídas que ningún step produce: deben venir del checkpoint.
    pub fn external_inputs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.ordered()
            .flat_map(|s| s.reads())
            .filter(|k| !self.produces(k) && seen.insert(k.clone()))
            .collect()
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn topological_order(steps: &[Box<dyn StepDefinition>], producers: &HashMap<String, usize>) -> Result<Vec<usize>, CoreEngineError> {
    let deps: Vec<HashSet<usize>> = steps.iter()
                                         .map(|s| s.reads().iter().filter_map(|k| producers.get(k).copied()).collect())
                                         .collect();
    let mut placed = vec![false; steps.len()];
    let mut order = Vec::with_capacity(steps.len());
    while order.len() < steps.len() {
        let next = (0..steps.len()).find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]));
        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            None => {
                let stuck = (0..steps.len()).filter(|&i| !placed[i])
                                            .map(|i| steps[i].id().to_string())
                                            .collect();
                return Err(CoreEngineError::DependencyCycle(stuck));
            }
        }
    }
    Ok(order)
}

fn definition_hash(steps: &[Box<dyn StepDefinition>]) -> String {
    let described: Vec<serde_json::Value> = steps.iter()
                                                 .map(|s| {
                                                     json!({
                                                         "id": s.id(),
                                                         "outputs": s.outputs(),
                                                         "reads": s.reads(),
                                                     })
                                                 })
                                                 .collect();
    hash_value(&json!({ "engine_version": ENGINE_VERSION, "steps": described }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StepContext;
    use async_trait::async_trait;
    use provision_manifest::Manifest;

    struct Fake {
        id: &'static str,
        outputs: Vec<&'static str>,
        reads: Vec<&'static str>,
    }

    #[async_trait]
    impl StepDefinition for Fake {
        fn id(&self) -> &str {
            self.id
        }
        fn outputs(&self) -> Vec<String> {
            self.outputs.iter().map(|s| s.to_string()).collect()
        }
        fn reads(&self) -> Vec<String> {
            self.reads.iter().map(|s| s.to_string()).collect()
        }
        async fn prepare(&self, _ctx: &StepContext<'_>) -> Result<Manifest, CoreEngineError> {
            Ok(Manifest::default())
        }
    }

    fn fake(id: &'static str, outputs: &[&'static str], reads: &[&'static str]) -> Fake {
        Fake { id,
               outputs: outputs.to_vec(),
               reads: reads.to_vec() }
    }

    #[test]
    fn consumer_declared_first_runs_after_its_producer() {
        let plan = ProvisionPlan::builder().step(fake("base", &["BASE"], &["OWNER"]))
                                           .step(fake("owner", &["OWNER"], &[]))
                                           .step(fake("other", &["OTHER"], &[]))
                                           .build()
                                           .unwrap();
        assert_eq!(plan.step_ids(), vec!["owner", "base", "other"]);
    }

    #[test]
    fn declaration_order_is_kept_when_already_sorted() {
        let plan = ProvisionPlan::builder().step(fake("a", &["A"], &[]))
                                           .step(fake("b", &["B"], &["A"]))
                                           .step(fake("c", &["C"], &["A", "B"]))
                                           .build()
                                           .unwrap();
        assert_eq!(plan.step_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cycles_duplicates_and_self_reads_are_rejected() {
        let cycle = ProvisionPlan::builder().step(fake("a", &["A"], &["B"]))
                                            .step(fake("b", &["B"], &["A"]))
                                            .build();
        assert!(matches!(cycle, Err(CoreEngineError::DependencyCycle(ids)) if ids == vec!["a", "b"]));

        let dup_output = ProvisionPlan::builder().step(fake("a", &["A"], &[]))
                                                 .step(fake("b", &["A"], &[]))
                                                 .build();
        assert!(matches!(dup_output, Err(CoreEngineError::InvalidPlan(_))));

        let dup_id = ProvisionPlan::builder().step(fake("a", &["A"], &[]))
                                             .step(fake("a", &["B"], &[]))
                                             .build();
        assert!(matches!(dup_id, Err(CoreEngineError::InvalidPlan(_))));

        let self_read = ProvisionPlan::builder().step(fake("a", &["A"], &["A"])).build();
        assert!(matches!(self_read, Err(CoreEngineError::InvalidPlan(_))));
    }

    #[test]
    fn external_inputs_and_definition_hash() {
        let plan = ProvisionPlan::builder().step(fake("keeper", &["KEEPER_TX"], &["KEEPER_COMPONENT", "AUTHORITY"]))
                                           .step(fake("prices", &["PRICES_TX"], &["AUTHORITY", "ORACLE"]))
                                           .build()
                                           .unwrap();
        assert_eq!(plan.external_inputs(), vec!["KEEPER_COMPONENT", "AUTHORITY", "ORACLE"]);

        let again = ProvisionPlan::builder().step(fake("keeper", &["KEEPER_TX"], &["KEEPER_COMPONENT", "AUTHORITY"]))
                                            .step(fake("prices", &["PRICES_TX"], &["AUTHORITY", "ORACLE"]))
                                            .build()
                                            .unwrap();
        assert_eq!(plan.definition_hash(), again.definition_hash());
    }
}
