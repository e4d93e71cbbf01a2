//! Step planner - orders the steps of an update or destroy pass

use crate::checkpoint::Checkpoint;
use crate::diff::{changed_keys, PlannedStep};
use crate::error::Result;
use crate::program::DesiredState;
use crate::provider::ProviderRegistry;
use crate::types::{DiffKind, StepOp};

/// Plan converging `checkpoint` to `desired`
///
/// Desired resources come first, in declaration order, followed by the
/// deletion of orphaned records in reverse creation order. Outputs of
/// resources that are created or replaced are unknown until they run, so
/// dependents are diffed against [`crate::program::UNKNOWN`] placeholders.
pub fn plan_update(
    desired: &DesiredState,
    checkpoint: &Checkpoint,
    providers: &ProviderRegistry,
) -> Result<Vec<PlannedStep>> {
    let mut known = checkpoint.output_map();
    let mut steps = Vec::with_capacity(desired.resources.len());

    for decl in &desired.resources {
        let provider = providers.for_type(&decl.type_token)?;
        let news = decl.resolve_inputs_lenient(&known);

        let step = match checkpoint.find(&decl.urn) {
            None => PlannedStep::new(&decl.urn, &decl.type_token, StepOp::Create),
            Some(record) if record.resource_type != decl.type_token => {
                PlannedStep::new(&decl.urn, &decl.type_token, StepOp::Replace)
            }
            Some(record) => {
                let op = match provider.diff(&decl.type_token, &record.inputs, &news) {
                    DiffKind::Same => StepOp::Same,
                    DiffKind::Update => StepOp::Update,
                    DiffKind::Replace => StepOp::Replace,
                };
                PlannedStep::new(&decl.urn, &decl.type_token, op)
                    .with_changed_keys(changed_keys(&record.inputs, &news))
            }
        };

        if matches!(step.op, StepOp::Create | StepOp::Replace) {
            known.remove(&decl.urn);
        }
        steps.push(step);
    }

    for record in checkpoint.resources.iter().rev() {
        if !desired.contains(&record.urn) {
            providers.for_type(&record.resource_type)?;
            steps.push(PlannedStep::new(
                &record.urn,
                &record.resource_type,
                StepOp::Delete,
            ));
        }
    }

    Ok(steps)
}

/// Plan deleting everything the checkpoint tracks
pub fn plan_destroy(checkpoint: &Checkpoint, providers: &ProviderRegistry) -> Result<Vec<PlannedStep>> {
    checkpoint
        .pending_deletes
        .iter()
        .rev()
        .chain(checkpoint.resources.iter().rev())
        .map(|record| {
            providers.for_type(&record.resource_type)?;
            Ok(PlannedStep::new(
                &record.urn,
                &record.resource_type,
                StepOp::Delete,
            ))
        })
        .collect()
}
