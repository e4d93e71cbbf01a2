//! Execution engine - converges a stack one resource at a time
//!
//! Steps run in declaration order. After every mutating step the checkpoint
//! is handed to the [`CheckpointSink`], so a pass that fails halfway leaves
//! an accurate record of what exists.

use crate::checkpoint::{Checkpoint, CheckpointSink, ResourceRecord, UpdateInfo};
use crate::context::EngineEvents;
use crate::diff::{DiffSummary, PlannedStep};
use crate::error::{Error, Result};
use crate::planner::{plan_destroy, plan_update};
use crate::program::{DesiredState, OutputMap, ResourceDecl};
use crate::provider::{CreateRequest, DeleteRequest, Provider, ProviderRegistry, UpdateRequest};
use crate::types::{ChangeSummary, DiffKind, ResourceChange, StepOp, UpdateKind};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of a preview
#[derive(Debug, Clone, Default)]
pub struct Preview {
    pub steps: Vec<PlannedStep>,
    pub summary: DiffSummary,
}

impl Preview {
    pub fn has_changes(&self) -> bool {
        self.summary.has_changes()
    }
}

/// Result of an update or destroy pass
#[derive(Debug)]
pub struct UpdateOutcome {
    pub kind: UpdateKind,
    pub summary: ChangeSummary,
    pub changes: Vec<ResourceChange>,
    /// Stack outputs, possibly partial when the pass failed
    pub outputs: BTreeMap<String, Value>,
    /// First error that stopped the pass
    pub error: Option<Error>,
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Compute the steps an update would run, without touching providers
pub fn preview(
    desired: &DesiredState,
    checkpoint: &Checkpoint,
    providers: &ProviderRegistry,
) -> Result<Preview> {
    let steps = plan_update(desired, checkpoint, providers)?;
    let summary = DiffSummary::from_steps(&steps);
    Ok(Preview { steps, summary })
}

/// Converge the recorded state to `desired`
///
/// Planning errors (a missing provider, say) are returned as `Err` before
/// anything is touched. Failures after the first mutation end the pass and
/// are reported through [`UpdateOutcome::error`], with the checkpoint
/// reflecting every step that did complete.
pub fn update<S, E>(
    desired: &DesiredState,
    checkpoint: &mut Checkpoint,
    providers: &ProviderRegistry,
    sink: &mut S,
    events: &mut E,
) -> Result<UpdateOutcome>
where
    S: CheckpointSink + ?Sized,
    E: EngineEvents + ?Sized,
{
    let steps = plan_update(desired, checkpoint, providers)?;
    events.on_plan(&steps);

    let mut pass = Pass::new(UpdateKind::Update);
    let mut live = checkpoint.output_map();

    let flow = converge_all(desired, &steps, checkpoint, providers, sink, events, &mut pass, &mut live)
        .and_then(|()| delete_orphans(desired, checkpoint, providers, sink, events, &mut pass))
        .and_then(|()| delete_pending(checkpoint, providers, sink, events, &mut pass));
    if flow.is_err() {
        log::debug!("update pass stopped after {} steps", pass.changes.len());
    }

    let (outputs, missing) = resolve_exports(desired, &live);
    if pass.error.is_none()
        && let Some(err) = missing
    {
        pass.error = Some(err);
    }
    checkpoint.outputs = outputs.clone();

    Ok(pass.finish(checkpoint, sink, outputs))
}

/// Delete everything the checkpoint tracks, newest first
pub fn destroy<S, E>(
    checkpoint: &mut Checkpoint,
    providers: &ProviderRegistry,
    sink: &mut S,
    events: &mut E,
) -> Result<UpdateOutcome>
where
    S: CheckpointSink + ?Sized,
    E: EngineEvents + ?Sized,
{
    let steps = plan_destroy(checkpoint, providers)?;
    events.on_plan(&steps);

    let mut pass = Pass::new(UpdateKind::Destroy);
    let flow = destroy_list(true, checkpoint, providers, sink, events, &mut pass)
        .and_then(|()| destroy_list(false, checkpoint, providers, sink, events, &mut pass));

    if flow.is_ok() {
        checkpoint.outputs.clear();
    }
    let outputs = checkpoint.outputs.clone();
    Ok(pass.finish(checkpoint, sink, outputs))
}

/// A pass stopped on a failed step; the error lives in [`Pass::error`]
struct Stopped;

type Flow = std::result::Result<(), Stopped>;

/// Bookkeeping shared by update and destroy passes
struct Pass {
    kind: UpdateKind,
    summary: ChangeSummary,
    changes: Vec<ResourceChange>,
    error: Option<Error>,
}

impl Pass {
    fn new(kind: UpdateKind) -> Self {
        Self {
            kind,
            summary: ChangeSummary::default(),
            changes: Vec::new(),
            error: None,
        }
    }

    fn record<E: EngineEvents + ?Sized>(&mut self, change: ResourceChange, events: &mut E) {
        self.summary.add_change(&change);
        events.on_step_complete(&change);
        self.changes.push(change);
    }

    /// Record a failed step and remember the error
    fn fail<E: EngineEvents + ?Sized>(
        &mut self,
        step: &PlannedStep,
        op: StepOp,
        error: Error,
        events: &mut E,
    ) -> Flow {
        self.record(
            ResourceChange::failed(&step.urn, &step.resource_type, op, error.to_string()),
            events,
        );
        self.error = Some(error);
        Err(Stopped)
    }

    fn finish<S: CheckpointSink + ?Sized>(
        mut self,
        checkpoint: &mut Checkpoint,
        sink: &mut S,
        outputs: BTreeMap<String, Value>,
    ) -> UpdateOutcome {
        checkpoint.last_update = Some(UpdateInfo {
            kind: self.kind,
            finished_at: Utc::now(),
            succeeded: self.error.is_none(),
            summary: self.summary.clone(),
        });
        if let Err(err) = persist(sink, checkpoint)
            && self.error.is_none()
        {
            self.error = Some(err);
        }

        UpdateOutcome {
            kind: self.kind,
            summary: self.summary,
            changes: self.changes,
            outputs,
            error: self.error,
        }
    }
}

fn persist<S: CheckpointSink + ?Sized>(sink: &mut S, checkpoint: &Checkpoint) -> Result<()> {
    sink.persist(checkpoint)
        .map_err(|e| Error::Checkpoint(format!("{e:#}")))
}

#[allow(clippy::too_many_arguments)]
fn converge_all<S, E>(
    desired: &DesiredState,
    steps: &[PlannedStep],
    checkpoint: &mut Checkpoint,
    providers: &ProviderRegistry,
    sink: &mut S,
    events: &mut E,
    pass: &mut Pass,
    live: &mut OutputMap,
) -> Flow
where
    S: CheckpointSink + ?Sized,
    E: EngineEvents + ?Sized,
{
    for (decl, step) in desired.resources.iter().zip(steps) {
        events.on_step_start(step);
        let provider = match providers.for_type(&decl.type_token) {
            Ok(provider) => provider,
            Err(err) => return pass.fail(step, step.op, err, events),
        };

        let op = match converge(decl, checkpoint, live, provider) {
            Ok(op) => op,
            Err(err) => return pass.fail(step, step.op, err, events),
        };

        if op.is_change()
            && let Err(err) = persist(sink, checkpoint)
        {
            return pass.fail(step, op, err, events);
        }
        if let Some(record) = checkpoint.find(&decl.urn) {
            live.insert(decl.urn.clone(), record.outputs.clone());
        }
        pass.record(
            ResourceChange::succeeded(&decl.urn, &decl.type_token, op),
            events,
        );
    }
    Ok(())
}

/// Bring one resource in line with its declaration
fn converge(
    decl: &ResourceDecl,
    checkpoint: &mut Checkpoint,
    live: &OutputMap,
    provider: &dyn Provider,
) -> Result<StepOp> {
    let news = decl
        .resolve_inputs(live)
        .map_err(|missing| Error::UnresolvedOutput {
            urn: missing.urn,
            property: missing.property,
        })?;

    let Some(old) = checkpoint.find(&decl.urn).cloned() else {
        let record = create(decl, news, provider, StepOp::Create)?;
        checkpoint.upsert(record);
        return Ok(StepOp::Create);
    };

    let kind = if old.resource_type == decl.type_token {
        provider.diff(&decl.type_token, &old.inputs, &news)
    } else {
        DiffKind::Replace
    };

    match kind {
        DiffKind::Same => Ok(StepOp::Same),
        DiffKind::Update => {
            let outputs = provider
                .update(&UpdateRequest {
                    urn: &decl.urn,
                    type_token: &decl.type_token,
                    id: &old.id,
                    olds: &old.inputs,
                    news: &news,
                    old_outputs: &old.outputs,
                })
                .map_err(|e| Error::provider(&decl.urn, StepOp::Update, &e))?;

            checkpoint.upsert(ResourceRecord {
                outputs: with_id(outputs, &old.id),
                inputs: news,
                dependencies: decl.dependencies(),
                updated_at: Utc::now(),
                ..old
            });
            Ok(StepOp::Update)
        }
        DiffKind::Replace => {
            // the replacement exists before the old resource goes away
            let record = create(decl, news, provider, StepOp::Replace)?;
            checkpoint.pending_deletes.push(old);
            checkpoint.upsert(record);
            Ok(StepOp::Replace)
        }
    }
}

fn create(
    decl: &ResourceDecl,
    inputs: Value,
    provider: &dyn Provider,
    op: StepOp,
) -> Result<ResourceRecord> {
    let created = provider
        .create(&CreateRequest {
            urn: &decl.urn,
            type_token: &decl.type_token,
            name: &decl.name,
            inputs: &inputs,
        })
        .map_err(|e| Error::provider(&decl.urn, op, &e))?;

    let now = Utc::now();
    Ok(ResourceRecord {
        urn: decl.urn.clone(),
        resource_type: decl.type_token.clone(),
        outputs: with_id(created.outputs, &created.id),
        id: created.id,
        inputs,
        dependencies: decl.dependencies(),
        created_at: now,
        updated_at: now,
    })
}

/// Make sure the outputs carry the physical id
fn with_id(mut outputs: Value, id: &str) -> Value {
    if !outputs.is_object() {
        outputs = Value::Object(serde_json::Map::new());
    }
    if let Some(map) = outputs.as_object_mut() {
        map.entry("id")
            .or_insert_with(|| Value::String(id.to_string()));
    }
    outputs
}

fn delete_record(record: &ResourceRecord, providers: &ProviderRegistry) -> Result<()> {
    let provider = providers.for_type(&record.resource_type)?;
    provider
        .delete(&DeleteRequest {
            urn: &record.urn,
            type_token: &record.resource_type,
            id: &record.id,
            outputs: &record.outputs,
        })
        .map_err(|e| Error::provider(&record.urn, StepOp::Delete, &e))
}

fn delete_orphans<S, E>(
    desired: &DesiredState,
    checkpoint: &mut Checkpoint,
    providers: &ProviderRegistry,
    sink: &mut S,
    events: &mut E,
    pass: &mut Pass,
) -> Flow
where
    S: CheckpointSink + ?Sized,
    E: EngineEvents + ?Sized,
{
    let orphans: Vec<ResourceRecord> = checkpoint
        .resources
        .iter()
        .rev()
        .filter(|r| !desired.contains(&r.urn))
        .cloned()
        .collect();

    for record in orphans {
        let step = PlannedStep::new(&record.urn, &record.resource_type, StepOp::Delete);
        events.on_step_start(&step);

        if let Err(err) = delete_record(&record, providers) {
            return pass.fail(&step, StepOp::Delete, err, events);
        }
        checkpoint.remove(&record.urn);
        if let Err(err) = persist(sink, checkpoint) {
            return pass.fail(&step, StepOp::Delete, err, events);
        }
        pass.record(
            ResourceChange::succeeded(&record.urn, &record.resource_type, StepOp::Delete),
            events,
        );
    }
    Ok(())
}

/// Delete physical resources left behind by replacements
///
/// These deletions belong to the replace steps already recorded, so they
/// only surface as diagnostics. A resource that cannot be deleted stays
/// pending and is retried by the next pass.
fn delete_pending<S, E>(
    checkpoint: &mut Checkpoint,
    providers: &ProviderRegistry,
    sink: &mut S,
    events: &mut E,
    pass: &mut Pass,
) -> Flow
where
    S: CheckpointSink + ?Sized,
    E: EngineEvents + ?Sized,
{
    while let Some(old) = checkpoint.pending_deletes.last().cloned() {
        if let Err(err) = delete_record(&old, providers) {
            events.on_diagnostic(
                Some(&old.urn),
                &format!("replaced resource {} not deleted yet: {err}", old.id),
            );
            return Ok(());
        }
        checkpoint.pending_deletes.pop();
        if let Err(err) = persist(sink, checkpoint) {
            let step = PlannedStep::new(&old.urn, &old.resource_type, StepOp::Replace);
            return pass.fail(&step, StepOp::Replace, err, events);
        }
        events.on_diagnostic(Some(&old.urn), &format!("deleted replaced resource {}", old.id));
    }
    Ok(())
}

fn destroy_list<S, E>(
    pending: bool,
    checkpoint: &mut Checkpoint,
    providers: &ProviderRegistry,
    sink: &mut S,
    events: &mut E,
    pass: &mut Pass,
) -> Flow
where
    S: CheckpointSink + ?Sized,
    E: EngineEvents + ?Sized,
{
    loop {
        let list = if pending {
            &mut checkpoint.pending_deletes
        } else {
            &mut checkpoint.resources
        };
        let Some(record) = list.last().cloned() else {
            return Ok(());
        };

        let step = PlannedStep::new(&record.urn, &record.resource_type, StepOp::Delete);
        events.on_step_start(&step);
        if let Err(err) = delete_record(&record, providers) {
            return pass.fail(&step, StepOp::Delete, err, events);
        }
        list.pop();

        if let Err(err) = persist(sink, checkpoint) {
            return pass.fail(&step, StepOp::Delete, err, events);
        }
        pass.record(
            ResourceChange::succeeded(&record.urn, &record.resource_type, StepOp::Delete),
            events,
        );
    }
}

/// Resolve stack exports against live outputs
///
/// Exports that cannot be resolved are left out; the first one is
/// returned as an error.
fn resolve_exports(
    desired: &DesiredState,
    live: &OutputMap,
) -> (BTreeMap<String, Value>, Option<Error>) {
    let mut outputs = BTreeMap::new();
    let mut missing = None;
    for (name, input) in &desired.exports {
        match input.resolve(live) {
            Ok(value) => {
                outputs.insert(name.clone(), value);
            }
            Err(m) => {
                missing.get_or_insert(Error::UnresolvedOutput {
                    urn: m.urn,
                    property: m.property,
                });
            }
        }
    }
    (outputs, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoEvents;
    use crate::program::{Args, Input, ProgramContext};
    use crate::provider::CreateResponse;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory provider that records calls
    #[derive(Debug, Default)]
    struct MockProvider {
        calls: Mutex<Vec<String>>,
        live: Mutex<HashSet<String>>,
        fail_on: Mutex<Option<String>>,
    }

    impl MockProvider {
        fn fail_on(&self, call: &str) {
            *self.fail_on.lock().unwrap() = Some(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn live_count(&self) -> usize {
            self.live.lock().unwrap().len()
        }

        fn track(&self, call: String) -> anyhow::Result<()> {
            let failing = self.fail_on.lock().unwrap().as_deref() == Some(call.as_str());
            self.calls.lock().unwrap().push(call.clone());
            if failing {
                anyhow::bail!("injected failure on {call}");
            }
            Ok(())
        }
    }

    impl Provider for MockProvider {
        fn package(&self) -> &str {
            "mock"
        }

        fn version(&self) -> &str {
            "v1.0.0"
        }

        fn replace_keys(&self, _type_token: &str) -> &'static [&'static str] {
            &["name", "bucket"]
        }

        fn create(&self, req: &CreateRequest<'_>) -> anyhow::Result<CreateResponse> {
            self.track(format!("create {}", req.name))?;
            let id = format!(
                "{}-{}",
                req.inputs["name"].as_str().unwrap_or(req.name),
                self.calls.lock().unwrap().len()
            );
            self.live.lock().unwrap().insert(id.clone());
            Ok(CreateResponse {
                id: id.clone(),
                outputs: json!({ "arn": format!("arn:mock:{id}"), "size": req.inputs["size"] }),
            })
        }

        fn update(&self, req: &UpdateRequest<'_>) -> anyhow::Result<Value> {
            self.track(format!("update {}", crate::program::urn_name(req.urn)))?;
            Ok(json!({ "arn": format!("arn:mock:{}", req.id), "size": req.news["size"] }))
        }

        fn delete(&self, req: &DeleteRequest<'_>) -> anyhow::Result<()> {
            self.track(format!("delete {}", req.id))?;
            self.live.lock().unwrap().remove(req.id);
            Ok(())
        }
    }

    /// Provider registry that shares one mock with the test
    #[derive(Debug)]
    struct Shared(std::sync::Arc<MockProvider>);

    impl Provider for Shared {
        fn package(&self) -> &str {
            self.0.package()
        }

        fn version(&self) -> &str {
            self.0.version()
        }

        fn replace_keys(&self, type_token: &str) -> &'static [&'static str] {
            self.0.replace_keys(type_token)
        }

        fn create(&self, req: &CreateRequest<'_>) -> anyhow::Result<CreateResponse> {
            self.0.create(req)
        }

        fn update(&self, req: &UpdateRequest<'_>) -> anyhow::Result<Value> {
            self.0.update(req)
        }

        fn delete(&self, req: &DeleteRequest<'_>) -> anyhow::Result<()> {
            self.0.delete(req)
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Vec<Checkpoint>,
        fail: bool,
    }

    impl CheckpointSink for MemorySink {
        fn persist(&mut self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("disk unavailable");
            }
            self.saved.push(checkpoint.clone());
            Ok(())
        }
    }

    fn setup() -> (std::sync::Arc<MockProvider>, ProviderRegistry) {
        let mock = std::sync::Arc::new(MockProvider::default());
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(Shared(mock.clone())));
        (mock, registry)
    }

    fn site(bucket_name: &str, size: i64, with_object: bool) -> DesiredState {
        let mut ctx = ProgramContext::new("proj", "proj.dev");
        let bucket = ctx
            .register(
                "mock:store:Bucket",
                "bucket",
                Args::new().set("name", bucket_name).set("size", json!(size)),
            )
            .unwrap();
        if with_object {
            ctx.register(
                "mock:store:Object",
                "object",
                Args::new()
                    .set("name", "object")
                    .set("bucket", bucket.id()),
            )
            .unwrap();
        }
        ctx.export(
            "arn",
            Input::concat([Input::from("url:"), bucket.output("arn")]),
        )
        .unwrap();
        ctx.into_desired()
    }

    #[test]
    fn test_update_creates_and_records() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        let outcome = update(&site("b", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents)
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.summary.created, 2);
        assert_eq!(cp.len(), 2);
        assert_eq!(mock.live_count(), 2);
        assert_eq!(outcome.outputs["arn"], json!("url:arn:mock:b-1"));
        assert_eq!(cp.outputs, outcome.outputs);
        // object inputs carry the bucket id
        assert_eq!(cp.resources[1].inputs["bucket"], json!("b-1"));
        assert_eq!(cp.resources[1].dependencies, vec![cp.resources[0].urn.clone()]);
        // one persist per create plus the final one
        assert_eq!(sink.saved.len(), 3);
        assert!(cp.last_update.as_ref().unwrap().succeeded);
    }

    #[test]
    fn test_update_is_idempotent() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();
        let desired = site("b", 1, true);

        update(&desired, &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        let calls_before = mock.calls().len();
        let second = update(&desired, &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert!(second.is_success());
        assert_eq!(second.summary.same, 2);
        assert_eq!(second.summary.total_changes(), 0);
        assert_eq!(mock.calls().len(), calls_before);
        assert_eq!(second.outputs["arn"], json!("url:arn:mock:b-1"));
    }

    #[test]
    fn test_update_in_place() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        update(&site("b", 1, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        let outcome =
            update(&site("b", 2, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert_eq!(outcome.summary.updated, 1);
        assert_eq!(cp.resources[0].id, "b-1");
        assert_eq!(cp.resources[0].outputs["size"], json!(2));
        assert_eq!(cp.resources[0].outputs["id"], json!("b-1"));
        assert!(mock.calls().contains(&"update bucket".to_string()));
    }

    #[test]
    fn test_replace_creates_before_delete() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        update(&site("b", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        let outcome =
            update(&site("c", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.summary.replaced, 2);
        assert!(cp.pending_deletes.is_empty());
        assert_eq!(mock.live_count(), 2);

        let calls = mock.calls();
        let created = calls.iter().position(|c| c == "create bucket").unwrap();
        let new_bucket = calls.iter().rposition(|c| c == "create bucket").unwrap();
        let old_deleted = calls.iter().position(|c| c == "delete b-1").unwrap();
        assert!(created < new_bucket && new_bucket < old_deleted);
        // old object goes before old bucket
        let old_object = calls.iter().position(|c| c == "delete object-2").unwrap();
        assert!(old_object < old_deleted);
    }

    #[test]
    fn test_failed_replace_delete_stays_pending() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        update(&site("b", 1, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        mock.fail_on("delete b-1");
        let outcome =
            update(&site("c", 1, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert!(outcome.is_success());
        assert_eq!(cp.pending_deletes.len(), 1);
        assert!(!cp.is_empty());

        // next pass retries the leftover
        *mock.fail_on.lock().unwrap() = None;
        update(&site("c", 1, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        assert!(cp.pending_deletes.is_empty());
        assert_eq!(mock.live_count(), 1);
    }

    #[test]
    fn test_failure_keeps_partial_progress() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();
        mock.fail_on("create object");

        let outcome =
            update(&site("b", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert!(!outcome.is_success());
        assert!(outcome.error.as_ref().unwrap().is_provider_failure());
        assert_eq!(outcome.summary.created, 1);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(cp.len(), 1);
        // bucket output is still known
        assert_eq!(outcome.outputs["arn"], json!("url:arn:mock:b-1"));
        assert!(!cp.last_update.as_ref().unwrap().succeeded);
        assert_eq!(sink.saved.last().unwrap(), &cp);
    }

    #[test]
    fn test_orphans_are_deleted() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        update(&site("b", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        let outcome =
            update(&site("b", 1, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert_eq!(outcome.summary.deleted, 1);
        assert_eq!(outcome.summary.same, 1);
        assert_eq!(cp.len(), 1);
        assert_eq!(mock.live_count(), 1);
    }

    #[test]
    fn test_destroy_empties_checkpoint() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        update(&site("b", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        let outcome = destroy(&mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.summary.deleted, 2);
        assert!(cp.is_empty());
        assert!(cp.outputs.is_empty());
        assert_eq!(mock.live_count(), 0);
        // dependents go first
        let calls = mock.calls();
        assert_eq!(&calls[calls.len() - 2..], ["delete object-2", "delete b-1"]);

        let again = destroy(&mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        assert!(again.is_success());
        assert_eq!(again.summary.total(), 0);
    }

    #[test]
    fn test_destroy_failure_keeps_remaining_records() {
        let (mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();

        update(&site("b", 1, true), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        mock.fail_on("delete b-1");
        let outcome = destroy(&mut cp, &providers, &mut sink, &mut NoEvents).unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.summary.deleted, 1);
        assert_eq!(cp.len(), 1);
        assert_eq!(cp.resources[0].id, "b-1");
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let (_mock, providers) = setup();
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink {
            fail: true,
            ..Default::default()
        };

        let outcome =
            update(&site("b", 1, false), &mut cp, &providers, &mut sink, &mut NoEvents).unwrap();
        assert!(matches!(outcome.error, Some(Error::Checkpoint(_))));
    }

    #[test]
    fn test_preview_touches_nothing() {
        let (mock, providers) = setup();
        let cp = Checkpoint::default();

        let preview = preview(&site("b", 1, true), &cp, &providers).unwrap();
        assert!(preview.has_changes());
        assert_eq!(preview.summary.additions, 2);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_missing_provider_fails_before_mutation() {
        let mut cp = Checkpoint::default();
        let mut sink = MemorySink::default();
        let err = update(
            &site("b", 1, false),
            &mut cp,
            &ProviderRegistry::new(),
            &mut sink,
            &mut NoEvents,
        )
        .unwrap_err();

        assert!(matches!(err, Error::MissingProvider(_)));
        assert!(sink.saved.is_empty());
    }
}
