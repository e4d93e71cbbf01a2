//! The stack orchestrator: one call, one operation, one stack

use crate::catalog::builtin_resolver;
use crate::error::{error_chain, OrchestratorError, Result};
use crate::events::OperationLog;
use crate::identity::StackIdentity;
use crate::program::{ProgramParameters, ProgramRegistry};
use crate::report::{self, Request, Response};
use crate::result::{LifecycleResult, Operation, Status};
use backend::{Workspace, WorkspaceConfig};
use declarative::{
    stringify_outputs, ChangeSummary, Checkpoint, EngineEvents, NoEvents, ProviderRegistry, Tee,
    UpdateOutcome,
};
use objectstore::{REGION_KEY, STORAGE_ROOT_KEY};
use plugins::{InstallOutcome, PluginConfig, Resolver};
use serde_json::Value;
use std::path::PathBuf;

/// Fixed configuration shared by every operation
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub workspace: WorkspaceConfig,
    /// Region new resources are placed in
    pub region: String,
    /// Directory the object store provider keeps buckets under
    pub storage_root: PathBuf,
}

impl OrchestratorConfig {
    pub fn new(workspace: WorkspaceConfig, region: &str, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace,
            region: region.to_string(),
            storage_root: storage_root.into(),
        }
    }

    /// Workspace config with the provider settings new stacks start from
    pub fn workspace_config(&self) -> WorkspaceConfig {
        let mut config = self.workspace.clone();
        for (key, value) in self.provider_settings() {
            config.stack_settings.insert(key.to_string(), value);
        }
        config
    }

    fn provider_settings(&self) -> [(&'static str, Value); 2] {
        [
            (REGION_KEY, Value::from(self.region.as_str())),
            (
                STORAGE_ROOT_KEY,
                Value::from(self.storage_root.to_string_lossy().into_owned()),
            ),
        ]
    }
}

/// Maps logical names to stacks and drives their lifecycle
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: ProgramRegistry,
    resolver: Resolver,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, registry: ProgramRegistry, resolver: Resolver) -> Self {
        Self {
            config,
            registry,
            resolver,
        }
    }

    /// Orchestrator backed by the providers compiled into this build
    pub fn with_builtin_providers(config: OrchestratorConfig) -> Self {
        Self::new(config, ProgramRegistry::new(), builtin_resolver())
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn project(&self) -> &str {
        &self.config.workspace.project
    }

    /// Stack a logical name maps to
    pub fn stack_name(&self, name: &str) -> Result<String> {
        Ok(StackIdentity::new(self.project(), name)?.stack_name())
    }

    /// The workspace, if the backend was ever initialized
    pub fn workspace(&self) -> Result<Option<Workspace>> {
        Ok(Workspace::open(self.config.workspace_config())?)
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.config.workspace.plugin_dir()
    }

    /// Install the plugins the program needs
    pub fn install_plugins(&self) -> Result<Vec<InstallOutcome>> {
        Ok(self
            .resolver
            .ensure_installed(&self.plugin_dir(), self.registry.required_plugins())?)
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    pub fn execute(
        &self,
        name: &str,
        operation: Operation,
        params: Option<ProgramParameters>,
    ) -> LifecycleResult {
        self.execute_with(name, operation, params, &mut NoEvents)
    }

    /// Run an operation given by name, as it arrives from a transport
    pub fn execute_named(
        &self,
        name: &str,
        operation: &str,
        params: Option<ProgramParameters>,
    ) -> LifecycleResult {
        match operation.parse::<Operation>() {
            Ok(op) => self.execute(name, op, params),
            Err(message) => {
                log::error!("rejected request for '{}': {message}", name.trim());
                let result = LifecycleResult::failed(
                    "",
                    None,
                    crate::error::ErrorKind::Validation,
                    message,
                );
                report::log_changes(&result);
                result
            }
        }
    }

    /// Serve a [`Request`]
    pub fn handle(&self, request: &Request) -> Response {
        let result = self.execute_named(&request.name, &request.operation, request.parameters());
        Response::from(&result)
    }

    /// Run an operation, forwarding engine events to `observer`
    ///
    /// Never fails: every error ends up in the returned result.
    pub fn execute_with(
        &self,
        name: &str,
        operation: Operation,
        params: Option<ProgramParameters>,
        observer: &mut dyn EngineEvents,
    ) -> LifecycleResult {
        let result = match StackIdentity::new(self.project(), name) {
            Ok(identity) => {
                let stack = identity.stack_name();
                log::info!("{operation} {stack}");
                self.run(&identity, operation, params, observer)
                    .unwrap_or_else(|err| {
                        let message = error_chain(&err);
                        log::error!("{operation} {stack} failed: {message}");
                        LifecycleResult::failed(&stack, Some(operation), err.kind(), message)
                            .with_advice(err.advice())
                    })
            }
            Err(err) => {
                log::error!("rejected {operation} request: {err}");
                LifecycleResult::failed("", Some(operation), err.kind(), err.to_string())
            }
        };
        report::log_changes(&result);
        result
    }

    fn run(
        &self,
        identity: &StackIdentity,
        operation: Operation,
        params: Option<ProgramParameters>,
        observer: &mut dyn EngineEvents,
    ) -> Result<LifecycleResult> {
        let stack = identity.stack_name();
        let mut log = OperationLog::new(&stack, operation);
        let mut events = Tee {
            first: &mut log,
            second: observer,
        };

        match operation {
            Operation::Create => self.create(identity, require(params, operation)?, &mut events),
            Operation::Destroy => self.destroy(identity, &mut events),
            Operation::Preview => self.preview(identity, require(params, operation)?, &mut events),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn create(
        &self,
        identity: &StackIdentity,
        params: ProgramParameters,
        events: &mut dyn EngineEvents,
    ) -> Result<LifecycleResult> {
        params.validate()?;
        let stack_name = identity.stack_name();
        let program = self.registry.bind(params);

        let workspace = Workspace::select_or_create(self.config.workspace_config())?;
        let (_, created) = workspace.select_or_create_stack(&stack_name)?;
        if created {
            log::debug!("{stack_name} is new");
        }
        self.install_plugins()?;

        let _lease = workspace.lock_stack(&stack_name, Operation::Create.as_str())?;
        // a destroy holding the lease before us may have removed the record
        let (mut stack, _) = workspace.select_or_create_stack(&stack_name)?;
        let settings =
            self.pass_settings(&stack_name, stack.config(), !stack.checkpoint().is_empty());
        for (key, value) in &settings {
            stack.set_config(key, value.clone())?;
        }

        let desired = declarative::evaluate(&program, identity.project(), &stack_name)?;
        let providers = self.load_providers(&settings)?;
        let mut checkpoint = stack.checkpoint().clone();
        let outcome = declarative::update(&desired, &mut checkpoint, &providers, &mut stack, events)?;

        let result = converged(&stack_name, Operation::Create, Status::Created, outcome);
        Ok(if result.is_success() {
            let message = format!("{stack_name} is up ({})", describe(&result.summary));
            result.with_message(message)
        } else {
            result
        })
    }

    fn destroy(
        &self,
        identity: &StackIdentity,
        events: &mut dyn EngineEvents,
    ) -> Result<LifecycleResult> {
        let stack_name = identity.stack_name();
        let nothing = || {
            log::info!("{stack_name} does not exist, nothing to destroy");
            LifecycleResult::new(&stack_name, Operation::Destroy, Status::Destroyed)
                .with_message(format!("nothing existed for {stack_name}"))
        };

        let Some(workspace) = self.workspace()? else {
            return Ok(nothing());
        };
        if workspace.select_stack(&stack_name)?.is_none() {
            return Ok(nothing());
        }
        self.install_plugins()?;

        let _lease = workspace.lock_stack(&stack_name, Operation::Destroy.as_str())?;
        // removed by a destroy that held the lease before us
        let Some(mut stack) = workspace.select_stack(&stack_name)? else {
            return Ok(nothing());
        };

        let settings = self.pass_settings(&stack_name, stack.config(), true);
        let providers = self.load_providers(&settings)?;
        let mut checkpoint = stack.checkpoint().clone();
        let outcome = declarative::destroy(&mut checkpoint, &providers, &mut stack, events)?;

        let result = converged(&stack_name, Operation::Destroy, Status::Destroyed, outcome);
        if !result.is_success() {
            return Ok(result);
        }
        workspace.remove_stack(&stack_name)?;
        let message = format!("{stack_name} destroyed ({})", describe(&result.summary));
        Ok(result.with_message(message))
    }

    fn preview(
        &self,
        identity: &StackIdentity,
        params: ProgramParameters,
        events: &mut dyn EngineEvents,
    ) -> Result<LifecycleResult> {
        params.validate()?;
        let stack_name = identity.stack_name();
        let program = self.registry.bind(params);

        let stack = match self.workspace()? {
            Some(workspace) => workspace.select_stack(&stack_name)?,
            None => None,
        };
        let (recorded, checkpoint) = stack.map_or_else(
            || (self.config.workspace_config().stack_settings, Checkpoint::default()),
            |s| (s.config().clone(), s.checkpoint().clone()),
        );
        let settings = self.pass_settings(&stack_name, &recorded, !checkpoint.is_empty());

        self.install_plugins()?;
        let desired = declarative::evaluate(&program, identity.project(), &stack_name)?;
        let providers = self.load_providers(&settings)?;
        let preview = declarative::preview(&desired, &checkpoint, &providers)?;
        events.on_plan(&preview.steps);

        let mut result = LifecycleResult::new(&stack_name, Operation::Preview, Status::Previewed);
        result.outputs = checkpoint.output_strings();
        let message = format!(
            "{stack_name}: {} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            preview.summary.additions,
            preview.summary.updates,
            preview.summary.replacements,
            preview.summary.removals,
            preview.summary.unchanged
        );
        result.planned = preview.steps;
        Ok(result.with_message(message))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn load_providers(&self, settings: &PluginConfig) -> Result<ProviderRegistry> {
        Ok(self
            .resolver
            .load(&self.plugin_dir(), self.registry.required_plugins(), settings)?)
    }

    /// Provider settings a pass over a stack runs with
    ///
    /// Once a stack tracks resources its recorded settings win, so every pass
    /// reaches resources where they were created. Current settings fill the
    /// gaps, and replace recorded ones while the stack is still empty.
    fn pass_settings(
        &self,
        stack_name: &str,
        recorded: &PluginConfig,
        tracks_resources: bool,
    ) -> PluginConfig {
        let mut settings = recorded.clone();
        for (key, value) in self.config.provider_settings() {
            match settings.get(key) {
                Some(kept) if tracks_resources => {
                    if *kept != value {
                        log::warn!(
                            "{stack_name} keeps {key}={kept} where its resources live, not {value}"
                        );
                    }
                }
                _ => {
                    settings.insert(key.to_string(), value);
                }
            }
        }
        settings
    }
}

fn require(params: Option<ProgramParameters>, operation: Operation) -> Result<ProgramParameters> {
    params.ok_or_else(|| {
        OrchestratorError::validation(format!("{operation} requires index content"))
    })
}

/// Turn an engine outcome into a result, failed if the pass stopped
fn converged(
    stack: &str,
    operation: Operation,
    status: Status,
    outcome: UpdateOutcome,
) -> LifecycleResult {
    let mut result = LifecycleResult::new(stack, operation, status);
    result.outputs = stringify_outputs(&outcome.outputs);
    result.summary = outcome.summary;
    result.changes = outcome.changes;

    if let Some(err) = outcome.error {
        let err = OrchestratorError::from(err);
        let message = error_chain(&err);
        log::error!("{operation} {stack} stopped: {message}");
        result.status = Status::Failed;
        result.error_kind = Some(err.kind());
        result.message = message;
    }
    result
}

fn describe(summary: &ChangeSummary) -> String {
    format!(
        "{} created, {} updated, {} replaced, {} deleted, {} unchanged",
        summary.created, summary.updated, summary.replaced, summary.deleted, summary.same
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_source;
    use crate::error::ErrorKind;
    use declarative::{BoxedProvider, StepOp};
    use objectstore::ObjectStore;
    use plugins::{BuiltinSource, MockSource, PluginRequirement, PluginSource};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Config sharing the backend and storage root under `dir`
    fn config_in(dir: &Path, home: &str, region: &str) -> OrchestratorConfig {
        let workspace = WorkspaceConfig::new(
            "site",
            &format!("file://{}", dir.join("backend").display()),
            dir.join(home),
        );
        OrchestratorConfig::new(workspace, region, dir.join("objects"))
    }

    fn orchestrator(dir: &Path) -> Orchestrator {
        Orchestrator::with_builtin_providers(config_in(dir, "work", "us-east-1"))
    }

    /// Builtin plugins, running `gate` on the first version lookup
    struct GatedSource {
        inner: BuiltinSource,
        gate: Box<dyn Fn() + Send + Sync>,
        opened: AtomicBool,
    }

    impl PluginSource for GatedSource {
        fn describe(&self) -> String {
            self.inner.describe()
        }

        fn versions(&self, name: &str) -> plugins::Result<Vec<String>> {
            if !self.opened.swap(true, Ordering::SeqCst) {
                (self.gate)();
            }
            self.inner.versions(name)
        }

        fn instantiate(
            &self,
            req: &PluginRequirement,
            config: &PluginConfig,
        ) -> plugins::Result<BoxedProvider> {
            self.inner.instantiate(req, config)
        }
    }

    fn page(html: &str) -> Option<ProgramParameters> {
        Some(ProgramParameters::new(html))
    }

    fn served(result: &LifecycleResult) -> String {
        let url = result.website_url().unwrap();
        let path = url.strip_prefix("file://").unwrap();
        fs::read_to_string(path).unwrap()
    }

    fn buckets_in(dir: &Path, region: &str) -> Vec<String> {
        ObjectStore::new(dir.join("objects"), region)
            .unwrap()
            .list_buckets()
            .unwrap()
    }

    fn buckets(dir: &Path) -> Vec<String> {
        buckets_in(dir, "us-east-1")
    }

    #[test]
    fn test_create_then_destroy_round_trip() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let created = orch.execute("alpha", Operation::Create, page("<h1>alpha</h1>"));
        assert_eq!(created.status, Status::Created, "{}", created.message);
        assert_eq!(created.stack, "site.alpha");
        assert_eq!(created.summary.created, 3);
        assert_eq!(served(&created), "<h1>alpha</h1>");
        assert_eq!(buckets(dir.path()).len(), 1);

        let destroyed = orch.execute("alpha", Operation::Destroy, None);
        assert_eq!(destroyed.status, Status::Destroyed, "{}", destroyed.message);
        assert_eq!(destroyed.summary.deleted, 3);
        assert!(buckets(dir.path()).is_empty());

        let workspace = orch.workspace().unwrap().unwrap();
        assert!(workspace.select_stack("site.alpha").unwrap().is_none());
    }

    #[test]
    fn test_addressing_is_case_insensitive_and_convergent() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let first = orch.execute("Alpha", Operation::Create, page("<p>v1</p>"));
        let second = orch.execute(" alpha ", Operation::Create, page("<p>v1</p>"));
        assert!(second.is_success(), "{}", second.message);
        assert_eq!(first.website_url(), second.website_url());
        assert_eq!(second.summary.same, 3);
        assert_eq!(second.summary.total_changes(), 0);
        assert!(second.changes.iter().all(|c| c.op == StepOp::Same));
        assert_eq!(buckets(dir.path()).len(), 1);
    }

    #[test]
    fn test_content_change_updates_in_place() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let first = orch.execute("alpha", Operation::Create, page("<p>v1</p>"));
        let second = orch.execute("alpha", Operation::Create, page("<p>v2</p>"));
        assert_eq!(second.summary.updated, 1);
        assert_eq!(second.summary.same, 2);
        assert_eq!(first.website_url(), second.website_url());
        assert_eq!(served(&second), "<p>v2</p>");
    }

    #[test]
    fn test_names_map_to_disjoint_stacks() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let a = orch.execute("alpha", Operation::Create, page("a"));
        let b = orch.execute("beta", Operation::Create, page("b"));
        assert_ne!(a.website_url(), b.website_url());
        assert_eq!(buckets(dir.path()).len(), 2);

        orch.execute("alpha", Operation::Destroy, None);
        assert_eq!(served(&b), "b");
        let stacks = orch.workspace().unwrap().unwrap().list_stacks().unwrap();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].name, "site.beta");
    }

    #[test]
    fn test_unknown_operation_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let result = orch.execute_named("alpha", "update", page("x"));
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.message.contains("'update'"));
        assert!(!dir.path().join("backend").exists());
    }

    #[test]
    fn test_create_requires_parameters() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let result = orch.execute("alpha", Operation::Create, None);
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(!dir.path().join("backend").exists());

        let result = orch.execute("bad name", Operation::Create, page("x"));
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.stack.is_empty());
    }

    #[test]
    fn test_destroy_without_stack_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let result = orch.execute("ghost", Operation::Destroy, None);
        assert_eq!(result.status, Status::Destroyed);
        assert!(result.message.contains("nothing existed"));
        assert!(!dir.path().join("backend").exists());
        assert!(!orch.plugin_dir().exists());

        orch.execute("alpha", Operation::Create, page("x"));
        let again = orch.execute("ghost", Operation::Destroy, None);
        assert_eq!(again.status, Status::Destroyed);
        assert!(again.changes.is_empty());
    }

    #[test]
    fn test_held_lease_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());
        orch.execute("alpha", Operation::Create, page("v1"));

        let workspace = orch.workspace().unwrap().unwrap();
        let lease = workspace.lock_stack("site.alpha", "test").unwrap();

        let blocked = orch.execute("alpha", Operation::Create, page("v2"));
        assert_eq!(blocked.error_kind, Some(ErrorKind::Conflict));
        assert!(blocked.is_retryable());
        let blocked = orch.execute("alpha", Operation::Destroy, None);
        assert_eq!(blocked.error_kind, Some(ErrorKind::Conflict));
        assert_eq!(buckets(dir.path()).len(), 1);

        drop(lease);
        let retried = orch.execute("alpha", Operation::Create, page("v2"));
        assert!(retried.is_success(), "{}", retried.message);
        assert_eq!(served(&retried), "v2");
    }

    #[test]
    fn test_provider_failure_is_reconcile_error() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());
        // storage root is a file, so no bucket directory can be made
        fs::write(dir.path().join("objects"), "not a directory").unwrap();

        let failed = orch.execute("alpha", Operation::Create, page("x"));
        assert_eq!(failed.status, Status::Failed);
        assert_eq!(failed.error_kind, Some(ErrorKind::Reconcile));
        assert_eq!(failed.summary.failed, 1);
        assert!(!failed.is_retryable());

        let workspace = orch.workspace().unwrap().unwrap();
        let stack = workspace.select_stack("site.alpha").unwrap().unwrap();
        assert!(stack.checkpoint().is_empty());

        fs::remove_file(dir.path().join("objects")).unwrap();
        let fixed = orch.execute("alpha", Operation::Create, page("x"));
        assert_eq!(fixed.status, Status::Created, "{}", fixed.message);
    }

    #[test]
    fn test_failed_teardown_keeps_stack_record() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());
        let created = orch.execute("alpha", Operation::Create, page("x"));
        let url = created.website_url().unwrap();
        let index = PathBuf::from(url.strip_prefix("file://").unwrap());
        // a directory in place of the object file cannot be deleted as one
        fs::remove_file(&index).unwrap();
        fs::create_dir(&index).unwrap();
        fs::write(index.join("stray"), "x").unwrap();

        let failed = orch.execute("alpha", Operation::Destroy, None);
        assert_eq!(failed.status, Status::Failed);
        assert_eq!(failed.error_kind, Some(ErrorKind::Reconcile));
        assert_eq!(failed.summary.deleted, 1);
        assert_eq!(failed.summary.failed, 1);

        let workspace = orch.workspace().unwrap().unwrap();
        let stack = workspace.select_stack("site.alpha").unwrap().unwrap();
        assert_eq!(stack.checkpoint().len(), 2);
        assert_eq!(buckets(dir.path()).len(), 1);

        fs::remove_dir_all(&index).unwrap();
        let retried = orch.execute("alpha", Operation::Destroy, None);
        assert_eq!(retried.status, Status::Destroyed, "{}", retried.message);
        assert_eq!(retried.summary.deleted, 2);
        assert!(buckets(dir.path()).is_empty());
        assert!(workspace.select_stack("site.alpha").unwrap().is_none());
    }

    #[test]
    fn test_plugin_failure_aborts_before_any_resource() {
        let dir = TempDir::new().unwrap();
        let orch = Orchestrator::new(
            config_in(dir.path(), "work", "us-east-1"),
            ProgramRegistry::new(),
            Resolver::with_source(Box::new(MockSource::new())),
        );

        let result = orch.execute("alpha", Operation::Create, page("x"));
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error_kind, Some(ErrorKind::Dependency));
        assert!(result.message.contains("aws"), "{}", result.message);
        assert!(result.advice.is_some());
        assert!(result.changes.is_empty());
        assert!(!dir.path().join("objects").exists());

        let workspace = orch.workspace().unwrap().unwrap();
        let stack = workspace.select_stack("site.alpha").unwrap().unwrap();
        assert!(stack.checkpoint().is_empty());
    }

    #[test]
    fn test_region_change_keeps_resources_where_they_live() {
        let dir = TempDir::new().unwrap();
        let east = orchestrator(dir.path());
        let west =
            Orchestrator::with_builtin_providers(config_in(dir.path(), "work", "eu-west-1"));

        let first = east.execute("alpha", Operation::Create, page("v1"));
        let again = west.execute("alpha", Operation::Create, page("v2"));
        assert_eq!(again.status, Status::Created, "{}", again.message);
        assert_eq!(again.summary.updated, 1);
        assert_eq!(first.website_url(), again.website_url());
        assert_eq!(served(&again), "v2");
        assert!(buckets_in(dir.path(), "eu-west-1").is_empty());

        let workspace = west.workspace().unwrap().unwrap();
        let stack = workspace.select_stack("site.alpha").unwrap().unwrap();
        assert_eq!(stack.config_value(REGION_KEY), Some(&Value::from("us-east-1")));

        let destroyed = west.execute("alpha", Operation::Destroy, None);
        assert_eq!(destroyed.status, Status::Destroyed, "{}", destroyed.message);
        assert_eq!(destroyed.summary.deleted, 3);
        assert!(buckets(dir.path()).is_empty());
        assert!(buckets_in(dir.path(), "eu-west-1").is_empty());
    }

    #[test]
    fn test_create_racing_a_destroy_recreates_the_stack() {
        let dir = TempDir::new().unwrap();
        orchestrator(dir.path()).execute("alpha", Operation::Create, page("v1"));

        // the destroy runs after create selected the record, before its lease
        let root = dir.path().to_path_buf();
        let source = GatedSource {
            inner: builtin_source(),
            gate: Box::new(move || {
                let destroyed = orchestrator(&root).execute("alpha", Operation::Destroy, None);
                assert_eq!(destroyed.status, Status::Destroyed);
            }),
            opened: AtomicBool::new(false),
        };
        // own plugin dir, so installing consults the source
        let racing = Orchestrator::new(
            config_in(dir.path(), "racing", "us-east-1"),
            ProgramRegistry::new(),
            Resolver::with_source(Box::new(source)),
        );

        let created = racing.execute("alpha", Operation::Create, page("v2"));
        assert_eq!(created.status, Status::Created, "{}", created.message);
        assert_eq!(created.summary.created, 3);
        assert_eq!(served(&created), "v2");
        assert_eq!(buckets(dir.path()).len(), 1);
    }

    #[test]
    fn test_unsupported_backend_is_dependency_error() {
        let dir = TempDir::new().unwrap();
        let workspace = WorkspaceConfig::new("site", "s3://bucket/state", dir.path().join("work"));
        let orch = Orchestrator::with_builtin_providers(OrchestratorConfig::new(
            workspace,
            "us-east-1",
            dir.path().join("objects"),
        ));

        let result = orch.execute("alpha", Operation::Create, page("x"));
        assert_eq!(result.error_kind, Some(ErrorKind::Dependency));
        assert!(result.message.contains("s3"));
        assert!(!dir.path().join("objects").exists());
    }

    #[test]
    fn test_preview_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let fresh = orch.execute("alpha", Operation::Preview, page("v1"));
        assert_eq!(fresh.status, Status::Previewed, "{}", fresh.message);
        assert_eq!(fresh.plan_summary().additions, 3);
        assert!(orch.workspace().unwrap().is_none());

        orch.execute("alpha", Operation::Create, page("v1"));
        let changed = orch.execute("alpha", Operation::Preview, page("v2"));
        let summary = changed.plan_summary();
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.unchanged, 2);
        assert!(changed.changes.is_empty());

        let current = orch.execute("alpha", Operation::Preview, page("v1"));
        assert!(!current.plan_summary().has_changes());
        assert!(current.website_url().is_some());
    }

    #[test]
    fn test_concurrent_creates_on_one_name() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let results: Vec<LifecycleResult> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| orch.execute("alpha", Operation::Create, page("same"))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in &results {
            assert!(
                result.status == Status::Created
                    || result.error_kind == Some(ErrorKind::Conflict),
                "{}",
                result.message
            );
        }
        let created: usize = results.iter().map(|r| r.summary.created).sum();
        assert_eq!(created, 3);
        assert_eq!(buckets(dir.path()).len(), 1);

        let settled = orch.execute("alpha", Operation::Create, page("same"));
        assert_eq!(settled.summary.same, 3);
    }

    #[test]
    fn test_handle_request() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path());

        let response = orch.handle(&Request {
            name: "alpha".into(),
            operation: "create".into(),
            index_content: Some("<p>hi</p>".into()),
        });
        assert_eq!(response.status, Status::Created);
        assert!(response.website_url.is_some());
        assert_eq!(response.changes.unwrap().created, 3);

        let response = orch.handle(&Request {
            name: "alpha".into(),
            operation: "destroy".into(),
            index_content: None,
        });
        assert_eq!(response.status, Status::Destroyed);
        assert!(response.website_url.is_none());
    }
}
