//! Programs describe the desired resource set of a stack
//!
//! A program never talks to a provider. It registers resource declarations
//! on a [`ProgramContext`], wiring inputs to the outputs of earlier
//! declarations through [`Input`] references. The engine resolves those
//! references while it walks the declarations in order.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Placeholder used for inputs that depend on outputs not known yet
pub const UNKNOWN: &str = "<computed>";

/// Outputs of already-converged resources, keyed by URN
pub type OutputMap = HashMap<String, Value>;

/// Build the URN of a resource
pub fn urn(project: &str, stack: &str, type_token: &str, name: &str) -> String {
    format!("urn:sitestack:{stack}::{project}::{type_token}::{name}")
}

/// Logical resource name encoded in a URN
pub fn urn_name(urn: &str) -> &str {
    urn.rsplit("::").next().unwrap_or(urn)
}

/// Provider package of a type token (`aws:s3/bucket:Bucket` -> `aws`)
pub fn package_of(type_token: &str) -> &str {
    type_token.split(':').next().unwrap_or(type_token)
}

/// A reference to an output that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingOutput {
    pub urn: String,
    pub property: String,
}

/// A resource input value
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Plain JSON value
    Literal(Value),
    /// Output property of another resource
    Output { urn: String, property: String },
    /// String concatenation of the parts
    Concat(Vec<Input>),
    /// Object whose fields may hold references
    Object(BTreeMap<String, Input>),
    /// Array whose items may hold references
    Array(Vec<Input>),
}

impl Input {
    /// Concatenate parts into a single string once all are known
    pub fn concat(parts: impl IntoIterator<Item = Input>) -> Self {
        Self::Concat(parts.into_iter().collect())
    }

    /// Build an object input from key/value pairs
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Input)>) -> Self {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build an array input
    pub fn array(items: impl IntoIterator<Item = Input>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// URNs this input reads outputs from
    pub fn references(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut BTreeSet<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Output { urn, .. } => {
                refs.insert(urn.clone());
            }
            Self::Concat(parts) | Self::Array(parts) => {
                for part in parts {
                    part.collect_references(refs);
                }
            }
            Self::Object(fields) => {
                for value in fields.values() {
                    value.collect_references(refs);
                }
            }
        }
    }

    /// Resolve to a concrete value using the outputs known so far
    pub fn resolve(&self, outputs: &OutputMap) -> std::result::Result<Value, MissingOutput> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Output { urn, property } => outputs
                .get(urn)
                .and_then(|o| o.get(property))
                .cloned()
                .ok_or_else(|| MissingOutput {
                    urn: urn.clone(),
                    property: property.clone(),
                }),
            Self::Concat(parts) => {
                let mut joined = String::new();
                for part in parts {
                    match part.resolve(outputs)? {
                        Value::String(s) => joined.push_str(&s),
                        Value::Null => {}
                        other => joined.push_str(&other.to_string()),
                    }
                }
                Ok(Value::String(joined))
            }
            Self::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), value.resolve(outputs)?);
                }
                Ok(Value::Object(map))
            }
            Self::Array(items) => items
                .iter()
                .map(|i| i.resolve(outputs))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Resolve, substituting [`UNKNOWN`] for anything not known yet
    pub fn resolve_lenient(&self, outputs: &OutputMap) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Output { .. } => self
                .resolve(outputs)
                .unwrap_or_else(|_| Value::String(UNKNOWN.to_string())),
            Self::Concat(parts) => {
                if parts.iter().all(|p| p.resolve(outputs).is_ok()) {
                    self.resolve(outputs)
                        .unwrap_or_else(|_| Value::String(UNKNOWN.to_string()))
                } else {
                    Value::String(UNKNOWN.to_string())
                }
            }
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.resolve_lenient(outputs)))
                    .collect(),
            ),
            Self::Array(items) => {
                Value::Array(items.iter().map(|i| i.resolve_lenient(outputs)).collect())
            }
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::Literal(Value::String(value))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }
}

/// Resource arguments builder
#[derive(Debug, Clone, Default)]
pub struct Args(BTreeMap<String, Input>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an input property
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Input>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn into_inner(self) -> BTreeMap<String, Input> {
        self.0
    }
}

/// Handle to a registered resource, used to reference its outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    urn: String,
}

impl ResourceRef {
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Reference an output property
    pub fn output(&self, property: &str) -> Input {
        Input::Output {
            urn: self.urn.clone(),
            property: property.to_string(),
        }
    }

    /// Reference the provider-assigned id
    pub fn id(&self) -> Input {
        self.output("id")
    }
}

/// A single declared resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub urn: String,
    pub type_token: String,
    pub name: String,
    pub inputs: BTreeMap<String, Input>,
}

impl ResourceDecl {
    /// URNs of resources this declaration reads outputs from
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = BTreeSet::new();
        for input in self.inputs.values() {
            deps.extend(input.references());
        }
        deps.into_iter().collect()
    }

    /// Resolve all inputs into a JSON object
    pub fn resolve_inputs(&self, outputs: &OutputMap) -> std::result::Result<Value, MissingOutput> {
        let mut map = Map::new();
        for (key, input) in &self.inputs {
            map.insert(key.clone(), input.resolve(outputs)?);
        }
        Ok(Value::Object(map))
    }

    /// Resolve inputs, leaving unknown placeholders where needed
    pub fn resolve_inputs_lenient(&self, outputs: &OutputMap) -> Value {
        Value::Object(
            self.inputs
                .iter()
                .map(|(k, v)| (k.clone(), v.resolve_lenient(outputs)))
                .collect(),
        )
    }
}

/// The desired state a program evaluated to
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    /// Declarations in registration order (dependencies first)
    pub resources: Vec<ResourceDecl>,
    /// Stack outputs
    pub exports: BTreeMap<String, Input>,
}

impl DesiredState {
    pub fn find(&self, urn: &str) -> Option<&ResourceDecl> {
        self.resources.iter().find(|r| r.urn == urn)
    }

    pub fn contains(&self, urn: &str) -> bool {
        self.find(urn).is_some()
    }
}

/// Registration surface handed to a program
#[derive(Debug)]
pub struct ProgramContext {
    project: String,
    stack: String,
    desired: DesiredState,
}

impl ProgramContext {
    pub fn new(project: &str, stack: &str) -> Self {
        Self {
            project: project.to_string(),
            stack: stack.to_string(),
            desired: DesiredState::default(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Declare a resource
    ///
    /// Inputs may only reference resources registered earlier.
    pub fn register(&mut self, type_token: &str, name: &str, args: Args) -> Result<ResourceRef> {
        if type_token.split(':').count() != 3 || type_token.split(':').any(str::is_empty) {
            return Err(Error::InvalidType(type_token.to_string()));
        }

        let urn = urn(&self.project, &self.stack, type_token, name);
        if self.desired.contains(&urn) {
            return Err(Error::DuplicateResource(urn));
        }

        let decl = ResourceDecl {
            urn: urn.clone(),
            type_token: type_token.to_string(),
            name: name.to_string(),
            inputs: args.into_inner(),
        };
        for reference in decl.dependencies() {
            self.check_reference(&urn, &reference)?;
        }

        log::trace!("registered {urn}");
        self.desired.resources.push(decl);
        Ok(ResourceRef { urn })
    }

    /// Declare a stack output
    pub fn export(&mut self, name: &str, value: impl Into<Input>) -> Result<()> {
        let value = value.into();
        for reference in value.references() {
            self.check_reference(&format!("output {name}"), &reference)?;
        }
        self.desired.exports.insert(name.to_string(), value);
        Ok(())
    }

    fn check_reference(&self, from: &str, reference: &str) -> Result<()> {
        if self.desired.contains(reference) {
            Ok(())
        } else {
            Err(Error::UnknownReference {
                urn: from.to_string(),
                reference: reference.to_string(),
            })
        }
    }

    pub fn into_desired(self) -> DesiredState {
        self.desired
    }
}

/// A description of infrastructure, evaluated by the engine
///
/// Implementations carry their parameters as fields, so everything a
/// program depends on is visible in its type.
pub trait Program: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Register the desired resources and outputs
    fn run(&self, ctx: &mut ProgramContext) -> anyhow::Result<()>;
}

/// Evaluate a program into its desired state
pub fn evaluate(program: &dyn Program, project: &str, stack: &str) -> Result<DesiredState> {
    let mut ctx = ProgramContext::new(project, stack);
    program.run(&mut ctx).map_err(|e| Error::Program {
        program: program.name().to_string(),
        message: format!("{e:#}"),
    })?;
    let desired = ctx.into_desired();
    log::debug!(
        "program {} declared {} resources and {} outputs",
        program.name(),
        desired.resources.len(),
        desired.exports.len()
    );
    Ok(desired)
}
