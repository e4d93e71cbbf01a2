//! # orchestrator
//!
//! Creates, previews and destroys ephemeral static-site stacks.
//!
//! Every logical name maps to its own stack (`<project>.<name>`), so
//! requests for different names never share state. Each call runs one
//! operation to completion and reports through a [`LifecycleResult`]:
//!
//! - **create** converges the stack to the static site program and
//!   returns its `website_url`
//! - **destroy** tears everything down and removes the stack record
//! - **preview** plans a create without touching anything
//!
//! ## Example
//!
//! ```ignore
//! use orchestrator::{Operation, Orchestrator, OrchestratorConfig, ProgramParameters};
//!
//! let orch = Orchestrator::with_builtin_providers(config);
//! let result = orch.execute("alpha", Operation::Create, Some(ProgramParameters::new("<h1>hi</h1>")));
//! println!("{}", result.website_url().unwrap_or_default());
//! ```

pub mod catalog;
pub mod error;
pub mod events;
pub mod identity;
pub mod orchestrator;
pub mod program;
pub mod report;
pub mod result;

pub use error::{error_chain, ErrorKind, OrchestratorError, Result};
pub use events::OperationLog;
pub use identity::StackIdentity;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use program::{ProgramParameters, ProgramRegistry, StaticSite, WEBSITE_URL};
pub use report::{log_changes, Request, Response, CHANGES_TARGET};
pub use result::{LifecycleResult, Operation, Status};
