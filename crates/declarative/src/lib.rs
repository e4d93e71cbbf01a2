//! # Declarative
//!
//! A small engine for declarative infrastructure stacks.
//!
//! A [`Program`] registers the resources a stack should contain on a
//! [`ProgramContext`]. The engine compares the resulting [`DesiredState`]
//! with the stack's recorded [`Checkpoint`], plans the steps needed to
//! converge the two, and drives [`Provider`]s through them one resource at
//! a time.
//!
//! ## Core Concepts
//!
//! - **Program**: code that declares resources and stack outputs
//! - **Input**: a resource argument, either literal or wired to another
//!   resource's output
//! - **Provider**: creates, updates and deletes the physical resources of
//!   one package (`aws:*`)
//! - **Checkpoint**: what the engine created, persisted through a
//!   [`CheckpointSink`] after every mutating step
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Args, Program, ProgramContext, evaluate, update, NoEvents};
//!
//! struct Site;
//!
//! impl Program for Site {
//!     fn name(&self) -> &str { "site" }
//!
//!     fn run(&self, ctx: &mut ProgramContext) -> anyhow::Result<()> {
//!         let bucket = ctx.register("aws:s3/bucket:Bucket", "site", Args::new())?;
//!         ctx.export("bucket", bucket.id())?;
//!         Ok(())
//!     }
//! }
//!
//! let desired = evaluate(&Site, "proj", "proj.dev")?;
//! let outcome = update(&desired, &mut checkpoint, &providers, &mut sink, &mut NoEvents)?;
//! ```
//!
//! ## Callback Traits
//!
//! - [`EngineEvents`]: receives plan and step progress
//! - [`CheckpointSink`]: stores the checkpoint durably
//!
//! Neither assumes a particular logger, terminal UI or storage backend.

pub mod checkpoint;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod program;
pub mod provider;
pub mod types;

// Re-export main types at crate root
pub use checkpoint::{stringify_outputs, Checkpoint, CheckpointSink, ResourceRecord, UpdateInfo};
pub use context::{EngineEvents, NoEvents, Tee};
pub use diff::{changed_keys, group_by_type, DiffSummary, PlannedStep};
pub use error::{Error, Result};
pub use executor::{destroy, preview, update, Preview, UpdateOutcome};
pub use planner::{plan_destroy, plan_update};
pub use program::{
    evaluate, package_of, urn, urn_name, Args, DesiredState, Input, OutputMap, Program,
    ProgramContext, ResourceDecl, ResourceRef, UNKNOWN,
};
pub use provider::{
    BoxedProvider, CreateRequest, CreateResponse, DeleteRequest, Provider, ProviderRegistry,
    UpdateRequest,
};
pub use types::{ChangeSummary, DiffKind, ResourceChange, StepOp, StepOutcome, UpdateKind};
