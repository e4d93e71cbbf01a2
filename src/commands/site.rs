//! `create` and `preview`

use crate::cli::SiteArgs;
use crate::progress::StepProgress;
use crate::Context;
use anyhow::{Context as _, Result};
use orchestrator::{Operation, ProgramParameters};
use std::fs;

pub fn create(ctx: &Context, args: &SiteArgs) -> Result<()> {
    run(ctx, args, Operation::Create)
}

pub fn preview(ctx: &Context, args: &SiteArgs) -> Result<()> {
    run(ctx, args, Operation::Preview)
}

fn run(ctx: &Context, args: &SiteArgs, operation: Operation) -> Result<()> {
    let params = parameters(args)?;
    let orch = ctx.orchestrator();

    let mut progress = StepProgress::new(ctx.quiet || ctx.json);
    let result = orch.execute_with(&args.name, operation, Some(params), &mut progress);
    progress.finish();

    super::report(ctx, &result)
}

fn parameters(args: &SiteArgs) -> Result<ProgramParameters> {
    let content = match (&args.content, &args.file) {
        (Some(content), _) => content.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?,
        (None, None) => anyhow::bail!("either --content or --file is required"),
    };
    Ok(ProgramParameters::new(content)
        .with_index_document(&args.index_document)
        .with_content_type(&args.content_type))
}
