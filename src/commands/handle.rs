//! One-shot request handler
//!
//! Reads a JSON request, writes the JSON response. The exit status is zero
//! whenever a response was written, failed results included.

use crate::Context;
use anyhow::{Context as _, Result};
use orchestrator::{ErrorKind, Request, Response, Status};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

pub fn run(ctx: &Context, event: Option<&Path>) -> Result<()> {
    let raw = match event {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Could not read request from stdin")?;
            buf
        }
    };

    let response = respond(ctx, &raw);
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn respond(ctx: &Context, raw: &str) -> Response {
    match serde_json::from_str::<Request>(raw) {
        Ok(request) => ctx.orchestrator().handle(&request),
        Err(e) => {
            log::error!("malformed request: {e}");
            malformed(&e)
        }
    }
}

fn malformed(err: &serde_json::Error) -> Response {
    Response {
        status: Status::Failed,
        website_url: None,
        message: Some(format!("malformed request: {err}")),
        error: Some(ErrorKind::Validation),
        changes: None,
    }
}
