//! Program registry - the static website description

use crate::error::{OrchestratorError, Result};
use declarative::{Args, Input, Program, ProgramContext};
use objectstore::{BUCKET, BUCKET_OBJECT, BUCKET_POLICY};
use plugins::PluginRequirement;
use serde_json::json;

/// Stack output holding the site URL
pub const WEBSITE_URL: &str = "website_url";

pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Values a program is bound with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramParameters {
    pub index_content: String,
    pub index_document: String,
    pub content_type: String,
}

impl ProgramParameters {
    pub fn new(index_content: impl Into<String>) -> Self {
        Self {
            index_content: index_content.into(),
            index_document: DEFAULT_INDEX_DOCUMENT.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    #[must_use]
    pub fn with_index_document(mut self, document: &str) -> Self {
        self.index_document = document.to_string();
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        objectstore::naming::validate_key(&self.index_document).map_err(|e| {
            OrchestratorError::validation(format!("invalid index document: {e}"))
        })?;
        if self.content_type.trim().is_empty() {
            return Err(OrchestratorError::validation("content type must not be empty"));
        }
        Ok(())
    }
}

/// A bucket serving one index page to anonymous readers
#[derive(Debug, Clone)]
pub struct StaticSite {
    params: ProgramParameters,
}

impl StaticSite {
    pub fn new(params: ProgramParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ProgramParameters {
        &self.params
    }
}

impl Program for StaticSite {
    fn name(&self) -> &str {
        "static-site"
    }

    fn run(&self, ctx: &mut ProgramContext) -> anyhow::Result<()> {
        let bucket = ctx.register(
            BUCKET,
            "s3-website-bucket",
            Args::new().set(
                "website",
                json!({ "indexDocument": self.params.index_document }),
            ),
        )?;

        ctx.register(
            BUCKET_OBJECT,
            "index",
            Args::new()
                .set("bucket", bucket.id())
                .set("key", self.params.index_document.as_str())
                .set("content", self.params.index_content.as_str())
                .set("contentType", self.params.content_type.as_str()),
        )?;

        let statement = Input::object([
            ("Effect", Input::from("Allow")),
            ("Principal", Input::from("*")),
            ("Action", Input::array([Input::from("s3:GetObject")])),
            (
                "Resource",
                Input::array([Input::concat([
                    Input::from("arn:aws:s3:::"),
                    bucket.id(),
                    Input::from("/*"),
                ])]),
            ),
        ]);
        let policy = Input::object([
            ("Version", Input::from("2012-10-17")),
            ("Statement", Input::array([statement])),
        ]);
        ctx.register(
            BUCKET_POLICY,
            "bucket-policy",
            Args::new().set("bucket", bucket.id()).set("policy", policy),
        )?;

        ctx.export(WEBSITE_URL, bucket.output("websiteEndpoint"))?;
        Ok(())
    }
}

/// Binds parameters to the registered program and pins its plugins
#[derive(Debug, Clone)]
pub struct ProgramRegistry {
    plugins: Vec<PluginRequirement>,
}

impl Default for ProgramRegistry {
    fn default() -> Self {
        Self {
            plugins: vec![PluginRequirement::new(
                objectstore::PACKAGE,
                objectstore::VERSION,
            )],
        }
    }
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, params: ProgramParameters) -> StaticSite {
        StaticSite::new(params)
    }

    /// Plugins the program needs, installed before every operation
    pub fn required_plugins(&self) -> &[PluginRequirement] {
        &self.plugins
    }
}
