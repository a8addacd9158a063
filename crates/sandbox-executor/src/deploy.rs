//! # Deployment Content Negotiation
//!
//! Classifies deployment content by its content-type tag and routes it to the
//! matching loader. Payload interpretation belongs to the loaders.

use crate::errors::HostError;
use crate::ports::outbound::ContentLoader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Recognised deployment content types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    /// Compiled bytecode package.
    BytecodePackage,
    /// Script package.
    ScriptPackage,
}

impl ContentType {
    /// Content-type tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BytecodePackage => "application/java",
            Self::ScriptPackage => "application/zip",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "application/java" => Ok(Self::BytecodePackage),
            "application/zip" => Ok(Self::ScriptPackage),
            other => Err(HostError::UnsupportedContentType(other.to_owned())),
        }
    }
}

/// Routes content to the bytecode or script loader.
#[derive(Clone)]
pub struct ContentNegotiator {
    bytecode: Arc<dyn ContentLoader>,
    script: Arc<dyn ContentLoader>,
}

impl ContentNegotiator {
    /// Creates a negotiator over the two loaders.
    #[must_use]
    pub fn new(bytecode: Arc<dyn ContentLoader>, script: Arc<dyn ContentLoader>) -> Self {
        Self { bytecode, script }
    }

    /// Loader responsible for `content_type`.
    #[must_use]
    pub fn route(&self, content_type: ContentType) -> &dyn ContentLoader {
        match content_type {
            ContentType::BytecodePackage => self.bytecode.as_ref(),
            ContentType::ScriptPackage => self.script.as_ref(),
        }
    }

    /// Parses the tag and selects its loader.
    ///
    /// # Errors
    ///
    /// `UnsupportedContentType` for unrecognised tags.
    pub fn negotiate(&self, tag: &str) -> Result<(ContentType, &dyn ContentLoader), HostError> {
        let content_type: ContentType = tag.parse()?;
        debug!(%content_type, "content negotiated");
        Ok((content_type, self.route(content_type)))
    }
}
