//! Config compiler
//!
//! Renders a [`StructuredConfig`] into the bytes of `main.json`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{Result, service_module::StructuredConfig};

/// A rendered config file, not yet written anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    contents: Vec<u8>,
    digest: String,
}

impl Artifact {
    /// Render `config` for the file at `path`
    pub fn compile(path: &Path, config: &StructuredConfig) -> Result<Self> {
        let contents = render(config)?;
        let digest = format!("{:x}", Sha256::digest(&contents));

        Ok(Self {
            path: path.to_path_buf(),
            contents,
            digest,
        })
    }

    /// Where the file belongs
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rendered bytes
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Hex encoded sha256 of the contents, logged to identify a render
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Serialize the config as compact JSON
///
/// Keys come out in declaration order and unset values are dropped, so the
/// same config always yields the same bytes.
pub fn render(config: &StructuredConfig) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(config)?)
}
