//! Reproducibility sidecar for sample files.
//!
//! `draws.json` gets a `draws.provenance.json` next to it holding everything
//! needed to regenerate the draws: code revision, library version, seed,
//! target parameters and the summary of the hat that produced them.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Sidecar document; `H` is the hat summary, `P` the target parameters.
#[derive(Debug, Serialize)]
pub struct Sidecar<'a, P: Serialize, H: Serialize> {
    pub code_rev: Option<String>,
    pub roucone_version: &'static str,
    pub seed: u64,
    pub count: usize,
    pub params: &'a P,
    pub hat: &'a H,
    pub output: String,
}

impl<'a, P: Serialize, H: Serialize> Sidecar<'a, P, H> {
    pub fn new(artifact: &Path, seed: u64, count: usize, params: &'a P, hat: &'a H) -> Self {
        Self {
            code_rev: code_rev(),
            roucone_version: roucone::VERSION,
            seed,
            count,
            params,
            hat,
            output: artifact.display().to_string(),
        }
    }

    /// Write the sidecar next to `artifact`; returns its path.
    pub fn write(&self, artifact: &Path) -> Result<PathBuf> {
        let path = sidecar_path(artifact);
        let body = serde_json::to_vec_pretty(self).context("serializing provenance")?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// `dir/draws.json` -> `dir/draws.provenance.json`.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("provenance.json")
}

/// Commit of the running code: `GIT_COMMIT` (build or run time), else `git`.
pub fn code_rev() -> Option<String> {
    option_env!("GIT_COMMIT")
        .map(str::to_owned)
        .or_else(|| std::env::var("GIT_COMMIT").ok())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            let out = Command::new("git")
                .args(["rev-parse", "--short=12", "HEAD"])
                .output()
                .ok()?;
            out.status
                .success()
                .then(|| String::from_utf8_lossy(&out.stdout).trim().to_owned())
        })
}
