//! config command - Print the resolved settings

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;

use super::{load_file_config, resolve_baseline, resolve_url};
use crate::cli::args::BaselineArgs;
use crate::core::config::{BaselineOverrides, GroupMatch, OnExisting};

/// Settings as `apply` would see them, minus anything secret, laid out as a
/// config file so the output can seed one.
#[derive(Debug, Serialize)]
struct Resolved {
    url: String,
    on_existing: OnExisting,
    group_match: GroupMatch,
    baseline: BaselineOverrides,
}

/// Print the resolved settings as TOML.
pub fn config(url: Option<String>, baseline: &BaselineArgs, config_file: Option<&Path>) -> Result<ExitCode> {
    let file = load_file_config(config_file)?;
    let resolved = Resolved {
        url: resolve_url(url, &file),
        on_existing: file.on_existing.unwrap_or_default(),
        group_match: file.group_match.unwrap_or_default(),
        baseline: BaselineOverrides::from(&resolve_baseline(&file, &baseline.overrides())?),
    };

    let text = toml::to_string_pretty(&resolved).context("Failed to render config")?;
    print!("{}", text);
    Ok(ExitCode::SUCCESS)
}
