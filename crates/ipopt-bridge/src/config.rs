//! Solver configuration loaded from TOML.
//!
//! Typed fields cover the options that are set most often; anything else goes
//! into `options` as raw option-file lines. The rendered lines are ordinary user
//! option lines, so the forced overrides still apply on top of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;
use crate::options;

/// Solver settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of iterations
    pub max_iter: Option<u32>,
    /// Desired convergence tolerance (relative)
    pub tol: Option<f64>,
    /// Output verbosity, 0 (silent) to 12
    pub print_level: Option<u8>,
    /// CPU time limit in seconds
    pub max_cpu_time: Option<f64>,
    /// Linear solver, e.g. "mumps" or "ma27"
    pub linear_solver: Option<String>,
    /// Existing option file whose lines are included before `options`
    pub option_file: Option<PathBuf>,
    /// Raw option lines in `<name> <value>` form
    pub options: Vec<String>,
}

impl SolverConfig {
    /// Render the configuration as option lines: typed fields first, then the
    /// option file, then the raw lines.
    pub fn to_option_lines(&self) -> BridgeResult<Vec<String>> {
        let mut lines = Vec::new();

        if let Some(max_iter) = self.max_iter {
            lines.push(format!("max_iter {max_iter}"));
        }
        if let Some(tol) = self.tol {
            lines.push(format!("tol {tol:e}"));
        }
        if let Some(print_level) = self.print_level {
            lines.push(format!("print_level {print_level}"));
        }
        if let Some(max_cpu_time) = self.max_cpu_time {
            lines.push(format!("max_cpu_time {max_cpu_time}"));
        }
        if let Some(linear_solver) = &self.linear_solver {
            lines.push(format!("linear_solver {linear_solver}"));
        }
        if let Some(path) = &self.option_file {
            lines.extend(options::read_option_file(path)?);
        }
        lines.extend(self.options.iter().cloned());

        Ok(lines)
    }
}

/// Load solver settings from a TOML file. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> BridgeResult<SolverConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(SolverConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: SolverConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Save solver settings as TOML, creating parent directories as needed.
pub fn save_config(config: &SolverConfig, path: impl AsRef<Path>) -> BridgeResult<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
