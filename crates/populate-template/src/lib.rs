//! # populate-template - fill template files with values
//!
//! ## Introduction for developers
//!
//! Read this to understand how `populate-template` works internally.
//!
//! A run has three phases, all driven by a [job::Config]:
//!
//! ### Planning
//!
//! see [job::plan]
//!
//! Every input path is mapped to a destination ([job::Layout] decides how). Before
//! anything is read the plan is checked:
//! - an input must not be its own destination unless overwriting was requested
//! - two inputs must not share a destination
//!
//! In a dry run every destination is stdout, the checks still apply.
//!
//! ### Resolving values
//!
//! see [resolver::resolve]
//!
//! Values come from two places:
//! - a yaml values file, loaded as the base [value::Mapping]
//! - `key=value` assignments, where the key is a dotted path
//!
//! Assignments are applied in order on top of the file. Each one only touches the
//! path it names:
//!
//! ```yaml
//! # values.yaml
//! x: 1
//! y:
//!   z: 2
//! ```
//!
//! `-f values.yaml -v y.z=3 -v y.w=4` resolves to
//!
//! ```yaml
//! x: 1
//! y:
//!   z: "3"
//!   w: "4"
//! ```
//!
//! The dotted path decoding lives in [path_decoder]. A path that would turn a value
//! into an object (or the other way around) is rejected instead of silently
//! dropping data.
//!
//! ### Rendering
//!
//! see [renderer::TemplateRenderer]
//!
//! Each input is rendered with jinja2 syntax (`{{ y.z }}`) against the resolved
//! values, in the order the inputs were given. The first failure aborts the run;
//! inputs after it are not touched. Files are replaced atomically so a failing
//! template never leaves a half written destination.
pub mod job;
pub mod path_decoder;
pub mod renderer;
pub mod resolver;
pub mod value;

use std::io::Write;
use std::path::PathBuf;

/// Plan, resolve and render everything described by `config`
///
/// `stdout` receives the output of dry runs.
pub fn run(config: &job::Config, stdout: &mut dyn Write) -> Result<(), Error> {
    let jobs = job::plan(config)?;
    let values = resolver::resolve(config.values_file.as_deref(), &config.assignments)?;

    let renderer = renderer::TemplateRenderer::new();
    for job in &jobs {
        job.execute(&renderer, &values, stdout)?;
    }

    tracing::info!(count = jobs.len(), "all templates rendered");
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Plan(#[from] job::PlanError),
    #[error(transparent)]
    Resolve(#[from] resolver::ResolveError),
    #[error(transparent)]
    Render(#[from] renderer::RenderError),
    #[error("Error reading \"{}\"", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error writing \"{}\"", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error writing output of \"{}\" to stdout", input.display())]
    Stdout {
        input: PathBuf,
        source: std::io::Error,
    },
}
