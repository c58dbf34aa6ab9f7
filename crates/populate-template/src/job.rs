//! render jobs
//!
//! A [Config] is turned into a list of [RenderJob]s before anything is read or written.
//! Planning is where the destination of every input is decided and where the
//! guards run:
//! - an input is never overwritten unless [Config::overwrite] is set
//! - no two inputs may end up at the same destination
//!
//! Jobs are then executed one after another, stopping at the first failure.
use crate::path_decoder::Assignment;
use crate::renderer::TemplateRenderer;
use crate::value::Mapping;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Everything a single invocation needs to know
#[derive(Debug, Clone)]
pub struct Config {
    /// Yaml file providing the base values
    pub values_file: Option<PathBuf>,
    /// `key=value` pairs, applied on top of the values file in this order
    pub assignments: Vec<Assignment>,
    /// Templates, rendered in this order
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub layout: Layout,
    /// Permit writing to a path that is also an input
    pub overwrite: bool,
    /// Render everything to stdout, never touch the file system
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            values_file: None,
            assignments: Vec::new(),
            inputs: Vec::new(),
            output_dir: PathBuf::from("."),
            layout: Layout::default(),
            overwrite: false,
            dry_run: false,
        }
    }
}

/// How the destination of an input is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// `<output>/<file name of input>`
    Flat,
    /// `<output>/<relative path of input>`
    ///
    /// Root, `.` and `..` components of the input are dropped so the destination
    /// always stays inside the output directory.
    #[default]
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    Stdout,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::File(path) => write!(f, "{}", path.display()),
            Destination::Stdout => f.write_str("<stdout>"),
        }
    }
}

/// One template and where its output goes
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub input: PathBuf,
    pub destination: Destination,
}

/// Compute the destination of `input` below `output_dir`
pub fn destination_path(input: &Path, output_dir: &Path, layout: Layout) -> Option<PathBuf> {
    match layout {
        Layout::Flat => input.file_name().map(|name| output_dir.join(name)),
        Layout::Preserve => {
            let relative: PathBuf = input
                .components()
                .filter(|component| matches!(component, Component::Normal(_)))
                .collect();

            if relative.as_os_str().is_empty() {
                return None;
            }

            Some(output_dir.join(relative))
        }
    }
}

/// Validate the configuration and decide where every input is written to
///
/// Nothing is read or written here, so a refused plan leaves the file system untouched.
pub fn plan(config: &Config) -> Result<Vec<RenderJob>, PlanError> {
    if config.inputs.is_empty() {
        return Err(PlanError::NoInputs);
    }

    // any input may be the destination of any job, not just of its own
    let inputs = config
        .inputs
        .iter()
        .map(|input| Ok((absolute(input)?, input.as_path())))
        .collect::<Result<HashMap<PathBuf, &Path>, PlanError>>()?;

    let mut jobs = Vec::with_capacity(config.inputs.len());
    let mut destinations: HashMap<PathBuf, &Path> = HashMap::new();

    for input in &config.inputs {
        let destination = destination_path(input, &config.output_dir, config.layout)
            .ok_or_else(|| PlanError::InvalidInput {
                input: input.clone(),
            })?;

        let absolute_destination = absolute(&destination)?;

        if !config.overwrite {
            if let Some(overwritten) = inputs.get(&absolute_destination) {
                return Err(PlanError::OutputCollision {
                    input: overwritten.to_path_buf(),
                    output: destination,
                });
            }
        }

        if let Some(first) = destinations.insert(absolute_destination, input) {
            return Err(PlanError::DuplicateDestination {
                destination,
                first: first.to_owned(),
                second: input.clone(),
            });
        }

        tracing::debug!(input=%input.display(), destination=%destination.display(), "planned");

        let destination = if config.dry_run {
            Destination::Stdout
        } else {
            Destination::File(destination)
        };
        jobs.push(RenderJob::new(input.clone(), destination));
    }

    Ok(jobs)
}

/// Absolute path with symlinks resolved as far as the path exists
///
/// For a file that does not exist yet the nearest existing ancestor is canonicalized
/// and the missing components are appended to it.
fn absolute(path: &Path) -> Result<PathBuf, PlanError> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    let lexical = std::path::absolute(path).map_err(|source| PlanError::Io {
        path: path.to_owned(),
        source,
    })?;

    for ancestor in lexical.ancestors().skip(1) {
        if let (Ok(canonical), Ok(missing)) =
            (ancestor.canonicalize(), lexical.strip_prefix(ancestor))
        {
            return Ok(canonical.join(missing));
        }
    }

    Ok(lexical)
}

impl RenderJob {
    /// Read, render and write this job
    ///
    /// File destinations are replaced atomically: the output is written to a temporary
    /// file next to the destination and renamed over it once complete.
    pub fn execute(
        &self,
        renderer: &TemplateRenderer,
        values: &Mapping,
        stdout: &mut dyn Write,
    ) -> Result<(), crate::Error> {
        let body = std::fs::read_to_string(&self.input).map_err(|source| crate::Error::Read {
            path: self.input.clone(),
            source,
        })?;
        let name = self.input.display().to_string();

        match &self.destination {
            Destination::Stdout => {
                let rendered = renderer.render_to_string(&name, &body, values)?;
                stdout
                    .write_all(rendered.as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(|source| crate::Error::Stdout {
                        input: self.input.clone(),
                        source,
                    })?;
            }
            Destination::File(path) => {
                let rendered = renderer.render_to_string(&name, &body, values)?;
                write_atomically(path, &rendered, &self.input).map_err(|source| {
                    crate::Error::Write {
                        path: path.clone(),
                        source,
                    }
                })?;
            }
        }

        tracing::info!(input=%self.input.display(), destination=%self.destination, "rendered");
        Ok(())
    }
}

/// Replace `path` with `contents`
///
/// Keeps the permissions of an existing destination, a new file takes the
/// permissions of `template`.
fn write_atomically(path: &Path, contents: &str, template: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let permissions = match std::fs::metadata(path) {
        Ok(metadata) => metadata.permissions(),
        Err(_) => std::fs::metadata(template)?.permissions(),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().set_permissions(permissions)?;
    file.persist(path).map_err(|err| err.error)?;

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("At least one input file must be specified via the --input (-i) flag")]
    NoInputs,
    #[error("Input \"{}\" does not name a file", input.display())]
    InvalidInput { input: PathBuf },
    #[error(
        "Execution would overwrite input file \"{}\", use the --overwrite flag to allow input files to be overwritten",
        input.display()
    )]
    OutputCollision { input: PathBuf, output: PathBuf },
    #[error(
        "Inputs \"{}\" and \"{}\" would both be written to \"{}\"",
        first.display(),
        second.display(),
        destination.display()
    )]
    DuplicateDestination {
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Error determining absolute path of \"{}\"", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
