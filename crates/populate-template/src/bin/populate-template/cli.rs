//! populate-template cli interface

use clap::{Parser, ValueEnum};
use populate_template::job::{Config, Layout};
use populate_template::path_decoder::Assignment;
use std::fmt::Formatter;
use std::path::PathBuf;

/// Populate a set of files with values using jinja2 templates
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// A value to be substituted, format should be name=value
    ///
    /// The name is a dotted path (`database.host=localhost`). Can be specified
    /// multiple times, later values override earlier ones and the values file.
    #[arg(short = 'v', long = "value", value_name = "NAME=VALUE")]
    pub values: Vec<Assignment>,

    /// The path to a yaml formatted file where the values can be sourced from
    ///
    /// A path that does not exist is ignored.
    #[arg(short = 'f', long = "values-file", value_name = "PATH")]
    pub values_file: Option<PathBuf>,

    /// The path to a file where the templates live
    ///
    /// Can be specified multiple times. Files are rendered in the given order.
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        required_unless_present = "print_values"
    )]
    pub inputs: Vec<PathBuf>,

    /// The path to a directory where the files will be placed after the templates have been applied
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// How the path of an output file is derived from its input
    #[arg(short = 'l', long = "layout", default_value_t)]
    pub layout: OutputLayout,

    /// Allow input files to be overwritten after applying the templates
    #[arg(long)]
    pub overwrite: bool,

    /// Write all output to stdout instead of files
    #[arg(long)]
    pub dry_run: bool,

    /// Print the resolved values and exit without rendering
    #[arg(long, value_name = "FORMAT")]
    pub print_values: Option<ValuesFormat>,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            values_file: self.values_file.clone(),
            assignments: self.values.clone(),
            inputs: self.inputs.clone(),
            output_dir: self.output.clone(),
            layout: self.layout.into(),
            overwrite: self.overwrite,
            dry_run: self.dry_run,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum OutputLayout {
    /// <output>/<file name of input>
    Flat,
    /// <output>/<path of input>
    #[default]
    Preserve,
}

impl std::fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputLayout::Flat => f.write_str("flat"),
            OutputLayout::Preserve => f.write_str("preserve"),
        }
    }
}

impl From<OutputLayout> for Layout {
    fn from(value: OutputLayout) -> Self {
        match value {
            OutputLayout::Flat => Layout::Flat,
            OutputLayout::Preserve => Layout::Preserve,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum ValuesFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for ValuesFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuesFormat::Json => f.write_str("json"),
            ValuesFormat::Yaml => f.write_str("yaml"),
        }
    }
}
