mod cli;

use populate_template::value::Mapping;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env(
            "POPULATE_TEMPLATE_LOG",
        ))
        .with_writer(std::io::stderr)
        .init();

    let command_result = match cli.print_values {
        Some(format) => print_values(&cli, format),
        None => render(&cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn render(cli: &cli::Cli) -> anyhow::Result<()> {
    let config = cli.config();
    let mut stdout = std::io::stdout().lock();

    populate_template::run(&config, &mut stdout)?;
    Ok(())
}

/// Show what the templates would be rendered against
pub fn print_values(cli: &cli::Cli, format: cli::ValuesFormat) -> anyhow::Result<()> {
    let config = cli.config();
    let values = populate_template::resolver::resolve(
        config.values_file.as_deref(),
        &config.assignments,
    )?;

    output(format, &values)
}

fn output(format: cli::ValuesFormat, values: &Mapping) -> anyhow::Result<()> {
    match format {
        cli::ValuesFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), values)?,
        cli::ValuesFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), values)?;
            println!();
        }
    };

    Ok(())
}
