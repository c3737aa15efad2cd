use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmds;

#[derive(Parser)]
#[command(name = "brahma-gen")]
#[command(about = "GOTCHA interface generator for brahma", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate interface headers and implementation files */
    Generate {
        /* YAML config describing the interfaces to generate */
        #[arg(short = 'c', long = "config", value_name = "FILE")]
        config: Option<PathBuf>,

        /* Interface short name (default: hdf5) */
        #[arg(long = "name")]
        name: Option<String>,

        /* Header referenced by the generated #include (default: hdf5.h) */
        #[arg(long = "header-file")]
        header_file: Option<String>,

        /* Header to parse */
        #[arg(long = "header-path", value_name = "FILE")]
        header_path: Option<PathBuf>,

        /* Substring a function name must contain (default: H5) */
        #[arg(long = "prefix")]
        prefix: Option<String>,

        /* Include directories searched for #include directives */
        #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /* Macros blanked out before parsing, e.g. H5_DLL or H5_ATTR_FORMAT() */
        #[arg(long = "strip-macro", value_name = "NAME")]
        strip_macros: Vec<String>,

        /* Predefine a macro for #if evaluation, e.g. -D H5_HAVE_PARALLEL */
        #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
        defines: Vec<String>,

        /* Root directory for generated files */
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output_root: Option<PathBuf>,

        /* Do not run the formatter over generated files */
        #[arg(long = "no-format")]
        no_format: bool,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* List the functions a header and prefix would intercept */
    Inspect {
        /* Header to parse */
        #[arg(long = "header-path", value_name = "FILE")]
        header_path: PathBuf,

        /* Substring a function name must contain */
        #[arg(long = "prefix")]
        prefix: String,

        /* Include directories searched for #include directives */
        #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /* Macros blanked out before parsing */
        #[arg(long = "strip-macro", value_name = "NAME")]
        strip_macros: Vec<String>,

        /* Predefine a macro for #if evaluation */
        #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
        defines: Vec<String>,

        /* Print the matched signatures as JSON */
        #[arg(long = "json")]
        json: bool,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Generate { verbose, .. } | Commands::Inspect { verbose, .. } => *verbose,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().without_time().with_target(false))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.command.verbose());

    match cli.command {
        Commands::Generate {
            config,
            name,
            header_file,
            header_path,
            prefix,
            include_dirs,
            strip_macros,
            defines,
            output_root,
            no_format,
            verbose,
        } => {
            cmds::generate::run(cmds::generate::GenerateArgs {
                config,
                rule: cmds::common::RuleArgs {
                    name,
                    header_file,
                    header_path,
                    prefix,
                },
                include_dirs,
                strip_macros,
                defines,
                output_root,
                no_format,
                verbose,
            })?;
        }

        Commands::Inspect {
            header_path,
            prefix,
            include_dirs,
            strip_macros,
            defines,
            json,
            verbose: _,
        } => {
            cmds::inspect::run(cmds::inspect::InspectArgs {
                header_path,
                prefix,
                include_dirs,
                strip_macros,
                defines,
                json,
            })?;
        }
    }

    Ok(())
}
