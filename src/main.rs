//! Command-line interface for xsd-assembly

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xsd_assembly::{Limits, SchemaAssemblyChecker};

/// Exit status when inputs or catalogs could not be used
#[cfg(feature = "cli")]
const EXIT_INITIALIZATION: i32 = 2;

/// Exit status when the assembly raised warnings
#[cfg(feature = "cli")]
const EXIT_WARNINGS: i32 = 1;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdcheck")]
#[command(author, version, about = "Check how XML Schema documents assemble through import, include, redefine and catalogs", long_about = None)]
struct Cli {
    /// XML catalog file (repeatable)
    #[arg(short, long = "catalog", value_name = "FILE")]
    catalogs: Vec<PathBuf>,

    /// Print the full assembly log, not only warnings
    #[arg(short, long)]
    verbose: bool,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Use strict resource limits
    #[arg(long)]
    strict_limits: bool,

    /// Schema document paths or namespace URIs
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_INITIALIZATION);
        }
    }
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let limits = if cli.strict_limits { Limits::strict() } else { Limits::default() };
    let mut checker = SchemaAssemblyChecker::new().with_limits(limits);
    for catalog in &cli.catalogs {
        checker.add_catalog_file(catalog);
    }
    for input in &cli.inputs {
        checker.add_input(input);
    }

    let errors = checker.initialization_errors();
    let fatal = checker.all_initial_schema_uris().is_empty();

    if cli.json {
        println!("{}", checker.report().to_json()?);
    } else {
        for error in &errors {
            eprintln!("Error: {}", error);
        }
        if fatal {
            return Ok(EXIT_INITIALIZATION);
        }
        print_text(&mut checker, cli.verbose);
    }

    if !errors.is_empty() {
        Ok(EXIT_INITIALIZATION)
    } else if checker.assembly_warnings() {
        Ok(EXIT_WARNINGS)
    } else {
        Ok(0)
    }
}

#[cfg(feature = "cli")]
fn print_text(checker: &mut SchemaAssemblyChecker, verbose: bool) {
    println!("Schema root directory: {}", checker.schema_root_directory());

    let catalog_results = checker.catalog_validation_results();
    if !catalog_results.is_empty() {
        println!();
        println!("Catalog:");
        for result in &catalog_results {
            println!("  - {}", result);
        }
    }

    if verbose {
        println!();
        println!("Assembly log:");
        for line in checker.assembly_log_messages() {
            println!("{}", line);
        }
    }

    println!();
    let warnings = checker.assembly_warning_messages();
    if warnings.is_empty() {
        println!("No assembly warnings");
    } else {
        println!("Assembly warnings:");
        for line in &warnings {
            println!("{}", line);
        }
    }

    let mut namespaces = checker.namespaces().into_iter().peekable();
    if namespaces.peek().is_some() {
        println!();
        println!("Namespaces:");
        for ns in namespaces {
            let version = checker.namespace_version(&ns);
            if version.is_empty() {
                println!("  {}", ns);
            } else {
                println!("  {} ({})", ns, version);
            }
        }
    }

    println!();
    println!("Assembled {} schema documents", checker.assembled_schema_documents().len());
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
