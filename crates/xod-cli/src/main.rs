//! `xod` command-line tool
//!
//! - `migrate`: convert a v1 bundle into a project document
//! - `extract`: replace curried input values of an entry patch with constant nodes
//! - `check`: load a project document and run deferred validation

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xod_project::{extract_bound_inputs, ExtractConfig, PatchPath, Project, ProjectError};

fn cli() -> Command {
    Command::new("xod")
        .version(xod_project::VERSION)
        .about("XOD project tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("migrate")
                .about("Convert a v1 bundle into a project document")
                .arg(
                    Arg::new("bundle")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("v1 bundle JSON file"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("extract")
                .about("Turn bound input values of the entry patch into constant nodes")
                .arg(
                    Arg::new("flat")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Flattened project document"),
                )
                .arg(
                    Arg::new("entry")
                        .long("entry")
                        .required(true)
                        .value_parser(value_parser!(PatchPath))
                        .help("Entry-point patch path, e.g. @/main"),
                )
                .arg(
                    Arg::new("library")
                        .long("library")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Project document providing node types and constant patches"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML extraction config"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Load a project document and validate it")
                .arg(
                    Arg::new("project")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Project document"),
                ),
        )
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_parser(value_parser!(PathBuf))
        .help("Write the result here instead of stdout")
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"))?;

    match matches.subcommand() {
        Some(("migrate", args)) => {
            let bundle = required_path(args, "bundle")?;
            let project = migrate(bundle)?;
            write_project(&project, args.get_one::<PathBuf>("output"))
        }
        Some(("extract", args)) => {
            let entry = args
                .get_one::<PatchPath>("entry")
                .context("missing --entry")?;
            let project = extract(
                required_path(args, "flat")?,
                entry,
                required_path(args, "library")?,
                args.get_one::<PathBuf>("config"),
            )?;
            write_project(&project, args.get_one::<PathBuf>("output"))
        }
        Some(("check", args)) => {
            let report = check(required_path(args, "project")?)?;
            println!("Patches: {}", report.patches);
            println!("Nodes:   {}", report.nodes);
            println!("Links:   {}", report.links);
            if report.problems.is_empty() {
                println!("Status:  OK");
                Ok(())
            } else {
                println!("Problems:");
                for problem in &report.problems {
                    println!("  - {problem}");
                }
                std::process::exit(1);
            }
        }
        _ => unreachable!("subcommand_required is set"),
    }
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing <{name}>"))
}

fn read_project(path: &Path) -> Result<Project> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let project = serde_json::from_str(&source)
        .with_context(|| format!("failed to load project {}", path.display()))?;
    Ok(project)
}

fn write_project(project: &Project, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(project)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn migrate(bundle: &Path) -> Result<Project> {
    let source = std::fs::read_to_string(bundle)
        .with_context(|| format!("failed to read {}", bundle.display()))?;
    xod_project::to_v2_str(&source)
        .with_context(|| format!("failed to migrate {}", bundle.display()))
}

fn extract(
    flat: &Path,
    entry: &PatchPath,
    library: &Path,
    config: Option<&PathBuf>,
) -> Result<Project> {
    let config = match config {
        Some(path) => ExtractConfig::from_file(path)?,
        None => ExtractConfig::default(),
    };
    let flat = read_project(flat)?;
    let library = read_project(library)?;
    extract_bound_inputs(&flat, entry, &library, &config)
        .with_context(|| format!("failed to extract bound inputs of {entry}"))
}

/// Counts and problems found by `check`
#[derive(Debug)]
struct CheckReport {
    patches: usize,
    nodes: usize,
    links: usize,
    problems: Vec<ProjectError>,
}

fn check(path: &Path) -> Result<CheckReport> {
    let project = read_project(path)?;
    let problems = project.validate().err().unwrap_or_default();
    tracing::debug!("Validated {} with {} problems", path.display(), problems.len());
    Ok(CheckReport {
        patches: project.patch_count(),
        nodes: project.list_patches().map(|p| p.node_count()).sum(),
        links: project.list_patches().map(|p| p.link_count()).sum(),
        problems,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use xod_test_utils::{flat_project, legacy_bundle, path, standard_library};

    fn write_json(value: &impl serde::Serialize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer(&mut file, value).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn parses_extract_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "xod", "extract", "flat.json", "--entry", "@/main", "--library", "lib.json", "-v",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "extract");
        assert_eq!(args.get_one::<PatchPath>("entry"), Some(&path("@/main")));
        assert!(args.get_flag("verbose"));
    }

    #[test]
    fn rejects_invalid_entry_path() {
        let result = cli().try_get_matches_from([
            "xod", "extract", "flat.json", "--entry", "bad path", "--library", "lib.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn migrate_reads_bundle_file() {
        let bundle = write_json(&legacy_bundle());
        let project = migrate(bundle.path()).unwrap();
        assert_eq!(project.patch_count(), 4);
    }

    #[test]
    fn extract_reads_documents_and_config() {
        let flat = write_json(&flat_project());
        let library = write_json(&standard_library());
        let mut config = tempfile::NamedTempFile::new().unwrap();
        writeln!(config, "placeholder = {{ x = 1.0, y = 2.0 }}").unwrap();
        let config_path = config.path().to_path_buf();

        let project = extract(flat.path(), &path("@/main"), library.path(), Some(&config_path)).unwrap();
        let main = project.patch(&path("@/main")).unwrap();
        assert_eq!(main.link_count(), 7);
    }

    #[test]
    fn check_reports_counts_and_problems() {
        let good = write_json(&flat_project());
        let report = check(good.path()).unwrap();
        assert_eq!(report.patches, 7);
        assert_eq!(report.nodes, 5);
        assert_eq!(report.links, 2);
        // constant definitions are not part of the flat project
        assert!(report.problems.is_empty());

        let missing = check(Path::new("/definitely/not/here.json"));
        assert!(missing.is_err());
    }
}
