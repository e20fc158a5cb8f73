use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use scrapeflow::config::{get_config_path, AppConfig, ConfigOverrides};
use scrapeflow::export::{build_envelope, ContractCompiler, ContractVersion};
use scrapeflow::logging::{init_logging, LogContext};
use scrapeflow::utils::{is_blank, truncate_string};
use scrapeflow::workflow::generator::WorkflowGenerator;
use scrapeflow::workflow::parser::{DocumentFormat, WorkflowParser};
use scrapeflow::workflow::tree::{count_scopes, max_depth};
use scrapeflow::workflow::{ScopeModule, ScrapingWorkflow};

const OUTLINE_SELECTOR_WIDTH: usize = 60;

#[derive(Parser)]
#[command(name = "scrapeflow")]
#[command(about = "Validate and compile scraping workflows into worker contracts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(short, long, help = "Configuration file path")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a workflow document against the structural rules
    Validate {
        #[arg(help = "Path to a JSON or YAML workflow")]
        file: PathBuf,
    },

    /// Compile a workflow into a worker contract
    Compile {
        #[arg(help = "Path to a JSON or YAML workflow")]
        file: PathBuf,

        #[arg(long, help = "Contract shape: flat or nested")]
        contract: Option<String>,

        #[arg(short, long, help = "Output file path (stdout when omitted)")]
        output: Option<PathBuf>,

        #[arg(long, help = "Wrap the contract in a submission envelope")]
        envelope: bool,

        #[arg(long, requires = "envelope", help = "Source id recorded in the envelope")]
        source_id: Option<String>,
    },

    /// Write a starter workflow
    Init {
        #[arg(long, help = "Name of the URL type to create [default: Detail, or Documents with --documents]")]
        url_type: Option<String>,

        #[arg(long, help = "Start from the document harvesting template")]
        documents: bool,

        #[arg(short, long, help = "Output file path, .json or .yaml (stdout YAML when omitted)")]
        output: Option<PathBuf>,
    },

    /// Print the scope tree of every phase
    Outline {
        #[arg(help = "Path to a JSON or YAML workflow")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(config_path) => AppConfig::load_from_file(config_path).await?,
        None => AppConfig::load().await?,
    };
    let ignored_overrides = ConfigOverrides::apply(&mut config);
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging)?;

    let context = LogContext::new("main", "startup").with_string_field("version", env!("CARGO_PKG_VERSION"));
    scrapeflow::log_info!(context, "ScrapeFlow CLI starting up");

    for message in &ignored_overrides {
        warn!("{}", message);
    }
    match &cli.config {
        Some(config_path) => info!("Configuration loaded from {}", config_path.display()),
        None => match AppConfig::write_defaults_if_missing().await {
            Ok(Some(path)) => info!("Default configuration written to {}", path.display()),
            Ok(None) => debug!("Configuration loaded from {}", get_config_path().display()),
            Err(e) => warn!("Could not write default configuration: {:#}", e),
        },
    }

    match cli.command {
        Commands::Validate { file } => validate_workflow(&file).await,
        Commands::Compile {
            file,
            contract,
            output,
            envelope,
            source_id,
        } => compile_workflow(&config, &file, contract, output, envelope, source_id).await,
        Commands::Init {
            url_type,
            documents,
            output,
        } => init_workflow(&config, url_type, documents, output).await,
        Commands::Outline { file } => outline_workflow(&file).await,
    }
}

async fn load_workflow(file: &Path) -> Result<ScrapingWorkflow> {
    WorkflowParser::load_file(file)
        .await
        .with_context(|| format!("Failed to load workflow {}", file.display()))
}

fn workflow_name(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow".to_string())
}

async fn validate_workflow(file: &Path) -> Result<()> {
    let workflow = load_workflow(file).await?;
    let report = workflow.validate();

    match report.error {
        Some(error) => {
            let context = LogContext::new("cli", "validate")
                .with_workflow(workflow_name(file))
                .with_error_category("validation");
            scrapeflow::log_error!(context, error, "Workflow validation failed");
            Err(anyhow::anyhow!("{}: {}", file.display(), error))
        }
        None => {
            println!("✓ {} is valid", file.display());
            for warning in &report.warnings {
                println!("  warning: {}", warning);
            }
            Ok(())
        }
    }
}

async fn compile_workflow(
    config: &AppConfig,
    file: &Path,
    contract: Option<String>,
    output: Option<PathBuf>,
    envelope: bool,
    source_id: Option<String>,
) -> Result<()> {
    let version = contract
        .map(|value| value.parse::<ContractVersion>())
        .transpose()?;

    let workflow = load_workflow(file).await?;
    let compiler = ContractCompiler::new(&config.compiler);
    let (compiled, warnings) = compiler.compile_validated(&workflow, version)?;
    let name = workflow_name(file);
    for warning in &warnings {
        let context = LogContext::new("cli", "compile")
            .with_workflow(name.as_str())
            .with_string_field("warning", warning.as_str());
        scrapeflow::log_warn!(context, "Workflow compiled with a warning");
    }

    let rendered_bytes = if envelope {
        let source_id = source_id.unwrap_or_else(|| name.clone());
        let payload = build_envelope(source_id, name.as_str(), &workflow, &compiled)?;
        emit(&compiler, &payload, output.as_deref()).await?
    } else {
        emit(&compiler, &compiled, output.as_deref()).await?
    };

    info!(
        "Compiled {} into a {} contract ({} bytes)",
        file.display(),
        compiled.version(),
        rendered_bytes
    );
    Ok(())
}

async fn emit<T: serde::Serialize>(compiler: &ContractCompiler, payload: &T, output: Option<&Path>) -> Result<u64> {
    match output {
        Some(path) => {
            let bytes = compiler.write(payload, path).await?;
            println!("Contract written to: {}", path.display());
            Ok(bytes)
        }
        None => {
            let rendered = compiler.render(payload)?;
            println!("{}", rendered);
            Ok(rendered.len() as u64)
        }
    }
}

async fn init_workflow(
    config: &AppConfig,
    url_type: Option<String>,
    documents: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut ids = config.editor.id_strategy.generator();
    let max_pages = config.editor.default_max_pages;

    let workflow = if documents {
        let name = url_type.as_deref().unwrap_or("Documents");
        WorkflowGenerator::generate_document_harvest(ids.as_mut(), name, max_pages)
    } else {
        let name = url_type.as_deref().unwrap_or("Detail");
        WorkflowGenerator::generate_basic(ids.as_mut(), name, max_pages)
    };

    let report = workflow.validate();
    if let Some(error) = &report.error {
        info!("Starter workflow still needs selectors: {}", error);
    }

    match output {
        Some(path) => {
            WorkflowParser::save_file(&workflow, &path).await?;
            println!("Starter workflow written to: {}", path.display());
        }
        None => println!("{}", WorkflowParser::render(&workflow, DocumentFormat::Yaml)?),
    }
    Ok(())
}

async fn outline_workflow(file: &Path) -> Result<()> {
    let workflow = load_workflow(file).await?;

    println!(
        "{} (playwright: {})",
        workflow_name(file),
        if workflow.playwright_enabled { "on" } else { "off" }
    );

    for (kind, phase) in workflow.phases() {
        println!(
            "\n{}: {} before action(s), {} scope(s), depth {}",
            kind,
            phase.before.len(),
            count_scopes(&phase.chain),
            max_depth(&phase.chain)
        );
        for action in &phase.before {
            println!("  > {}", action.type_name());
        }
        print_scopes(&phase.chain, 1);
    }
    Ok(())
}

fn print_scopes(forest: &[ScopeModule], depth: usize) {
    let indent = "  ".repeat(depth);
    for scope in forest {
        let label = if is_blank(&scope.label) { &scope.id } else { &scope.label };
        let selector = if scope.css_selector.is_empty() {
            "<no selector>".to_string()
        } else {
            truncate_string(&scope.css_selector, OUTLINE_SELECTOR_WIDTH)
        };
        println!("{}- {} [{}]", indent, label, selector);

        if let Some(repeater) = &scope.repeater {
            let steps: Vec<&str> = repeater.steps.iter().map(|step| step.kind.type_name()).collect();
            println!(
                "{}    repeater [{}]: {} step(s) {}",
                indent,
                truncate_string(&repeater.css_selector, OUTLINE_SELECTOR_WIDTH),
                steps.len(),
                steps.join(", ")
            );
        }
        if let Some(pagination) = &scope.pagination {
            println!(
                "{}    pagination [{}] up to {} page(s)",
                indent, pagination.css_selector, pagination.max_pages
            );
        }

        print_scopes(&scope.children, depth + 1);
    }
}
