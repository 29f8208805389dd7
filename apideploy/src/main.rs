mod logging;

use std::{
    io::IsTerminal as _,
    path::{Path, PathBuf},
    process::exit,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use apideploy::{
    deploy_changes_concurrently, deploy_changes_until, interrupt::set_up_process_interrupt_handler,
    order_by_dependencies, DeployResult, StandardDeployer,
};
use apideploy_client::ReqwestClient;
use apideploy_core::{ActionKind, Change, ElemId};
use apideploy_request::{build_request, DeployConfig, DeploymentRequestsByAction, HttpRequest};
use clap::{ColorChoice, CommandFactory as _, Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::info;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    let _logger = logging::set_up(logging::Options {
        verbose: args.options.verbose,
        color: use_color(args.options.color),
    })?;
    match &args.command {
        Commands::Deploy(subargs) => deploy(subargs),
        Commands::Plan(subargs) => plan(subargs),
        Commands::CheckConfig { config } => check_config(config),
        Commands::GenerateMan => (|| {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        })(),
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(*shell, &mut cmd, "apideploy", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn use_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    }
}

/// Create the single-threaded tokio runtime used by the CLI.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize tokio runtime")
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("apideploy error: {:?}", e);
            exit(1);
        }
    }
}

fn load_config(path: &Path) -> Result<DeployConfig> {
    DeployConfig::load(path)
        .with_context(|| format!("while loading deploy configuration {}", path.display()))
}

fn load_changes(path: &Path) -> Result<Vec<Change>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("while reading changes from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("while parsing changes from {}", path.display()))
}

fn parse_headers(pairs: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for pair in pairs.chunks(2) {
        let [name, value] = pair else {
            bail!("--header takes a name and a value");
        };
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name {:?}", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("invalid value for header {}", name))?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn deploy(args: &DeployArgs) -> Result<()> {
    let config = Arc::new(load_config(&args.config)?);
    let changes = load_changes(&args.changes)?;
    let headers = parse_headers(&args.header)?;
    let client = Arc::new(ReqwestClient::new(&args.base_url, headers));
    let deployer = StandardDeployer::new(client, config);
    let interrupt_state = set_up_process_interrupt_handler()?;

    info!("deploying {} changes to {}", changes.len(), args.base_url);
    let result: DeployResult = runtime()?.block_on(async {
        match args.concurrency {
            Some(limit) => {
                deploy_changes_concurrently(changes, &deployer, limit, &interrupt_state).await
            }
            None => deploy_changes_until(changes, &deployer, &interrupt_state).await,
        }
    });

    print_json(&result)?;
    if !result.is_success() {
        bail!(
            "{} of {} changes failed",
            result.errors.len(),
            result.errors.len() + result.applied_changes.len()
        );
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannedChange {
    elem_id: ElemId,
    action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<HttpRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn plan(args: &PlanArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let changes = load_changes(&args.changes)?;
    let unconfigured = DeploymentRequestsByAction::default();
    let planned: Vec<PlannedChange> = order_by_dependencies(changes)
        .iter()
        .map(|change| {
            let requests = config
                .requests_for(change.data().type_name())
                .unwrap_or(&unconfigured);
            let (request, error) = match build_request(change, requests, None) {
                Ok(request) => (Some(request), None),
                Err(e) => (None, Some(e.to_string())),
            };
            PlannedChange {
                elem_id: change.elem_id().clone(),
                action: change.action(),
                request,
                error,
            }
        })
        .collect();
    print_json(&planned)
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    for (type_name, type_config) in &config.types {
        let requests = &type_config.deploy_requests;
        let actions: Vec<&str> = [ActionKind::Add, ActionKind::Modify, ActionKind::Remove]
            .into_iter()
            .filter(|action| requests.get(*action).is_some())
            .map(|action| action.as_str())
            .collect();
        println!("{}: {}", type_name, actions.join(", "));
    }
    Ok(())
}

/// apideploy: deploy changes to REST APIs from declarative endpoint definitions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Parser, Debug)]
struct DeployArgs {
    /// The deploy configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// The changes to deploy (a JSON array)
    #[arg(long)]
    changes: PathBuf,

    /// The URL that endpoint paths are relative to
    #[arg(long)]
    base_url: String,

    /// A header to send with every request, e.g. `--header Authorization "Basic ..."`
    #[arg(long, num_args = 2, value_names = &["NAME", "VALUE"])]
    header: Vec<String>,

    /// Send up to N independent changes at once, without ordering them
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// The deploy configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// The changes to plan (a JSON array)
    #[arg(long)]
    changes: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send the changes to the service and print the outcome
    #[command()]
    Deploy(DeployArgs),

    /// Print the requests that `deploy` would send, without sending them
    #[command()]
    Plan(PlanArgs),

    /// Validate a deploy configuration and list the configured actions per type
    CheckConfig {
        /// The deploy configuration (JSON)
        #[arg(long)]
        config: PathBuf,
    },

    /// Generate markdown documentation for apideploy
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for apideploy
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for apideploy
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_header_pairs() {
        let args = Args::try_parse_from([
            "apideploy",
            "deploy",
            "--config",
            "config.json",
            "--changes",
            "changes.json",
            "--base-url",
            "https://example.atlassian.net",
            "--header",
            "Authorization",
            "Basic dXNlcjp0b2tlbg==",
            "--header",
            "X-Atlassian-Token",
            "no-check",
        ])
        .unwrap();
        let Commands::Deploy(deploy_args) = args.command else {
            panic!("expected deploy");
        };
        let headers = parse_headers(&deploy_args.header).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-atlassian-token"], "no-check");
        assert!(parse_headers(&["bad name".to_string(), "v".to_string()]).is_err());
    }

    #[test]
    fn loads_changes_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{ "action": "remove", "before": {{ "elemId": "jira.Field.instance.f", "value": {{ "id": "customfield_1" }} }} }}]"#
        )
        .unwrap();
        let changes = load_changes(file.path()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), ActionKind::Remove);
        assert_eq!(changes[0].elem_id().name, "f");
    }
}
