use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use relay_repo::discovery::all_heads;
use relay_repo::{HeadRecord, RepoRegistry, Repository};
use relay_server::{RelayServer, ServerConfig};
use relay_store::history;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Init(args) => cmd_init(args, format),
        Command::Heads(args) => cmd_heads(args, format),
        Command::Branches(args) => cmd_branches(args, format),
        Command::Log(args) => cmd_log(args, format),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn serve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = &args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    if let Some(root) = &args.root {
        config.repos_root = root.clone();
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(&args)?;
    tracing::debug!(?config, "effective configuration");
    println!(
        "{} Relay on {} (root: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.repos_root.display()
    );
    let server = RelayServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_init(args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => args
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .context("cannot derive a repository name from the path; pass --name")?,
    };
    let repo = Repository::init(&name, &args.path, &args.branch)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({"repo": repo.name(), "path": args.path, "branch": args.branch})
        ),
        OutputFormat::Text => {
            println!(
                "{} Initialized repository {} in {}",
                "✓".green().bold(),
                repo.name().bold(),
                args.path.display()
            );
            println!("  Branch: {} (unborn)", args.branch.yellow());
        }
    }
    Ok(())
}

fn scan(args: &RootArgs) -> anyhow::Result<RepoRegistry> {
    RepoRegistry::scan(&args.root, &args.default_repo)
        .with_context(|| format!("scanning {}", args.root.display()))
}

fn head_label(head: Option<&relay_types::ObjectId>) -> String {
    match head {
        Some(id) => id.short_hex(),
        None => "(unborn)".to_string(),
    }
}

fn collect_heads(args: &RootArgs) -> anyhow::Result<Vec<HeadRecord>> {
    Ok(all_heads(&scan(args)?)?)
}

fn cmd_heads(args: RootArgs, format: OutputFormat) -> anyhow::Result<()> {
    let heads = collect_heads(&args)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&heads)?),
        OutputFormat::Text => {
            if heads.is_empty() {
                println!("No repositories.");
            }
            for record in &heads {
                println!(
                    "{}  {}/{}",
                    head_label(record.head.as_ref()).yellow(),
                    record.repo.bold(),
                    record.branch.green()
                );
            }
        }
    }
    Ok(())
}

fn pick_repo(
    registry: &RepoRegistry,
    args: &RootArgs,
    repo: Option<&str>,
) -> anyhow::Result<std::sync::Arc<Repository>> {
    let name = repo.unwrap_or(&args.default_repo);
    Ok(registry.get(name)?)
}

fn cmd_branches(args: BranchesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let registry = scan(&args.root)?;
    let repo = pick_repo(&registry, &args.root, args.repo.as_deref())?;
    let branches = repo.branches()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&branches)?),
        OutputFormat::Text => {
            for branch in &branches {
                println!(
                    "  {}  {}",
                    branch.name.green().bold(),
                    head_label(branch.head.as_ref()).dimmed()
                );
            }
        }
    }
    Ok(())
}

fn cmd_log(args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let registry = scan(&args.root)?;
    let repo = pick_repo(&registry, &args.root, args.repo.as_deref())?;
    let entries = match repo.head(&args.branch)? {
        Some(head) => history(repo.objects(), &head, args.limit)?,
        None => Vec::new(),
    };

    if format == OutputFormat::Json {
        let items: Vec<_> = entries
            .iter()
            .map(|(id, c)| {
                json!({
                    "commit": id,
                    "parent": c.parent,
                    "tree": c.tree,
                    "timestamp": c.timestamp().to_rfc3339(),
                    "message": c.message,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Branch {} has no commits.", args.branch.yellow());
    }
    for (id, commit) in &entries {
        if args.oneline {
            println!("{} {}", id.short_hex().yellow(), commit.message);
        } else {
            println!("{}  ({})", id.to_hex().yellow().bold(), args.branch.green());
            println!("  Date: {}", commit.timestamp().to_rfc3339().dimmed());
            println!("  {}", commit.message);
        }
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
