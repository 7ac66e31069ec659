//! bped - Blueprint project editor
//!
//! Loads a project, regenerates every Blueprint and reports the results log.
//! Edit commands apply one change through the editor and save what changed.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use blueprint_cli::commands::{StdinPrompt, parse_pin_type};
use blueprint_cli::project::ProjectLoader;
use blueprint_cli::session::Session;
use blueprint_editor::blueprint_types::{BlueprintStatus, PinType};
use blueprint_editor::{AutoConfirm, ConfirmationPrompt, LogMessage, Severity};

/// Blueprint project editor
#[derive(Parser, Debug)]
#[command(name = "bped")]
#[command(about = "Load, check and edit Blueprint projects", long_about = None)]
struct Args {
    /// Path to the project directory
    #[arg(short, long, default_value = "./project")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Regenerate every Blueprint and print the results log
    Check {
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
        /// Only show messages for Blueprints whose name matches
        #[arg(long)]
        filter: Option<String>,
        /// Hide notes
        #[arg(long)]
        warnings_only: bool,
    },
    /// Rename a member variable and every reference to it
    RenameVar {
        blueprint: String,
        old_name: String,
        new_name: String,
    },
    /// Change the type of a member variable
    RetypeVar {
        blueprint: String,
        variable: String,
        #[arg(value_parser = parse_pin_type)]
        new_type: PinType,
        /// Do not ask before reconstructing referencing nodes
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct BlueprintReport<'a> {
    name: &'a str,
    status: BlueprintStatus,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    project: &'a str,
    blueprints: Vec<BlueprintReport<'a>>,
    errors: usize,
    warnings: usize,
    messages: Vec<&'a LogMessage>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bped=info,blueprint_editor=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("bped v{}", env!("CARGO_PKG_VERSION"));

    let project = ProjectLoader::load(&args.project).await?;
    let prompt: Box<dyn ConfirmationPrompt> = match &args.command {
        Command::RetypeVar { yes: false, .. } => Box::new(StdinPrompt),
        _ => Box::new(AutoConfirm(true)),
    };
    let mut session = Session::open(project, prompt);

    match args.command {
        Command::Check {
            json,
            filter,
            warnings_only,
        } => {
            if let Some(filter) = filter {
                session.filters_mut().set_search_string(filter);
            }
            check(&session, json, warnings_only)?;
            if session.filters().settings().persistent_filters {
                session.save_filters()?;
            }
            if session.editor().results_log().error_count() > 0 {
                bail!("{} errors", session.editor().results_log().error_count());
            }
        }
        Command::RenameVar {
            blueprint,
            old_name,
            new_name,
        } => {
            let id = session.find(&blueprint)?;
            session.editor_mut().rename_member_variable(id, &old_name, &new_name)?;
            let written = session.save_modified().await?;
            println!("Renamed {}.{} to {} ({} assets written)", blueprint, old_name, new_name, written);
        }
        Command::RetypeVar {
            blueprint,
            variable,
            new_type,
            ..
        } => {
            let id = session.find(&blueprint)?;
            session
                .editor_mut()
                .change_member_variable_type(id, &variable, new_type.clone())?;
            let written = session.save_modified().await?;
            println!("Changed {}.{} to {} ({} assets written)", blueprint, variable, new_type, written);
        }
    }

    Ok(())
}

fn check(session: &Session, json: bool, warnings_only: bool) -> Result<()> {
    let editor = session.editor();
    let messages: Vec<&LogMessage> = session
        .visible_messages()
        .into_iter()
        .filter(|m| !warnings_only || m.severity >= Severity::Warning)
        .collect();

    if json {
        let report = CheckReport {
            project: session.project().name(),
            blueprints: editor
                .blueprints()
                .map(|bp| BlueprintReport {
                    name: &bp.name,
                    status: bp.status,
                })
                .collect(),
            errors: editor.results_log().error_count(),
            warnings: editor.results_log().warning_count(),
            messages,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for blueprint in editor.blueprints() {
        println!("{:<32} {:?}", blueprint.name, blueprint.status);
    }
    for message in messages {
        let location = message
            .node
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| message.blueprint.map(|b| b.to_string()))
            .unwrap_or_default();
        println!("[{:?}] {} {}", message.severity, location, message.text);
    }
    println!(
        "{} errors, {} warnings",
        editor.results_log().error_count(),
        editor.results_log().warning_count()
    );
    Ok(())
}
