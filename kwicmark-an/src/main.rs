//! kwicmark-an - annotation engine CLI
//!
//! Operational interface for Kwicmark projects: bulk snippet import and
//! export, agreement and consistency reports, and the disagreement
//! listing, plus the minimal project/user/assignment glue needed to run
//! without a web front end.

use anyhow::Result;
use clap::{Parser, Subcommand};
use kwicmark_common::{config, db::init_database, Decision, Role};
use kwicmark_an::{adjudication, agreement, consistency, transfer};
use kwicmark_an::agreement::{Kappa, ProjectKappa};
use kwicmark_an::cursor::{self, CursorView, Move};
use kwicmark_an::db::{projects, snippets, users};
use kwicmark_an::session::CursorSessions;
use kwicmark_common::Error;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "kwicmark-an", version, about = "Kwicmark annotation engine")]
struct Cli {
    /// Root folder holding the Kwicmark database (overrides
    /// KWICMARK_ROOT and the config file)
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a project
    CreateProject {
        name: String,
        /// Annotation instructions shown to annotators
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Create a user (role: annotator or superannotator)
    CreateUser {
        username: String,
        #[arg(long, default_value = "annotator")]
        role: String,
    },
    /// Assign a user to a project
    Assign {
        username: String,
        #[arg(long)]
        project: i64,
    },
    /// Import snippets from a JSON file of {content, kwic} records
    Import {
        #[arg(long)]
        project: i64,
        file: PathBuf,
    },
    /// Export a project's snippets, annotations, and final decisions
    Export {
        #[arg(long)]
        project: i64,
        file: PathBuf,
    },
    /// Record an annotator's decision for a snippet
    Annotate {
        username: String,
        #[arg(long)]
        project: i64,
        #[arg(long)]
        snippet: i64,
        /// yes or no
        #[arg(long)]
        decision: String,
    },
    /// Record a superannotator's final decision for a snippet
    Resolve {
        username: String,
        #[arg(long)]
        snippet: i64,
        /// yes or no
        #[arg(long)]
        decision: String,
    },
    /// Pairwise and overall Cohen's Kappa for a project
    Kappa {
        #[arg(long)]
        project: i64,
    },
    /// Per-annotator duplicate-content consistency ratios
    Consistency {
        #[arg(long)]
        project: i64,
    },
    /// List snippets whose annotators disagree
    Disagreements {
        #[arg(long)]
        project: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Kwicmark annotation engine v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let root = config::resolve_root_folder(cli.root.as_deref());
    let db_path = config::prepare_root_folder(&root)?;
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    match cli.command {
        Command::CreateProject { name, instructions } => {
            let id = projects::create(&pool, &name, instructions.as_deref()).await?;
            println!("Created project {} ({})", id, name);
        }
        Command::CreateUser { username, role } => {
            let role = Role::from_str(&role)?;
            let id = users::create(&pool, &username, role).await?;
            println!("Created {} {} ({})", role.as_str(), id, username);
        }
        Command::Assign { username, project } => {
            let user = users::get_by_username(&pool, &username).await?;
            projects::assign_user(&pool, user.id, project).await?;
            println!("Assigned {} to project {}", username, project);
        }
        Command::Import { project, file } => {
            let count = transfer::import_json(&pool, project, &file).await?;
            println!("Imported {} snippets into project {}", count, project);
        }
        Command::Export { project, file } => {
            let count = transfer::export_json(&pool, project, &file).await?;
            println!("Exported {} snippets to {}", count, file.display());
        }
        Command::Annotate {
            username,
            project,
            snippet,
            decision,
        } => {
            let user = users::get_by_username(&pool, &username).await?;
            let decision = Decision::from_str(&decision)?;
            snippets::get(&pool, project, snippet)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("snippet {} in project {}", snippet, project))
                })?;

            // Drive the cursor so the submit follows the same path the
            // interactive flow does
            let sessions = CursorSessions::new();
            cursor::step(&pool, &sessions, user.id, project, Some(Move::Jump(snippet))).await?;
            let view =
                cursor::step(&pool, &sessions, user.id, project, Some(Move::Submit(decision)))
                    .await?;
            match view {
                CursorView::Snippet(v) => println!(
                    "Recorded {} for snippet {}; next is snippet {} ({}/{} annotated)",
                    decision, snippet, v.snippet.id, v.progress.annotated, v.progress.total
                ),
                CursorView::Exhausted(p) => println!(
                    "Recorded {} for snippet {} ({}/{} annotated)",
                    decision, snippet, p.annotated, p.total
                ),
            }
        }
        Command::Resolve {
            username,
            snippet,
            decision,
        } => {
            let user = users::get_by_username(&pool, &username).await?;
            let decision = Decision::from_str(&decision)?;
            adjudication::resolve_for(&pool, &user, snippet, decision).await?;
            println!("Recorded final decision {} for snippet {}", decision, snippet);
        }
        Command::Kappa { project } => {
            print_kappa(agreement::project_kappa(&pool, project).await?);
        }
        Command::Consistency { project } => {
            for report in consistency::consistency(&pool, project).await? {
                println!(
                    "{} (user {}): {:.2}% consistent ({}/{} in duplicate groups)",
                    report.username,
                    report.user_id,
                    report.ratio() * 100.0,
                    report.consistent,
                    report.total
                );
            }
        }
        Command::Disagreements { project } => {
            let items = adjudication::disagreements(&pool, project).await?;
            for item in &items {
                let decisions: Vec<String> = item
                    .annotations
                    .iter()
                    .map(|(who, decision)| format!("{}={}", who, decision))
                    .collect();
                println!("snippet {}: {}", item.snippet.id, decisions.join(", "));
            }
            println!("{} disagreement(s)", items.len());
        }
    }

    Ok(())
}

fn print_kappa(result: ProjectKappa) {
    match result {
        ProjectKappa::NotEnoughRaters => {
            println!("Not enough annotators for Cohen's Kappa calculation.");
        }
        ProjectKappa::Computed { pairs, mean } => {
            for pair in &pairs {
                let value = match pair.kappa {
                    Kappa::Value(v) => format!("{:.4}", v),
                    Kappa::Undefined(_) => "undefined".to_string(),
                };
                println!(
                    "raters {} x {}: kappa = {} (n = {})",
                    pair.rater_a,
                    pair.rater_b,
                    value,
                    pair.n()
                );
                println!(
                    "            yes/yes={} yes/no={} no/yes={} no/no={}",
                    pair.table.count(Decision::Yes, Decision::Yes),
                    pair.table.count(Decision::Yes, Decision::No),
                    pair.table.count(Decision::No, Decision::Yes),
                    pair.table.count(Decision::No, Decision::No)
                );
            }
            match mean {
                Some(mean) => println!("Overall Cohen's Kappa: {:.4}", mean),
                None => println!("Overall Cohen's Kappa: undefined (no overlapping pairs)"),
            }
        }
    }
}
