use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use histree::{BranchId, BranchSwitchMode};
use tracing_subscriber::EnvFilter;
use web_time::SystemTime;

use crate::config::BoardConfig;
use crate::error::{BoardError, Result};
use crate::geometry::Vector;
use crate::session::Session;
use crate::timeline::{render_branch_list, render_timeline};

#[derive(Debug, Parser)]
#[command(
    name = "histree-board",
    about = "Card board with branching undo/redo history",
    version
)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a scripted editing session and print the resulting history.
    Demo,

    /// Print the effective configuration as TOML.
    #[command(name = "show-config")]
    ShowConfig,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => BoardConfig::from_toml_file(path)?,
        None => BoardConfig::default(),
    };
    let mut stdout = std::io::stdout().lock();
    match cli.command.unwrap_or(Commands::Demo) {
        Commands::Demo => {
            init_logging(&config.log_filter)?;
            run_demo(&config, &mut stdout)
        }
        Commands::ShowConfig => {
            write!(stdout, "{}", toml::to_string(&config)?)?;
            Ok(())
        }
    }
}

/// Install a stderr subscriber. `RUST_LOG` overrides the configured filter.
/// A subscriber installed earlier by the host process is left in place.
fn init_logging(filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter).map_err(|err| BoardError::Logging {
            message: err.to_string(),
        })?,
    };
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!(target: "histree.board", "global subscriber already installed");
    }
    Ok(())
}

/// Two cards, a move that gets undone and replaced by a recolor (forking a
/// second branch), then a tour across both branches.
pub fn run_demo(config: &BoardConfig, out: &mut impl Write) -> Result<()> {
    let mut session = Session::new(config)?;
    let plan = session.add_card(Vector::new(60.0, 45.0), "Plan")?;
    let build = session.add_card(Vector::new(260.0, 45.0), "Build")?;
    session.move_cards(&[plan, build], Vector::new(10.0, 10.0))?;
    session.undo()?;
    session.update_color(&[plan], "#ffcc00")?;
    session.update_text(build, "Build the history engine")?;

    session.switch_to_branch(BranchId::new(0), BranchSwitchMode::HeadOfBranch)?;
    session.time_travel(0, None)?;
    session.switch_to_branch(BranchId::new(1), BranchSwitchMode::LastCommonAction)?;
    session.redo()?;
    tracing::info!(
        target: "histree.board",
        position = %session.engine().history().position(),
        cards = session.board().cards.len(),
        "demo finished"
    );

    let now = SystemTime::now();
    let history = session.engine().history();
    writeln!(out, "Cards")?;
    for card in &session.board().cards {
        writeln!(
            out,
            "  {} at {} {} '{}'",
            card.id, card.location, card.color, card.text
        )?;
    }
    writeln!(out, "\nActions on {}", history.current_branch().custom().name)?;
    write!(
        out,
        "{}",
        render_timeline(session.engine(), history.current_branch_id(), now)?
    )?;
    writeln!(out, "\nBranches")?;
    write!(out, "{}", render_branch_list(history, now)?)?;
    Ok(())
}
