pub mod toml_config;

pub use toml_config::PlannerConfig;

#[cfg(feature = "cli")]
use crate::domain::model::Term;
#[cfg(feature = "cli")]
use crate::domain::plan::{CreditLoad, GenerationRequest};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "course-planner")]
#[command(about = "Prerequisite checks, requirement progress and multi-semester course plans")]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// JSON catalog file (overrides catalog.path)
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check whether a course's prerequisites are met
    Check {
        course: String,
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
    },
    /// Print the prerequisite tree below a course
    Tree {
        course: String,
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Report requirement progress for a program
    Validate {
        program: String,
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
    },
    /// Rank the courses a student can take next
    Next {
        program: String,
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
    },
    /// Generate a multi-semester plan through the configured proposer
    Generate {
        program: String,
        #[arg(long)]
        starting_year: i32,
        #[arg(long, default_value = "FALL")]
        starting_term: Term,
        #[arg(long, default_value = "STANDARD")]
        credit_load: CreditLoad,
        #[arg(long, default_value = "4")]
        max_years: u32,
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
        /// Also write plan.json, plan.csv and plan.tsv into this directory
        #[arg(long)]
        output: Option<String>,
    },
}

#[cfg(feature = "cli")]
impl Command {
    /// Builds the generation request for the `generate` subcommand.
    pub fn generation_request(&self) -> Option<GenerationRequest> {
        match self {
            Command::Generate {
                program,
                starting_year,
                starting_term,
                credit_load,
                max_years,
                completed,
                ..
            } => {
                let mut request =
                    GenerationRequest::new(program.clone(), *starting_year).with_completed(completed);
                request.starting_term = *starting_term;
                request.credit_load = *credit_load;
                request.max_years = *max_years;
                Some(request)
            }
            _ => None,
        }
    }
}
