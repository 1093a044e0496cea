use anyhow::Context;
use clap::Parser;
use course_planner::core::export::export_plan;
use course_planner::utils::error::ErrorSeverity;
use course_planner::utils::{logger, validation::Validate};
use course_planner::{
    CliConfig, Command, HttpPlanProposer, InMemoryCatalog, InMemoryPlanCache, LocalStorage,
    PlannerConfig, PlannerEngine, PlannerError,
};
use serde::Serialize;
use std::sync::Arc;

type Engine = PlannerEngine<InMemoryCatalog, HttpPlanProposer, InMemoryPlanCache>;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(cli).await {
        let exit_code = match e.downcast_ref::<PlannerError>() {
            Some(err) => {
                tracing::error!(
                    "❌ {} (Category: {:?}, Severity: {:?})",
                    err,
                    err.category(),
                    err.severity()
                );
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 Suggestion: {}", err.recovery_suggestion());

                // 根據錯誤嚴重程度決定退出碼
                match err.severity() {
                    ErrorSeverity::Low => 0,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                }
            }
            None => {
                eprintln!("❌ {:#}", e);
                1
            }
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => PlannerConfig::default(),
    };
    config.validate()?;

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog.path.clone())
        .ok_or_else(|| PlannerError::MissingConfigError {
            field: "catalog.path".to_string(),
        })?;
    let catalog = InMemoryCatalog::load(&LocalStorage::new("."), &catalog_path).await?;

    let cache = InMemoryPlanCache::new()
        .with_ttl_seconds(config.cache.ttl_seconds)
        .with_max_entries(config.cache.max_entries);
    let engine: Engine = PlannerEngine::new(
        Arc::new(catalog),
        Arc::new(HttpPlanProposer::new(config.proposer_settings())),
        Arc::new(cache),
    )
    .with_settings(config.generation_settings());

    execute(&engine, &cli.command).await
}

async fn execute(engine: &Engine, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Check { course, completed } => {
            print_json(&engine.check_prerequisites(course, completed)?)
        }
        Command::Tree { course, depth } => print_json(&engine.prerequisite_tree(course, *depth)?),
        Command::Validate { program, completed } => {
            print_json(&engine.validate_requirements(program, completed)?)
        }
        Command::Next { program, completed } => {
            print_json(&engine.next_available_courses(program, completed)?)
        }
        Command::Generate { output, .. } => {
            let request = command
                .generation_request()
                .context("generate command without a request")?;
            let plan = engine.generate_plan(&request).await?;

            if !plan.is_valid {
                tracing::warn!(
                    "Plan for {} is best effort, see warnings",
                    plan.program_code
                );
            }

            if let Some(dir) = output {
                let storage = LocalStorage::new(dir.as_str());
                let written = export_plan(&storage, &plan).await?;
                tracing::info!("📁 Wrote {} to {}", written.join(", "), dir);
            }

            print_json(&plan)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
