mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use siteplan_core::analyzer::critical_path::{analyze_network, CpmSchedule};
use siteplan_core::config::{load_config, PlannerConfig};
use siteplan_core::input::{load_project, ProjectInput};
use siteplan_core::network::export;
use siteplan_core::optimizer::crashing::crashing_actions;
use siteplan_core::optimizer::fast_track::fast_tracking_actions;
use siteplan_core::optimizer::risk_rules::KeywordRiskRules;
use siteplan_core::resources::{LevelingStrategy, ResourceLeveler};
use siteplan_core::whatif::{parse_change, WhatIfScenario, WhatIfSimulator};
use siteplan_core::{ActivityNetwork, Objective, ScheduleOptimizer, ValidationError};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "siteplan",
    version,
    about = "siteplan: construction schedule analysis and optimization",
    long_about = "Analyze a construction programme with the critical path method, level resources,\nfind fast-track and crash opportunities, and compare what-if scenarios."
)]
struct Cli {
    /// Planner tuning file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Print planner diagnostics to stderr (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Critical path, floats and near-critical groups
    Cpm {
        /// Project file (YAML or JSON)
        path: PathBuf,
    },

    /// Generate alternative schedules and pick the best one for the objective
    Optimize {
        path: PathBuf,

        /// Weight for minimizing duration (overrides the project objective)
        #[arg(long)]
        time: Option<f64>,

        /// Weight for minimizing cost
        #[arg(long)]
        cost: Option<f64>,

        /// Weight for maximizing quality
        #[arg(long)]
        quality: Option<f64>,

        /// Weight for balancing resource demand
        #[arg(long)]
        resources: Option<f64>,
    },

    /// Level resource demand against available capacity
    Level {
        path: PathBuf,

        /// Leveling strategy (smoothing, resource-limited, auto)
        #[arg(short, long, default_value = "auto")]
        strategy: String,
    },

    /// List activity pairs that could be overlapped
    FastTrack {
        path: PathBuf,
    },

    /// Crash options for critical activities
    Crash {
        path: PathBuf,

        /// Days the project should be shortened by
        #[arg(short, long)]
        target: i64,
    },

    /// Run the project's what-if scenarios, or an ad hoc one
    Whatif {
        path: PathBuf,

        /// Ad hoc change, e.g. "duration frame +3" (repeatable)
        #[arg(long = "change")]
        changes: Vec<String>,

        /// Name for the ad hoc scenario
        #[arg(long, default_value = "Ad hoc")]
        name: String,
    },

    /// Export the network as a Mermaid Gantt chart or Graphviz DOT
    Export {
        path: PathBuf,

        /// Export format (mermaid, dot)
        #[arg(long = "as", default_value = "mermaid")]
        kind: String,

        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = planner_config(cli.config.as_deref(), cli.verbose)?;
    let format = cli.format.as_str();

    match cli.command {
        Commands::Cpm { path } => cmd_cpm(&path, &config, format),
        Commands::Optimize { path, time, cost, quality, resources } => {
            let weights = [time, cost, quality, resources];
            cmd_optimize(&path, config, weights, format)
        }
        Commands::Level { path, strategy } => cmd_level(&path, &config, &strategy, format),
        Commands::FastTrack { path } => cmd_fast_track(&path, &config, format),
        Commands::Crash { path, target } => cmd_crash(&path, &config, target, format),
        Commands::Whatif { path, changes, name } => cmd_whatif(&path, config, &changes, &name, format),
        Commands::Export { path, kind, output } => cmd_export(&path, &config, &kind, output.as_deref()),
    }
}

fn planner_config(path: Option<&Path>, verbose: u8) -> Result<PlannerConfig> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None if Path::new("siteplan.toml").is_file() => load_config(Path::new("siteplan.toml"))?,
        None => PlannerConfig::default(),
    };
    config.verbosity = config.verbosity.max(verbose);
    Ok(config)
}

fn load(path: &Path) -> Result<(ProjectInput, ActivityNetwork)> {
    let project = load_project(path)?;
    let network = ActivityNetwork::build(&project.activities)
        .with_context(|| format!("Invalid activity network in {}", path.display()))?;
    Ok((project, network))
}

fn project_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_cpm(path: &Path, config: &PlannerConfig, format: &str) -> Result<()> {
    let (_, network) = load(path)?;
    let analysis = analyze_network(&network, config);

    match format {
        "json" => print_json(&analysis),
        _ => {
            display::print_critical_path(&project_title(path), &analysis);
            Ok(())
        }
    }
}

fn cmd_optimize(path: &Path, config: PlannerConfig, weights: [Option<f64>; 4], format: &str) -> Result<()> {
    let project = load_project(path)?;
    let constraints = project.constraints.clone().with_context(|| {
        format!(
            "'{}' has no constraints section. Optimize needs maxProjectDuration and maxBudget.",
            path.display()
        )
    })?;

    let base = project.objective.unwrap_or_else(Objective::balanced);
    let [time, cost, quality, resources] = weights;
    let objective = Objective::new(
        time.unwrap_or(base.minimize_time),
        cost.unwrap_or(base.minimize_cost),
        quality.unwrap_or(base.maximize_quality),
        resources.unwrap_or(base.balance_resources),
    );

    let result = ScheduleOptimizer::new(&project.activities, constraints, config)?.optimize(&objective)?;

    match format {
        "json" => print_json(&result),
        _ => {
            display::print_optimization(&project_title(path), &result);
            Ok(())
        }
    }
}

fn parse_strategy(name: &str) -> Result<LevelingStrategy> {
    match name {
        "smoothing" => Ok(LevelingStrategy::Smoothing),
        "resource-limited" => Ok(LevelingStrategy::ResourceLimited),
        "auto" => Ok(LevelingStrategy::Auto),
        other => anyhow::bail!(
            "Unknown leveling strategy '{}'. Available: smoothing, resource-limited, auto",
            other
        ),
    }
}

fn cmd_level(path: &Path, config: &PlannerConfig, strategy: &str, format: &str) -> Result<()> {
    let strategy = parse_strategy(strategy)?;
    let (project, network) = load(path)?;
    let resources = project.all_resources();
    let calendar = project
        .constraints
        .as_ref()
        .and_then(|c| c.working_calendar.as_ref());

    let result = ResourceLeveler::new(&network, &resources, config)
        .with_calendar(calendar)
        .level(strategy);

    match format {
        "json" => print_json(&result),
        _ => {
            display::print_leveling(&project_title(path), &result);
            Ok(())
        }
    }
}

fn cmd_fast_track(path: &Path, config: &PlannerConfig, format: &str) -> Result<()> {
    let (_, network) = load(path)?;
    let rules = KeywordRiskRules::from_config(config)?;
    let actions = fast_tracking_actions(&network, &rules, config);

    match format {
        "json" => print_json(&actions),
        _ => {
            display::print_actions("Fast-Tracking Opportunities", &project_title(path), &actions);
            Ok(())
        }
    }
}

fn cmd_crash(path: &Path, config: &PlannerConfig, target: i64, format: &str) -> Result<()> {
    if target <= 0 {
        return Err(ValidationError::InvalidCrashTarget(target).into());
    }
    let (_, network) = load(path)?;
    let cpm = CpmSchedule::planned(&network);
    let actions = crashing_actions(&network, &cpm, target, config);

    match format {
        "json" => print_json(&actions),
        _ => {
            let title = format!("Crash Options (target: {} days)", target);
            display::print_actions(&title, &project_title(path), &actions);
            Ok(())
        }
    }
}

fn cmd_whatif(path: &Path, config: PlannerConfig, changes: &[String], name: &str, format: &str) -> Result<()> {
    let project = load_project(path)?;

    let scenarios = if changes.is_empty() {
        project.scenarios.clone()
    } else {
        let changes = changes
            .iter()
            .map(|c| parse_change(c).with_context(|| format!("Invalid --change '{}'", c)))
            .collect::<Result<Vec<_>>>()?;
        vec![WhatIfScenario {
            name: name.to_string(),
            description: None,
            changes,
        }]
    };

    if scenarios.is_empty() {
        anyhow::bail!(
            "No scenarios in '{}'. Add a scenarios section or pass --change.",
            path.display()
        );
    }

    let resources = project.all_resources();
    let simulator = WhatIfSimulator::new(&project.activities)?
        .with_resources(&resources)
        .with_config(config);
    let results: Vec<_> = scenarios.iter().map(|s| simulator.simulate(s)).collect();

    match format {
        "json" => print_json(&results),
        _ => {
            for result in &results {
                display::print_scenario(result);
            }
            Ok(())
        }
    }
}

fn cmd_export(path: &Path, config: &PlannerConfig, kind: &str, output: Option<&Path>) -> Result<()> {
    let (_, network) = load(path)?;
    let analysis = analyze_network(&network, config);
    let title = project_title(path);

    let rendered = match kind {
        "mermaid" => export::to_mermaid_gantt(&network, &analysis, &title),
        "dot" => export::to_dot(&network, &analysis, &title),
        other => anyhow::bail!("Unknown export format '{}'. Available: mermaid, dot", other),
    };

    match output {
        Some(out_path) => {
            std::fs::write(out_path, &rendered)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
            println!("Exported {} to {}", kind, out_path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
