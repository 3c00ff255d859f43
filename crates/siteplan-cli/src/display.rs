use colored::*;
use siteplan_core::analyzer::report::{format_days, format_money, RiskLevel, Severity};
use siteplan_core::resources::ResourceLevelingResult;
use siteplan_core::risk::Risk;
use siteplan_core::{CriticalPathAnalysis, OptimizationAction, OptimizationResult, ScenarioResult};

fn severity_tag(severity: Severity) -> String {
    let label = format!(" {} ", severity.symbol());
    match severity {
        Severity::Critical => label.on_red().white().bold().to_string(),
        Severity::High => label.on_yellow().black().bold().to_string(),
        Severity::Medium => label.on_blue().white().bold().to_string(),
        Severity::Low | Severity::Info => label.dimmed().to_string(),
    }
}

fn risk_tag(risk: RiskLevel) -> String {
    match risk {
        RiskLevel::High => risk.symbol().red().bold().to_string(),
        RiskLevel::Medium => risk.symbol().yellow().to_string(),
        RiskLevel::Low => risk.symbol().green().to_string(),
    }
}

/// Days gained are green, days lost red.
fn format_day_delta(delta: i64) -> String {
    if delta < 0 {
        format_days(delta).green().to_string()
    } else if delta > 0 {
        format!("+{}", format_days(delta)).red().to_string()
    } else {
        "0d".to_string()
    }
}

fn format_money_delta(delta: f64) -> String {
    if delta < 0.0 {
        format_money(delta).green().to_string()
    } else if delta > 0.0 {
        format!("+{}", format_money(delta)).red().to_string()
    } else {
        "0".to_string()
    }
}

fn format_score_delta(delta: f64) -> String {
    if delta > 0.05 {
        format!("+{:.1}", delta).green().to_string()
    } else if delta < -0.05 {
        format!("{:.1}", delta).red().to_string()
    } else {
        "0.0".to_string()
    }
}

fn header(title: &str) {
    println!();
    println!("{}", format!(" siteplan v{} - {}", env!("CARGO_PKG_VERSION"), title).bold());
    println!();
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!(" {}", "Warnings".bold().yellow());
    for w in warnings {
        println!("   {} {}", "!".yellow(), w);
    }
    println!();
}

/// Print the critical path, float table and near-critical groups.
pub fn print_critical_path(project: &str, analysis: &CriticalPathAnalysis) {
    header(&format!("Critical Path for {}", project));

    if analysis.activity_timings.is_empty() {
        println!(" {} No activities to analyze.", "OK".green().bold());
        println!();
        return;
    }

    println!(" {}", "Programme".bold().underline());
    if let (Some(start), Some(finish)) = (analysis.project_start, analysis.project_finish) {
        println!(" {} Start:    {}", "|-".dimmed(), start);
        println!(" {} Finish:   {}", "|-".dimmed(), finish);
    }
    println!(
        " {} Duration: {}",
        "|-".dimmed(),
        format_days(analysis.project_duration_days).bold()
    );
    println!(
        " {} Critical path: {}",
        "|-".dimmed(),
        analysis.critical_activities.join(" -> ").red()
    );
    println!();

    println!(
        "   {:<18} {:>10} {:>10} {:>10} {:>10} {:>5} {:>5}",
        "Activity".underline(),
        "ES".underline(),
        "EF".underline(),
        "LS".underline(),
        "LF".underline(),
        "TF".underline(),
        "FF".underline()
    );
    for t in &analysis.activity_timings {
        let id = if t.is_critical {
            format!("{:<18}", t.activity_id).red().bold().to_string()
        } else {
            format!("{:<18}", t.activity_id)
        };
        println!(
            "   {} {:>10} {:>10} {:>10} {:>10} {:>5} {:>5}",
            id, t.early_start, t.early_finish, t.late_start, t.late_finish, t.total_float, t.free_float
        );
    }
    println!();

    if !analysis.near_critical_paths.is_empty() {
        println!(" {}", "Near-Critical".bold().underline());
        for group in &analysis.near_critical_paths {
            println!(
                " {} {} float: {}",
                severity_tag(group.severity),
                format_days(group.total_float),
                group.activities.join(", ")
            );
        }
        println!();
    }
}

/// Print the selected alternative, the comparison table, actions and risks.
pub fn print_optimization(project: &str, result: &OptimizationResult) {
    header(&format!("Optimizing {}", project));

    println!(" {}", "Selected Schedule".bold().underline());
    println!(
        " {} Strategy:    {}",
        "|-".dimmed(),
        result.selected_strategy.to_string().cyan().bold()
    );
    println!(
        " {} Duration:    {} -> {} ({})",
        "|-".dimmed(),
        format_days(result.original_duration),
        format_days(result.optimized_duration).bold(),
        format_day_delta(-result.duration_saving)
    );
    println!(
        " {} Cost:        {} -> {} ({})",
        "|-".dimmed(),
        format_money(result.original_cost),
        format_money(result.optimized_cost).bold(),
        format_money_delta(-result.cost_saving)
    );
    println!(" {} Quality:     {:.1}/100", "|-".dimmed(), result.quality_score);
    println!(" {} Resources:   {:.1}/100", "|-".dimmed(), result.resource_utilization);
    let feasibility = format!("{:.1}/100", result.feasibility_score);
    println!(
        " {} Feasibility: {}",
        "|-".dimmed(),
        if result.alternatives.iter().any(|a| a.feasible) {
            feasibility.green().to_string()
        } else {
            feasibility.red().to_string()
        }
    );
    println!();

    println!(" {}", "Alternatives".bold().underline());
    println!(
        "   {:<20} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8}",
        "Strategy".underline(),
        "Days".underline(),
        "Cost".underline(),
        "Quality".underline(),
        "Res.".underline(),
        "Score".underline(),
        "Feas.".underline()
    );
    for alt in &result.alternatives {
        let name = format!("{:<20}", alt.strategy.name());
        let name = if alt.strategy == result.selected_strategy {
            name.cyan().bold().to_string()
        } else if !alt.feasible {
            name.dimmed().to_string()
        } else {
            name
        };
        println!(
            "   {} {:>8} {:>10} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            name,
            alt.duration_days,
            format_money(alt.total_cost),
            alt.quality_score,
            alt.resource_utilization,
            alt.objective_score,
            alt.feasibility_score
        );
    }
    println!();

    print_action_list(&result.optimization_actions);
    print_risks(&result.risks);
    print_warnings(&result.warnings);

    println!(
        " {} {} alternatives in {:.1} ms, {:.1}% objective improvement",
        "=".dimmed(),
        result.performance.iterations_run,
        result.performance.convergence_time,
        result.performance.improvement_achieved
    );
    println!();
}

fn print_action_list(actions: &[OptimizationAction]) {
    if actions.is_empty() {
        println!(" {} No compression actions needed.", "OK".green().bold());
        println!();
        return;
    }

    println!(" {}", "Actions".bold().underline());
    for action in actions {
        println!(
            " {} {} {}",
            format!("[{:>2}]", action.priority).bold(),
            action.action_type.label().cyan(),
            action.description
        );
        println!(
            "   {} Impact: {}, cost {} | Risk: {} | Effort: {:?}",
            "|".dimmed(),
            format_day_delta(action.duration_impact),
            format_money_delta(action.cost_impact),
            risk_tag(action.risk_level),
            action.implementation_effort
        );
        if !action.prerequisites.is_empty() {
            println!(
                "   {} Requires: {}",
                "|".dimmed(),
                action.prerequisites.join("; ").dimmed()
            );
        }
    }
    println!();
}

fn print_risks(risks: &[Risk]) {
    if risks.is_empty() {
        return;
    }
    println!(" {}", "Risk Register".bold().underline());
    for risk in risks {
        println!(
            " {} {} {:?}: {} ({:.0}%)",
            severity_tag(risk.impact),
            risk.id.bold(),
            risk.category,
            risk.description,
            risk.probability
        );
        println!("   {} Mitigation: {}", "|".dimmed(), risk.mitigation);
        println!("   {} Contingency: {}", "|".dimmed(), risk.contingency.dimmed());
    }
    println!();
}

/// Print a ranked action list (fast-tracking or crashing).
pub fn print_actions(title: &str, project: &str, actions: &[OptimizationAction]) {
    header(&format!("{} for {}", title, project));
    print_action_list(actions);

    let days: i64 = actions.iter().map(|a| a.duration_impact).sum();
    let cost: f64 = actions.iter().map(|a| a.cost_impact).sum();
    if !actions.is_empty() {
        println!(
            " {} {} actions, up to {} at {} if all were taken",
            "=".dimmed(),
            actions.len(),
            format_days(-days).green(),
            format_money(cost)
        );
        println!();
    }
}

/// Print leveling shifts, the days still overallocated and recommendations.
pub fn print_leveling(project: &str, result: &ResourceLevelingResult) {
    header(&format!("Leveling {} ({:?})", project, result.strategy));

    println!(" {}", "Improvements".bold().underline());
    println!(
        " {} Peak reduction:        {:.1}%",
        "|-".dimmed(),
        result.improvements.peak_reduction
    );
    println!(
        " {} Smoother demand:       {:.1}%",
        "|-".dimmed(),
        result.improvements.utilization_improvement
    );
    println!(
        " {} Duration impact:       {}",
        "|-".dimmed(),
        format_day_delta(result.improvements.duration_impact)
    );
    println!(
        " {} Cost impact:           {}",
        "|-".dimmed(),
        format_money_delta(result.improvements.cost_impact)
    );
    println!();

    if !result.shifts.is_empty() {
        println!(" {}", "Shifted Activities".bold().underline());
        for (id, days) in &result.shifts {
            println!("   {} {:<18} +{}", "+".green(), id, format_days(*days));
        }
        println!();
    }

    let overallocated: Vec<_> = result
        .resource_profile
        .iter()
        .flat_map(|day| {
            day.per_resource_type
                .iter()
                .filter(|(_, u)| u.overallocation > 0)
                .map(move |(t, u)| (day.date, t, u))
        })
        .collect();
    if !overallocated.is_empty() {
        println!(" {}", "Remaining Overallocation".bold().underline().red());
        for (date, resource_type, usage) in overallocated {
            println!(
                "   {} {:<14} {}/{} ({:.0}%)",
                date,
                resource_type,
                usage.required.to_string().red(),
                usage.available,
                usage.utilization
            );
        }
        println!();
    }

    if !result.recommendations.is_empty() {
        println!(" {}", "Recommendations".bold().underline());
        for rec in &result.recommendations {
            println!(" {} {}", severity_tag(rec.severity), rec.message);
        }
        println!();
    }

    print_warnings(&result.warnings);
}

/// Print one what-if scenario against the unchanged plan.
pub fn print_scenario(result: &ScenarioResult) {
    header(&format!("What-If: {}", result.scenario_name));

    if !result.changes_applied.is_empty() {
        println!(" {}", "Changes Applied".bold().underline());
        for c in &result.changes_applied {
            println!("   {} {}", "+".green(), c);
        }
        println!();
    }

    print_warnings(&result.warnings);

    println!(" {}", "Impact".bold().underline());
    println!(
        "   {:<22} {:>12} {:>12} {:>10}",
        "Metric".underline(),
        "Baseline".underline(),
        "Projected".underline(),
        "Delta".underline()
    );
    println!(
        "   {:<22} {:>12} {:>12} {:>10}",
        "Duration",
        format_days(result.baseline.duration_days),
        format_days(result.projected.duration_days),
        format_day_delta(result.duration_delta)
    );
    println!(
        "   {:<22} {:>12} {:>12} {:>10}",
        "Finish",
        result.baseline.finish_date.to_string(),
        result.projected.finish_date.to_string(),
        ""
    );
    println!(
        "   {:<22} {:>12} {:>12} {:>10}",
        "Cost",
        format_money(result.baseline.total_cost),
        format_money(result.projected.total_cost),
        format_money_delta(result.cost_delta)
    );
    println!(
        "   {:<22} {:>12.1} {:>12.1} {:>10}",
        "Quality",
        result.baseline.quality_score,
        result.projected.quality_score,
        format_score_delta(result.quality_delta)
    );
    println!(
        "   {:<22} {:>12.1} {:>12.1} {:>10}",
        "Resource utilization",
        result.baseline.resource_utilization,
        result.projected.resource_utilization,
        format_score_delta(result.resource_utilization_delta)
    );
    println!();

    for note in &result.notes {
        println!(" {}", note.dimmed());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_delta_sign() {
        colored::control::set_override(false);
        assert_eq!(format_day_delta(-3), "-3d");
        assert_eq!(format_day_delta(2), "+2d");
        assert_eq!(format_day_delta(0), "0d");
    }

    #[test]
    fn test_money_delta_sign() {
        colored::control::set_override(false);
        assert_eq!(format_money_delta(2500.0), "+2,500");
        assert_eq!(format_money_delta(-250.0), "-250");
        assert_eq!(format_money_delta(0.0), "0");
    }
}
