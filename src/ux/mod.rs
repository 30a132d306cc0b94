use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::plan::{Difficulty, Plan, Subtask, Summary};

fn badge(d: Difficulty) -> ColoredString {
    let label = format!("[{}]", d.label().to_uppercase());
    match d {
        Difficulty::Easy => label.green().bold(),
        Difficulty::Medium => label.yellow().bold(),
        Difficulty::Hard => label.red().bold(),
    }
}

pub fn show_plan(plan: &Plan) {
    println!("\n=== {} ===", plan.plan_title.bold());
    if plan.days.is_empty() {
        println!("(no days)");
    }
    for day in &plan.days {
        let day_xp = day.tasks.iter().fold(0i64, |acc, t| acc.saturating_add(t.xp));
        println!("\n{}  {}", day.day_title.bold().underline(), format!("+{day_xp} XP").cyan());
        if day.tasks.is_empty() {
            println!("  (no tasks)");
        }
        for (i, t) in day.tasks.iter().enumerate() {
            let slot = t.time_slot.as_deref().unwrap_or("unscheduled");
            println!(
                "  {}. {}  {}  ({} min, {} XP)  {}",
                i + 1,
                badge(t.difficulty),
                t.title,
                t.duration,
                t.xp,
                slot.dimmed()
            );
            for step in &t.steps {
                println!("       - {}", step);
            }
        }
    }
    print_summary_dashboard(&plan.summary);
}

pub fn print_summary_dashboard(sum: &Summary) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━━ Summary ━━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    let count = |d: Difficulty| sum.difficulty_breakdown.get(&d).copied().unwrap_or(0);
    println!(
        "  {}: {}   {}: {}   {}: {}   {}: {}",
        "Tasks".bold(), sum.total_tasks,
        "Easy".green().bold(), count(Difficulty::Easy),
        "Medium".yellow().bold(), count(Difficulty::Medium),
        "Hard".red().bold(), count(Difficulty::Hard),
    );
    println!(
        "  {}: {}   {}: {}",
        "Total XP".cyan().bold(), sum.total_xp,
        "Focus time".bold(), format_minutes(sum.total_time),
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
    for note in &sum.notes {
        println!("  • {}", note.dimmed());
    }
    println!();
}

pub fn show_subtasks(task: &str, subtasks: &[Subtask]) {
    println!("\n=== {} ===", task.bold());
    if subtasks.is_empty() {
        println!("(model returned no subtasks)");
        return;
    }
    let total = subtasks.iter().fold(0i64, |acc, s| acc.saturating_add(s.est_minutes));
    for (i, s) in subtasks.iter().enumerate() {
        let level = match s.difficulty {
            1 => "●○○".green(),
            2 => "●●○".yellow(),
            _ => "●●●".red(),
        };
        println!("{}. {}  {} ({} min)", i + 1, level, s.title, s.est_minutes);
    }
    println!("\n{} {}", "Estimated total:".bold(), format_minutes(total));
}

/// `95` -> `"1h 35m"`, `40` -> `"40m"`.
pub fn format_minutes(total: i64) -> String {
    let (h, m) = (total / 60, total % 60);
    if h == 0 {
        format!("{m}m")
    } else {
        format!("{h}h {m:02}m")
    }
}

/// Spinner shown while the model works; hidden when progress is off.
pub fn spinner(message: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
