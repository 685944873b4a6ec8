use std::io::{self, Write};

use colored::Colorize;

use crate::response::{CodeAnalysis, MergeRequestReport};

fn bullets(out: &mut impl Write, marker: &str, items: &[String]) -> io::Result<()> {
    for item in items {
        writeln!(out, "{} {}", marker, item)?;
    }
    Ok(())
}

fn titled_list(out: &mut impl Write, title: &str, marker: &str, items: &[String]) -> io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{}:", title)?;
    bullets(out, marker, items)
}

pub fn render_notice(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message.yellow())
}

pub fn render_analysis(out: &mut impl Write, analysis: &CodeAnalysis) -> io::Result<()> {
    if let Some(summary) = &analysis.summary {
        let rule = "─".repeat(60);
        writeln!(out, "{}", "Code Analysis Summary".bold().blue())?;
        writeln!(out, "{}", rule.blue())?;
        writeln!(out, "{}", summary)?;
        writeln!(out, "{}", rule.blue())?;
    }

    if !analysis.issues.is_empty() {
        writeln!(out, "\n{}", "Potential Issues:".bold().red())?;
        bullets(out, "•", &analysis.issues)?;
    }

    if !analysis.recommendations.is_empty() {
        writeln!(out, "\n{}", "Recommendations:".bold().green())?;
        bullets(out, "•", &analysis.recommendations)?;
    }

    Ok(())
}

pub fn render_report(out: &mut impl Write, report: &MergeRequestReport) -> io::Result<()> {
    writeln!(out, "\n{}", "Merge Request Description".bold().blue())?;

    writeln!(out, "\n{}", "1. What does this MR do and why?".bold())?;
    if let Some(purpose) = &report.purpose {
        writeln!(out, "{}", purpose)?;
    }
    titled_list(out, "Key Changes", "•", &report.changes_explanation)?;
    titled_list(out, "Problems Solved", "•", &report.problems_solved)?;

    writeln!(out, "\n{}", "2. References".bold())?;
    let references = &report.references;
    titled_list(out, "Jira Tickets", "•", &references.jira_tickets)?;
    titled_list(out, "Related MRs", "•", &references.related_mrs)?;
    titled_list(out, "Documentation Updates", "•", &references.documentation)?;

    writeln!(out, "\n{}", "MR Acceptance Checklist".bold())?;
    bullets(out, "☐", &report.acceptance_checklist)?;

    writeln!(out, "\n{}", "3. How to set up and validate locally".bold())?;
    titled_list(out, "Setup Steps", "•", &report.setup_steps)?;
    titled_list(out, "Validation Steps", "•", &report.validation_steps)?;
    titled_list(out, "Potential Side Effects", "⚠", &report.side_effects)?;

    Ok(())
}
