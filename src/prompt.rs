use crate::models::{Commit, RepositoryContext, UncommittedChange};

const RULE_WIDTH: usize = 40;

const ANALYSIS_SHAPE: &str = r#"{
    "summary": "Brief overview of the changes",
    "issues": ["Potential issue or risk"],
    "recommendations": ["Recommendation for improvement"]
}"#;

const REPORT_SHAPE: &str = r#"{
    "purpose": "What the merge request does and why",
    "changes_explanation": ["Key change and the reason for it"],
    "problems_solved": ["Problem this merge request addresses"],
    "references": {
        "jira_tickets": ["Ticket referenced by the commits"],
        "related_mrs": ["Related merge request"],
        "documentation": ["Documentation that needs updating"]
    },
    "acceptance_checklist": ["Item to check before merging"],
    "setup_steps": ["Step to set up the change locally"],
    "validation_steps": ["Scenario to verify"],
    "side_effects": ["Side effect to watch for"]
}"#;

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

pub fn format_commits(commits: &[Commit]) -> String {
    let mut out = Vec::new();
    for commit in commits {
        out.push(format!("Commit: {}", commit.hash));
        out.push(format!("Author: {}", commit.author));
        out.push(format!("Date: {}", commit.date));
        out.push(format!("Message: {}", commit.message));
        for change in &commit.changes {
            out.push(format!("File: {} ({})", change.path, change.change_type));
            out.push(change.diff.clone());
        }
        out.push(rule());
    }
    out.join("\n")
}

pub fn format_uncommitted(changes: &[UncommittedChange]) -> String {
    let mut out = Vec::new();
    for change in changes {
        out.push(format!("File: {}", change.path));
        out.push(format!("Status: {}", change.status));
        out.push("Changes:".to_string());
        out.push(change.content.clone());
        out.push(rule());
    }
    out.join("\n")
}

fn review_prompt(subject: &str, body: &str) -> String {
    format!(
        "You are an experienced code reviewer. Review the {subject} below.\n\n\
         {body}\n\n\
         Cover:\n\
         1. A short summary of what changed\n\
         2. Potential bugs, risks or regressions\n\
         3. Concrete recommendations\n\n\
         Reply with a single JSON object in exactly this shape and nothing else:\n\
         {ANALYSIS_SHAPE}"
    )
}

pub fn analysis_prompt(commits: &[Commit]) -> String {
    review_prompt("commits on this branch", &format_commits(commits))
}

pub fn uncommitted_analysis_prompt(changes: &[UncommittedChange]) -> String {
    review_prompt("uncommitted changes", &format_uncommitted(changes))
}

pub fn report_prompt(commits: &[Commit], context: &RepositoryContext) -> String {
    let context_json =
        serde_json::to_string_pretty(context).unwrap_or_else(|_| format!("{:?}", context));
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    let tickets = extract_ticket_keys(&messages);
    let ticket_hint = if tickets.is_empty() {
        "none detected".to_string()
    } else {
        tickets.join(", ")
    };

    format!(
        "You are a technical writer. Write a merge request description for the commits below.\n\n\
         Repository context:\n{context_json}\n\n\
         Ticket keys found in commit messages: {ticket_hint}\n\n\
         Commits:\n{commits}\n\n\
         The description has three parts:\n\
         1. What the merge request does and why: purpose, key changes with their reasons, problems solved.\n\
         2. References: tickets, related merge requests, documentation to update.\n\
         3. How to set up and validate locally: setup steps including new configuration, \
         scenarios to verify, side effects to watch for.\n\
         Also give an acceptance checklist (reviews, lint, unit and integration tests, docs).\n\n\
         Reply with a single JSON object in exactly this shape and nothing else:\n\
         {REPORT_SHAPE}",
        commits = format_commits(commits),
    )
}

/// Issue keys like `PROJ-123`, de-duplicated in first-seen order.
pub fn extract_ticket_keys(messages: &[&str]) -> Vec<String> {
    let Ok(re) = regex::Regex::new(r"\b([A-Z][A-Z0-9]+-\d+)\b") else {
        return Vec::new();
    };

    let mut keys: Vec<String> = Vec::new();
    for message in messages {
        for m in re.find_iter(message) {
            let key = m.as_str();
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
    keys
}
