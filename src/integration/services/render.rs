//! Issue and pull request bodies rendered from templates.
//!
//! Bodies are deterministic for the same task and report so that re-runs
//! overwrite remote text with identical content.

use minijinja::{Environment, context};
use serde::Serialize;

use super::error::{ReconcileError, ReconcileResult};
use crate::integration::domain::{IssueNumber, Report, TaskSpec, TitlePrefix};

const ISSUE_TEMPLATE: &str = r"## Goal

{% if goal %}{{ goal }}{% else %}{{ title }}{% endif %}
{% if context %}
## Context

{{ context }}
{% endif %}
## Acceptance Criteria
{% for item in criteria %}
- [{% if item.passed %}x{% else %} {% endif %}] {{ item.text }}
{%- endfor %}
{% if report %}
## Implementation Report

**Status:** {{ report.status }}
{% if report.summary %}
### Summary
{% for line in report.summary %}
- {{ line }}
{%- endfor %}
{% endif %}
{%- if report.verification.results %}
### Verification
{% for line in report.verification.results %}
- {{ line }}
{%- endfor %}
{% endif %}
{%- if report.files_modified %}
### Files Modified
{% for change in report.files_modified %}
- `{{ change.path }}`{% if change.description %}: {{ change.description }}{% endif %}
{%- endfor %}
{% endif %}
{%- if report.risks %}
### Risks
{% for risk in report.risks %}
- {{ risk }}
{%- endfor %}
{% endif %}
{%- endif %}
---
_Managed by taskbridge for task {{ task }}._
";

const PULL_REQUEST_TEMPLATE: &str = r"## Task

Closes #{{ issue }}

## Summary
{% if summary %}{% for line in summary %}
- {{ line }}
{%- endfor %}{% else %}
{% if goal %}{{ goal }}{% else %}{{ title }}{% endif %}
{%- endif %}
{% if changes %}
## Changes
{% for change in changes %}
- `{{ change.path }}`{% if change.description %}: {{ change.description }}{% endif %}
{%- endfor %}
{% endif %}
{%- if verification.commands_run or verification.results %}
## Verification
{% for command in verification.commands_run %}
- `{{ command }}`
{%- endfor %}
{%- for line in verification.results %}
- {{ line }}
{%- endfor %}
{% endif %}
## Checklist
{% for item in criteria %}
- [{% if item.passed %}x{% else %} {% endif %}] {{ item.text }}
{%- endfor %}

---
_Managed by taskbridge for task {{ task }}._
";

/// Checklist row pairing a criterion with its verification outcome.
#[derive(Debug, Serialize)]
struct ChecklistItem<'a> {
    text: &'a str,
    passed: bool,
}

/// Pairs each task criterion with the report's result, matched by text and
/// then by position. A task without criteria uses the report's list.
fn checklist<'a>(task: &'a TaskSpec, report: Option<&'a Report>) -> Vec<ChecklistItem<'a>> {
    let results = report.map(|r| r.criteria_results.as_slice()).unwrap_or_default();
    if task.acceptance_criteria().is_empty() {
        return results
            .iter()
            .map(|result| ChecklistItem {
                text: &result.criterion,
                passed: result.passed,
            })
            .collect();
    }
    task.acceptance_criteria()
        .iter()
        .enumerate()
        .map(|(index, criterion)| {
            let passed = results
                .iter()
                .find(|result| result.criterion.trim() == criterion.as_str())
                .or_else(|| results.get(index))
                .is_some_and(|result| result.passed);
            ChecklistItem {
                text: criterion,
                passed,
            }
        })
        .collect()
}

fn render(name: &'static str, template: &str, ctx: minijinja::Value) -> ReconcileResult<String> {
    let environment = Environment::new();
    environment
        .render_str(template, ctx)
        .map(|body| body.trim().to_owned())
        .map_err(|err| ReconcileError::InvalidInput(format!("cannot render {name} body: {err}")))
}

/// Renders the issue body.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] when rendering fails.
pub fn issue_body(task: &TaskSpec, report: Option<&Report>) -> ReconcileResult<String> {
    render(
        "issue",
        ISSUE_TEMPLATE,
        context! {
            task => task.key().as_str(),
            title => task.title(),
            goal => task.goal(),
            context => task.context(),
            criteria => checklist(task, report),
            report => report,
        },
    )
}

/// Renders the pull request body referencing `issue`.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] when rendering fails.
pub fn pull_request_body(
    task: &TaskSpec,
    report: Option<&Report>,
    issue: IssueNumber,
) -> ReconcileResult<String> {
    let summary = report.map(|r| r.summary.as_slice()).unwrap_or_default();
    let changes = report.map(|r| r.files_modified.as_slice()).unwrap_or_default();
    render(
        "pull request",
        PULL_REQUEST_TEMPLATE,
        context! {
            task => task.key().as_str(),
            title => task.title(),
            goal => task.goal(),
            issue => issue.value(),
            summary => summary,
            changes => changes,
            verification => report.map(|r| r.verification.clone()).unwrap_or_default(),
            criteria => checklist(task, report),
        },
    )
}

/// Returns the pull request title, `[{task}] {title}`.
#[must_use]
pub fn pull_request_title(task: &TaskSpec) -> String {
    TitlePrefix::for_task(task.key()).title(task.title())
}
