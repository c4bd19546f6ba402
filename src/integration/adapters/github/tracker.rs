//! GitHub issue tracker over the REST API.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use super::cli::GhCli;
use super::payload::{
    ApiIssue, ApiPullRequest, ApiRepository, ProjectFields, ProjectItem, ProjectView,
    SearchResponse, parse,
};
use crate::integration::{
    domain::{
        BranchName, IssueDraft, IssueNumber, IssueRef, ProjectBoard, PullRequestDraft,
        PullRequestNumber, RemoteIssue, RemotePullRequest, Reviewers, TitlePrefix,
    },
    ports::{IssueTracker, TrackerError, TrackerResult},
};

/// Name of the single-select project field that carries the status.
const STATUS_FIELD: &str = "Status";

/// Issue tracker backed by `gh api`.
#[derive(Debug, Clone)]
pub struct GitHubTracker {
    cli: GhCli,
}

impl GitHubTracker {
    /// Creates a tracker using `cli`.
    #[must_use]
    pub const fn new(cli: GhCli) -> Self {
        Self { cli }
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!("repos/{}/{suffix}", self.cli.repository())
    }

    fn project_owner<'a>(&'a self, board: &'a ProjectBoard) -> &'a str {
        board
            .owner
            .as_deref()
            .unwrap_or_else(|| self.cli.repository().owner())
    }

    async fn set_project_status(
        &self,
        board: &ProjectBoard,
        item_id: &str,
        status: &str,
    ) -> TrackerResult<()> {
        let number = board.number.to_string();
        let owner = self.project_owner(board);
        let view: ProjectView = parse(
            &self
                .cli
                .run_checked(
                    &["project", "view", &number, "--owner", owner, "--format", "json"],
                    None,
                )
                .await?,
        )?;
        let fields: ProjectFields = parse(
            &self
                .cli
                .run_checked(
                    &["project", "field-list", &number, "--owner", owner, "--format", "json"],
                    None,
                )
                .await?,
        )?;
        let field = fields
            .fields
            .iter()
            .find(|field| field.name == STATUS_FIELD)
            .ok_or_else(|| {
                TrackerError::Rejected(format!("project {number} has no {STATUS_FIELD} field"))
            })?;
        let option = field
            .options
            .iter()
            .find(|option| option.name.eq_ignore_ascii_case(status))
            .ok_or_else(|| {
                TrackerError::Rejected(format!("project {number} has no status option {status}"))
            })?;
        self.cli
            .run_checked(
                &[
                    "project",
                    "item-edit",
                    "--id",
                    item_id,
                    "--project-id",
                    &view.id,
                    "--field-id",
                    &field.id,
                    "--single-select-option-id",
                    &option.id,
                ],
                None,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    #[instrument(skip_all, fields(prefix = %prefix))]
    async fn search_issues(&self, prefix: &TitlePrefix) -> TrackerResult<Vec<RemoteIssue>> {
        let query = format!(
            "repo:{} is:issue in:title \"{}\"",
            self.cli.repository(),
            prefix
        );
        let body = self
            .cli
            .api("GET", "search/issues", &[("q", query.as_str()), ("per_page", "100")], None)
            .await?;
        let response: SearchResponse = parse(&body)?;
        let issues = response
            .items
            .into_iter()
            .filter(|item| !item.is_pull_request())
            .map(ApiIssue::into_domain)
            .collect::<TrackerResult<Vec<_>>>()?;
        debug!(candidates = issues.len(), "issue search completed");
        Ok(issues)
    }

    async fn get_issue(&self, number: IssueNumber) -> TrackerResult<Option<RemoteIssue>> {
        let endpoint = self.repo_path(&format!("issues/{number}"));
        match self.cli.api("GET", &endpoint, &[], None).await {
            Ok(body) => {
                let issue: ApiIssue = parse(&body)?;
                if issue.is_pull_request() {
                    return Ok(None);
                }
                issue.into_domain().map(Some)
            }
            Err(TrackerError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip_all, fields(title = %draft.title))]
    async fn create_issue(&self, draft: &IssueDraft) -> TrackerResult<RemoteIssue> {
        let payload = json!({
            "title": draft.title,
            "body": draft.body,
            "labels": draft.labels,
        });
        let body = self
            .cli
            .api("POST", &self.repo_path("issues"), &[], Some(&payload))
            .await?;
        parse::<ApiIssue>(&body)?.into_domain()
    }

    async fn update_issue_body(&self, number: IssueNumber, body: &str) -> TrackerResult<()> {
        let payload = json!({ "body": body });
        self.cli
            .api(
                "PATCH",
                &self.repo_path(&format!("issues/{number}")),
                &[],
                Some(&payload),
            )
            .await?;
        Ok(())
    }

    async fn find_pull_requests(
        &self,
        head: &BranchName,
    ) -> TrackerResult<Vec<RemotePullRequest>> {
        let qualified = format!("{}:{head}", self.cli.repository().owner());
        let body = self
            .cli
            .api(
                "GET",
                &self.repo_path("pulls"),
                &[("head", qualified.as_str()), ("state", "all"), ("per_page", "100")],
                None,
            )
            .await?;
        let pulls: Vec<ApiPullRequest> = parse(&body)?;
        pulls
            .into_iter()
            .map(ApiPullRequest::into_domain)
            .collect::<TrackerResult<Vec<_>>>()
            .map(|found| found.into_iter().filter(|pull| pull.is_from(head)).collect())
    }

    #[instrument(skip_all, fields(head = %draft.head, base = %draft.base))]
    async fn create_pull_request(
        &self,
        draft: &PullRequestDraft,
    ) -> TrackerResult<RemotePullRequest> {
        let payload = json!({
            "title": draft.title,
            "body": draft.body,
            "head": draft.head.as_str(),
            "base": draft.base,
        });
        let body = self
            .cli
            .api("POST", &self.repo_path("pulls"), &[], Some(&payload))
            .await?;
        parse::<ApiPullRequest>(&body)?.into_domain()
    }

    async fn update_pull_request_body(
        &self,
        number: PullRequestNumber,
        body: &str,
    ) -> TrackerResult<()> {
        let payload = json!({ "body": body });
        self.cli
            .api(
                "PATCH",
                &self.repo_path(&format!("pulls/{number}")),
                &[],
                Some(&payload),
            )
            .await?;
        Ok(())
    }

    async fn request_reviewers(
        &self,
        number: PullRequestNumber,
        reviewers: &Reviewers,
    ) -> TrackerResult<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        let payload = json!({
            "reviewers": reviewers.users,
            "team_reviewers": reviewers.teams,
        });
        self.cli
            .api(
                "POST",
                &self.repo_path(&format!("pulls/{number}/requested_reviewers")),
                &[],
                Some(&payload),
            )
            .await?;
        Ok(())
    }

    async fn default_branch(&self) -> TrackerResult<String> {
        let endpoint = format!("repos/{}", self.cli.repository());
        let body = self.cli.api("GET", &endpoint, &[], None).await?;
        let repository: ApiRepository = parse(&body)?;
        Ok(repository.default_branch)
    }

    #[instrument(skip_all, fields(project = board.number, issue = %issue.number))]
    async fn add_to_project(&self, board: &ProjectBoard, issue: &IssueRef) -> TrackerResult<()> {
        let number = board.number.to_string();
        let owner = self.project_owner(board);
        let body = self
            .cli
            .run_checked(
                &[
                    "project", "item-add", &number, "--owner", owner, "--url", &issue.url,
                    "--format", "json",
                ],
                None,
            )
            .await?;
        let item: ProjectItem = parse(&body)?;
        if let Some(status) = board.status.as_deref() {
            self.set_project_status(board, &item.id, status).await?;
        }
        Ok(())
    }
}
