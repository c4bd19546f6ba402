//! REST payload shapes and their conversion into domain values.

use serde::Deserialize;

use crate::integration::{
    domain::{
        IssueNumber, IssueState, PullRequestNumber, PullRequestState, RemoteIssue,
        RemotePullRequest,
    },
    ports::{TrackerError, TrackerResult},
};

#[derive(Debug, Deserialize)]
pub(super) struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    state: String,
    html_url: String,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl ApiIssue {
    /// Search results include pull requests; they carry a `pull_request` key.
    pub(super) const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub(super) fn into_domain(self) -> TrackerResult<RemoteIssue> {
        let state = match self.state.as_str() {
            "open" => IssueState::Open,
            "closed" => IssueState::Closed,
            other => return Err(TrackerError::Protocol(format!("unknown issue state {other}"))),
        };
        Ok(RemoteIssue {
            number: IssueNumber::new(self.number)
                .map_err(|err| TrackerError::Protocol(err.to_string()))?,
            title: self.title,
            body: self.body.unwrap_or_default(),
            labels: self.labels.into_iter().map(|label| label.name).collect(),
            state,
            url: self.html_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchResponse {
    #[serde(default)]
    pub(super) items: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiBranch {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiPullRequest {
    number: u64,
    title: String,
    head: ApiBranch,
    base: ApiBranch,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    merged_at: Option<String>,
    html_url: String,
}

impl ApiPullRequest {
    pub(super) fn into_domain(self) -> TrackerResult<RemotePullRequest> {
        let state = match (self.state.as_str(), self.merged_at.is_some()) {
            ("open", _) => PullRequestState::Open,
            ("closed", true) => PullRequestState::Merged,
            ("closed", false) => PullRequestState::Closed,
            (other, _) => {
                return Err(TrackerError::Protocol(format!(
                    "unknown pull request state {other}"
                )));
            }
        };
        Ok(RemotePullRequest {
            number: PullRequestNumber::new(self.number)
                .map_err(|err| TrackerError::Protocol(err.to_string()))?,
            title: self.title,
            head: self.head.name,
            base: self.base.name,
            body: self.body.unwrap_or_default(),
            state,
            url: self.html_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiRepository {
    pub(super) default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectView {
    pub(super) id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectItem {
    pub(super) id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectFieldOption {
    pub(super) id: String,
    pub(super) name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectField {
    pub(super) id: String,
    pub(super) name: String,
    #[serde(default)]
    pub(super) options: Vec<ProjectFieldOption>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectFields {
    #[serde(default)]
    pub(super) fields: Vec<ProjectField>,
}

/// Parses a JSON response body.
pub(super) fn parse<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> TrackerResult<T> {
    serde_json::from_slice(bytes).map_err(|err| {
        TrackerError::Protocol(format!("unexpected response from GitHub: {err}"))
    })
}
