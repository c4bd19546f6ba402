//! In-memory issue tracker with fault injection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::integration::{
    domain::{
        BranchName, IssueDraft, IssueNumber, IssueRef, IssueState, ProjectBoard,
        PullRequestDraft, PullRequestNumber, PullRequestState, RemoteIssue, RemotePullRequest,
        Reviewers, TitlePrefix,
    },
    ports::{IssueTracker, TrackerError, TrackerResult},
};

const BASE_URL: &str = "https://tracker.invalid/acme/widgets";

/// Tracker operation, used to address injected faults and call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOperation {
    /// [`IssueTracker::search_issues`].
    SearchIssues,
    /// [`IssueTracker::get_issue`].
    GetIssue,
    /// [`IssueTracker::create_issue`].
    CreateIssue,
    /// [`IssueTracker::update_issue_body`].
    UpdateIssue,
    /// [`IssueTracker::find_pull_requests`].
    FindPullRequests,
    /// [`IssueTracker::create_pull_request`].
    CreatePullRequest,
    /// [`IssueTracker::update_pull_request_body`].
    UpdatePullRequest,
    /// [`IssueTracker::request_reviewers`].
    RequestReviewers,
    /// [`IssueTracker::default_branch`].
    DefaultBranch,
    /// [`IssueTracker::add_to_project`].
    AddToProject,
}

/// A scheduled failure for one call.
#[derive(Debug, Clone)]
enum Fault {
    /// Fail without touching state.
    Reject(TrackerError),
    /// Apply the call, then report failure as if the response was lost.
    LoseResponse(TrackerError),
}

/// Thread-safe in-memory tracker.
///
/// Issues and pull requests share one numbering space, as on GitHub.
#[derive(Debug, Clone)]
pub struct InMemoryTracker {
    state: Arc<RwLock<TrackerState>>,
    latency: Duration,
}

#[derive(Debug)]
struct TrackerState {
    issues: BTreeMap<u64, RemoteIssue>,
    pulls: BTreeMap<u64, RemotePullRequest>,
    reviewers: HashMap<u64, Vec<Reviewers>>,
    project_items: Vec<(u64, IssueRef)>,
    default_branch: String,
    next_number: u64,
    faults: HashMap<TrackerOperation, VecDeque<Fault>>,
    calls: HashMap<TrackerOperation, usize>,
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTracker {
    /// Creates an empty tracker whose default branch is `main`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerState {
                issues: BTreeMap::new(),
                pulls: BTreeMap::new(),
                reviewers: HashMap::new(),
                project_items: Vec::new(),
                default_branch: "main".to_owned(),
                next_number: 1,
                faults: HashMap::new(),
                calls: HashMap::new(),
            })),
            latency: Duration::ZERO,
        }
    }

    /// Delays every call by `latency`, leaving room for cancellation.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the repository default branch.
    pub fn set_default_branch(&self, branch: impl Into<String>) {
        if let Ok(mut state) = self.state.write() {
            state.default_branch = branch.into();
        }
    }

    /// Makes the next calls to `operation` fail with `errors`, in order.
    pub fn fail_next(
        &self,
        operation: TrackerOperation,
        errors: impl IntoIterator<Item = TrackerError>,
    ) {
        if let Ok(mut state) = self.state.write() {
            state
                .faults
                .entry(operation)
                .or_default()
                .extend(errors.into_iter().map(Fault::Reject));
        }
    }

    /// Makes the next call to `operation` take effect but report `error`.
    pub fn lose_next_response(&self, operation: TrackerOperation, error: TrackerError) {
        if let Ok(mut state) = self.state.write() {
            state
                .faults
                .entry(operation)
                .or_default()
                .push_back(Fault::LoseResponse(error));
        }
    }

    /// Returns how many times `operation` was called.
    #[must_use]
    pub fn call_count(&self, operation: TrackerOperation) -> usize {
        self.state
            .read()
            .map(|state| state.calls.get(&operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Returns the total number of calls of every kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.state
            .read()
            .map(|state| state.calls.values().sum())
            .unwrap_or(0)
    }

    /// Returns every issue ordered by number.
    #[must_use]
    pub fn issues(&self) -> Vec<RemoteIssue> {
        self.state
            .read()
            .map(|state| state.issues.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every pull request ordered by number.
    #[must_use]
    pub fn pull_requests(&self) -> Vec<RemotePullRequest> {
        self.state
            .read()
            .map(|state| state.pulls.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the reviewer requests made on a pull request.
    #[must_use]
    pub fn reviewer_requests(&self, number: PullRequestNumber) -> Vec<Reviewers> {
        self.state
            .read()
            .map(|state| {
                state
                    .reviewers
                    .get(&number.value())
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Returns the `(project number, issue)` pairs added to boards.
    #[must_use]
    pub fn project_items(&self) -> Vec<(u64, IssueRef)> {
        self.state
            .read()
            .map(|state| state.project_items.clone())
            .unwrap_or_default()
    }

    /// Seeds an issue, as if created by someone else.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Client`] when the state lock is poisoned.
    pub fn seed_issue(
        &self,
        title: &str,
        labels: &[&str],
        state: IssueState,
    ) -> TrackerResult<RemoteIssue> {
        let mut guard = self.write_state()?;
        let number = guard.allocate()?;
        let issue = RemoteIssue {
            number: IssueNumber::new(number).map_err(TrackerError::client)?,
            title: title.to_owned(),
            body: String::new(),
            labels: labels.iter().map(|label| (*label).to_owned()).collect(),
            state,
            url: format!("{BASE_URL}/issues/{number}"),
        };
        guard.issues.insert(number, issue.clone());
        Ok(issue)
    }

    /// Seeds a pull request titled `title` from `head`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Client`] when the state lock is poisoned.
    pub fn seed_pull_request(
        &self,
        title: &str,
        head: &str,
        state: PullRequestState,
    ) -> TrackerResult<RemotePullRequest> {
        let mut guard = self.write_state()?;
        let number = guard.allocate()?;
        let pull = RemotePullRequest {
            number: PullRequestNumber::new(number).map_err(TrackerError::client)?,
            title: title.to_owned(),
            head: head.to_owned(),
            base: guard.default_branch.clone(),
            body: String::new(),
            state,
            url: format!("{BASE_URL}/pull/{number}"),
        };
        guard.pulls.insert(number, pull.clone());
        Ok(pull)
    }

    /// Changes the state of an existing pull request.
    pub fn set_pull_request_state(&self, number: PullRequestNumber, state: PullRequestState) {
        if let Ok(mut guard) = self.state.write()
            && let Some(pull) = guard.pulls.get_mut(&number.value())
        {
            pull.state = state;
        }
    }

    /// Closes an existing issue.
    pub fn close_issue(&self, number: IssueNumber) {
        if let Ok(mut guard) = self.state.write()
            && let Some(issue) = guard.issues.get_mut(&number.value())
        {
            issue.state = IssueState::Closed;
        }
    }

    fn write_state(&self) -> TrackerResult<std::sync::RwLockWriteGuard<'_, TrackerState>> {
        self.state
            .write()
            .map_err(|err| TrackerError::client(std::io::Error::other(err.to_string())))
    }

    /// Waits out the configured latency, counts the call and pops any
    /// scheduled fault.
    async fn enter(&self, operation: TrackerOperation) -> TrackerResult<Option<Fault>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.write_state()?;
        *state.calls.entry(operation).or_default() += 1;
        Ok(state
            .faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front))
    }

    /// Runs `apply` unless a rejecting fault is scheduled.
    async fn perform<T: Send>(
        &self,
        operation: TrackerOperation,
        apply: impl FnOnce(&mut TrackerState) -> TrackerResult<T> + Send,
    ) -> TrackerResult<T> {
        let fault = self.enter(operation).await?;
        if let Some(Fault::Reject(err)) = fault {
            return Err(err);
        }
        let mut state = self.write_state()?;
        let value = apply(&mut state)?;
        match fault {
            Some(Fault::LoseResponse(err)) => Err(err),
            _ => Ok(value),
        }
    }
}

impl TrackerState {
    fn allocate(&mut self) -> TrackerResult<u64> {
        let number = self.next_number;
        self.next_number = number
            .checked_add(1)
            .ok_or_else(|| TrackerError::Protocol("tracker numbers exhausted".to_owned()))?;
        Ok(number)
    }
}

#[async_trait]
impl IssueTracker for InMemoryTracker {
    async fn search_issues(&self, prefix: &TitlePrefix) -> TrackerResult<Vec<RemoteIssue>> {
        let needle = prefix.as_str().to_owned();
        self.perform(TrackerOperation::SearchIssues, move |state| {
            Ok(state
                .issues
                .values()
                .filter(|issue| issue.title.contains(&needle))
                .cloned()
                .collect())
        })
        .await
    }

    async fn get_issue(&self, number: IssueNumber) -> TrackerResult<Option<RemoteIssue>> {
        self.perform(TrackerOperation::GetIssue, move |state| {
            Ok(state.issues.get(&number.value()).cloned())
        })
        .await
    }

    async fn create_issue(&self, draft: &IssueDraft) -> TrackerResult<RemoteIssue> {
        let payload = draft.clone();
        self.perform(TrackerOperation::CreateIssue, move |state| {
            let number = state.allocate()?;
            let issue = RemoteIssue {
                number: IssueNumber::new(number).map_err(TrackerError::client)?,
                title: payload.title,
                body: payload.body,
                labels: payload.labels,
                state: IssueState::Open,
                url: format!("{BASE_URL}/issues/{number}"),
            };
            state.issues.insert(number, issue.clone());
            Ok(issue)
        })
        .await
    }

    async fn update_issue_body(&self, number: IssueNumber, body: &str) -> TrackerResult<()> {
        let text = body.to_owned();
        self.perform(TrackerOperation::UpdateIssue, move |state| {
            let issue = state
                .issues
                .get_mut(&number.value())
                .ok_or_else(|| TrackerError::NotFound(format!("issue #{number}")))?;
            issue.body = text;
            Ok(())
        })
        .await
    }

    async fn find_pull_requests(
        &self,
        head: &BranchName,
    ) -> TrackerResult<Vec<RemotePullRequest>> {
        let branch = head.clone();
        self.perform(TrackerOperation::FindPullRequests, move |state| {
            Ok(state
                .pulls
                .values()
                .filter(|pull| pull.is_from(&branch))
                .cloned()
                .collect())
        })
        .await
    }

    async fn create_pull_request(
        &self,
        draft: &PullRequestDraft,
    ) -> TrackerResult<RemotePullRequest> {
        let payload = draft.clone();
        self.perform(TrackerOperation::CreatePullRequest, move |state| {
            let duplicate = state.pulls.values().any(|pull| {
                pull.is_from(&payload.head) && pull.state == PullRequestState::Open
            });
            if duplicate {
                return Err(TrackerError::Rejected(format!(
                    "a pull request already exists for {}",
                    payload.head
                )));
            }
            let number = state.allocate()?;
            let pull = RemotePullRequest {
                number: PullRequestNumber::new(number).map_err(TrackerError::client)?,
                title: payload.title,
                head: payload.head.to_string(),
                base: payload.base,
                body: payload.body,
                state: PullRequestState::Open,
                url: format!("{BASE_URL}/pull/{number}"),
            };
            state.pulls.insert(number, pull.clone());
            Ok(pull)
        })
        .await
    }

    async fn update_pull_request_body(
        &self,
        number: PullRequestNumber,
        body: &str,
    ) -> TrackerResult<()> {
        let text = body.to_owned();
        self.perform(TrackerOperation::UpdatePullRequest, move |state| {
            let pull = state
                .pulls
                .get_mut(&number.value())
                .ok_or_else(|| TrackerError::NotFound(format!("pull request #{number}")))?;
            pull.body = text;
            Ok(())
        })
        .await
    }

    async fn request_reviewers(
        &self,
        number: PullRequestNumber,
        reviewers: &Reviewers,
    ) -> TrackerResult<()> {
        let requested = reviewers.clone();
        self.perform(TrackerOperation::RequestReviewers, move |state| {
            state
                .reviewers
                .entry(number.value())
                .or_default()
                .push(requested);
            Ok(())
        })
        .await
    }

    async fn default_branch(&self) -> TrackerResult<String> {
        self.perform(TrackerOperation::DefaultBranch, |state| {
            Ok(state.default_branch.clone())
        })
        .await
    }

    async fn add_to_project(&self, board: &ProjectBoard, issue: &IssueRef) -> TrackerResult<()> {
        let item = (board.number, issue.clone());
        self.perform(TrackerOperation::AddToProject, move |state| {
            if !state.project_items.contains(&item) {
                state.project_items.push(item);
            }
            Ok(())
        })
        .await
    }
}
