//! In-memory Git repository model.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::integration::{
    domain::{BranchName, CommitMessage},
    ports::{BranchStart, VcsError, VcsResult, VersionControl},
};

/// Thread-safe model of a working tree, its local branches and one remote.
///
/// Branches are modelled as ordered lists of commit identifiers. A push
/// succeeds only when the remote branch is a prefix of the local one, which
/// is exactly the fast-forward rule; forcing is not supported.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    state: Arc<RwLock<RepositoryState>>,
}

#[derive(Debug)]
struct RepositoryState {
    current: String,
    local: HashMap<String, Vec<String>>,
    remote: HashMap<String, Vec<String>>,
    unstaged: Vec<String>,
    staged: Vec<String>,
    messages: Vec<String>,
    next_commit: u64,
    transient_push_failures: usize,
    rebase_conflicts: bool,
    pushes: usize,
}

impl InMemoryRepository {
    /// Creates a repository with one commit on `base`, pushed to the remote.
    #[must_use]
    pub fn new(base: &str) -> Self {
        let root = vec!["c0".to_owned()];
        Self {
            state: Arc::new(RwLock::new(RepositoryState {
                current: base.to_owned(),
                local: HashMap::from([(base.to_owned(), root.clone())]),
                remote: HashMap::from([(base.to_owned(), root)]),
                unstaged: Vec::new(),
                staged: Vec::new(),
                messages: Vec::new(),
                next_commit: 1,
                transient_push_failures: 0,
                rebase_conflicts: false,
                pushes: 0,
            })),
        }
    }

    /// Records an uncommitted change to `path` in the working tree.
    pub fn write_file(&self, path: &str) {
        if let Ok(mut state) = self.state.write()
            && !state.unstaged.iter().any(|existing| existing == path)
        {
            state.unstaged.push(path.to_owned());
        }
    }

    /// Adds a commit to the remote branch only, making the local copy diverge.
    pub fn push_foreign_commit(&self, branch: &str) {
        if let Ok(mut state) = self.state.write() {
            let id = state.next_id();
            let base = state
                .remote
                .get(branch)
                .or_else(|| state.local.get(branch))
                .cloned()
                .unwrap_or_default();
            let mut commits = base;
            commits.push(id);
            state.remote.insert(branch.to_owned(), commits);
        }
    }

    /// Makes the next `count` pushes fail transiently.
    pub fn fail_pushes(&self, count: usize) {
        if let Ok(mut state) = self.state.write() {
            state.transient_push_failures = count;
        }
    }

    /// Makes every rebase conflict.
    pub fn conflict_on_rebase(&self) {
        if let Ok(mut state) = self.state.write() {
            state.rebase_conflicts = true;
        }
    }

    /// Returns the checked-out branch.
    #[must_use]
    pub fn current_branch(&self) -> String {
        self.state
            .read()
            .map(|state| state.current.clone())
            .unwrap_or_default()
    }

    /// Returns the commits on the remote copy of `branch`.
    #[must_use]
    pub fn remote_commits(&self, branch: &str) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.remote.get(branch).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Returns every commit message in creation order.
    #[must_use]
    pub fn commit_messages(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.messages.clone())
            .unwrap_or_default()
    }

    /// Returns the number of successful pushes.
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.state.read().map(|state| state.pushes).unwrap_or(0)
    }

    fn read_state(&self) -> VcsResult<std::sync::RwLockReadGuard<'_, RepositoryState>> {
        self.state
            .read()
            .map_err(|err| VcsError::io(std::io::Error::other(err.to_string())))
    }

    fn write_state(&self) -> VcsResult<std::sync::RwLockWriteGuard<'_, RepositoryState>> {
        self.state
            .write()
            .map_err(|err| VcsError::io(std::io::Error::other(err.to_string())))
    }
}

impl RepositoryState {
    fn next_id(&mut self) -> String {
        let id = format!("c{}", self.next_commit);
        self.next_commit = self.next_commit.saturating_add(1);
        id
    }

    fn branch_commits(&self, branch: &str) -> VcsResult<&Vec<String>> {
        self.local.get(branch).ok_or_else(|| VcsError::Command {
            command: format!("git rev-parse {branch}"),
            stderr: format!("unknown revision {branch}"),
        })
    }
}

#[async_trait]
impl VersionControl for InMemoryRepository {
    async fn local_branch_exists(&self, branch: &BranchName) -> VcsResult<bool> {
        Ok(self.read_state()?.local.contains_key(branch.as_str()))
    }

    async fn remote_branch_exists(&self, branch: &BranchName) -> VcsResult<bool> {
        Ok(self.read_state()?.remote.contains_key(branch.as_str()))
    }

    async fn checkout(&self, branch: &BranchName, start: BranchStart) -> VcsResult<()> {
        let mut state = self.write_state()?;
        let name = branch.to_string();
        let commits = match start {
            BranchStart::Existing => state.branch_commits(&name)?.clone(),
            BranchStart::TrackRemote => state.remote.get(&name).cloned().ok_or_else(|| {
                VcsError::Command {
                    command: format!("git checkout --track origin/{name}"),
                    stderr: format!("origin/{name} does not exist"),
                }
            })?,
            BranchStart::NewFromHead => {
                let current = state.current.clone();
                state.branch_commits(&current)?.clone()
            }
        };
        state.local.insert(name.clone(), commits);
        state.current = name;
        Ok(())
    }

    async fn stage(&self, paths: &[String]) -> VcsResult<()> {
        let mut state = self.write_state()?;
        let wanted: HashSet<&str> = paths.iter().map(String::as_str).collect();
        let (selected, remaining): (Vec<String>, Vec<String>) = state
            .unstaged
            .drain(..)
            .partition(|path| wanted.is_empty() || wanted.contains(path.as_str()));
        state.unstaged = remaining;
        state.staged.extend(selected);
        Ok(())
    }

    async fn has_staged_changes(&self) -> VcsResult<bool> {
        Ok(!self.read_state()?.staged.is_empty())
    }

    async fn commit(&self, message: &CommitMessage) -> VcsResult<String> {
        let mut state = self.write_state()?;
        if state.staged.is_empty() {
            return Err(VcsError::Command {
                command: "git commit".to_owned(),
                stderr: "nothing to commit".to_owned(),
            });
        }
        let id = state.next_id();
        let current = state.current.clone();
        state
            .local
            .entry(current)
            .or_default()
            .push(id.clone());
        state.staged.clear();
        state.messages.push(message.to_string());
        Ok(id)
    }

    async fn head_commit(&self) -> VcsResult<String> {
        let state = self.read_state()?;
        state
            .branch_commits(&state.current)?
            .last()
            .cloned()
            .ok_or_else(|| VcsError::Command {
                command: "git rev-parse HEAD".to_owned(),
                stderr: "empty branch".to_owned(),
            })
    }

    async fn commits_ahead(&self, base: &str) -> VcsResult<u64> {
        let state = self.read_state()?;
        let base_commits: HashSet<&String> = state
            .remote
            .get(base)
            .or_else(|| state.local.get(base))
            .map(|commits| commits.iter().collect())
            .unwrap_or_default();
        let ahead = state
            .branch_commits(&state.current)?
            .iter()
            .filter(|commit| !base_commits.contains(commit))
            .count();
        Ok(u64::try_from(ahead).unwrap_or(u64::MAX))
    }

    async fn push(&self, branch: &BranchName) -> VcsResult<()> {
        let mut state = self.write_state()?;
        if state.transient_push_failures > 0 {
            state.transient_push_failures -= 1;
            return Err(VcsError::Transient("connection reset by peer".to_owned()));
        }
        let name = branch.to_string();
        let local = state.branch_commits(&name)?.clone();
        let fast_forward = state
            .remote
            .get(&name)
            .is_none_or(|remote| local.starts_with(remote));
        if !fast_forward {
            return Err(VcsError::PushRejected(name));
        }
        state.remote.insert(name, local);
        state.pushes = state.pushes.saturating_add(1);
        Ok(())
    }

    async fn rebase_onto_remote(&self, branch: &BranchName) -> VcsResult<()> {
        let mut state = self.write_state()?;
        let name = branch.to_string();
        if state.rebase_conflicts {
            return Err(VcsError::RebaseConflict(name));
        }
        let remote = state.remote.get(&name).cloned().unwrap_or_default();
        let local = state.branch_commits(&name)?.clone();
        let mut rebased = remote.clone();
        rebased.extend(local.into_iter().filter(|commit| !remote.contains(commit)));
        state.local.insert(name, rebased);
        Ok(())
    }
}
