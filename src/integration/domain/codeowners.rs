//! CODEOWNERS rules and reviewer selection.

/// One `pattern owner...` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OwnerRule {
    pattern: String,
    owners: Vec<String>,
}

/// Reviewers to request on a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reviewers {
    /// Individual user logins, without the leading `@`.
    pub users: Vec<String>,
    /// Team slugs (`team` from `@org/team`).
    pub teams: Vec<String>,
}

impl Reviewers {
    /// Returns `true` when nobody is to be requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.teams.is_empty()
    }

    fn add(&mut self, owner: &str) {
        let Some(handle) = owner.strip_prefix('@') else {
            return;
        };
        let (target, value) = handle.split_once('/').map_or_else(
            || (&mut self.users, handle),
            |(_, team)| (&mut self.teams, team),
        );
        if !value.is_empty() && !target.iter().any(|existing| existing == value) {
            target.push(value.to_owned());
        }
    }
}

/// Parsed CODEOWNERS file.
///
/// Matching follows the tracker's semantics: the last rule matching a path
/// decides its owners. Email owners are ignored because they cannot be
/// requested as reviewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeOwners {
    rules: Vec<OwnerRule>,
}

impl CodeOwners {
    /// Parses CODEOWNERS text, skipping comments and blank lines.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let rules = content
            .lines()
            .map(|line| line.split_once('#').map_or(line, |(head, _)| head).trim())
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let pattern = parts.next()?.to_owned();
                let owners = parts.map(str::to_owned).collect();
                Some(OwnerRule { pattern, owners })
            })
            .collect();
        Self { rules }
    }

    /// Returns `true` when no rules were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the owners of `path`, or an empty slice when unowned.
    #[must_use]
    pub fn owners_for(&self, path: &str) -> &[String] {
        let normalized = path.trim_start_matches("./").trim_start_matches('/');
        self.rules
            .iter()
            .rev()
            .find(|rule| pattern_matches(&rule.pattern, normalized))
            .map_or(&[], |rule| rule.owners.as_slice())
    }

    /// Collects reviewers owning any of `paths`, excluding `author`.
    #[must_use]
    pub fn reviewers_for<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a str>,
        author: Option<&str>,
    ) -> Reviewers {
        let mut reviewers = Reviewers::default();
        for path in paths {
            for owner in self.owners_for(path) {
                reviewers.add(owner);
            }
        }
        if let Some(login) = author {
            reviewers.users.retain(|user| user != login);
        }
        reviewers
    }
}

/// Matches a CODEOWNERS pattern against a repository-relative path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let anchored = pattern.starts_with('/');
    let body = pattern.trim_start_matches('/');
    let directory_only = body.ends_with('/');
    let glob = body.trim_end_matches('/');
    if glob.is_empty() {
        return false;
    }

    let components: Vec<&str> = path.split('/').collect();
    let count = components.len();
    let starts: Vec<usize> = if anchored || glob.contains('/') {
        vec![0]
    } else {
        (0..count).collect()
    };

    starts.iter().any(|&start| {
        ((start + 1)..=count).any(|end| {
            let Some(parts) = components.get(start..end) else {
                return false;
            };
            let is_directory = end < count;
            (!directory_only || is_directory)
                && glob_match(glob.as_bytes(), parts.join("/").as_bytes())
        })
    })
}

/// Glob matcher supporting `*` (within a segment), `**` (across segments)
/// and `?`.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => {
            if let Some((b'*', after)) = rest.split_first() {
                let tail = after.strip_prefix(b"/").unwrap_or(after);
                return (0..=text.len())
                    .filter_map(|split| text.get(split..))
                    .any(|remainder| glob_match(tail, remainder));
            }
            for split in 0..=text.len() {
                let Some((consumed, remainder)) = text.get(..split).zip(text.get(split..)) else {
                    return false;
                };
                if consumed.contains(&b'/') {
                    return false;
                }
                if glob_match(rest, remainder) {
                    return true;
                }
            }
            false
        }
        Some((b'?', rest)) => text
            .split_first()
            .is_some_and(|(ch, remainder)| *ch != b'/' && glob_match(rest, remainder)),
        Some((expected, rest)) => text
            .split_first()
            .is_some_and(|(ch, remainder)| ch == expected && glob_match(rest, remainder)),
    }
}
