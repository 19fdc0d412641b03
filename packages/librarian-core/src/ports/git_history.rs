use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Commit-derived change-frequency metrics for a single file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnMetrics {
    pub total_commits: u32,
    pub total_additions: u32,
    pub total_deletions: u32,
    pub first_commit_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_commit_at: Option<chrono::DateTime<chrono::Utc>>,
    pub days_active: u32,
    pub churn_rate: f64,
    pub commit_frequency: f64,
}

impl ChurnMetrics {
    pub fn recompute_derived(&mut self) {
        if let (Some(first), Some(last)) = (self.first_commit_at, self.last_commit_at) {
            let days = last.signed_duration_since(first).num_days().max(1) as u32;
            self.days_active = days;
            self.churn_rate = (self.total_additions + self.total_deletions) as f64 / days as f64;
            let weeks = (days as f64 / 7.0).max(1.0);
            self.commit_frequency = self.total_commits as f64 / weeks;
        }
    }
}

/// A single author's contribution to a file, used by the ownership
/// extractor to attribute a primary maintainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorContribution {
    pub author_name: String,
    pub author_email: String,
    pub commit_count: u32,
    pub last_commit_at: chrono::DateTime<chrono::Utc>,
}

/// Driven port over a repository's version-control history, implemented
/// with `git2` rather than shelling out to the `git` binary.
pub trait GitHistory: Send + Sync {
    fn churn(&self, path: &str) -> Result<ChurnMetrics>;
    fn contributors(&self, path: &str) -> Result<Vec<AuthorContribution>>;
    /// Files that changed alongside `path` across its commit history,
    /// paired with how many commits they shared, feeding the relationships
    /// extractor's cochange signal.
    fn cochanged_files(&self, path: &str) -> Result<Vec<(String, u32)>>;
}

/// `git2`-backed implementation over a repository checkout.
pub struct Git2History {
    repo_root: PathBuf,
}

impl Git2History {
    pub fn open(repo_root: impl AsRef<Path>) -> Result<Self> {
        let repo_root = repo_root.as_ref().to_path_buf();
        git2::Repository::open(&repo_root).map_err(CoreError::Git)?;
        Ok(Self { repo_root })
    }

    fn repo(&self) -> Result<git2::Repository> {
        git2::Repository::open(&self.repo_root).map_err(CoreError::Git)
    }
}

impl GitHistory for Git2History {
    fn churn(&self, path: &str) -> Result<ChurnMetrics> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk().map_err(CoreError::Git)?;
        revwalk.push_head().map_err(CoreError::Git)?;

        let mut metrics = ChurnMetrics::default();
        for oid in revwalk {
            let oid = oid.map_err(CoreError::Git)?;
            let commit = repo.find_commit(oid).map_err(CoreError::Git)?;
            let tree = commit.tree().map_err(CoreError::Git)?;
            let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

            let diff = repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .map_err(CoreError::Git)?;

            let mut touched = false;
            diff.foreach(
                &mut |delta, _| {
                    if delta.new_file().path().map(|p| p.to_string_lossy() == path).unwrap_or(false) {
                        touched = true;
                    }
                    true
                },
                None,
                None,
                None,
            )
            .map_err(CoreError::Git)?;

            if !touched {
                continue;
            }

            let stats = diff.stats().map_err(CoreError::Git)?;
            metrics.total_commits += 1;
            metrics.total_additions += stats.insertions() as u32;
            metrics.total_deletions += stats.deletions() as u32;

            let when = commit.time();
            let committed_at = chrono::DateTime::from_timestamp(when.seconds(), 0).unwrap_or_else(chrono::Utc::now);
            metrics.last_commit_at = metrics.last_commit_at.or(Some(committed_at));
            metrics.first_commit_at = Some(committed_at);
        }

        metrics.recompute_derived();
        Ok(metrics)
    }

    fn contributors(&self, path: &str) -> Result<Vec<AuthorContribution>> {
        use std::collections::HashMap;

        let repo = self.repo()?;
        let mut revwalk = repo.revwalk().map_err(CoreError::Git)?;
        revwalk.push_head().map_err(CoreError::Git)?;

        let mut by_author: HashMap<String, AuthorContribution> = HashMap::new();
        for oid in revwalk {
            let oid = oid.map_err(CoreError::Git)?;
            let commit = repo.find_commit(oid).map_err(CoreError::Git)?;
            let tree = commit.tree().map_err(CoreError::Git)?;
            let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
            let diff = repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .map_err(CoreError::Git)?;

            let mut touched = false;
            diff.foreach(
                &mut |delta, _| {
                    if delta.new_file().path().map(|p| p.to_string_lossy() == path).unwrap_or(false) {
                        touched = true;
                    }
                    true
                },
                None,
                None,
                None,
            )
            .map_err(CoreError::Git)?;
            if !touched {
                continue;
            }

            let author = commit.author();
            let email = author.email().unwrap_or("unknown").to_string();
            let when = commit.time();
            let committed_at = chrono::DateTime::from_timestamp(when.seconds(), 0).unwrap_or_else(chrono::Utc::now);

            let entry = by_author.entry(email.clone()).or_insert_with(|| AuthorContribution {
                author_name: author.name().unwrap_or("unknown").to_string(),
                author_email: email,
                commit_count: 0,
                last_commit_at: committed_at,
            });
            entry.commit_count += 1;
            if committed_at > entry.last_commit_at {
                entry.last_commit_at = committed_at;
            }
        }

        let mut contributions: Vec<_> = by_author.into_values().collect();
        contributions.sort_by(|a, b| b.commit_count.cmp(&a.commit_count));
        Ok(contributions)
    }

    fn cochanged_files(&self, path: &str) -> Result<Vec<(String, u32)>> {
        use std::collections::HashMap;

        let repo = self.repo()?;
        let mut revwalk = repo.revwalk().map_err(CoreError::Git)?;
        revwalk.push_head().map_err(CoreError::Git)?;

        let mut counts: HashMap<String, u32> = HashMap::new();
        for oid in revwalk {
            let oid = oid.map_err(CoreError::Git)?;
            let commit = repo.find_commit(oid).map_err(CoreError::Git)?;
            let tree = commit.tree().map_err(CoreError::Git)?;
            let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
            let diff = repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
                .map_err(CoreError::Git)?;

            let mut paths = Vec::new();
            diff.foreach(
                &mut |delta, _| {
                    if let Some(p) = delta.new_file().path() {
                        paths.push(p.to_string_lossy().to_string());
                    }
                    true
                },
                None,
                None,
                None,
            )
            .map_err(CoreError::Git)?;

            if paths.iter().any(|p| p == path) {
                for other in paths.iter().filter(|p| p.as_str() != path) {
                    *counts.entry(other.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut result: Vec<_> = counts.into_iter().collect();
        result.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_recompute_derived_handles_single_day() {
        let now = chrono::Utc::now();
        let mut metrics = ChurnMetrics {
            total_commits: 3,
            total_additions: 30,
            total_deletions: 10,
            first_commit_at: Some(now),
            last_commit_at: Some(now),
            ..Default::default()
        };
        metrics.recompute_derived();
        assert_eq!(metrics.days_active, 1);
        assert_eq!(metrics.churn_rate, 40.0);
    }

    #[test]
    fn open_rejects_non_repository_path() {
        let result = Git2History::open(std::env::temp_dir());
        assert!(result.is_err());
    }
}
