//! Repository Acquirer: produces a working tree on disk for a
//! `(repository, ref, maybe_local_path)` tuple.

use crate::config::Config;
use crate::error::{KotaError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct AcquiredTree {
    pub path: PathBuf,
    /// Present only when the tree is a scratch clone owned by this job; a
    /// caller-provided `local_path` is never cleaned up.
    scratch: bool,
}

impl AcquiredTree {
    /// Guaranteed-execution cleanup. Call from a `finally`-equivalent
    /// block on every exit path of the owning job.
    pub fn cleanup(&self) {
        if self.scratch && self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch tree");
            }
        }
    }
}

fn resolve_clone_url(full_name: &str, base_url: &str) -> String {
    if full_name.starts_with("http://")
        || full_name.starts_with("https://")
        || full_name.starts_with("file://")
        || full_name.starts_with('/')
    {
        full_name.to_string()
    } else {
        format!("{}/{full_name}", base_url.trim_end_matches('/'))
    }
}

/// Acquire a working tree for `(full_name, git_ref)`. If `local_path` is
/// `Some` and exists, it is adopted as-is. Otherwise a scratch clone keyed
/// by `(full_name, job_id)` is created (or, if already cloned for this
/// acquirer, fetched and reset to `git_ref`).
pub fn acquire(
    config: &Config,
    full_name: &str,
    git_ref: &str,
    local_path: Option<&Path>,
    job_id: &str,
) -> Result<AcquiredTree> {
    if let Some(p) = local_path {
        if p.exists() {
            info!(path = %p.display(), "using caller-provided local path");
            return Ok(AcquiredTree {
                path: p.to_path_buf(),
                scratch: false,
            });
        }
        return Err(KotaError::InvalidArgument(format!(
            "local_path {} does not exist",
            p.display()
        )));
    }

    let scratch_path = config.scratch_dir.join(format!(
        "{}-{job_id}",
        full_name.replace(['/', ':'], "_")
    ));

    #[cfg(feature = "git-integration")]
    {
        clone_or_fetch(config, full_name, git_ref, &scratch_path)?;
    }
    #[cfg(not(feature = "git-integration"))]
    {
        return Err(KotaError::CloneFailed(
            "git-integration feature not enabled".into(),
        ));
    }

    Ok(AcquiredTree {
        path: scratch_path,
        scratch: true,
    })
}

#[cfg(feature = "git-integration")]
fn clone_or_fetch(
    config: &Config,
    full_name: &str,
    git_ref: &str,
    dest: &Path,
) -> Result<()> {
    use git2::{FetchOptions, RemoteCallbacks, Repository};

    let url = resolve_clone_url(full_name, &config.clone_base_url);

    let repo = if dest.exists() {
        Repository::open(dest)?
    } else {
        std::fs::create_dir_all(dest.parent().unwrap_or(Path::new(".")))?;
        info!(url = %url, dest = %dest.display(), "cloning repository");
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, _username, _allowed| {
            Err(git2::Error::from_str("authentication not configured"))
        });
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder.clone(&url, dest).map_err(|e| {
            if e.class() == git2::ErrorClass::Net {
                KotaError::NetworkTransient(e.message().to_string())
            } else if e.class() == git2::ErrorClass::Http
                || e.message().to_lowercase().contains("auth")
            {
                KotaError::AcquireAuthDenied
            } else {
                KotaError::CloneFailed(e.message().to_string())
            }
        })?
    };

    {
        let mut remote = repo.find_remote("origin").or_else(|_| repo.remote_anonymous(&url))?;
        remote.fetch(&[git_ref], None, None).map_err(|e| {
            if e.class() == git2::ErrorClass::Net {
                KotaError::NetworkTransient(e.message().to_string())
            } else {
                KotaError::RefNotFound(git_ref.to_string())
            }
        })?;
    }

    let (object, reference) = repo
        .revparse_ext(git_ref)
        .map_err(|_| KotaError::RefNotFound(git_ref.to_string()))?;
    repo.checkout_tree(&object, None)?;
    match reference {
        Some(r) if r.is_branch() => {
            repo.set_head(r.name().unwrap_or("HEAD"))?;
        }
        _ => repo.set_head_detached(object.id())?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_short_names_against_base_url() {
        assert_eq!(
            resolve_clone_url("owner/name", "https://github.com/"),
            "https://github.com/owner/name"
        );
    }

    #[test]
    fn passes_through_full_urls() {
        assert_eq!(
            resolve_clone_url("https://example.com/a/b.git", "https://github.com/"),
            "https://example.com/a/b.git"
        );
    }

    #[test]
    fn missing_local_path_is_invalid_argument() {
        let config = Config::default();
        let result = acquire(&config, "o/n", "main", Some(Path::new("/does/not/exist")), "job1");
        assert!(matches!(result, Err(KotaError::InvalidArgument(_))));
    }
}
