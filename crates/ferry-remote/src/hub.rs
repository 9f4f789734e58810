use crate::error::RemoteError;
use crate::http::RECOVERABLE_STATUS_CODES;
use hf_hub::api::sync::{ApiBuilder, ApiError, ApiRepo};
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};

/// The reserved repository-indirection scheme.
///
/// `hub://` identifiers are not fetched through the normal scheme-client
/// path: the hub client library maintains its own cache layout, so it is
/// handed the work wholesale and returns a final local path.
pub const HUB_SCHEME: &str = "hub";

/// Resolve a `hub://` identifier to a local path, downloading through the
/// hub client if necessary. The hub keeps its own cache under
/// `<cache_dir>/hub`.
///
/// Identifier forms:
/// - `hub://repo-id`: whole-repository snapshot
/// - `hub://org/name/path/to/file`: a file within repository `org/name`
/// - `hub://a/b`: ambiguous; tried first as file `b` in repository `a`,
///   then as repository `a/b` if the first read fails with
///   not-found/unauthorized
///
/// A `@revision` suffix on the repository part pins a revision, e.g.
/// `hub://org/name@main/config.json`.
pub fn hub_get(url: &str, cache_dir: &Path) -> Result<PathBuf, RemoteError> {
    let identifier = url
        .strip_prefix("hub://")
        .filter(|identifier| !identifier.is_empty())
        .ok_or_else(|| RemoteError::InvalidUrl {
            provider: "hub",
            url: url.to_string(),
        })?;

    let segments: Vec<&str> = identifier.split('/').collect();
    match segments.len() {
        1 => download(segments[0], None, cache_dir),
        2 => match download(segments[0], Some(segments[1]), cache_dir) {
            Ok(path) => Ok(path),
            Err(err) if retry_as_repository(&err) => download(identifier, None, cache_dir),
            Err(err) => Err(err),
        },
        _ => download(
            &segments[..2].join("/"),
            Some(&segments[2..].join("/")),
            cache_dir,
        ),
    }
}

fn download(
    repo_spec: &str,
    filename: Option<&str>,
    cache_dir: &Path,
) -> Result<PathBuf, RemoteError> {
    let (repo_id, revision) = match repo_spec.split_once('@') {
        Some((repo_id, revision)) => (repo_id, Some(revision)),
        None => (repo_spec, None),
    };

    let api = ApiBuilder::new()
        .with_cache_dir(cache_dir.join("hub"))
        .with_progress(false)
        .build()
        .map_err(|err| map_api_error(repo_id, err))?;

    let repo = match revision {
        Some(revision) => {
            Repo::with_revision(repo_id.to_string(), RepoType::Model, revision.to_string())
        }
        None => Repo::new(repo_id.to_string(), RepoType::Model),
    };
    let repo = api.repo(repo);

    match filename {
        Some(filename) => repo
            .get(filename)
            .map_err(|err| map_api_error(repo_id, err)),
        None => snapshot(&repo, repo_id),
    }
}

/// Download every file of the repository and return the snapshot directory.
fn snapshot(repo: &ApiRepo, repo_id: &str) -> Result<PathBuf, RemoteError> {
    let info = repo.info().map_err(|err| map_api_error(repo_id, err))?;

    let mut root: Option<PathBuf> = None;
    for sibling in &info.siblings {
        let path = repo
            .get(&sibling.rfilename)
            .map_err(|err| map_api_error(repo_id, err))?;
        if root.is_none() {
            root = Some(snapshot_root(&path, &sibling.rfilename));
        }
    }

    root.ok_or_else(|| RemoteError::NotFound {
        resource: repo_id.to_string(),
    })
}

/// Strip a repo-relative filename's components off the downloaded path to
/// recover the snapshot directory it lives in.
fn snapshot_root(downloaded: &Path, rfilename: &str) -> PathBuf {
    let mut root = downloaded.to_path_buf();
    for _ in Path::new(rfilename).components() {
        root.pop();
    }
    root
}

fn retry_as_repository(err: &RemoteError) -> bool {
    match err {
        RemoteError::NotFound { .. } => true,
        RemoteError::Status { status, .. } => *status == 401,
        _ => false,
    }
}

fn map_api_error(resource: &str, err: ApiError) -> RemoteError {
    match err {
        ApiError::RequestError(request_err) => match *request_err {
            ureq::Error::Status(404, _) => RemoteError::NotFound {
                resource: resource.to_string(),
            },
            ureq::Error::Status(code, _) if RECOVERABLE_STATUS_CODES.contains(&code) => {
                RemoteError::Recoverable {
                    resource: resource.to_string(),
                    reason: format!("hub returned status {code}"),
                }
            }
            ureq::Error::Status(code, _) => RemoteError::Status {
                resource: resource.to_string(),
                status: code,
            },
            ureq::Error::Transport(transport) => RemoteError::Recoverable {
                resource: resource.to_string(),
                reason: transport.to_string(),
            },
        },
        ApiError::IoError(err) => RemoteError::Io(err),
        other => RemoteError::Backend {
            message: format!("hub request failed for {resource}: {other}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_root_strips_nested_filenames() {
        let downloaded = Path::new("/cache/hub/models--org--name/snapshots/abc/sub/dir/file.bin");
        assert_eq!(
            snapshot_root(downloaded, "sub/dir/file.bin"),
            Path::new("/cache/hub/models--org--name/snapshots/abc")
        );
    }

    #[test]
    fn bare_scheme_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            hub_get("hub://", tmp.path()).unwrap_err(),
            RemoteError::InvalidUrl { provider: "hub", .. }
        ));
    }
}
