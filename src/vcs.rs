// src/vcs.rs

use crate::error::{MinerError, Result};
use crate::model::{TagOrder, VersionTag, Window};
use crate::version;
use git2::build::CheckoutBuilder;
use git2::{Repository, Signature};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// The operations the pipeline needs from version control.
pub trait VersionControl {
    /// Tag names paired with the commit time of the tagged commit, oldest first.
    fn list_tags(&self) -> Result<Vec<(String, i64)>>;

    /// Sets aside uncommitted modifications of the working tree.
    fn shelve(&mut self) -> std::result::Result<(), git2::Error>;

    /// Moves the working tree to the named tag.
    fn checkout(&mut self, tag: &str) -> std::result::Result<(), git2::Error>;

    fn workdir(&self) -> &Path;
}

pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepository {
    /// Opens the checkout at `path`, cloning `url` into it first when the
    /// path does not exist yet.
    pub fn open_or_clone(path: &Path, url: Option<&str>) -> Result<Self> {
        let repo = if path.exists() {
            info!("Opening repository at {}", path.display());
            Repository::open(path).map_err(|source| MinerError::OpenRepository {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            let url = url.ok_or_else(|| MinerError::MissingRepository(path.to_path_buf()))?;
            println!("Cloning {} into {}", url, path.display());
            Repository::clone(url, path).map_err(|source| MinerError::Clone {
                url: url.to_string(),
                path: path.to_path_buf(),
                source,
            })?
        };

        let workdir = match repo.workdir() {
            Some(dir) if !repo.is_bare() => dir.to_path_buf(),
            _ => return Err(MinerError::BareRepository(path.to_path_buf())),
        };

        Ok(GitRepository { repo, workdir })
    }

    fn tagged_commit(&self, tag: &str) -> std::result::Result<git2::Commit<'_>, git2::Error> {
        self.repo
            .revparse_single(&format!("refs/tags/{tag}"))?
            .peel_to_commit()
    }
}

impl VersionControl for GitRepository {
    fn list_tags(&self) -> Result<Vec<(String, i64)>> {
        let names = self.repo.tag_names(None).map_err(MinerError::TagEnumeration)?;

        let mut tags = Vec::with_capacity(names.len());
        for name in names.iter().flatten() {
            match self.tagged_commit(name) {
                Ok(commit) => tags.push((name.to_string(), commit.time().seconds())),
                Err(e) => warn!("Ignoring tag {name}: it does not point at a commit ({e})"),
            }
        }

        // Chronological by tagged commit; versions break ties so the order is stable.
        tags.sort_by(|(a, ta), (b, tb)| ta.cmp(tb).then_with(|| version::compare_names(a, b)));
        Ok(tags)
    }

    fn shelve(&mut self) -> std::result::Result<(), git2::Error> {
        let signature = self
            .repo
            .signature()
            .or_else(|_| Signature::now("tag-miner", "tag-miner@localhost"))?;
        let oid = self
            .repo
            .stash_save(&signature, "tag-miner: shelved before checkout", None)?;
        debug!("Shelved local changes as {oid}");
        Ok(())
    }

    fn checkout(&mut self, tag: &str) -> std::result::Result<(), git2::Error> {
        let commit = self.tagged_commit(tag)?;
        let mut opts = CheckoutBuilder::new();
        opts.force();
        self.repo.checkout_tree(commit.as_object(), Some(&mut opts))?;
        self.repo.set_head_detached(commit.id())
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Lists every tag and cuts the processing window out of it. Failure here
/// is fatal: a run never works from a partial tag list.
pub fn enumerate<V: VersionControl + ?Sized>(vcs: &V, size: usize, order: TagOrder) -> Result<Window> {
    let tags = vcs.list_tags()?;
    info!("Found {} tags, mining at most {}", tags.len(), size);
    Ok(Window::select(tags, size, order))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    CheckedOut { shelved: bool },
    Failed(String),
}

/// Shelves local edits (best effort) and checks out `tag`.
pub fn transition<V: VersionControl + ?Sized>(vcs: &mut V, tag: &VersionTag) -> Transition {
    let shelved = match vcs.shelve() {
        Ok(()) => true,
        Err(e) => {
            debug!("Nothing shelved before {}: {}", tag.name, e.message());
            false
        }
    };

    match vcs.checkout(&tag.name) {
        Ok(()) => Transition::CheckedOut { shelved },
        Err(e) => {
            warn!("Checkout of {} failed: {}", tag.name, e.message());
            Transition::Failed(e.message().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Commit, Oid, Time};
    use std::fs;

    fn commit_file(repo: &Repository, name: &str, content: &str, time: i64) -> Oid {
        let workdir = repo.workdir().unwrap();
        fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new("Tester", "tester@example.com", &Time::new(time, 0)).unwrap();
        let parents: Vec<Commit> = repo.head().ok().and_then(|h| h.peel_to_commit().ok()).into_iter().collect();
        let parent_refs: Vec<&Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "release", &tree, &parent_refs).unwrap()
    }

    fn tag(repo: &Repository, name: &str, oid: Oid) {
        let object = repo.find_object(oid, None).unwrap();
        repo.tag_lightweight(name, &object, false).unwrap();
    }

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo");
        let repo = Repository::init(&path).unwrap();
        let first = commit_file(&repo, "VERSION", "1.9", 1_000);
        tag(&repo, "1.9", first);
        let second = commit_file(&repo, "VERSION", "1.10", 2_000);
        tag(&repo, "1.10", second);
        let third = commit_file(&repo, "VERSION", "2.0", 3_000);
        tag(&repo, "2.0", third);
        (dir, path)
    }

    #[test]
    fn lists_tags_chronologically() {
        let (_dir, path) = fixture();
        let repo = GitRepository::open_or_clone(&path, None).unwrap();
        let names: Vec<_> = repo.list_tags().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["1.9", "1.10", "2.0"]);
    }

    #[test]
    fn enumerate_truncates_to_window() {
        let (_dir, path) = fixture();
        let repo = GitRepository::open_or_clone(&path, None).unwrap();
        let window = enumerate(&repo, 2, TagOrder::NewestFirst).unwrap();
        let names: Vec<_> = window.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["2.0", "1.10"]);
    }

    #[test]
    fn transition_moves_working_tree_and_shelves_edits() {
        let (_dir, path) = fixture();
        let mut repo = GitRepository::open_or_clone(&path, None).unwrap();
        fs::write(path.join("VERSION"), "local edit").unwrap();

        let tag = VersionTag { name: "1.9".into(), timestamp: 1_000, position: 0 };
        assert_eq!(transition(&mut repo, &tag), Transition::CheckedOut { shelved: true });
        assert_eq!(fs::read_to_string(path.join("VERSION")).unwrap(), "1.9");

        // A clean tree has nothing to shelve; the checkout still goes ahead.
        let tag = VersionTag { name: "2.0".into(), timestamp: 3_000, position: 1 };
        assert_eq!(transition(&mut repo, &tag), Transition::CheckedOut { shelved: false });
        assert_eq!(fs::read_to_string(path.join("VERSION")).unwrap(), "2.0");
    }

    #[test]
    fn unknown_tag_fails_the_transition_only() {
        let (_dir, path) = fixture();
        let mut repo = GitRepository::open_or_clone(&path, None).unwrap();
        let tag = VersionTag { name: "9.9".into(), timestamp: 0, position: 0 };
        assert!(matches!(transition(&mut repo, &tag), Transition::Failed(_)));
    }

    #[test]
    fn missing_repository_without_url_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitRepository::open_or_clone(&dir.path().join("absent"), None).err().unwrap();
        assert!(matches!(err, MinerError::MissingRepository(_)));
    }

    #[test]
    fn non_repository_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitRepository::open_or_clone(dir.path(), None).err().unwrap();
        assert!(matches!(err, MinerError::OpenRepository { .. }));
    }

    #[test]
    fn bare_repository_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path().join("bare.git")).unwrap();
        let err = GitRepository::open_or_clone(&dir.path().join("bare.git"), None).err().unwrap();
        assert!(matches!(err, MinerError::BareRepository(_)));
    }
}
