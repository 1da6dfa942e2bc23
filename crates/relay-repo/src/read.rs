//! The read path: resolve a branch head once, then serve a file, synthesize a
//! directory listing, or build a not-found document.
//!
//! Everything is read from a single commit snapshot, so a concurrent write
//! can never show through half-applied.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use relay_store::{lookup_path, read_blob, read_commit, read_tree, EntryMode, Located, ObjectStore};
use relay_types::{ObjectId, RepoPath};
use serde::Serialize;

use crate::content::{
    content_type, is_disallowed, DIRECTORY_STYLESHEET, NOT_FOUND_DOCUMENT, THEME_STYLESHEET,
};
use crate::error::{EngineError, EngineResult};
use crate::repository::Repository;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    pub kind: EntryMode,
    pub href: String,
}

/// A generated directory view. Directories come first, then files; each
/// group is ordered by name bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub repo: String,
    pub branch: String,
    pub commit: Option<ObjectId>,
    pub path: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub entries: Vec<ListingEntry>,
    /// Stylesheet hrefs to apply, global theme first.
    pub stylesheets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileContent {
    pub repo: String,
    pub branch: String,
    pub commit: ObjectId,
    pub path: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundPage {
    pub repo: String,
    pub branch: String,
    pub commit: Option<ObjectId>,
    pub path: String,
    /// Markdown source of the branch's custom not-found document.
    pub custom_page: Option<String>,
    /// Listing of the nearest existing ancestor directory.
    pub nearest: Listing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    File(FileContent),
    Directory(Listing),
    NotFound(NotFoundPage),
}

impl ReadOutcome {
    pub fn commit(&self) -> Option<ObjectId> {
        match self {
            Self::File(f) => Some(f.commit),
            Self::Directory(l) => l.commit,
            Self::NotFound(n) => n.commit,
        }
    }
}

/// Bytes escaped inside one path segment of a generated link: the URL path
/// set plus `%` and `/`, so names such as `a b#1.md` or `x?.md` survive.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encoded link to `path`, keeping the trailing slash of a directory.
pub fn href(path: &RepoPath) -> String {
    if path.is_root() {
        return "/".into();
    }
    let mut out = String::new();
    for segment in path.segments() {
        out.push('/');
        out.extend(utf8_percent_encode(segment, SEGMENT));
    }
    if path.wants_directory() {
        out.push('/');
    }
    out
}

/// Where a path landed. `Dir(None)` is the root of an unborn branch.
enum Spot {
    File(ObjectId),
    Dir(Option<ObjectId>),
}

struct Snapshot<'a> {
    repo: &'a Repository,
    branch: &'a str,
    commit: Option<ObjectId>,
    root: Option<ObjectId>,
}

impl<'a> Snapshot<'a> {
    fn store(&self) -> &dyn ObjectStore {
        self.repo.objects()
    }

    fn locate(&self, segments: &[impl AsRef<str>]) -> EngineResult<Option<Spot>> {
        let segments: Vec<String> = segments.iter().map(|s| s.as_ref().to_string()).collect();
        let Some(root) = self.root else {
            return Ok(segments.is_empty().then_some(Spot::Dir(None)));
        };
        Ok(lookup_path(self.store(), &root, &segments)?.map(|l| match l {
            Located::File(id) => Spot::File(id),
            Located::Directory(id) => Spot::Dir(Some(id)),
        }))
    }

    fn listing(&self, dir: &RepoPath, tree: Option<ObjectId>) -> EngineResult<Listing> {
        let tree = match tree {
            Some(id) => read_tree(self.store(), &id)?,
            None => relay_store::Tree::empty(),
        };
        let dir = dir.as_directory();

        let mut entries: Vec<ListingEntry> = tree
            .entries
            .iter()
            .map(|e| {
                let target = dir.join(&e.name);
                let target = if e.mode.is_directory() { target.as_directory() } else { target };
                ListingEntry {
                    name: e.name.clone(),
                    kind: e.mode,
                    href: href(&target),
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.kind
                .is_directory()
                .cmp(&a.kind.is_directory())
                .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes()))
        });

        let mut stylesheets = Vec::new();
        if let Some(Spot::File(_)) = self.locate(THEME_STYLESHEET)? {
            stylesheets.push(format!("/{}", THEME_STYLESHEET.join("/")));
        }
        if tree
            .get(DIRECTORY_STYLESHEET)
            .is_some_and(|e| !e.mode.is_directory())
        {
            stylesheets.push(href(&dir.join(DIRECTORY_STYLESHEET)));
        }

        Ok(Listing {
            repo: self.repo.name().to_string(),
            branch: self.branch.to_string(),
            commit: self.commit,
            path: dir.to_url_path(),
            breadcrumbs: breadcrumbs(&dir),
            entries,
            stylesheets,
        })
    }

    fn not_found(&self, path: &RepoPath) -> EngineResult<NotFoundPage> {
        let custom_page = match self.locate(NOT_FOUND_DOCUMENT)? {
            Some(Spot::File(id)) => {
                Some(String::from_utf8_lossy(&read_blob(self.store(), &id)?).into_owned())
            }
            _ => None,
        };

        let mut candidate = path.parent();
        let nearest = loop {
            let dir = candidate.unwrap_or_else(RepoPath::root);
            if let Some(Spot::Dir(tree)) = self.locate(dir.segments())? {
                break self.listing(&dir, tree)?;
            }
            candidate = dir.parent();
        };

        Ok(NotFoundPage {
            repo: self.repo.name().to_string(),
            branch: self.branch.to_string(),
            commit: self.commit,
            path: path.to_url_path(),
            custom_page,
            nearest,
        })
    }
}

fn breadcrumbs(dir: &RepoPath) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: "/".into(),
        href: "/".into(),
    }];
    let mut prefix = RepoPath::root();
    for segment in dir.segments() {
        prefix = prefix.join(segment).as_directory();
        crumbs.push(Breadcrumb {
            name: segment.clone(),
            href: href(&prefix),
        });
    }
    crumbs
}

/// Read `path` on `branch`.
///
/// Disallowed extensions are refused before anything is looked up. A
/// missing branch is an error; a missing path is a [`ReadOutcome::NotFound`].
pub fn read_path(repo: &Repository, branch: &str, path: &RepoPath) -> EngineResult<ReadOutcome> {
    if is_disallowed(path) {
        return Err(EngineError::DisallowedExtension(path.to_url_path()));
    }
    let commit = repo.head(branch)?;
    let root = match commit {
        Some(id) => Some(read_commit(repo.objects(), &id)?.tree),
        None => None,
    };
    let snapshot = Snapshot {
        repo,
        branch,
        commit,
        root,
    };

    match snapshot.locate(path.segments())? {
        // `/a.md/` names a directory, and there is none.
        Some(Spot::File(_)) if path.wants_directory() => {
            Ok(ReadOutcome::NotFound(snapshot.not_found(path)?))
        }
        Some(Spot::File(blob)) => Ok(ReadOutcome::File(FileContent {
            repo: repo.name().to_string(),
            branch: branch.to_string(),
            // A file is only reachable through a commit.
            commit: commit.ok_or_else(|| EngineError::Internal("file without commit".into()))?,
            path: path.to_url_path(),
            content_type: content_type(path),
            bytes: read_blob(repo.objects(), &blob)?,
        })),
        Some(Spot::Dir(tree)) => Ok(ReadOutcome::Directory(snapshot.listing(path, tree)?)),
        None => Ok(ReadOutcome::NotFound(snapshot.not_found(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_store::{upsert_file, write_blob, write_commit, Commit};

    fn seg(path: &str) -> Vec<String> {
        path.trim_start_matches('/').split('/').map(String::from).collect()
    }

    /// Commit `files` onto an in-memory repo's `main`.
    fn repo_with(files: &[(&str, &str)]) -> Repository {
        let repo = Repository::in_memory("docs");
        repo.ensure_branch("main").unwrap();
        let mut root = None;
        for (path, body) in files {
            let blob = write_blob(repo.objects(), body.as_bytes()).unwrap();
            root = Some(upsert_file(repo.objects(), root.as_ref(), &seg(path), blob).unwrap());
        }
        if let Some(root) = root {
            let commit = write_commit(repo.objects(), &Commit::new(root, None, "seed")).unwrap();
            repo.refs().compare_and_swap("main", None, commit).unwrap();
        }
        repo
    }

    fn p(raw: &str) -> RepoPath {
        RepoPath::parse(raw).unwrap()
    }

    #[test]
    fn serves_file_bytes() {
        let repo = repo_with(&[("/docs/a.md", "hello")]);
        match read_path(&repo, "main", &p("/docs/a.md")).unwrap() {
            ReadOutcome::File(f) => {
                assert_eq!(f.bytes, b"hello");
                assert_eq!(f.content_type, "text/markdown; charset=utf-8");
                assert_eq!(Some(f.commit), repo.head("main").unwrap());
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn listing_puts_directories_first() {
        let repo = repo_with(&[
            ("/b.md", "b"),
            ("/A.md", "a"),
            ("/zeta/x.md", "x"),
            ("/alpha/y.md", "y"),
        ]);
        let ReadOutcome::Directory(listing) = read_path(&repo, "main", &p("/")).unwrap() else {
            panic!("expected listing");
        };
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta", "A.md", "b.md"]);
        assert_eq!(listing.entries[0].href, "/alpha/");
        assert_eq!(listing.entries[2].href, "/A.md");
    }

    #[test]
    fn directory_without_trailing_slash() {
        let repo = repo_with(&[("/docs/deep/a.md", "a")]);
        let ReadOutcome::Directory(listing) = read_path(&repo, "main", &p("/docs")).unwrap() else {
            panic!("expected listing");
        };
        assert_eq!(listing.path, "/docs/");
        assert_eq!(listing.entries[0].href, "/docs/deep/");
        let crumbs: Vec<_> = listing.breadcrumbs.iter().map(|b| b.href.as_str()).collect();
        assert_eq!(crumbs, ["/", "/docs/"]);
    }

    #[test]
    fn not_found_lists_nearest_ancestor() {
        let repo = repo_with(&[("/docs/a.md", "a")]);
        let ReadOutcome::NotFound(page) =
            read_path(&repo, "main", &p("/docs/missing/file.md")).unwrap()
        else {
            panic!("expected not found");
        };
        assert_eq!(page.path, "/docs/missing/file.md");
        assert_eq!(page.nearest.path, "/docs/");
        assert!(page.custom_page.is_none());

        let ReadOutcome::NotFound(page) = read_path(&repo, "main", &p("/missing/file.md")).unwrap()
        else {
            panic!("expected not found");
        };
        assert_eq!(page.nearest.path, "/");
    }

    #[test]
    fn custom_not_found_and_styles() {
        let repo = repo_with(&[
            ("/.relay/404.md", "# Lost?"),
            ("/.relay/theme.css", "body{}"),
            ("/docs/style.css", "h1{}"),
            ("/docs/a.md", "a"),
        ]);
        let ReadOutcome::NotFound(page) = read_path(&repo, "main", &p("/docs/nope.md")).unwrap()
        else {
            panic!("expected not found");
        };
        assert_eq!(page.custom_page.as_deref(), Some("# Lost?"));
        assert_eq!(
            page.nearest.stylesheets,
            ["/.relay/theme.css", "/docs/style.css"]
        );
    }

    #[test]
    fn hrefs_are_percent_encoded() {
        let repo = repo_with(&[
            ("/docs/a b#1.md", "a"),
            ("/docs/x?.md", "x"),
            ("/docs/100%/r.md", "r"),
        ]);
        let ReadOutcome::Directory(listing) = read_path(&repo, "main", &p("/docs/")).unwrap() else {
            panic!("expected listing");
        };
        let hrefs: Vec<_> = listing.entries.iter().map(|e| e.href.as_str()).collect();
        assert_eq!(hrefs, ["/docs/100%25/", "/docs/a%20b%231.md", "/docs/x%3F.md"]);
        assert_eq!(listing.entries[1].name, "a b#1.md");

        let ReadOutcome::Directory(inner) = read_path(&repo, "main", &p("/docs/100%/")).unwrap()
        else {
            panic!("expected listing");
        };
        let crumbs: Vec<_> = inner.breadcrumbs.iter().map(|b| b.href.as_str()).collect();
        assert_eq!(crumbs, ["/", "/docs/", "/docs/100%25/"]);
        assert_eq!(inner.breadcrumbs[2].name, "100%");
    }

    #[test]
    fn file_with_trailing_slash_is_not_found() {
        let repo = repo_with(&[("/docs/a.md", "hello")]);
        let ReadOutcome::NotFound(page) = read_path(&repo, "main", &p("/docs/a.md/")).unwrap()
        else {
            panic!("expected not found");
        };
        assert_eq!(page.path, "/docs/a.md/");
        assert_eq!(page.nearest.path, "/docs/");
        assert!(matches!(
            read_path(&repo, "main", &p("/docs/a.md")).unwrap(),
            ReadOutcome::File(_)
        ));
    }

    #[test]
    fn disallowed_before_lookup() {
        let repo = repo_with(&[("/a.md", "a")]);
        assert!(matches!(
            read_path(&repo, "main", &p("/never-existed.html")).unwrap_err(),
            EngineError::DisallowedExtension(_)
        ));
    }

    #[test]
    fn unborn_branch_is_empty_directory() {
        let repo = repo_with(&[]);
        let ReadOutcome::Directory(listing) = read_path(&repo, "main", &p("/")).unwrap() else {
            panic!("expected listing");
        };
        assert!(listing.entries.is_empty());
        assert!(listing.commit.is_none());
        assert!(matches!(
            read_path(&repo, "main", &p("/a.md")).unwrap(),
            ReadOutcome::NotFound(_)
        ));
        assert!(matches!(
            read_path(&repo, "ghost", &p("/")).unwrap_err(),
            EngineError::BranchNotFound { .. }
        ));
    }
}
