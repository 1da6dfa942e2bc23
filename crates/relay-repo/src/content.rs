//! Content types and the extension denylist.

use relay_types::RepoPath;

/// Extensions never served: markup and code a browser or shell could execute.
pub const DISALLOWED_EXTENSIONS: &[&str] = &[
    "html", "htm", "xhtml", "js", "mjs", "cjs", "svg", "exe", "dll", "so", "sh", "bat", "cmd",
    "ps1", "php", "wasm", "jar",
];

/// Path of the per-branch custom not-found document.
pub const NOT_FOUND_DOCUMENT: &[&str] = &[".relay", "404.md"];

/// Path of the repository-global stylesheet.
pub const THEME_STYLESHEET: &[&str] = &[".relay", "theme.css"];

/// Name of the directory-scoped stylesheet.
pub const DIRECTORY_STYLESHEET: &str = "style.css";

/// `true` for names whose final dotted suffix is on the denylist, including
/// bare dot-names such as `.js`.
pub fn is_disallowed(path: &RepoPath) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let suffix = match name.rsplit_once('.') {
        Some((_, suffix)) => suffix,
        None => return false,
    };
    DISALLOWED_EXTENSIONS.contains(&suffix.to_ascii_lowercase().as_str())
}

/// MIME type served for a file, by extension.
pub fn content_type(path: &RepoPath) -> &'static str {
    let Some(ext) = path.extension() else {
        return "application/octet-stream";
    };
    match ext.as_str() {
        "md" | "markdown" => "text/markdown; charset=utf-8",
        "txt" | "text" | "log" => "text/plain; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "json" => "application/json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
