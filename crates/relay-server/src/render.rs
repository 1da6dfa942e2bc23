//! HTML for listings and not-found pages.
//!
//! Pages are plain, self-contained documents. Repository stylesheets are
//! linked, never inlined; repository markdown is rendered with raw HTML
//! neutralized so stored content can never inject markup or script.

use std::fmt::Write;

use axum::http::{header, HeaderMap};
use pulldown_cmark::{html, CowStr, Event, Options, Parser};
use relay_repo::{Listing, NotFoundPage};

/// `true` when the client asked for JSON.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render markdown to HTML, turning embedded HTML into text.
pub fn markdown(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(pulldown_cmark::Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) if dest_url.trim_start().to_ascii_lowercase().starts_with("javascript:") => {
                Event::Start(pulldown_cmark::Tag::Link {
                    link_type,
                    dest_url: CowStr::Borrowed("#"),
                    title,
                    id,
                })
            }
            other => other,
        });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn page(title: &str, stylesheets: &[String], suffix: &str, body: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n",
        escape(title)
    );
    for href in stylesheets {
        let _ = writeln!(
            out,
            "<link rel=\"stylesheet\" href=\"{}{}\">",
            escape(href),
            escape(suffix)
        );
    }
    let _ = write!(out, "</head>\n<body>\n{body}</body>\n</html>\n");
    out
}

fn listing_body(listing: &Listing, suffix: &str) -> String {
    let mut out = String::from("<nav class=\"breadcrumbs\">");
    for (i, crumb) in listing.breadcrumbs.iter().enumerate() {
        if i > 1 {
            out.push_str(" / ");
        }
        let _ = write!(
            out,
            "<a href=\"{}{}\">{}</a>",
            escape(&crumb.href),
            escape(suffix),
            escape(&crumb.name)
        );
    }
    out.push_str("</nav>\n<ul class=\"listing\">\n");
    for entry in &listing.entries {
        let (class, label) = if entry.kind.is_directory() {
            ("dir", format!("{}/", entry.name))
        } else {
            ("file", entry.name.clone())
        };
        let _ = writeln!(
            out,
            "<li class=\"{class}\"><a href=\"{}{}\">{}</a></li>",
            escape(&entry.href),
            escape(suffix),
            escape(&label)
        );
    }
    out.push_str("</ul>\n");
    out
}

/// A directory listing page. `suffix` is appended to every link so that
/// query-string selectors survive navigation.
pub fn listing_page(listing: &Listing, suffix: &str) -> String {
    let title = format!("{} @ {}: {}", listing.repo, listing.branch, listing.path);
    let body = format!(
        "<h1>{}</h1>\n{}",
        escape(&listing.path),
        listing_body(listing, suffix)
    );
    page(&title, &listing.stylesheets, suffix, &body)
}

/// Custom not-found document if the branch has one, the default text
/// otherwise, followed by the nearest existing directory.
pub fn not_found_page(missing: &NotFoundPage, suffix: &str) -> String {
    let mut body = match &missing.custom_page {
        Some(source) => format!("<article class=\"not-found\">\n{}</article>\n", markdown(source)),
        None => default_not_found(&missing.path),
    };
    let _ = write!(
        body,
        "<h2>Contents of {}</h2>\n{}",
        escape(&missing.nearest.path),
        listing_body(&missing.nearest, suffix)
    );
    page("Not found", &missing.nearest.stylesheets, suffix, &body)
}

/// Not-found page when there is no snapshot to list (unknown repository or
/// branch).
pub fn missing_target_page(message: &str) -> String {
    let body = format!(
        "<h1>Not found</h1>\n<p>{}</p>\n",
        escape(message)
    );
    page("Not found", &[], "", &body)
}

fn default_not_found(path: &str) -> String {
    format!(
        "<h1>Not found</h1>\n<p>Nothing exists at <code>{}</code> on this branch.</p>\n",
        escape(path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_repo::{Breadcrumb, EntryMode, ListingEntry};

    fn listing() -> Listing {
        Listing {
            repo: "default".into(),
            branch: "main".into(),
            commit: None,
            path: "/docs/".into(),
            breadcrumbs: vec![
                Breadcrumb {
                    name: "/".into(),
                    href: "/".into(),
                },
                Breadcrumb {
                    name: "docs".into(),
                    href: "/docs/".into(),
                },
            ],
            entries: vec![
                ListingEntry {
                    name: "img".into(),
                    kind: EntryMode::Directory,
                    href: "/docs/img/".into(),
                },
                ListingEntry {
                    name: "<a>.md".into(),
                    kind: EntryMode::File,
                    href: "/docs/<a>.md".into(),
                },
            ],
            stylesheets: vec!["/docs/style.css".into()],
        }
    }

    #[test]
    fn listing_escapes_and_keeps_selectors() {
        let html = listing_page(&listing(), "?branch=main");
        assert!(html.contains("href=\"/docs/img/?branch=main\">img/</a>"));
        assert!(html.contains("&lt;a&gt;.md"));
        assert!(!html.contains("<a>.md"));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/docs/style.css?branch=main\">"));
    }

    #[test]
    fn markdown_neutralizes_html() {
        let html = markdown("# Lost\n\n<script>alert(1)</script>\n\n[x](javascript:alert(1))");
        assert!(html.contains("<h1>Lost</h1>"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn not_found_prefers_custom_page() {
        let mut missing = NotFoundPage {
            repo: "default".into(),
            branch: "main".into(),
            commit: None,
            path: "/docs/gone.md".into(),
            custom_page: None,
            nearest: listing(),
        };
        let html = not_found_page(&missing, "");
        assert!(html.contains("Nothing exists at <code>/docs/gone.md</code>"));
        assert!(html.contains("Contents of /docs/"));

        missing.custom_page = Some("## Try the index".into());
        let html = not_found_page(&missing, "");
        assert!(html.contains("<h2>Try the index</h2>"));
        assert!(!html.contains("Nothing exists"));
    }

    #[test]
    fn accept_header() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));
        headers.insert(header::ACCEPT, "application/json".parse().unwrap());
        assert!(wants_json(&headers));
    }
}
