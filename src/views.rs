use axum::http::StatusCode;
use humansize::{format_size, BINARY};
use maud::{html, Markup, DOCTYPE};

use crate::classify::{DirEntryInfo, DirectoryListing, FileView};

const HIGHLIGHT_JS: &str = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0";

fn browse_url(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/?path={}", urlencoding::encode(path))
    }
}

fn download_url(path: &str) -> String {
    format!("/download?path={}", urlencoding::encode(path))
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href="/static/styles.css";
                link rel="stylesheet" href={(HIGHLIGHT_JS) "/styles/github.min.css"};
                script src={(HIGHLIGHT_JS) "/highlight.min.js"} defer {}
                script src="/static/highlight_init.js" defer {}
            }
            body {
                h1 { a href="/" { "File Browser" } }
                (body)
            }
        }
    }
}

/// Clickable trail from the root down to `current` (a relative path).
fn breadcrumbs(current: &str) -> Markup {
    let segments: Vec<&str> = current.split('/').filter(|s| !s.is_empty()).collect();
    html! {
        nav #breadcrumbs {
            a href="/" { "root" }
            @for (i, segment) in segments.iter().enumerate() {
                span class="sep" { "/" }
                @if i + 1 == segments.len() {
                    span class="current" { (segment) }
                } @else {
                    a href=(browse_url(&segments[..=i].join("/"))) { (segment) }
                }
            }
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn entry_row(item: &DirEntryInfo) -> Markup {
    html! {
        tr class=(if item.is_dir { "dir" } else { "file" }) {
            td class="icon" { (if item.is_dir { "📁" } else { "📄" }) }
            td class="name" { a href=(browse_url(&item.path)) { (item.name) } }
            td class="size" {
                @if item.is_dir { "-" } @else { (format_size(item.size, BINARY)) }
            }
            td class="modified" {
                @if let Some(modified) = &item.modified {
                    (modified.format("%Y-%m-%d %H:%M").to_string())
                }
            }
        }
    }
}

pub fn listing_page(current: &str, listing: &DirectoryListing) -> Markup {
    let title = if current.is_empty() { "/" } else { current };
    layout(
        &format!("Index of {}", title),
        html! {
            (breadcrumbs(current))
            table #file-list {
                thead {
                    tr { th {} th { "Name" } th { "Size" } th { "Modified" } }
                }
                tbody {
                    @if !current.is_empty() {
                        tr class="dir parent" {
                            td class="icon" { "⬆️" }
                            td class="name" { a href=(browse_url(parent_of(current))) { ".." } }
                            td {} td {}
                        }
                    }
                    @for item in &listing.entries {
                        (entry_row(item))
                    }
                }
            }
            @if listing.entries.is_empty() {
                p class="empty" { "This directory is empty." }
            }
        },
    )
}

/// `requested` is the path as the client sent it; downloads go through it.
pub fn file_page(current: &str, requested: &str, view: &FileView) -> Markup {
    let name = current.rsplit('/').next().unwrap_or(current);
    let download = download_url(requested);

    layout(
        name,
        html! {
            (breadcrumbs(current))
            @match view {
                FileView::Text(text) => {
                    div class="file-meta" {
                        span { strong { "Size: " } (format_size(text.size, BINARY)) }
                        span { strong { "Type: " } (text.mime_type) }
                        a class="download-button" href=(download) { "Download" }
                    }
                    pre { code class={"language-" (text.language)} { (text.content) } }
                }
                FileView::TooLarge { size } => {
                    div class="notice" {
                        p { "File is too large to display (> 1MB)" }
                        p { "Size: " (format_size(*size, BINARY)) }
                        a class="download-button" href=(download) { "Download" }
                    }
                }
                FileView::Binary { .. } => {
                    div class="notice" {
                        p { "Binary file - cannot display as text" }
                        a class="download-button" href=(download) { "Download" }
                    }
                }
            }
        },
    )
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let heading = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    layout(
        &heading,
        html! {
            div class="error" {
                h2 { (heading) }
                p { (message) }
                p { a href="/" { "Back to root" } }
            }
        },
    )
}
