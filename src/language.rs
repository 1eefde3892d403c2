use std::path::Path;

pub const PLAINTEXT: &str = "plaintext";

/// Highlighting tag for a file, chosen by its extension (case-insensitive).
pub fn language_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "py" => "python",
        "js" => "javascript",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "xml" => "xml",
        "md" => "markdown",
        "sh" => "bash",
        "txt" => PLAINTEXT,
        _ => PLAINTEXT,
    }
}
