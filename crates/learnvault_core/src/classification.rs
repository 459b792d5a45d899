//! Content classification of repository paths.
//!
//! Classification is a total function of the path: the lowercased
//! extension (or, for a few well-known names, the bare filename) selects
//! a category from a static table. Unknown paths are plain text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language tag used for text files that match no table entry.
pub const PLAIN_TEXT: &str = "plaintext";

/// The kind of a repository file, driving how its payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentCategory {
    /// UTF-8 text. The language tag is only a display hint.
    Text {
        /// Syntax highlighting language (e.g. "rust", "docker").
        language: &'static str,
    },
    /// Tabular workbook or delimited text.
    Spreadsheet,
    /// Raster or vector image.
    Image,
    /// PDF document.
    Pdf,
    /// Any other binary payload.
    Binary,
}

impl ContentCategory {
    /// Returns true when the payload can be decoded for preview.
    pub fn is_previewable(&self) -> bool {
        matches!(self, Self::Text { .. } | Self::Spreadsheet)
    }

    /// Returns the language tag for text, None otherwise.
    pub fn language(&self) -> Option<&'static str> {
        match self {
            Self::Text { language } => Some(language),
            _ => None,
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Spreadsheet => "spreadsheet",
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { language } => write!(f, "text ({})", language),
            other => f.write_str(other.name()),
        }
    }
}

const fn text(language: &'static str) -> ContentCategory {
    ContentCategory::Text { language }
}

/// Bare filenames recognized without an extension. Matched case-insensitively.
static SPECIAL_NAMES: &[(&str, ContentCategory)] = &[
    ("dockerfile", text("docker")),
    ("makefile", text("makefile")),
];

/// Extension table. Keys are lowercase without the leading dot.
static EXTENSIONS: &[(&str, ContentCategory)] = &[
    // web
    ("js", text("javascript")),
    ("mjs", text("javascript")),
    ("cjs", text("javascript")),
    ("jsx", text("jsx")),
    ("ts", text("typescript")),
    ("tsx", text("tsx")),
    ("html", text("html")),
    ("htm", text("html")),
    ("css", text("css")),
    ("scss", text("scss")),
    ("sass", text("scss")),
    ("less", text("less")),
    ("vue", text("vue")),
    ("svelte", text("svelte")),
    // general purpose
    ("py", text("python")),
    ("java", text("java")),
    ("php", text("php")),
    ("go", text("go")),
    ("rb", text("ruby")),
    ("cs", text("csharp")),
    ("rs", text("rust")),
    ("kt", text("kotlin")),
    ("kts", text("kotlin")),
    ("swift", text("swift")),
    ("pl", text("perl")),
    ("ex", text("elixir")),
    ("exs", text("elixir")),
    ("c", text("c")),
    ("h", text("c")),
    ("cpp", text("cpp")),
    ("cc", text("cpp")),
    ("cxx", text("cpp")),
    ("hpp", text("cpp")),
    ("m", text("objectivec")),
    ("r", text("r")),
    ("dart", text("dart")),
    ("jl", text("julia")),
    ("lua", text("lua")),
    // data and markup
    ("json", text("json")),
    ("xml", text("xml")),
    ("yaml", text("yaml")),
    ("yml", text("yaml")),
    ("md", text("markdown")),
    ("markdown", text("markdown")),
    ("sql", text("sql")),
    ("graphql", text("graphql")),
    ("gql", text("graphql")),
    ("toml", text("toml")),
    ("ini", text("ini")),
    ("properties", text("properties")),
    ("gitignore", text("git")),
    ("gitattributes", text("git")),
    // shell
    ("sh", text("bash")),
    ("bash", text("bash")),
    ("zsh", text("bash")),
    ("ps1", text("powershell")),
    ("bat", text("batch")),
    ("cmd", text("batch")),
    ("txt", text(PLAIN_TEXT)),
    // spreadsheets
    ("xlsx", ContentCategory::Spreadsheet),
    ("xlsm", ContentCategory::Spreadsheet),
    ("xls", ContentCategory::Spreadsheet),
    ("xlsb", ContentCategory::Spreadsheet),
    ("ods", ContentCategory::Spreadsheet),
    ("csv", ContentCategory::Spreadsheet),
    // images
    ("png", ContentCategory::Image),
    ("jpg", ContentCategory::Image),
    ("jpeg", ContentCategory::Image),
    ("gif", ContentCategory::Image),
    ("bmp", ContentCategory::Image),
    ("webp", ContentCategory::Image),
    ("svg", ContentCategory::Image),
    ("ico", ContentCategory::Image),
    ("pdf", ContentCategory::Pdf),
    // other binaries
    ("doc", ContentCategory::Binary),
    ("docx", ContentCategory::Binary),
    ("ppt", ContentCategory::Binary),
    ("pptx", ContentCategory::Binary),
    ("zip", ContentCategory::Binary),
    ("gz", ContentCategory::Binary),
    ("tar", ContentCategory::Binary),
    ("rar", ContentCategory::Binary),
    ("7z", ContentCategory::Binary),
    ("exe", ContentCategory::Binary),
    ("dll", ContentCategory::Binary),
    ("jar", ContentCategory::Binary),
];

/// Returns the final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns the lowercased extension of the final path component, if any.
///
/// Dotfiles count as their own extension, so `.gitignore` has the
/// extension `gitignore` and `Makefile` has none.
pub fn extension(path: &str) -> Option<String> {
    let (_, ext) = file_name(path).rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classifies a repository path. Never fails; unknown paths are plain text.
pub fn classify(path: &str) -> ContentCategory {
    if let Some(ext) = extension(path) {
        return EXTENSIONS
            .iter()
            .find(|(key, _)| *key == ext)
            .map(|(_, category)| *category)
            .unwrap_or(text(PLAIN_TEXT));
    }

    let name = file_name(path).to_ascii_lowercase();
    SPECIAL_NAMES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, category)| *category)
        .unwrap_or(text(PLAIN_TEXT))
}

/// Returns the MIME type used when handing a raw payload to a viewer.
pub fn mime_type(path: &str) -> String {
    mime_guess::from_path(file_name(path))
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}
