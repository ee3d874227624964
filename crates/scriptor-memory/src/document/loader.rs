use std::path::Path;
use std::pin::Pin;
use std::sync::LazyLock;

use regex::Regex;

use super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentLoader};
use crate::error::MemoryError;

/// Environments whose body is prose: only their delimiters are removed.
static WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:begin|end)\s*\{(?:document|abstract)\}").expect("valid wrapper regex")
});

static ENVIRONMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{[^}]*\}.*?\\end\{[^}]*\}").expect("valid environment regex")
});

static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[A-Za-z]+\*?(?:\[[^\]]*\])?(?:\{[^}]*\})?").expect("valid command regex")
});

static ESCAPED_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[^A-Za-z]?").expect("valid escape regex"));

static BRACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[{}]").expect("valid brace regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Loads `.tex` files and reduces them to prose with [`clean_latex`].
pub struct LatexLoader {
    pub max_file_size: u64,
}

impl Default for LatexLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl LatexLoader {
    #[must_use]
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

impl DocumentLoader for LatexLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Document, MemoryError>> + Send + '_>> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(MemoryError::FileTooLarge {
                    path,
                    size: meta.len(),
                });
            }

            let bytes = tokio::fs::read(&path).await?;
            let raw = String::from_utf8_lossy(&bytes);
            let content = clean_latex(&raw);

            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            tracing::debug!(
                source = %path.display(),
                raw_bytes = bytes.len(),
                cleaned_chars = content.chars().count(),
                "loaded document"
            );

            Ok(Document {
                title,
                content,
                source: path,
            })
        })
    }
}

/// Strip LaTeX markup, leaving whitespace-collapsed prose.
///
/// Comments go first so that commented-out markup never reaches the other
/// passes. `document` and `abstract` only lose their delimiters; every other
/// environment (`\begin{..} .. \end{..}`) is dropped whole. Then command
/// tokens with one optional and one mandatory argument go, then any remaining
/// escapes and braces.
#[must_use]
pub fn clean_latex(text: &str) -> String {
    let text = strip_comments(text);
    let text = WRAPPER.replace_all(&text, " ");
    let text = ENVIRONMENT.replace_all(&text, " ");
    let text = COMMAND.replace_all(&text, " ");
    let text = ESCAPED_SYMBOL.replace_all(&text, " ");
    let text = BRACES.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_owned()
}

/// Cut every line at its first unescaped `%`.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut escaped = false;
        let mut cut = None;
        for (i, c) in line.char_indices() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '%' {
                cut = Some(i);
                break;
            }
        }
        match cut {
            Some(i) => {
                out.push_str(&line[..i]);
                out.push('\n');
            }
            None => out.push_str(line),
        }
    }
    out
}
