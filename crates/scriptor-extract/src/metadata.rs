use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const SAMPLE_CHARS: usize = 500;
const MAX_EQUATIONS: usize = 5;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\title\s*(?:\[[^\]]*\])?\s*\{").expect("valid title regex"));

static ABSTRACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{abstract\}(.+?)\\end\{abstract\}").expect("valid abstract regex")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\cite[tp]?\*?(?:\[[^\]]*\]){0,2}\{([^}]*)\}").expect("valid citation regex")
});

static EQUATION_ENV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{equation\*?\}(.+?)\\end\{equation\*?\}").expect("valid equation regex")
});

static DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\[(.+?)\\\]").expect("valid display math regex"));

static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{table\*?\}.+?\\end\{table\*?\}").expect("valid table regex")
});

static NON_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\\begin\{(figure|table|equation)\*?\}.*?\\end\{(figure|table|equation)\*?\}|\\\[.*?\\\]",
    )
    .expect("valid body regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// First and last characters of the body text, floats and display math removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSample {
    pub start: String,
    pub end: String,
}

/// Metadata extracted from one paper. Fields not found are `None` (`null` in JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub year: Option<u16>,
    pub main_text_sample: TextSample,
    /// Citation keys, deduplicated and sorted.
    pub citations: Vec<String>,
    /// Up to five equations, numbered environments first.
    pub equations: Vec<String>,
    /// The first `table` environment, verbatim.
    pub first_table: Option<String>,
}

#[must_use]
pub fn extract_metadata(text: &str) -> PaperMetadata {
    PaperMetadata {
        title: extract_title(text),
        abstract_text: extract_abstract(text),
        year: extract_year(text),
        main_text_sample: extract_sample(text),
        citations: extract_citations(text),
        equations: extract_equations(text),
        first_table: TABLE.find(text).map(|m| m.as_str().trim().to_owned()),
    }
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn extract_title(text: &str) -> Option<String> {
    let open = TITLE.find(text)?;
    let body = balanced_group(&text[open.end()..])?;
    let title = collapse(body);
    (!title.is_empty()).then_some(title)
}

/// Content up to the brace closing an already-opened group.
fn balanced_group(rest: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_abstract(text: &str) -> Option<String> {
    let caps = ABSTRACT.captures(text)?;
    let abstract_text = collapse(&caps[1]);
    (!abstract_text.is_empty()).then_some(abstract_text)
}

fn extract_year(text: &str) -> Option<u16> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

fn extract_citations(text: &str) -> Vec<String> {
    let keys: BTreeSet<String> = CITATION
        .captures_iter(text)
        .flat_map(|caps| {
            caps[1]
                .split(',')
                .map(|k| k.trim().to_owned())
                .collect::<Vec<_>>()
        })
        .filter(|k| !k.is_empty())
        .collect();
    keys.into_iter().collect()
}

fn extract_equations(text: &str) -> Vec<String> {
    EQUATION_ENV
        .captures_iter(text)
        .chain(DISPLAY_MATH.captures_iter(text))
        .map(|caps| caps[1].trim().to_owned())
        .take(MAX_EQUATIONS)
        .collect()
}

fn extract_sample(text: &str) -> TextSample {
    let body = NON_BODY.replace_all(text, "");
    let chars: Vec<char> = body.chars().collect();
    let start: String = chars.iter().take(SAMPLE_CHARS).collect();
    let end: String = chars[chars.len().saturating_sub(SAMPLE_CHARS)..].iter().collect();
    TextSample {
        start: start.trim().to_owned(),
        end: end.trim().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = r"\documentclass{article}
\title{Attention Is {All} You
  Need}
\date{June 2017}
\begin{document}
\maketitle
\begin{abstract}
  The dominant sequence transduction models
  are based on recurrent networks.
\end{abstract}
Recurrent models \cite{hochreiter1997, chung2014} dominate. We follow \citep[see][p.~2]{bahdanau2014}
and \citet{hochreiter1997}.
\begin{equation}
  \mathrm{Attention}(Q, K, V) = \mathrm{softmax}(QK^T) V
\end{equation}
\[ PE_{pos} = \sin(pos) \]
\begin{table}
\begin{tabular}{cc} a & b \end{tabular}
\end{table}
\begin{figure} picture \end{figure}
Conclusion text.
\end{document}";

    #[test]
    fn extracts_title_with_nested_braces() {
        let m = extract_metadata(PAPER);
        assert_eq!(m.title.as_deref(), Some("Attention Is {All} You Need"));
    }

    #[test]
    fn abstract_whitespace_collapsed() {
        let m = extract_metadata(PAPER);
        assert_eq!(
            m.abstract_text.as_deref(),
            Some("The dominant sequence transduction models are based on recurrent networks.")
        );
    }

    #[test]
    fn first_year_found() {
        assert_eq!(extract_metadata(PAPER).year, Some(2017));
    }

    #[test]
    fn year_ignores_longer_numbers() {
        assert_eq!(extract_year("id 120175 then 1999"), Some(1999));
    }

    #[test]
    fn citations_split_deduplicated_sorted() {
        let m = extract_metadata(PAPER);
        assert_eq!(m.citations, ["bahdanau2014", "chung2014", "hochreiter1997"]);
    }

    #[test]
    fn equations_environment_then_display_math() {
        let m = extract_metadata(PAPER);
        assert_eq!(m.equations.len(), 2);
        assert!(m.equations[0].starts_with("\\mathrm{Attention}"));
        assert_eq!(m.equations[1], "PE_{pos} = \\sin(pos)");
    }

    #[test]
    fn at_most_five_equations() {
        let text = "\\[a\\] ".repeat(8);
        assert_eq!(extract_metadata(&text).equations.len(), 5);
    }

    #[test]
    fn first_table_verbatim() {
        let m = extract_metadata(PAPER);
        let table = m.first_table.unwrap();
        assert!(table.starts_with("\\begin{table}"));
        assert!(table.ends_with("\\end{table}"));
        assert!(table.contains("tabular"));
    }

    #[test]
    fn sample_excludes_floats_and_math() {
        let m = extract_metadata(PAPER);
        assert!(m.main_text_sample.start.starts_with("\\documentclass"));
        assert!(!m.main_text_sample.start.contains("softmax"));
        assert!(!m.main_text_sample.start.contains("tabular"));
        assert!(!m.main_text_sample.start.contains("picture"));
        assert!(m.main_text_sample.end.ends_with("\\end{document}"));
    }

    #[test]
    fn sample_limited_and_char_safe() {
        let text = "é".repeat(1200);
        let sample = extract_sample(&text);
        assert_eq!(sample.start.chars().count(), 500);
        assert_eq!(sample.end.chars().count(), 500);
    }

    #[test]
    fn missing_fields_are_null() {
        let m = extract_metadata("Just some prose without markup.");
        assert!(m.title.is_none());
        assert!(m.abstract_text.is_none());
        assert!(m.year.is_none());
        assert!(m.citations.is_empty());
        assert!(m.equations.is_empty());
        assert!(m.first_table.is_none());

        let json = serde_json::to_value(&m).unwrap();
        assert!(json["title"].is_null());
        assert!(json["abstract"].is_null());
        assert!(json["first_table"].is_null());
        assert_eq!(json["main_text_sample"]["start"], "Just some prose without markup.");
    }

    #[test]
    fn unterminated_title_is_none() {
        assert!(extract_metadata("\\title{Never closed").title.is_none());
    }
}
