use crate::traits::Presenter;
use crate::MatchResult;
use std::fmt::Write as _;
use url::Url;

pub const EXCERPT_MAX_CHARS: usize = 200;
pub const TRUNCATION_MARKER: &str = "...";
pub const REPORT_LINK_LABEL: &str = "Download PDF Report";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExcerptPolicy {
    /// Marker is appended to every excerpt, even short ones.
    #[default]
    AlwaysMark,
    MarkWhenTruncated,
}

impl ExcerptPolicy {
    pub fn excerpt(self, text: &str) -> String {
        let mut chars = text.chars();
        let mut excerpt: String = chars.by_ref().take(EXCERPT_MAX_CHARS).collect();
        let truncated = chars.next().is_some();

        if truncated || self == Self::AlwaysMark {
            excerpt.push_str(TRUNCATION_MARKER);
        }
        excerpt
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCard {
    /// 1-based position in the service response.
    pub index: usize,
    pub source: String,
    pub similarity: f64,
    pub excerpt: String,
}

impl MatchCard {
    pub fn from_match(position: usize, result: &MatchResult, policy: ExcerptPolicy) -> Self {
        Self {
            index: position + 1,
            source: result.source.clone(),
            similarity: result.similarity,
            excerpt: policy.excerpt(&result.text),
        }
    }

    pub fn cards_for(matches: &[MatchResult], policy: ExcerptPolicy) -> Vec<Self> {
        matches
            .iter()
            .enumerate()
            .map(|(position, result)| Self::from_match(position, result, policy))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLink {
    pub href: String,
    pub label: String,
    pub new_context: bool,
}

impl ReportLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: REPORT_LINK_LABEL.to_string(),
            new_context: true,
        }
    }
}

/// Plain-text regions for terminal output.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    results: String,
    report: String,
    progress_visible: bool,
    report_base: Option<Url>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative report links are printed as absolute URLs against `base`.
    pub fn with_report_base(base: Url) -> Self {
        Self {
            report_base: Some(base),
            ..Self::default()
        }
    }

    pub fn results(&self) -> &str {
        &self.results
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    pub fn progress_visible(&self) -> bool {
        self.progress_visible
    }

    pub fn output(&self) -> String {
        match (self.results.is_empty(), self.report.is_empty()) {
            (_, true) => self.results.clone(),
            (true, false) => self.report.clone(),
            (false, false) => format!("{}\n{}", self.results, self.report),
        }
    }

    fn display_href(&self, href: &str) -> String {
        self.report_base
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| href.to_string())
    }
}

impl Presenter for TerminalPresenter {
    fn clear(&mut self) {
        self.results.clear();
        self.report.clear();
    }

    fn show_progress(&mut self) {
        self.progress_visible = true;
    }

    fn hide_progress(&mut self) {
        self.progress_visible = false;
    }

    fn show_error(&mut self, message: &str) {
        self.results = format!("{message}\n");
    }

    fn render_summary(&mut self, plagiarism_percentage: f64) {
        let _ = writeln!(self.results, "Overall plagiarism: {plagiarism_percentage}%\n");
    }

    fn render_matches(&mut self, cards: &[MatchCard]) {
        for card in cards {
            let _ = write!(
                self.results,
                "Match #{}\nSource: {}\nSimilarity: {}%\nText: {}\n\n",
                card.index, card.source, card.similarity, card.excerpt
            );
        }
    }

    fn render_report_link(&mut self, link: &ReportLink) {
        self.report = format!("{}: {}\n", link.label, self.display_href(&link.href));
    }
}

/// HTML fragments matching the checker page: a results region, a report
/// region and a progress indicator.
#[derive(Debug, Default)]
pub struct HtmlPresenter {
    results: String,
    report: String,
    progress_visible: bool,
}

impl HtmlPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results_html(&self) -> &str {
        &self.results
    }

    pub fn report_html(&self) -> &str {
        &self.report
    }

    pub fn progress_visible(&self) -> bool {
        self.progress_visible
    }

    pub fn page(&self) -> String {
        let display = if self.progress_visible { "block" } else { "none" };
        format!(
            "<div id=\"progress\" style=\"display:{display}\">Checking...</div>\n\
             <div id=\"results\">{}</div>\n\
             <div id=\"report\">{}</div>\n",
            self.results, self.report
        )
    }
}

impl Presenter for HtmlPresenter {
    fn clear(&mut self) {
        self.results.clear();
        self.report.clear();
    }

    fn show_progress(&mut self) {
        self.progress_visible = true;
    }

    fn hide_progress(&mut self) {
        self.progress_visible = false;
    }

    fn show_error(&mut self, message: &str) {
        self.results = escape_html(message);
    }

    fn render_summary(&mut self, plagiarism_percentage: f64) {
        let _ = write!(
            self.results,
            "<p>Overall plagiarism: {plagiarism_percentage}%</p>"
        );
    }

    fn render_matches(&mut self, cards: &[MatchCard]) {
        for card in cards {
            let _ = write!(
                self.results,
                "<div><h3>Match #{}</h3><p>Source: {}</p><p>Similarity: {}%</p><p>Text: {}</p></div>",
                card.index,
                escape_html(&card.source),
                card.similarity,
                escape_html(&card.excerpt)
            );
        }
    }

    fn render_report_link(&mut self, link: &ReportLink) {
        let target = if link.new_context {
            " target=\"_blank\" rel=\"noopener\""
        } else {
            ""
        };
        self.report = format!(
            "<a href=\"{}\"{target}>{}</a>",
            escape_html(&link.href),
            escape_html(&link.label)
        );
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
