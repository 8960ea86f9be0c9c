use crate::feed::EntryRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Title prefix length used in digest filenames.
const FILENAME_TITLE_CHARS: usize = 30;

/// An entry record plus the fields the AI stage derived from it.
#[derive(Debug, Clone)]
pub struct ProcessedArticle {
    pub entry: EntryRecord,
    /// Entry title translated into the target language
    pub title_translated: String,
    /// Source-language summary of the entry content
    pub summary: String,
    /// Translated summary
    pub summary_translated: String,
}

/// Renders processed articles to markdown digests and writes them under a
/// single output directory. File naming and filesystem layout live here
/// and nowhere else.
#[derive(Debug)]
pub struct MarkdownWriter {
    output_dir: PathBuf,
}

impl MarkdownWriter {
    /// Creates the writer, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory '{}'", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders one article as a markdown digest.
    pub fn render(article: &ProcessedArticle) -> String {
        format!(
            "# {title_translated}\n\
             \n\
             ## 原文情報\n\
             - 公開日:{published}\n\
             - 元記事URL:[{title}]({link})\n\
             \n\
             ## 要約(日本語)\n\
             {summary_translated}\n\
             \n\
             ## 原文要約(英語)\n\
             {summary}\n",
            title_translated = article.title_translated,
            published = article.entry.published.as_deref().unwrap_or("-"),
            title = article.entry.title,
            link = article.entry.link,
            summary_translated = article.summary_translated,
            summary = article.summary,
        )
    }

    /// Builds the digest filename: `YYYYMMDD_<title-prefix>.md`.
    ///
    /// The title prefix is truncated to 30 characters on a char boundary
    /// and sanitized so it can never escape the output directory or carry
    /// control characters into the filesystem.
    pub fn digest_filename(title: &str, date: NaiveDate) -> String {
        let prefix: String = title
            .chars()
            .take(FILENAME_TITLE_CHARS)
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect();

        format!("{}_{}.md", date.format("%Y%m%d"), prefix)
    }

    /// Writes `content` under the output directory, returning the path.
    pub fn save(&self, content: &str, filename: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write digest '{}'", path.display()))?;
        Ok(path)
    }

    /// Renders and writes one article, dated `date`.
    pub fn write(&self, article: &ProcessedArticle, date: NaiveDate) -> Result<PathBuf> {
        let content = Self::render(article);
        let filename = Self::digest_filename(&article.entry.title, date);
        self.save(&content, &filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_article() -> ProcessedArticle {
        ProcessedArticle {
            entry: EntryRecord {
                title: "Hello".to_string(),
                link: "https://example.com/1".to_string(),
                published: Some("Tue, 05 Aug 2025 10:00:00 +0000".to_string()),
                content: "Hi & bye".to_string(),
            },
            title_translated: "こんにちは".to_string(),
            summary: "A greeting.".to_string(),
            summary_translated: "挨拶です。".to_string(),
        }
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 5).unwrap()
    }

    #[test]
    fn test_render_template_fields() {
        let md = MarkdownWriter::render(&sample_article());
        assert!(md.starts_with("# こんにちは\n"));
        assert!(md.contains("## 原文情報"));
        assert!(md.contains("- 公開日:Tue, 05 Aug 2025 10:00:00 +0000"));
        assert!(md.contains("[Hello](https://example.com/1)"));
        assert!(md.contains("## 要約(日本語)\n挨拶です。"));
        assert!(md.contains("## 原文要約(英語)\nA greeting."));
    }

    #[test]
    fn test_render_missing_published_shows_dash() {
        let mut article = sample_article();
        article.entry.published = None;
        let md = MarkdownWriter::render(&article);
        assert!(md.contains("- 公開日:-"));
    }

    #[test]
    fn test_filename_format() {
        assert_eq!(
            MarkdownWriter::digest_filename("Hello", test_date()),
            "20250805_Hello.md"
        );
    }

    #[test]
    fn test_filename_truncates_at_30_chars() {
        let long = "a".repeat(60);
        let name = MarkdownWriter::digest_filename(&long, test_date());
        assert_eq!(name, format!("20250805_{}.md", "a".repeat(30)));
    }

    #[test]
    fn test_filename_truncation_is_multibyte_safe() {
        let title = "日本語のタイトルが三十文字を超えるときの切り詰め確認用の長い題名です";
        let name = MarkdownWriter::digest_filename(title, test_date());
        // No panic on char boundaries, and the prefix is 30 chars
        let stem = name
            .strip_prefix("20250805_")
            .unwrap()
            .strip_suffix(".md")
            .unwrap();
        assert_eq!(stem.chars().count(), 30);
    }

    #[test]
    fn test_filename_sanitizes_separators() {
        let name = MarkdownWriter::digest_filename("a/b\\c: d", test_date());
        assert_eq!(name, "20250805_a_b_c__d.md");
    }

    #[test]
    fn test_write_creates_file_in_output_dir() {
        let dir = std::env::temp_dir().join("feedbrief_md_test_write");
        std::fs::create_dir_all(&dir).unwrap();

        let writer = MarkdownWriter::new(&dir).unwrap();
        let path = writer.write(&sample_article(), test_date()).unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("こんにちは"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = std::env::temp_dir().join("feedbrief_md_test_mkdir/nested");
        std::fs::remove_dir_all(dir.parent().unwrap()).ok();

        let writer = MarkdownWriter::new(&dir).unwrap();
        assert!(writer.output_dir().is_dir());

        std::fs::remove_dir_all(dir.parent().unwrap()).ok();
    }
}
