//! Self-contained HTML pages: inline CSS, inline SVG charts, no scripts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::chart::{Chart, escape};

/// A summary table. Cells are plain text and escaped on render.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn to_html(&self) -> String {
        let mut html = String::from("<table><thead><tr>");
        for h in &self.headers {
            html.push_str(&format!("<th>{}</th>", escape(h)));
        }
        html.push_str("</tr></thead><tbody>\n");
        if self.rows.is_empty() {
            html.push_str(&format!(
                "<tr><td colspan=\"{}\">No rows.</td></tr>\n",
                self.headers.len().max(1)
            ));
        }
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", escape(cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody></table>");
        html
    }
}

#[derive(Debug, Clone)]
enum Block {
    Heading(String),
    Chart(Chart),
    Table(Table),
    Stats(Vec<(String, String)>),
    Note(String),
}

/// One report page, assembled top to bottom.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    blocks: Vec<Block>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), blocks: Vec::new() }
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading(text.into()));
        self
    }

    pub fn chart(&mut self, chart: Chart) -> &mut Self {
        self.blocks.push(Block::Chart(chart));
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.blocks.push(Block::Table(table));
        self
    }

    /// Row of headline numbers (value, label).
    pub fn stats(&mut self, stats: Vec<(String, String)>) -> &mut Self {
        self.blocks.push(Block::Stats(stats));
        self
    }

    pub fn note(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Note(text.into()));
        self
    }

    pub fn chart_count(&self) -> usize {
        self.blocks.iter().filter(|b| matches!(b, Block::Chart(_))).count()
    }

    pub fn render(&self) -> String {
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading(text) => body.push_str(&format!("<h2>{}</h2>\n", escape(text))),
                Block::Chart(chart) => {
                    body.push_str(&format!("<div class=\"card\">{}</div>\n", chart.to_svg()))
                }
                Block::Table(table) => {
                    body.push_str(&format!("<div class=\"card\">{}</div>\n", table.to_html()))
                }
                Block::Stats(stats) => {
                    body.push_str("<div class=\"stats\">");
                    for (value, label) in stats {
                        body.push_str(&format!(
                            r#"<div class="stat"><span class="val">{}</span><span class="lbl">{}</span></div>"#,
                            escape(value),
                            escape(label)
                        ));
                    }
                    body.push_str("</div>\n");
                }
                Block::Note(text) => body.push_str(&format!("<p class=\"note\">{}</p>\n", escape(text))),
            }
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>{title}</h1>
{body}<footer>Generated by {app}</footer>
</body>
</html>
"#,
            title = escape(&self.title),
            app = crate::APP_NAME,
        )
    }

    /// Write the page to `dir/file_name`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let path = dir.join(file_name);
        std::fs::write(&path, self.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {}", path.display());
        Ok(path)
    }
}

const STYLE: &str = "
body { font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; background: #121212; color: #e0e0e0; margin: 0 auto; max-width: 1100px; padding: 24px; }
h1 { color: #1DB954; }
h2 { color: #ffffff; border-bottom: 1px solid #333; padding-bottom: 4px; margin-top: 32px; }
.card { background: #1e1e1e; border-radius: 8px; padding: 12px; margin: 16px 0; }
.stats { display: flex; flex-wrap: wrap; gap: 12px; }
.stat { background: #1e1e1e; border-radius: 8px; padding: 12px 18px; display: flex; flex-direction: column; min-width: 120px; }
.stat .val { font-size: 1.6em; color: #1DB954; }
.stat .lbl { font-size: 0.85em; color: #999; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #333; }
th { color: #1DB954; }
.note { color: #aaa; font-style: italic; }
footer { margin-top: 40px; color: #666; font-size: 0.8em; }
svg.chart { width: 100%; height: auto; }
svg .title { fill: #fff; font-size: 16px; font-weight: bold; }
svg .tick, svg .legend { fill: #bbb; font-size: 11px; }
svg .label { fill: #ddd; font-size: 12px; }
svg .note { fill: #FFD93D; font-size: 11px; }
svg .empty { fill: #888; font-size: 14px; }
svg .axis { stroke: #888; }
svg .grid { stroke: #333; }
svg .ref { stroke: #FFD93D; stroke-dasharray: 5 4; }
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::chart::{ChartKind, Series};

    #[test]
    fn test_page_renders_blocks_in_order() {
        let mut table = Table::new(["Artist", "Tracks"]);
        table.row(vec!["<Tom & Co>".into(), "3".into()]);

        let mut page = Page::new("Artist Dashboard");
        page.heading("Overview")
            .stats(vec![("42".into(), "Tracks".into())])
            .chart(Chart::new(ChartKind::Bar, "Top").series(Series::from_values("n", [1.0])))
            .table(table)
            .note("Based on live data");
        let html = page.render();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Artist Dashboard</title>"));
        assert!(html.contains("&lt;Tom &amp; Co&gt;"));
        assert!(!html.contains("<script"));
        let overview = html.find("<h2>Overview</h2>").unwrap();
        let svg = html.find("<svg").unwrap();
        let note = html.find("Based on live data").unwrap();
        assert!(overview < svg && svg < note);
        assert_eq!(page.chart_count(), 1);
    }

    #[test]
    fn test_empty_table_placeholder() {
        let html = Table::new(["a", "b"]).to_html();
        assert!(html.contains("colspan=\"2\""));
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let path = Page::new("x").write_to(&out, "x.html").unwrap();
        assert!(path.exists());
        assert!(std::fs::read_to_string(path).unwrap().contains("<h1>x</h1>"));
    }
}
