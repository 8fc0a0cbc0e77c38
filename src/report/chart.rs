//! Chart descriptions rendered to inline SVG.
//!
//! A chart is plain data: series of `(x, y, label)` points plus axis
//! metadata. Bar and radar charts index into `categories` with `x`.

const WIDTH: f64 = 760.0;
const HEIGHT: f64 = 420.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_BOTTOM: f64 = 70.0;

const PALETTE: [&str; 8] = [
    "#1DB954", "#4ECDC4", "#FF6B6B", "#45B7D1", "#FFD93D", "#96CEB4", "#9B59B6", "#E67E22",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    /// Bars along the y axis; `categories` label the rows.
    HorizontalBar,
    Line,
    Scatter,
    Radar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, label: None }
    }

    pub fn labeled(x: f64, y: f64, label: impl Into<String>) -> Self {
        Self { x, y, label: Some(label.into()) }
    }
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> Self {
        Self { name: name.into(), points }
    }

    /// One point per category, `x` = category index.
    pub fn from_values(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, y)| Point::new(i as f64, y))
            .collect();
        Self::new(name, points)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Text { x: f64, y: f64, text: String },
    /// Dashed reference line at `y`.
    HLine { y: f64, text: String },
    /// Dashed reference line at `x`.
    VLine { x: f64, text: String },
}

#[derive(Debug, Clone)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub series: Vec<Series>,
    pub annotations: Vec<Annotation>,
}

impl Chart {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            categories: Vec::new(),
            x_range: None,
            y_range: None,
            series: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn axes(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    pub fn categories<S: Into<String>>(mut self, categories: impl IntoIterator<Item = S>) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn x_range(mut self, lo: f64, hi: f64) -> Self {
        self.x_range = Some((lo, hi));
        self
    }

    pub fn y_range(mut self, lo: f64, hi: f64) -> Self {
        self.y_range = Some((lo, hi));
        self
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" class="chart" role="img">"#
        );
        svg.push_str(&format!(
            r#"<text x="{}" y="24" text-anchor="middle" class="title">{}</text>"#,
            WIDTH / 2.0,
            escape(&self.title)
        ));

        if self.is_empty() {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" class="empty">No data</text></svg>"#,
                WIDTH / 2.0,
                HEIGHT / 2.0
            ));
            return svg;
        }

        match self.kind {
            ChartKind::Radar => self.render_radar(&mut svg),
            _ => self.render_cartesian(&mut svg),
        }
        if self.series.len() > 1 {
            self.render_legend(&mut svg);
        }
        svg.push_str("</svg>");
        svg
    }

    fn margin_left(&self) -> f64 {
        if self.kind == ChartKind::HorizontalBar { 170.0 } else { 64.0 }
    }

    fn points(&self) -> impl Iterator<Item = &Point> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    /// Value range for the measured axis, including zero for bars.
    fn value_range(&self) -> (f64, f64) {
        if let Some(r) = self.y_range {
            return r;
        }
        let (mut lo, mut hi) = bounds(self.points().map(|p| p.y));
        if matches!(self.kind, ChartKind::Bar | ChartKind::HorizontalBar) {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        pad(lo, hi)
    }

    fn render_cartesian(&self, svg: &mut String) {
        let left = self.margin_left();
        let plot_w = WIDTH - left - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let bottom = MARGIN_TOP + plot_h;

        let (v0, v1) = self.value_range();
        let categorical = matches!(self.kind, ChartKind::Bar | ChartKind::HorizontalBar);
        let (x0, x1) = match (categorical, self.x_range) {
            (true, _) => (0.0, self.category_count() as f64),
            (false, Some(r)) => r,
            (false, None) => pad_range(bounds(self.points().map(|p| p.x))),
        };

        // Measured axis maps along y except for horizontal bars.
        let horizontal = self.kind == ChartKind::HorizontalBar;
        let map_v = |v: f64| {
            let t = (v - v0) / (v1 - v0);
            if horizontal { left + t * plot_w } else { bottom - t * plot_h }
        };
        let map_x = |x: f64| left + (x - x0) / (x1 - x0) * plot_w;

        // Axes
        svg.push_str(&format!(
            r#"<line x1="{left}" y1="{bottom}" x2="{}" y2="{bottom}" class="axis"/><line x1="{left}" y1="{MARGIN_TOP}" x2="{left}" y2="{bottom}" class="axis"/>"#,
            left + plot_w
        ));

        // Value ticks with grid
        for v in ticks(v0, v1, 5) {
            let p = map_v(v);
            if horizontal {
                svg.push_str(&format!(
                    r#"<line x1="{p:.1}" y1="{MARGIN_TOP}" x2="{p:.1}" y2="{bottom}" class="grid"/><text x="{p:.1}" y="{}" text-anchor="middle" class="tick">{}</text>"#,
                    bottom + 16.0,
                    fmt_tick(v)
                ));
            } else {
                svg.push_str(&format!(
                    r#"<line x1="{left}" y1="{p:.1}" x2="{}" y2="{p:.1}" class="grid"/><text x="{}" y="{:.1}" text-anchor="end" class="tick">{}</text>"#,
                    left + plot_w,
                    left - 6.0,
                    p + 4.0,
                    fmt_tick(v)
                ));
            }
        }

        if categorical {
            self.render_bars(svg, left, plot_w, plot_h, &map_v);
        } else {
            // Categories, when given, label the integer x positions.
            let x_ticks: Vec<(f64, String)> = if self.categories.is_empty() {
                ticks(x0, x1, 6).into_iter().map(|v| (v, fmt_tick(v))).collect()
            } else {
                self.categories
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i as f64, truncate(c, 12)))
                    .collect()
            };
            for (v, text) in x_ticks {
                let p = map_x(v);
                svg.push_str(&format!(
                    r#"<text x="{p:.1}" y="{}" text-anchor="middle" class="tick">{}</text>"#,
                    bottom + 16.0,
                    escape(&text)
                ));
            }
            for (i, s) in self.series.iter().enumerate() {
                let color = PALETTE[i % PALETTE.len()];
                if self.kind == ChartKind::Line {
                    let mut pts: Vec<&Point> = s.points.iter().collect();
                    pts.sort_by(|a, b| a.x.total_cmp(&b.x));
                    let path: Vec<String> = pts
                        .iter()
                        .map(|p| format!("{:.1},{:.1}", map_x(p.x), map_v(p.y)))
                        .collect();
                    svg.push_str(&format!(
                        r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="3"/>"#,
                        path.join(" ")
                    ));
                }
                for p in &s.points {
                    svg.push_str(&format!(
                        r#"<circle cx="{:.1}" cy="{:.1}" r="5" fill="{color}" fill-opacity="0.8"><title>{}</title></circle>"#,
                        map_x(p.x),
                        map_v(p.y),
                        escape(&point_title(s, p))
                    ));
                }
            }
        }

        for a in &self.annotations {
            match a {
                Annotation::HLine { y, text } if !horizontal => {
                    let p = map_v(*y);
                    svg.push_str(&format!(
                        r#"<line x1="{left}" y1="{p:.1}" x2="{}" y2="{p:.1}" class="ref"/><text x="{}" y="{:.1}" text-anchor="end" class="note">{}</text>"#,
                        left + plot_w,
                        left + plot_w - 4.0,
                        p - 4.0,
                        escape(text)
                    ));
                }
                Annotation::VLine { x, text } => {
                    let p = if horizontal { map_v(*x) } else { map_x(*x) };
                    svg.push_str(&format!(
                        r#"<line x1="{p:.1}" y1="{MARGIN_TOP}" x2="{p:.1}" y2="{bottom}" class="ref"/><text x="{:.1}" y="{}" class="note">{}</text>"#,
                        p + 4.0,
                        MARGIN_TOP + 12.0,
                        escape(text)
                    ));
                }
                Annotation::Text { x, y, text } if !categorical => {
                    svg.push_str(&format!(
                        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" class="note">{}</text>"#,
                        map_x(*x),
                        map_v(*y) - 10.0,
                        escape(text)
                    ));
                }
                _ => {}
            }
        }

        // Axis titles
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{}" text-anchor="middle" class="label">{}</text>"#,
            left + plot_w / 2.0,
            HEIGHT - 8.0,
            escape(&self.x_label)
        ));
        svg.push_str(&format!(
            r#"<text transform="translate(14,{:.1}) rotate(-90)" text-anchor="middle" class="label">{}</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            escape(&self.y_label)
        ));
    }

    fn category_count(&self) -> usize {
        let from_points = self
            .points()
            .map(|p| p.x.max(0.0) as usize + 1)
            .max()
            .unwrap_or(0);
        self.categories.len().max(from_points).max(1)
    }

    fn render_bars(&self, svg: &mut String, left: f64, plot_w: f64, plot_h: f64, map_v: &dyn Fn(f64) -> f64) {
        let n = self.category_count();
        let horizontal = self.kind == ChartKind::HorizontalBar;
        let band = if horizontal { plot_h / n as f64 } else { plot_w / n as f64 };
        let group = band * 0.8;
        let bar = group / self.series.len().max(1) as f64;
        let bottom = MARGIN_TOP + plot_h;
        let base = map_v(0.0_f64.max(self.value_range().0));

        for (c, name) in self.categories.iter().enumerate().take(n) {
            let mid = c as f64 * band + band / 2.0;
            if horizontal {
                svg.push_str(&format!(
                    r#"<text x="{}" y="{:.1}" text-anchor="end" class="tick">{}</text>"#,
                    left - 6.0,
                    MARGIN_TOP + mid + 4.0,
                    escape(&truncate(name, 24))
                ));
            } else if n > 8 {
                svg.push_str(&format!(
                    r#"<text transform="translate({:.1},{}) rotate(-35)" text-anchor="end" class="tick">{}</text>"#,
                    left + mid,
                    bottom + 14.0,
                    escape(&truncate(name, 18))
                ));
            } else {
                svg.push_str(&format!(
                    r#"<text x="{:.1}" y="{}" text-anchor="middle" class="tick">{}</text>"#,
                    left + mid,
                    bottom + 16.0,
                    escape(&truncate(name, 18))
                ));
            }
        }

        for (i, s) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            for p in &s.points {
                let start = p.x.max(0.0) * band + (band - group) / 2.0 + i as f64 * bar;
                let v = map_v(p.y);
                let (lo, hi) = if v < base { (v, base) } else { (base, v) };
                let title = escape(&point_title(s, p));
                if horizontal {
                    svg.push_str(&format!(
                        r#"<rect x="{lo:.1}" y="{:.1}" width="{:.1}" height="{bar:.1}" fill="{color}"><title>{title}</title></rect>"#,
                        MARGIN_TOP + start,
                        hi - lo
                    ));
                } else {
                    svg.push_str(&format!(
                        r#"<rect x="{:.1}" y="{lo:.1}" width="{bar:.1}" height="{:.1}" fill="{color}"><title>{title}</title></rect>"#,
                        left + start,
                        hi - lo
                    ));
                }
            }
        }
    }

    fn render_radar(&self, svg: &mut String) {
        let n = self.categories.len().max(3);
        let cx = WIDTH / 2.0;
        let cy = MARGIN_TOP + (HEIGHT - MARGIN_TOP) / 2.0;
        let radius = (HEIGHT - MARGIN_TOP) / 2.0 - 40.0;
        let (_, max) = self.y_range.unwrap_or_else(|| (0.0, bounds(self.points().map(|p| p.y)).1.max(1.0)));

        let vertex = |i: usize, frac: f64| {
            let angle = std::f64::consts::TAU * i as f64 / n as f64 - std::f64::consts::FRAC_PI_2;
            (cx + radius * frac * angle.cos(), cy + radius * frac * angle.sin())
        };

        for ring in 1..=4 {
            let frac = ring as f64 / 4.0;
            let pts: Vec<String> = (0..n)
                .map(|i| {
                    let (x, y) = vertex(i, frac);
                    format!("{x:.1},{y:.1}")
                })
                .collect();
            svg.push_str(&format!(r#"<polygon points="{}" class="grid" fill="none"/>"#, pts.join(" ")));
        }
        for (i, name) in self.categories.iter().enumerate() {
            let (x, y) = vertex(i, 1.0);
            let (lx, ly) = vertex(i, 1.12);
            svg.push_str(&format!(
                r#"<line x1="{cx}" y1="{cy:.1}" x2="{x:.1}" y2="{y:.1}" class="grid"/><text x="{lx:.1}" y="{ly:.1}" text-anchor="middle" class="tick">{}</text>"#,
                escape(name)
            ));
        }

        for (i, s) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let pts: Vec<String> = s
                .points
                .iter()
                .map(|p| {
                    let (x, y) = vertex(p.x.max(0.0) as usize, (p.y / max).clamp(0.0, 1.0));
                    format!("{x:.1},{y:.1}")
                })
                .collect();
            svg.push_str(&format!(
                r#"<polygon points="{}" fill="{color}" fill-opacity="0.25" stroke="{color}" stroke-width="2"><title>{}</title></polygon>"#,
                pts.join(" "),
                escape(&s.name)
            ));
        }
    }

    fn render_legend(&self, svg: &mut String) {
        let x = WIDTH - MARGIN_RIGHT - 150.0;
        for (i, s) in self.series.iter().enumerate() {
            let y = MARGIN_TOP + 4.0 + i as f64 * 18.0;
            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="12" height="12" fill="{}"/><text x="{}" y="{}" class="legend">{}</text>"#,
                PALETTE[i % PALETTE.len()],
                x + 18.0,
                y + 10.0,
                escape(&truncate(&s.name, 20))
            ));
        }
    }
}

fn point_title(series: &Series, p: &Point) -> String {
    match &p.label {
        Some(label) => format!("{label}: {}", fmt_tick(p.y)),
        None => format!("{}: {}", series.name, fmt_tick(p.y)),
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Widen a range by 5% each side; a point range becomes ±1.
fn pad(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < 1e-9 {
        return (lo - 1.0, hi + 1.0);
    }
    let m = (hi - lo) * 0.05;
    (if lo == 0.0 { lo } else { lo - m }, hi + m)
}

fn pad_range((lo, hi): (f64, f64)) -> (f64, f64) {
    pad(lo, hi)
}

fn ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    (0..=count)
        .map(|i| lo + (hi - lo) * i as f64 / count as f64)
        .collect()
}

fn fmt_tick(v: f64) -> String {
    if (v - v.round()).abs() < 1e-6 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.1}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}

/// Escape text for HTML/SVG content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_empty_chart_says_no_data() {
        let svg = Chart::new(ChartKind::Line, "Nothing").to_svg();
        assert!(svg.contains("No data"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_bar_chart_has_one_rect_per_point() {
        let chart = Chart::new(ChartKind::Bar, "Top artists")
            .categories(["A", "B", "C"])
            .series(Series::from_values("tracks", [3.0, 2.0, 1.0]));
        let svg = chart.to_svg();
        assert_eq!(svg.matches("<rect").count(), 3);
        assert!(svg.contains(">B<"));
        // Single series: no legend swatches
        assert!(!svg.contains("class=\"legend\""));
    }

    #[test]
    fn test_line_chart_and_annotations() {
        let chart = Chart::new(ChartKind::Line, "Timeline & more")
            .axes("Year", "Score")
            .series(Series::new("X", vec![Point::new(2021.0, 1.0), Point::new(2020.0, 3.0)]))
            .series(Series::new("Y", vec![Point::labeled(2021.0, 2.0, "peak")]))
            .annotate(Annotation::HLine { y: 2.0, text: "mean".into() });
        let svg = chart.to_svg();
        assert!(svg.contains("Timeline &amp; more"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("peak: 2"));
        assert!(svg.contains(">mean<"));
        assert!(svg.contains("class=\"legend\""));
    }

    #[test]
    fn test_radar_polygon_per_series() {
        let chart = Chart::new(ChartKind::Radar, "Profile")
            .categories(["a", "b", "c", "d"])
            .y_range(0.0, 6.0)
            .series(Series::from_values("you", [6.0, 2.0, 0.0, 4.0]));
        let svg = chart.to_svg();
        // 4 grid rings + 1 data polygon
        assert_eq!(svg.matches("<polygon").count(), 5);
    }

    #[test]
    fn test_ticks_and_format() {
        assert_eq!(ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(fmt_tick(4.0), "4");
        assert_eq!(fmt_tick(2.25), "2.2");
        assert_eq!(pad(3.0, 3.0), (2.0, 4.0));
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
