//! Classical significance tests over listening data.
//!
//! p-values come from the regularised incomplete beta function
//! (continued-fraction evaluation, Lentz's method).

use std::collections::HashSet;

use crate::db::models::{TimeRange, TrackSnapshot};

use super::{duration_minutes, group_songs, mean, sample_std, sample_variance, song_age};

/// Significance level used for every test.
pub const ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestResult {
    pub fn significant(&self) -> bool {
        self.p_value < ALPHA
    }
}

/// ln Γ(x) for x > 0 (Lanczos, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = COEF[0];
    let t = x + 7.5;
    for (i, c) in COEF.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Continued fraction for the incomplete beta function.
fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 3e-14;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularised incomplete beta I_x(a, b).
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_cf(a, b, x) / a
    } else {
        1.0 - front * beta_cf(b, a, 1.0 - x) / b
    }
}

/// Two-sided p-value of Student's t with `df` degrees of freedom.
pub fn t_p_value(t: f64, df: f64) -> f64 {
    incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// Upper-tail p-value of F(d1, d2).
pub fn f_p_value(f: f64, d1: f64, d2: f64) -> f64 {
    incomplete_beta(d2 / 2.0, d1 / 2.0, d2 / (d2 + d1 * f))
}

/// One-way ANOVA. Needs at least two non-empty groups, more observations
/// than groups, and some within-group spread.
pub fn one_way_anova(groups: &[Vec<f64>]) -> Option<TestResult> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n <= k {
        return None;
    }

    let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in &groups {
        let m = mean(g)?;
        ss_between += g.len() as f64 * (m - grand).powi(2);
        ss_within += g.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    }
    if ss_within <= 0.0 {
        return None;
    }

    let d1 = (k - 1) as f64;
    let d2 = (n - k) as f64;
    let f = (ss_between / d1) / (ss_within / d2);
    Some(TestResult { statistic: f, p_value: f_p_value(f, d1, d2) })
}

/// Pearson correlation with a two-sided p-value. `None` below three points
/// or when either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<TestResult> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let p_value = if (1.0 - r.abs()) < 1e-12 {
        0.0
    } else {
        t_p_value(r * (df / (1.0 - r * r)).sqrt(), df)
    };
    Some(TestResult { statistic: r, p_value })
}

/// Student's two-sample t-test with pooled variance.
pub fn t_test(a: &[f64], b: &[f64]) -> Option<TestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return None;
    }
    let df = (n1 + n2 - 2) as f64;
    let pooled = ((n1 - 1) as f64 * sample_variance(a)? + (n2 - 1) as f64 * sample_variance(b)?) / df;
    let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    if se <= 0.0 {
        return None;
    }
    let t = (mean(a)? - mean(b)?) / se;
    Some(TestResult { statistic: t, p_value: t_p_value(t, df) })
}

#[derive(Debug, Clone)]
pub struct DurationComparison {
    pub explicit_mean: f64,
    pub clean_mean: f64,
    pub test: TestResult,
}

#[derive(Debug, Clone)]
pub struct RankingConsistency {
    pub repeated_songs: usize,
    /// Mean of per-song rank standard deviations.
    pub avg_std: f64,
    pub std_of_std: Option<f64>,
    pub level: &'static str,
}

#[derive(Debug, Clone)]
pub struct StatReport {
    /// Popularity across windows.
    pub popularity_anova: Option<TestResult>,
    /// Song age vs rank, with the number of dated rows.
    pub age_rank: Option<(TestResult, usize)>,
    pub duration_explicit: Option<DurationComparison>,
    pub ranking_consistency: Option<RankingConsistency>,
    pub total_tracks: usize,
    pub unique_songs: usize,
    pub windows: usize,
}

/// Run every test whose minimum sample size is met.
pub fn statistical_tests(tracks: &[TrackSnapshot], reference_year: i32) -> StatReport {
    let present: HashSet<TimeRange> = tracks.iter().map(|t| t.time_range).collect();

    let popularity_anova = if present.len() > 1 {
        let groups: Vec<Vec<f64>> = TimeRange::ALL
            .into_iter()
            .filter(|r| present.contains(r))
            .map(|r| {
                tracks
                    .iter()
                    .filter(|t| t.time_range == r)
                    .map(|t| t.popularity as f64)
                    .collect()
            })
            .collect();
        one_way_anova(&groups)
    } else {
        None
    };

    let (ages, ranks): (Vec<f64>, Vec<f64>) = tracks
        .iter()
        .filter_map(|t| song_age(t, reference_year).map(|a| (a, t.rank_position as f64)))
        .unzip();
    let age_rank = if ages.len() > 10 {
        pearson(&ages, &ranks).map(|r| (r, ages.len()))
    } else {
        None
    };

    let explicit: Vec<f64> = tracks.iter().filter(|t| t.explicit).map(duration_minutes).collect();
    let clean: Vec<f64> = tracks.iter().filter(|t| !t.explicit).map(duration_minutes).collect();
    let duration_explicit = if explicit.len() > 5 && clean.len() > 5 {
        t_test(&explicit, &clean).and_then(|test| {
            Some(DurationComparison {
                explicit_mean: mean(&explicit)?,
                clean_mean: mean(&clean)?,
                test,
            })
        })
    } else {
        None
    };

    let groups = group_songs(tracks);
    let stds: Vec<f64> = groups.iter().filter_map(|g| sample_std(&g.ranks())).collect();
    let ranking_consistency = if stds.len() > 5 {
        mean(&stds).map(|avg_std| RankingConsistency {
            repeated_songs: stds.len(),
            avg_std,
            std_of_std: sample_std(&stds),
            level: if avg_std < 5.0 {
                "HIGH"
            } else if avg_std < 10.0 {
                "MODERATE"
            } else {
                "LOW"
            },
        })
    } else {
        None
    };

    StatReport {
        popularity_anova,
        age_rank,
        duration_explicit,
        ranking_consistency,
        total_tracks: tracks.len(),
        unique_songs: groups.len(),
        windows: present.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::track;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_incomplete_beta_known_values() {
        // I_x(1, 1) = x
        assert!(close(incomplete_beta(1.0, 1.0, 0.3), 0.3, 1e-10));
        // I_x(2, 3) at 0.4 = 0.5248
        assert!(close(incomplete_beta(2.0, 3.0, 0.4), 0.5248, 1e-8));
        assert_eq!(incomplete_beta(2.0, 2.0, 0.0), 0.0);
        assert_eq!(incomplete_beta(2.0, 2.0, 1.0), 1.0);
    }

    #[test]
    fn test_t_p_value_reference() {
        // t = 2.228 at df = 10 is the two-sided 5% critical value
        assert!(close(t_p_value(2.228, 10.0), 0.05, 1e-3));
        assert!(close(t_p_value(0.0, 10.0), 1.0, 1e-12));
    }

    #[test]
    fn test_anova_reference() {
        let groups = vec![
            vec![6.0, 8.0, 4.0, 5.0, 3.0, 4.0],
            vec![8.0, 12.0, 9.0, 11.0, 6.0, 8.0],
            vec![13.0, 9.0, 11.0, 8.0, 7.0, 12.0],
        ];
        let r = one_way_anova(&groups).unwrap();
        assert!(close(r.statistic, 9.2647, 1e-3));
        assert!(close(r.p_value, 0.002399, 1e-4));
        assert!(r.significant());

        assert!(one_way_anova(&[vec![1.0, 2.0]]).is_none());
        assert!(one_way_anova(&[vec![1.0, 1.0], vec![1.0, 1.0]]).is_none());
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let r = pearson(&x, &y).unwrap();
        assert!(close(r.statistic, 0.7746, 1e-4));
        assert!(close(r.p_value, 0.1240, 1e-3));

        let perfect = pearson(&x, &[10.0, 8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!(close(perfect.statistic, -1.0, 1e-12));
        assert_eq!(perfect.p_value, 0.0);
        assert!(pearson(&x, &[1.0; 5]).is_none());
    }

    #[test]
    fn test_t_test() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [3.0, 4.0, 5.0, 6.0, 7.0];
        let r = t_test(&a, &b).unwrap();
        assert!(close(r.statistic, -2.0, 1e-9));
        assert!(close(r.p_value, 0.0805, 1e-3));
        assert!(!r.significant());
    }

    #[test]
    fn test_report_minimum_sizes() {
        let tracks = vec![
            track("a", "A", "X", TimeRange::Short, 1, 50),
            track("b", "B", "Y", TimeRange::Short, 2, 60),
        ];
        let report = statistical_tests(&tracks, 2025);
        assert!(report.popularity_anova.is_none());
        assert!(report.age_rank.is_none());
        assert!(report.duration_explicit.is_none());
        assert!(report.ranking_consistency.is_none());
        assert_eq!(report.windows, 1);
        assert_eq!(report.unique_songs, 2);
    }

    #[test]
    fn test_report_anova_across_windows() {
        let mut tracks = Vec::new();
        for (i, pop) in [80, 82, 85, 79].iter().enumerate() {
            tracks.push(track(&format!("s{i}"), &format!("S{i}"), "X", TimeRange::Short, i as i64 + 1, *pop));
        }
        for (i, pop) in [20, 25, 22, 18].iter().enumerate() {
            tracks.push(track(&format!("l{i}"), &format!("L{i}"), "Y", TimeRange::Long, i as i64 + 1, *pop));
        }
        let report = statistical_tests(&tracks, 2025);
        let anova = report.popularity_anova.unwrap();
        assert!(anova.significant());
        assert_eq!(report.windows, 2);
    }
}
