/// Combines analyzer scores into one total with a weighted power mean:
///
///   total = Σ(score^exponent · weight) / Σ(weight)
///
/// Exponents above 1 let a bad sub-score drag the total down harder than
/// its weight alone would.
use crate::analyzers::{report, Analyzer, AnalyzerKind, Report};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::json;

/// A constant weight, or one the analyzer computes from what it saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weight {
    Fixed(f64),
    Dynamic,
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Fixed(f64),
            Named(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Fixed(w) => Ok(Weight::Fixed(w)),
            Repr::Named(name) if name == "dynamic" => Ok(Weight::Dynamic),
            Repr::Named(name) => Err(D::Error::custom(format!("unknown weight {name:?}"))),
        }
    }
}

fn default_exponent() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreWeight {
    pub analyzer: AnalyzerKind,
    pub weight:   Weight,
    #[serde(default = "default_exponent")]
    pub exponent: f64,
}

pub struct AnalysisScorer<'s, 'a> {
    analyzers: &'s [Box<dyn Analyzer + 'a>],
    weights:   &'s [ScoreWeight],
}

impl<'s, 'a> AnalysisScorer<'s, 'a> {
    pub fn new(analyzers: &'s [Box<dyn Analyzer + 'a>], weights: &'s [ScoreWeight]) -> Self {
        Self { analyzers, weights }
    }

    pub fn get_analyzer(&self, kind: AnalyzerKind) -> Option<&'s (dyn Analyzer + 'a)> {
        self.analyzers.iter().find(|a| a.kind() == kind).map(|a| a.as_ref())
    }

    /// Analyzers missing from the roster, or without a score, are left out
    /// of both sums. With nothing left to weigh the total is `1.0`.
    pub fn total_score(&self) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for entry in self.weights {
            let Some(analyzer) = self.get_analyzer(entry.analyzer) else {
                tracing::debug!("No {:?} analyzer for this fight, skipping its weight", entry.analyzer);
                continue;
            };
            let Some(score) = analyzer.score() else { continue };
            let weight = match entry.weight {
                Weight::Fixed(w) => w,
                Weight::Dynamic => analyzer.dynamic_weight().unwrap_or(0.0),
            };
            weighted += score.powf(entry.exponent) * weight;
            total_weight += weight;
        }

        if total_weight == 0.0 {
            return 1.0;
        }
        weighted / total_weight
    }

    pub fn report(&self) -> Report {
        report("analysis_scores", json!({ "total_score": self.total_score() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyzers::EventInput, annotation::Annotation, error::Result};

    struct Fixed {
        kind:    AnalyzerKind,
        score:   Option<f64>,
        dynamic: Option<f64>,
    }

    impl Analyzer for Fixed {
        fn kind(&self) -> AnalyzerKind {
            self.kind
        }

        fn add_event(&mut self, _: &EventInput<'_>, _: &mut Annotation) -> Result<()> {
            Ok(())
        }

        fn score(&self) -> Option<f64> {
            self.score
        }

        fn dynamic_weight(&self) -> Option<f64> {
            self.dynamic
        }
    }

    fn fixed(kind: AnalyzerKind, score: f64) -> Box<dyn Analyzer> {
        Box::new(Fixed { kind, score: Some(score), dynamic: None })
    }

    fn weight(analyzer: AnalyzerKind, w: f64, exponent: f64) -> ScoreWeight {
        ScoreWeight { analyzer, weight: Weight::Fixed(w), exponent }
    }

    #[test]
    fn plain_weighted_mean() {
        let analyzers = vec![fixed(AnalyzerKind::Gcd, 1.0), fixed(AnalyzerKind::Bombs, 0.0)];
        let weights = [weight(AnalyzerKind::Gcd, 1.0, 1.0), weight(AnalyzerKind::Bombs, 1.0, 1.0)];
        let scorer = AnalysisScorer::new(&analyzers, &weights);
        assert!((scorer.total_score() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn exponents_at_the_extremes_change_nothing() {
        let analyzers = vec![fixed(AnalyzerKind::Gcd, 1.0), fixed(AnalyzerKind::Bombs, 0.0)];

        let squared_zero = [weight(AnalyzerKind::Gcd, 1.0, 1.0), weight(AnalyzerKind::Bombs, 1.0, 2.0)];
        assert!((AnalysisScorer::new(&analyzers, &squared_zero).total_score() - 0.5).abs() < 1e-9);

        let squared_one = [weight(AnalyzerKind::Gcd, 1.0, 2.0), weight(AnalyzerKind::Bombs, 1.0, 1.0)];
        assert!((AnalysisScorer::new(&analyzers, &squared_one).total_score() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn exponent_applies_before_weighting() {
        let analyzers = vec![fixed(AnalyzerKind::MeleeUptime, 0.5)];
        let weights = [weight(AnalyzerKind::MeleeUptime, 4.0, 2.0)];
        assert!((AnalysisScorer::new(&analyzers, &weights).total_score() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn dynamic_weight_comes_from_the_analyzer() {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            fixed(AnalyzerKind::Gcd, 1.0),
            Box::new(Fixed { kind: AnalyzerKind::Trinkets, score: Some(0.0), dynamic: Some(3.0) }),
        ];
        let weights = [
            weight(AnalyzerKind::Gcd, 1.0, 1.0),
            ScoreWeight { analyzer: AnalyzerKind::Trinkets, weight: Weight::Dynamic, exponent: 1.0 },
        ];
        assert!((AnalysisScorer::new(&analyzers, &weights).total_score() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn missing_or_unscored_analyzers_are_skipped() {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            fixed(AnalyzerKind::Gcd, 0.8),
            Box::new(Fixed { kind: AnalyzerKind::RunicPower, score: None, dynamic: None }),
        ];
        let weights = [
            weight(AnalyzerKind::Gcd, 3.0, 1.0),
            weight(AnalyzerKind::RunicPower, 5.0, 1.0),
            weight(AnalyzerKind::Gargoyle, 5.0, 1.0),
        ];
        let scorer = AnalysisScorer::new(&analyzers, &weights);
        assert!((scorer.total_score() - 0.8).abs() < 1e-9);
        assert!(scorer.get_analyzer(AnalyzerKind::Gargoyle).is_none());
    }

    #[test]
    fn nothing_to_weigh_scores_full() {
        let analyzers: Vec<Box<dyn Analyzer>> = Vec::new();
        let scorer = AnalysisScorer::new(&analyzers, &[]);
        assert_eq!(scorer.total_score(), 1.0);
        assert_eq!(scorer.report()["analysis_scores"]["total_score"], 1.0);
    }

    #[test]
    fn weights_parse_from_toml() {
        #[derive(Deserialize)]
        struct Table {
            weights: Vec<ScoreWeight>,
        }
        let table: Table = toml::from_str(
            r#"
            weights = [
                { analyzer = "gcd", weight = 3 },
                { analyzer = "trinkets", weight = "dynamic" },
                { analyzer = "melee_uptime", weight = 4.0, exponent = 1.5 },
            ]
            "#,
        )
        .unwrap();
        assert_eq!(table.weights[0].weight, Weight::Fixed(3.0));
        assert_eq!(table.weights[0].exponent, 1.0);
        assert_eq!(table.weights[1].weight, Weight::Dynamic);
        assert_eq!(table.weights[2].exponent, 1.5);

        let bad: std::result::Result<Table, _> =
            toml::from_str(r#"weights = [{ analyzer = "gcd", weight = "heavy" }]"#);
        assert!(bad.is_err());
    }
}
