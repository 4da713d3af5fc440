use chrono::{DateTime, Utc};

use crate::classifier::ClassifierScorer;
use crate::config::AnalysisConfig;
use crate::detection::{AnomalyDetector, ConsistencyChecker};
use crate::features::FeatureExtractor;
use crate::nmea::SentenceParser;
use crate::prelude::{AnalysisError, AnalysisResult, CancelFlag, Diagnostics, WarningKind};
use crate::report::{AnalysisReport, ReportAssembler, ReportMeta};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::track::{Track, TrackBuilder};

/// One uploaded log. `analyzed_at` is supplied by the caller so identical
/// requests produce identical reports.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub file_name: &'a str,
    pub payload: &'a [u8],
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub diagnostics: Diagnostics,
}

/// The analysis service: configuration and the frozen model, fixed at
/// construction and shared read-only between requests.
pub struct Analyzer {
    config: AnalysisConfig,
    scorer: Option<ClassifierScorer>,
    extractor: FeatureExtractor,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig, scorer: Option<ClassifierScorer>) -> AnalysisResult<Self> {
        config.validate()?;
        let logger = LogManager::new("analyzer");
        match &scorer {
            Some(scorer) => logger.record(&format!("scoring with model {}", scorer.model_version())),
            None => logger.warn("no model loaded; spoofing_score will be null"),
        }
        Ok(Self {
            config,
            scorer,
            extractor: FeatureExtractor::new(),
            metrics: MetricsRecorder::new(),
            logger,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn has_model(&self) -> bool {
        self.scorer.is_some()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn analyze(
        &self,
        request: AnalysisRequest<'_>,
        cancel: &CancelFlag,
    ) -> AnalysisResult<AnalysisOutcome> {
        let result = self.run(request, cancel);
        match &result {
            Ok(outcome) => self.metrics.record_processed(outcome.diagnostics.parse_errors),
            Err(e) => {
                self.metrics.record_failed();
                self.logger
                    .warn(&format!("{}: analysis failed: {}", request.file_name, e));
            }
        }
        result
    }

    fn run(&self, request: AnalysisRequest<'_>, cancel: &CancelFlag) -> AnalysisResult<AnalysisOutcome> {
        if request.payload.iter().all(u8::is_ascii_whitespace) {
            return Err(AnalysisError::Input(format!("{} is empty", request.file_name)));
        }
        let text = String::from_utf8_lossy(request.payload);

        let parsed = SentenceParser::new(&self.config.parser).parse(
            &text,
            request.analyzed_at.date_naive(),
            cancel,
        )?;
        cancel.check()?;

        let (track, mut diagnostics) = TrackBuilder::new(&self.config.track).build(parsed, cancel)?;
        if track.is_empty() {
            return Err(AnalysisError::Input(format!(
                "{} contains no valid navigation epochs ({} malformed lines)",
                request.file_name, diagnostics.parse_errors
            )));
        }
        cancel.check()?;

        let rule_events = AnomalyDetector::new(&self.config.detectors).run(&track, cancel)?;
        cancel.check()?;
        let consistency = ConsistencyChecker::new(&self.config.consistency).check(&track);
        cancel.check()?;

        let spoofing_score = match &self.scorer {
            Some(scorer) if track.len() >= self.config.classifier.min_samples => {
                self.score(scorer, &track, &mut diagnostics)?
            }
            Some(_) => {
                self.logger.detail(&format!(
                    "{} samples is below the scoring minimum of {}",
                    track.len(),
                    self.config.classifier.min_samples
                ));
                None
            }
            None => None,
        };

        let report = ReportAssembler::assemble(
            ReportMeta {
                file_name: request.file_name,
                analyzed_at: request.analyzed_at,
            },
            &track,
            &rule_events,
            &consistency,
            spoofing_score,
        );
        report.validate()?;

        self.logger.record(&format!(
            "{}: {} samples, {} anomalies, {} parse errors, {} warnings",
            request.file_name,
            report.meta.sample_count,
            report.summary.total_anomalies,
            diagnostics.parse_errors,
            diagnostics.warning_count()
        ));
        Ok(AnalysisOutcome {
            report,
            diagnostics,
        })
    }

    /// Non-finite track summaries leave the score null with a warning.
    fn score(
        &self,
        scorer: &ClassifierScorer,
        track: &Track,
        diagnostics: &mut Diagnostics,
    ) -> AnalysisResult<Option<f64>> {
        match self.extractor.extract(track) {
            Ok(features) => scorer.score(&features).map(Some),
            Err(e) => {
                self.logger.warn(&format!("skipping classifier: {}", e));
                diagnostics.warn(WarningKind::UnscorableFeatures, e.to_string());
                Ok(None)
            }
        }
    }
}
