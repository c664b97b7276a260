//! One segmentation run: features, clusters, patterns, suggestions.
//!
//! The engine is a short-lived value built per run (or per tenant); it holds
//! no state between runs, so concurrent runs only share the copy writer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cohort_compute::{
    build_feature_matrix, dbscan, kmeans, Algorithm, ClusteringError, ClusteringResult,
    DbscanParams, FeatureMatrix, KMeansParams,
};
use cohort_core::config::{AlgorithmChoice, SegmentationConfig};
use cohort_core::CustomerProfile;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::InsightError;
use crate::pattern::{DiscoveredPattern, PatternAnalyzer};
use crate::suggest::{
    CopySource, SuggestedSegment, SuggestionGenerator, SuggestionSettings, SuggestionWriter,
};

/// Which clustering algorithm(s) a run uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusteringStrategy {
    KMeans(KMeansParams),
    Dbscan(DbscanParams),
    /// Run both and keep the higher quality score; ties go to K-Means.
    Auto { kmeans: KMeansParams, dbscan: DbscanParams },
}

impl ClusteringStrategy {
    pub fn from_config(config: &SegmentationConfig) -> Self {
        let kmeans = KMeansParams {
            k: config.k,
            max_iterations: config.max_iterations,
            seed: config.seed,
            trials: config.kmeans_trials,
        };
        let dbscan = DbscanParams::new(config.eps, config.min_pts);
        match config.algorithm {
            AlgorithmChoice::Kmeans => ClusteringStrategy::KMeans(kmeans),
            AlgorithmChoice::Dbscan => ClusteringStrategy::Dbscan(dbscan),
            AlgorithmChoice::Auto => ClusteringStrategy::Auto { kmeans, dbscan },
        }
    }

    pub fn cluster(&self, matrix: &FeatureMatrix) -> Result<ClusteringResult, ClusteringError> {
        match self {
            ClusteringStrategy::KMeans(params) => kmeans(matrix, params),
            ClusteringStrategy::Dbscan(params) => dbscan(matrix, params),
            ClusteringStrategy::Auto { kmeans: kp, dbscan: dp } => {
                let by_centroid = kmeans(matrix, kp)?;
                let by_density = dbscan(matrix, dp)?;
                info!(
                    kmeans_quality = by_centroid.quality_score,
                    dbscan_quality = by_density.quality_score,
                    "auto clustering compared algorithms"
                );
                if by_density.quality_score > by_centroid.quality_score {
                    Ok(by_density)
                } else {
                    Ok(by_centroid)
                }
            }
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub clustering: ClusteringResult,
    pub patterns: Vec<DiscoveredPattern>,
    pub suggestions: Vec<SuggestedSegment>,
    /// Suggestions whose copy fell back to the template after a writer failure.
    pub degraded_copy_count: usize,
}

pub struct SegmentationEngine {
    strategy: ClusteringStrategy,
    analyzer: PatternAnalyzer,
    generator: SuggestionGenerator,
    run_deadline: Option<Duration>,
}

impl SegmentationEngine {
    pub fn new(
        strategy: ClusteringStrategy,
        analyzer: PatternAnalyzer,
        generator: SuggestionGenerator,
    ) -> Self {
        Self {
            strategy,
            analyzer,
            generator,
            run_deadline: None,
        }
    }

    pub fn from_config(config: &SegmentationConfig, writer: Arc<dyn SuggestionWriter>) -> Self {
        let engine = Self::new(
            ClusteringStrategy::from_config(config),
            PatternAnalyzer::new(config.min_cluster_size),
            SuggestionGenerator::new(writer, SuggestionSettings::from_config(config)),
        );
        match config.run_deadline_secs {
            Some(secs) => engine.with_deadline(Duration::from_secs(secs)),
            None => engine,
        }
    }

    /// Bound the whole run, copy generation included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = Some(deadline);
        self
    }

    pub fn strategy(&self) -> &ClusteringStrategy {
        &self.strategy
    }

    /// Build features from `customers` and run the full pipeline.
    pub async fn run(&self, customers: &[CustomerProfile]) -> Result<SegmentationReport, InsightError> {
        let matrix = build_feature_matrix(customers)?;
        self.run_with_matrix(&matrix, customers).await
    }

    /// Run the pipeline on a matrix supplied from elsewhere. Row `i` of
    /// `matrix` must describe `customers[i]`.
    pub async fn run_with_matrix(
        &self,
        matrix: &FeatureMatrix,
        customers: &[CustomerProfile],
    ) -> Result<SegmentationReport, InsightError> {
        match self.run_deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.execute(matrix, customers))
                .await
                .map_err(|_| {
                    warn!(?deadline, "segmentation run timed out");
                    InsightError::DeadlineExceeded(deadline)
                })?,
            None => self.execute(matrix, customers).await,
        }
    }

    async fn execute(
        &self,
        matrix: &FeatureMatrix,
        customers: &[CustomerProfile],
    ) -> Result<SegmentationReport, InsightError> {
        check_alignment(matrix, customers)?;

        let run_id = Uuid::new_v4();
        info!(%run_id, customers = customers.len(), "segmentation run started");

        // Clustering and pattern analysis are CPU-bound; keep them off the
        // runtime so the run deadline can still fire.
        let strategy = self.strategy.clone();
        let analyzer = self.analyzer.clone();
        let matrix = matrix.clone();
        let customers: Arc<[CustomerProfile]> = customers.into();
        let (clustering, patterns) = tokio::task::spawn_blocking(move || {
            let clustering = strategy.cluster(&matrix)?;
            info!(
                %run_id,
                algorithm = %clustering.algorithm,
                clusters = clustering.cluster_count,
                noise = clustering.noise_count(),
                quality_score = clustering.quality_score,
                "clustering complete"
            );
            let patterns = analyzer.analyze(&clustering, &customers)?;
            Ok::<_, InsightError>((clustering, patterns))
        })
        .await??;

        let suggestions = self.generator.generate(&patterns).await;
        let degraded_copy_count = suggestions
            .iter()
            .filter(|s| s.copy_source == CopySource::Fallback)
            .count();

        info!(
            %run_id,
            patterns = patterns.len(),
            suggestions = suggestions.len(),
            degraded_copy_count,
            "segmentation run finished"
        );

        Ok(SegmentationReport {
            run_id,
            generated_at: Utc::now(),
            algorithm: clustering.algorithm,
            clustering,
            patterns,
            suggestions,
            degraded_copy_count,
        })
    }
}

fn check_alignment(matrix: &FeatureMatrix, customers: &[CustomerProfile]) -> Result<(), InsightError> {
    if matrix.len() != customers.len() {
        return Err(InsightError::MisalignedInput {
            labels: matrix.len(),
            customers: customers.len(),
        });
    }
    let reordered = matrix
        .ids()
        .iter()
        .zip(customers)
        .position(|(id, c)| *id != c.customer_id);
    if let Some(row) = reordered {
        return Err(InsightError::ReorderedInput {
            row,
            expected: customers[row].customer_id.clone(),
            found: matrix.ids()[row].clone(),
        });
    }
    Ok(())
}
