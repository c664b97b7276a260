//! Clustering engine: feature matrices, distance and quality primitives,
//! K-Means and DBSCAN.

pub mod algorithms;
pub mod error;
pub mod features;
pub mod matrix;
pub mod result;

pub use algorithms::dbscan::{dbscan, DbscanParams};
pub use algorithms::distance::euclidean_distance;
pub use algorithms::kmeans::{assign_labels, best_k_means, kmeans, KMeansParams};
pub use algorithms::silhouette::silhouette_score;
pub use error::ClusteringError;
pub use features::{build_feature_matrix, FEATURE_NAMES};
pub use matrix::{FeatureMatrix, FeatureVector};
pub use result::{Algorithm, ClusteringResult, NOISE};
