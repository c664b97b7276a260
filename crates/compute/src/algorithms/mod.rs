pub mod dbscan;
pub mod distance;
pub mod kmeans;
pub mod silhouette;
