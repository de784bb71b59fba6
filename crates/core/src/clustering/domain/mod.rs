pub mod cluster_assignment;
pub mod clustering_params;
pub mod face_clusterer;
