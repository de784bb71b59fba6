pub mod parallel_detection;
