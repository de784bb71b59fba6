pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Maximum cosine distance for two faces to be density-reachable.
pub const DEFAULT_EPSILON: f64 = 0.45;

/// Neighborhood size (self included) that makes a face a core point.
/// With 1, every face is a core point and no noise label exists.
pub const DEFAULT_MIN_POINTS: usize = 1;

pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const CORPUS_FILE_NAME: &str = "processed_faces.json";
pub const REPRESENTATIVES_FILE_NAME: &str = "representatives.json";
pub const MEMBERS_FILE_NAME: &str = "members.json";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
