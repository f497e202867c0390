/// File name of the BlazeFace short-range model the CLI resolves by default.
pub const BLAZEFACE_MODEL_NAME: &str = "blazeface.onnx";
pub const BLAZEFACE_MODEL_URL: &str =
    "https://github.com/facefilter/facefilter/releases/download/v0.1.0/blazeface.onnx";

/// Directory name used under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "FaceFilter";

pub const DEFAULT_FPS: f64 = 30.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
