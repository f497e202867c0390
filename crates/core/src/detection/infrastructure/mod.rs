pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_blazeface_source;
pub mod threaded_detection_executor;
