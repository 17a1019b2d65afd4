use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    VisionTransformer,
    Cnn,
    Mlp,
    LargeLanguageModel,
    DecisionTree,
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub file_path: String,
    pub model_type: ModelType,
    #[serde(default)]
    pub model_size: u64,
    /// Requested replica count.
    #[serde(default)]
    pub replicas: u32,

    /// Model-specific input schema, e.g. `{"prompt": "string", "max_tokens": "number"}`.
    #[serde(default)]
    pub input_format: serde_json::Value,
}
