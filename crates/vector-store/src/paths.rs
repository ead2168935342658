use std::path::PathBuf;

pub const TREEGPT_DIR_NAME: &str = ".treegpt";

pub const ARCHIVE_REL_PATH: &str = "unzipped/conversations.json";
pub const VECTORS_REL_PATH: &str = "graphs/prepared_messages.json";
pub const GRAPH_REL_PATH: &str = "graphs/graph_data.json";

/// Root of all TreeGPT state: `$TREEGPT_HOME`, else `~/.treegpt`.
#[must_use]
pub fn treegpt_home() -> PathBuf {
    if let Ok(path) = std::env::var("TREEGPT_HOME") {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TREEGPT_DIR_NAME)
}

/// Directory holding `<model-id>/model.onnx` and `<model-id>/tokenizer.json`.
#[must_use]
pub fn model_dir() -> PathBuf {
    if let Ok(path) = std::env::var("TREEGPT_MODEL_DIR") {
        return PathBuf::from(path);
    }
    treegpt_home().join("models")
}

#[must_use]
pub fn default_archive_path() -> PathBuf {
    treegpt_home().join(ARCHIVE_REL_PATH)
}

#[must_use]
pub fn default_vectors_path() -> PathBuf {
    treegpt_home().join(VECTORS_REL_PATH)
}

#[must_use]
pub fn default_graph_path() -> PathBuf {
    treegpt_home().join(GRAPH_REL_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_share_the_home_dir() {
        let home = treegpt_home();
        assert!(default_archive_path().starts_with(&home));
        assert!(default_vectors_path().ends_with("graphs/prepared_messages.json"));
        assert!(default_graph_path().ends_with("graphs/graph_data.json"));
    }
}
