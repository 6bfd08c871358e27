use std::fs;
use std::path::Path;

use super::{QuestionBank, Result};

fn is_yaml(path: &Path) -> bool {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    matches!(extension.as_str(), "yaml" | "yml")
}

/// Reads and validates a bank. `.yaml`/`.yml` files are YAML, anything else JSON.
pub fn load_bank(path: impl AsRef<Path>) -> Result<QuestionBank> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let bank = if is_yaml(path) {
        serde_yaml::from_str::<QuestionBank>(&raw)?
    } else {
        serde_json::from_str::<QuestionBank>(&raw)?
    };
    bank.validate()?;
    log::info!(
        "loaded {} question(s) from {}",
        bank.questions.len(),
        path.display()
    );
    Ok(bank)
}

pub fn save_bank(path: impl AsRef<Path>, bank: &QuestionBank) -> Result<()> {
    let path = path.as_ref();
    let serialized = if is_yaml(path) {
        serde_yaml::to_string(bank)?
    } else {
        serde_json::to_string_pretty(bank)?
    };
    fs::write(path, serialized)?;
    Ok(())
}
