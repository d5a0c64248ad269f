use anyhow::{bail, Context, Result};
use std::path::Path;

pub async fn read_file_to_string_async(path: &Path) -> Result<String> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading file: {}", path.display()))?;
    Ok(data)
}

/// Write text content to a file asynchronously
pub async fn write_file_async(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating directory: {}", parent.display()))?;
        }
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("writing file: {}", path.display()))?;
    Ok(())
}

pub fn filename_only(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Starter content for a freshly created rule file.
pub fn new_rule_template() -> &'static str {
    r#"package com.example.rules;

import java.util.*;

rule "New Rule"
    when
        // Add your conditions here
    then
        // Add your actions here
end
"#
}

pub fn timestamped_rule_name(prefix: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.drl", prefix, stamp)
}

pub fn launch_editor(editor: &str, path: &Path) -> Result<()> {
    let status = std::process::Command::new(editor)
        .arg(path)
        .status()
        .with_context(|| format!("launching editor: {}", editor))?;
    if !status.success() {
        bail!("editor '{}' exited with status {}", editor, status);
    }
    Ok(())
}
