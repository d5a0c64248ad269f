use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const SECTION_RULE: &str = "--------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    JavaModel,
    RuleFile,
    DecisionTable,
}

impl FileCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FileCategory::JavaModel => "java model",
            FileCategory::RuleFile => "drl rule",
            FileCategory::DecisionTable => "decision table",
        }
    }
}

/// Classify a path the way the repository scan does. Java files only count
/// when their path mentions "model"; plain `.java` sources are ignored.
pub fn classify(path: &Path) -> Option<FileCategory> {
    let ext = path.extension().and_then(|s| s.to_str())?.to_lowercase();
    match ext.as_str() {
        "java" if path.to_string_lossy().to_lowercase().contains("model") => {
            Some(FileCategory::JavaModel)
        }
        "drl" => Some(FileCategory::RuleFile),
        "gdst" => Some(FileCategory::DecisionTable),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub category: FileCategory,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ScanSummary {
    pub java_models: usize,
    pub rule_files: usize,
    pub decision_tables: usize,
}

impl ScanSummary {
    pub fn is_empty(&self) -> bool {
        self.java_models == 0 && self.rule_files == 0 && self.decision_tables == 0
    }
}

/// One scanned file prepared for the context chunker: self-describing text
/// with the file header baked in.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub category: FileCategory,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct RepositoryScan {
    pub root: PathBuf,
    pub files: Vec<ScannedFile>,
}

pub fn scan_repository(root: &Path) -> Result<RepositoryScan> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    // Deterministic order keeps context and chunk boundaries stable.
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(RepositoryScan { root: root.to_path_buf(), files })
}

fn walk(dir: &Path, out: &mut Vec<ScannedFile>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            if name.starts_with('.') || name == "target" || name == "node_modules" {
                continue;
            }
            walk(&path, out)?;
        } else if let Some(category) = classify(&path) {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            out.push(ScannedFile { path, category, size });
        }
    }
    Ok(())
}

impl RepositoryScan {
    pub fn summary(&self) -> ScanSummary {
        let mut s = ScanSummary::default();
        for f in &self.files {
            match f.category {
                FileCategory::JavaModel => s.java_models += 1,
                FileCategory::RuleFile => s.rule_files += 1,
                FileCategory::DecisionTable => s.decision_tables += 1,
            }
        }
        s
    }

    pub fn files_in(&self, category: FileCategory) -> Vec<&ScannedFile> {
        self.files.iter().filter(|f| f.category == category).collect()
    }

    /// Read every scanned file and produce the ordered document list:
    /// Java models first, then DRL rules, then decision tables.
    pub fn build_documents(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.files.len());
        for category in [FileCategory::JavaModel, FileCategory::RuleFile, FileCategory::DecisionTable] {
            for file in self.files_in(category) {
                let content = fs::read_to_string(&file.path)
                    .with_context(|| format!("reading file: {}", file.path.display()))?;
                let text = match category {
                    FileCategory::JavaModel => java_model_document_text(&file.path, &content)?,
                    _ => plain_document_text(&file.path, &content),
                };
                docs.push(Document {
                    source: file.path.display().to_string(),
                    category,
                    text,
                });
            }
        }
        Ok(docs)
    }
}

fn plain_document_text(path: &Path, content: &str) -> String {
    format!("File: {}\n{}\n{}\n", path.display(), content, SECTION_RULE)
}

fn java_model_document_text(path: &Path, content: &str) -> Result<String> {
    let info = extract_java_model_info(content)?;
    let mut text = format!("File: {}\nClass: {}\nFields:\n", path.display(), info.class_name);
    for (field_type, field_name) in &info.fields {
        text.push_str(&format!("  - {} {}\n", field_type, field_name));
    }
    text.push_str(&format!("Annotations: {}\n", info.annotations.join(", ")));
    text.push_str(&format!("\nFull Content:\n{}\n{}\n", content, SECTION_RULE));
    Ok(text)
}

#[derive(Debug, Clone, Default)]
pub struct JavaModelInfo {
    pub class_name: String,
    /// (type, name) pairs of private fields.
    pub fields: Vec<(String, String)>,
    pub imports: Vec<String>,
    pub annotations: Vec<String>,
}

pub fn extract_java_model_info(content: &str) -> Result<JavaModelInfo> {
    let class_re = Regex::new(r"public\s+class\s+(\w+)")?;
    let field_re = Regex::new(r"private\s+(\w+(?:<[^>]+>)?)\s+(\w+);")?;
    let import_re = Regex::new(r"import\s+([^;]+);")?;
    let annotation_re = Regex::new(r"@(\w+)")?;

    let mut info = JavaModelInfo::default();
    if let Some(caps) = class_re.captures(content) {
        info.class_name = caps[1].to_string();
    }
    for caps in field_re.captures_iter(content) {
        info.fields.push((caps[1].to_string(), caps[2].to_string()));
    }
    for caps in import_re.captures_iter(content) {
        info.imports.push(caps[1].to_string());
    }
    for caps in annotation_re.captures_iter(content) {
        let name = caps[1].to_string();
        if !info.annotations.contains(&name) {
            info.annotations.push(name);
        }
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension_and_model_path() {
        assert_eq!(classify(Path::new("src/model/Person.java")), Some(FileCategory::JavaModel));
        assert_eq!(classify(Path::new("src/Models/Order.JAVA")), Some(FileCategory::JavaModel));
        assert_eq!(classify(Path::new("src/service/PersonService.java")), None);
        assert_eq!(classify(Path::new("rules/discount.drl")), Some(FileCategory::RuleFile));
        assert_eq!(classify(Path::new("tables/pricing.gdst")), Some(FileCategory::DecisionTable));
        assert_eq!(classify(Path::new("README.md")), None);
        assert_eq!(classify(Path::new("Makefile")), None);
    }

    #[test]
    fn extracts_java_model_info() {
        let content = r#"
package com.example.model;

import java.util.List;
import javax.persistence.Entity;

@Entity
@Table
public class Customer {
    private String name;
    private List<String> tags;
    private int age;

    public String getName() { return name; }
}
"#;
        let info = extract_java_model_info(content).unwrap();
        assert_eq!(info.class_name, "Customer");
        assert_eq!(
            info.fields,
            vec![
                ("String".to_string(), "name".to_string()),
                ("List<String>".to_string(), "tags".to_string()),
                ("int".to_string(), "age".to_string()),
            ]
        );
        assert_eq!(info.imports, vec!["java.util.List", "javax.persistence.Entity"]);
        assert!(info.annotations.contains(&"Entity".to_string()));
        assert!(info.annotations.contains(&"Table".to_string()));
    }

    #[test]
    fn scan_finds_and_orders_documents() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/model")).unwrap();
        fs::create_dir_all(root.join("rules")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(
            root.join("src/model/Person.java"),
            "public class Person {\n    private String name;\n}\n",
        )
        .unwrap();
        fs::write(root.join("rules/b.drl"), "rule \"b\"\nwhen\nthen\nend\n").unwrap();
        fs::write(root.join("rules/a.drl"), "rule \"a\"\nwhen\nthen\nend\n").unwrap();
        fs::write(root.join("rules/pricing.gdst"), "<decision-table/>\n").unwrap();
        fs::write(root.join(".git/ignored.drl"), "not scanned\n").unwrap();
        fs::write(root.join("README.md"), "docs\n").unwrap();

        let scan = scan_repository(root).unwrap();
        let summary = scan.summary();
        assert_eq!(summary.java_models, 1);
        assert_eq!(summary.rule_files, 2);
        assert_eq!(summary.decision_tables, 1);
        assert!(!summary.is_empty());

        let docs = scan.build_documents().unwrap();
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0].category, FileCategory::JavaModel);
        assert!(docs[0].text.contains("Class: Person"));
        assert!(docs[0].text.contains("  - String name"));
        // Rule files sorted by path: a.drl before b.drl.
        assert!(docs[1].source.ends_with("a.drl"));
        assert!(docs[2].source.ends_with("b.drl"));
        assert_eq!(docs[3].category, FileCategory::DecisionTable);
    }

    #[test]
    fn empty_directory_scans_clean() {
        let temp = tempfile::tempdir().unwrap();
        let scan = scan_repository(temp.path()).unwrap();
        assert!(scan.summary().is_empty());
        assert!(scan.build_documents().unwrap().is_empty());
    }
}
