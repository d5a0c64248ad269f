use serde::{Deserialize, Serialize};

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to serialize json: {}", e),
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorOut<'a> {
    pub code: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
}

pub fn print_json_error(code: &str, message: &str, hint: Option<&str>) {
    let err = ErrorOut { code, message, hint };
    print_json(&err);
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RuleAnalysis {
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub compatibility: String,
    #[serde(default)]
    pub performance: String,
}

/// Parse the model's analysis output. Models do not always return clean
/// JSON; fall back to treating the whole reply as the summary.
pub fn parse_analysis(raw: &str) -> RuleAnalysis {
    match serde_json::from_str::<RuleAnalysis>(raw) {
        Ok(a) => a,
        Err(_) => RuleAnalysis {
            summary: raw.trim().to_string(),
            issues: vec!["could not parse analysis response as JSON".to_string()],
            suggestions: Vec::new(),
            compatibility: "unknown".to_string(),
            performance: "unknown".to_string(),
        },
    }
}

pub fn render_analysis_text(analysis: &RuleAnalysis) {
    println!("SUMMARY:\n{}\n", analysis.summary);
    println!("ISSUES:");
    for item in &analysis.issues { println!("- {}", item); }
    println!("\nSUGGESTIONS:");
    for item in &analysis.suggestions { println!("- {}", item); }
    println!("\nCOMPATIBILITY:\n{}\n", analysis.compatibility);
    println!("PERFORMANCE:\n{}", analysis.performance);
}
