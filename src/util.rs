pub fn estimate_tokens_for_text(text: &str) -> usize {
    // Simple heuristic: 1 token ~ 4 characters
    let chars = text.chars().count();
    (chars + 3) / 4
}

/// Replace every character of a secret with '*' for display.
pub fn mask_secret(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}
