//! System instruction and output cleanup for the translation engine.

/// Build the fixed system instruction for a language pair.
pub fn system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        "You are a {source_language}-{target_language} translator. Translate the user's text \
         faithfully between {source_language} and {target_language}, the way a native speaker \
         would say it, keeping the tone of the original. Do not answer the user. Do not \
         include anything other than the translation in your output."
    )
}

/// Clean up generated text before it is spoken.
///
/// Newlines become spaces, runs of whitespace collapse to one space, a space
/// before a period is removed and the result is trimmed. Applying it twice
/// gives the same result as applying it once.
pub fn normalize_translation(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(" .", ".")
}
