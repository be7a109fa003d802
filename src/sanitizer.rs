// Directory names derived from prompt text

const PREFIX: &str = "query-";
const MAX_LEN: usize = 50;

// "Hello, World!" -> "query-hello-world"
pub fn folder_name_for(message: &str) -> String {
    let mut cleaned = String::with_capacity(message.len());

    for c in message.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        // collapse runs of hyphens as we go
        if c == '-' && cleaned.ends_with('-') {
            continue;
        }
        cleaned.push(c);
    }

    // one leading and one trailing hyphen at most, after collapsing
    let cleaned = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    let cleaned = cleaned.strip_suffix('-').unwrap_or(cleaned);

    // everything left is ascii, so byte slicing is safe
    let end = cleaned.len().min(MAX_LEN);
    format!("{}{}", PREFIX, &cleaned[..end])
}
