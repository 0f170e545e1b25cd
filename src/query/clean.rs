/// Strip markdown code fences from generated text, leaving plain SQL.
///
/// Only text that starts with a fence is touched; every "```sql" and "```"
/// marker is then removed.
pub fn sql_clean(text: &str) -> String {
    let text = text.trim();
    if text.starts_with("```") {
        text.replace("```sql", "").replace("```", "").trim().to_owned()
    } else {
        text.to_owned()
    }
}
