use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static US_PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap());
static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CREDIT_CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap());
static DATABRICKS_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdapi[0-9a-f]{32,40}\b").unwrap());
static KEY_VALUE_SECRET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(api[_-]?key|secret|token|password)\s*[:=]\s*\S+"#).unwrap());
static SQL_STRING_LITERAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^'\\]|\\.)*'").unwrap());
static LONG_NUMERIC_LITERAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6,}\b").unwrap());

/// Scrubs any text before it leaves the process toward an LLM collaborator
/// or a metrics/log sink (spec.md §4.6, §4.8). Order matters: secrets and
/// identifiers are replaced before the more generic literal placeholders so
/// a key=value secret isn't half-masked by the numeric-literal pass first.
pub fn scrub(text: &str) -> String {
    let mut out = KEY_VALUE_SECRET_RE.replace_all(text, "$1=<SECRET>").into_owned();
    out = DATABRICKS_TOKEN_RE.replace_all(&out, "<DATABRICKS_TOKEN>").into_owned();
    out = EMAIL_RE.replace_all(&out, "<EMAIL>").into_owned();
    out = SSN_RE.replace_all(&out, "<SSN>").into_owned();
    out = CREDIT_CARD_RE.replace_all(&out, "<CARD>").into_owned();
    out = US_PHONE_RE.replace_all(&out, "<PHONE>").into_owned();
    out
}

/// SQL-specific scrubbing used before a prompt embeds a fragment of a
/// model's SQL: string literals and long numeric literals carry the most
/// tenant-specific information (spec.md §4.6).
pub fn scrub_sql(sql: &str) -> String {
    let out = SQL_STRING_LITERAL_RE.replace_all(sql, "<LITERAL>").into_owned();
    LONG_NUMERIC_LITERAL_RE.replace_all(&out, "<ID>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_email_and_phone() {
        let scrubbed = scrub("contact jane@example.com or 555-123-4567");
        assert!(!scrubbed.contains("jane@example.com"));
        assert!(!scrubbed.contains("555-123-4567"));
    }

    #[test]
    fn scrubs_key_value_secret() {
        let scrubbed = scrub("api_key=sk_live_abcdef123456");
        assert!(scrubbed.contains("<SECRET>"));
        assert!(!scrubbed.contains("sk_live_abcdef123456"));
    }

    #[test]
    fn scrub_sql_masks_literals_and_long_numbers() {
        let scrubbed = scrub_sql("SELECT * FROM t WHERE name = 'Jane Doe' AND acct = 123456789");
        assert_eq!(scrubbed, "SELECT * FROM t WHERE name = <LITERAL> AND acct = <ID>");
    }
}
