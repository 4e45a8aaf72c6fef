use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Ordered key-value metadata block found at the start of a post, delimited
/// by `---` lines. Insertion order is preserved across a parse/serialize
/// round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: Vec<(String, String)>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some(field) => field.1 = value.to_string(),
            None => self.fields.push((key.to_string(), value.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_block(&self) -> String {
        let mut buf = String::from("---\n");
        for (key, value) in &self.fields {
            buf.push_str(key);
            buf.push_str(": ");
            buf.push_str(value);
            buf.push('\n');
        }
        buf.push_str("---\n");
        buf
    }
}

/// Splits `content` into its frontmatter fields and the remaining body.
/// Never fails: a missing or malformed block yields an empty mapping and
/// the input unchanged.
pub fn parse(content: &str) -> (Frontmatter, &str) {
    lazy_static! {
        static ref BLOCK: Regex =
            Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n(.*)\z").unwrap();
    }

    let Some(caps) = BLOCK.captures(content) else {
        return (Frontmatter::default(), content);
    };

    let mut fields = Frontmatter::default();
    for line in caps.get(1).unwrap().as_str().lines() {
        // Lines without a colon are not fields; skip them
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields.set(key, strip_quotes(value.trim()));
    }

    // Delimiters without a single parseable field are body, not metadata
    if fields.is_empty() {
        return (Frontmatter::default(), content);
    }

    (fields, caps.get(2).unwrap().as_str())
}

/// Returns `content` unchanged if it already carries frontmatter fields,
/// otherwise prepends a synthesized block for a new draft.
pub fn ensure(content: &str, title: &str, slug: &str, now: DateTime<Utc>) -> String {
    let (fields, _) = parse(content);
    if !fields.is_empty() {
        return content.to_string();
    }

    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut fields = Frontmatter::default();
    fields.set("title", title);
    fields.set("slug", slug);
    fields.set("publishDate", &publish_date(now));
    fields.set("createdAt", &stamp);
    fields.set("updatedAt", &stamp);
    fields.set("draft", "true");

    format!("{}\n{}", fields.to_block(), content)
}

/// Mutates or inserts a single field, re-serializing the whole block in
/// mapping order and reassembling it with the original body.
pub fn set_field(content: &str, key: &str, value: &str) -> String {
    let (mut fields, body) = parse(content);
    fields.set(key, value);
    format!("{}{}", fields.to_block(), body)
}

// Publish dates carry a fixed UTC-7 offset.
fn publish_date(now: DateTime<Utc>) -> String {
    let offset = FixedOffset::west_opt(7 * 3600).unwrap();
    now.with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn strip_quotes(value: &str) -> &str {
    if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        return inner;
    }
    if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        return inner;
    }
    value
}
