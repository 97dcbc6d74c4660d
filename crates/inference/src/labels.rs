use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Class names indexed by model class id.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// One name per line; blank lines are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read labels from {}", path.display()))?;

        let names: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        tracing::info!(count = names.len(), path = %path.display(), "Loaded class labels");
        Ok(Self { names })
    }

    /// Parse the class table a YOLOv5 export embeds in its ONNX metadata,
    /// a Python literal such as `{0: 'apple', 1: 'banana'}`. A plain list
    /// (`['apple', 'banana']`) is accepted too. Ids missing from a dict
    /// keep the `class_<id>` name.
    pub fn from_model_metadata(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();

        let names: Vec<String> = if let Some(body) = enclosed(raw, '{', '}') {
            let mut by_id = BTreeMap::new();
            for entry in split_unquoted(body, ',') {
                if entry.trim().is_empty() {
                    continue;
                }
                let &[id, name] = split_unquoted(entry, ':').as_slice() else {
                    anyhow::bail!("malformed class entry `{}`", entry.trim());
                };
                let id: usize = unquote(id)
                    .parse()
                    .with_context(|| format!("class id `{}` is not an integer", id.trim()))?;
                by_id.insert(id, unquote(name).to_string());
            }

            let count = by_id.last_key_value().map_or(0, |(id, _)| id + 1);
            (0..count)
                .map(|id| by_id.remove(&id).unwrap_or_else(|| format!("class_{}", id)))
                .collect()
        } else if let Some(body) = enclosed(raw, '[', ']') {
            split_unquoted(body, ',')
                .into_iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| unquote(name).to_string())
                .collect()
        } else {
            anyhow::bail!("unrecognised class names metadata `{}`", raw);
        };

        tracing::info!(count = names.len(), "Loaded class labels from model metadata");
        Ok(Self::new(names))
    }

    pub fn name(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn enclosed(s: &str, open: char, close: char) -> Option<&str> {
    s.strip_prefix(open)?.strip_suffix(close)
}

/// Split on `sep`, ignoring separators inside single or double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == sep => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    ['\'', '"']
        .into_iter()
        .find_map(|q| enclosed(s, q, q))
        .unwrap_or(s)
}
