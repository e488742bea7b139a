//! Hierarchical entity names (spec.md §3).
//!
//! A name is an ordered tuple of parts alternating module and instance
//! identifiers, `(m0, i0, m1, i1, …, leaf)`. It has four independent
//! renderings, each used by a different downstream consumer: a
//! filesystem-safe [`Name::filename`] for work-directory paths, a
//! human-facing [`Display`] impl for reports, a yosys-`select`-flavoured
//! [`Name::rtlil`] for solver input files, and a canonical
//! [`Name::db_key`] for the status store's primary key.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamePart {
    Instance(String),
    Module(String),
}

impl NamePart {
    pub fn as_str(&self) -> &str {
        match self {
            NamePart::Instance(s) => s,
            NamePart::Module(s) => s,
        }
    }
}

impl fmt::Display for NamePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePart::Instance(s) => write!(f, "{s}"),
            NamePart::Module(s) => write!(f, "/{s}"),
        }
    }
}

/// A fully qualified entity name: alternating module/instance parts
/// ending in a leaf, e.g. `top` / `fifo` / `/fifo_ctrl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    parts: Vec<NamePart>,
}

impl Name {
    pub fn new(parts: Vec<NamePart>) -> Self {
        Self { parts }
    }

    pub fn root() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn parts(&self) -> &[NamePart] {
        &self.parts
    }

    /// The last path segment, used as a short display label.
    pub fn local(&self) -> &str {
        self.parts.last().map(|p| p.as_str()).unwrap_or("")
    }

    /// Append an instance segment, returning the child name.
    pub fn child_instance(&self, name: impl Into<String>) -> Self {
        let mut parts = self.parts.clone();
        parts.push(NamePart::Instance(name.into()));
        Self { parts }
    }

    /// Append a module segment, returning the child name.
    pub fn child_module(&self, name: impl Into<String>) -> Self {
        let mut parts = self.parts.clone();
        parts.push(NamePart::Module(name.into()));
        Self { parts }
    }

    /// The filesystem form (spec.md §3): all parts `.`-joined, any
    /// character outside `[A-Za-z0-9_.]` replaced by `_`, a leading `.`
    /// (which the general substitution leaves alone, since `.` is itself
    /// allowed) separately forced to `_`, and the empty name reading as
    /// `"unknown"`.
    pub fn filename(&self) -> String {
        let joined = self
            .parts
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(".");
        let mut out: String = joined
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
            .collect();
        if out.starts_with('.') {
            out.replace_range(0..1, "_");
        }
        if out.is_empty() {
            "unknown".to_string()
        } else {
            out
        }
    }

    /// The RTLIL form (spec.md §3): the module path (every part except
    /// the last two) `.`-joined, then `/`, then the leaf (the final
    /// part) — e.g. `top.fifo/fifo_ctrl`. Names shorter than three parts
    /// have no module path to render and degrade to an empty path before
    /// the slash.
    pub fn rtlil(&self) -> String {
        let n = self.parts.len();
        if n == 0 {
            return String::new();
        }
        let path_len = n.saturating_sub(2);
        let path = self.parts[..path_len]
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(".");
        format!("{path}/{}", self.parts[n - 1].as_str())
    }

    /// Names of all instance segments, in order.
    pub fn instance_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                NamePart::Instance(s) => Some(s.as_str()),
                NamePart::Module(_) => None,
            })
            .collect()
    }

    /// Names of all module segments, in order.
    pub fn module_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                NamePart::Module(s) => Some(s.as_str()),
                NamePart::Instance(_) => None,
            })
            .collect()
    }

    /// The canonical key used for the status store's `name` column. Uses a
    /// JSON array of tagged parts so it round-trips without ambiguity
    /// between an instance called `/foo` and a module named `foo`.
    pub fn db_key(&self) -> String {
        let tagged: Vec<serde_json::Value> = self
            .parts
            .iter()
            .map(|p| match p {
                NamePart::Instance(s) => serde_json::json!(["i", s]),
                NamePart::Module(s) => serde_json::json!(["m", s]),
            })
            .collect();
        serde_json::Value::Array(tagged).to_string()
    }

    pub fn from_db_key(key: &str) -> Result<Self, NameParseError> {
        let value: serde_json::Value =
            serde_json::from_str(key).map_err(|e| NameParseError::Json(e.to_string()))?;
        let arr = value
            .as_array()
            .ok_or_else(|| NameParseError::Shape("expected a JSON array".to_string()))?;
        let mut parts = Vec::with_capacity(arr.len());
        for item in arr {
            let pair = item
                .as_array()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| NameParseError::Shape("expected a [tag, value] pair".to_string()))?;
            let tag = pair[0]
                .as_str()
                .ok_or_else(|| NameParseError::Shape("tag must be a string".to_string()))?;
            let value = pair[1]
                .as_str()
                .ok_or_else(|| NameParseError::Shape("value must be a string".to_string()))?
                .to_string();
            match tag {
                "i" => parts.push(NamePart::Instance(value)),
                "m" => parts.push(NamePart::Module(value)),
                other => return Err(NameParseError::Shape(format!("unknown tag {other:?}"))),
            }
        }
        Ok(Self { parts })
    }
}

/// The display form (spec.md §3): instance parts only, `.`-joined; each
/// part renders bare if it matches `[A-Za-z0-9_]*`, else as `\<part> `
/// (escaped, with a significant trailing space) the way yosys escapes
/// non-identifier names.
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.instance_names().into_iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            if part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                write!(f, "{part}")?;
            } else {
                write!(f, "\\{part} ")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NameParseError {
    #[error("invalid db key json: {0}")]
    Json(String),
    #[error("invalid db key shape: {0}")]
    Shape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_key_round_trips() {
        let name = Name::root()
            .child_instance("top")
            .child_instance("fifo")
            .child_module("fifo_ctrl");
        let key = name.db_key();
        let back = Name::from_db_key(&key).unwrap();
        assert_eq!(name, back);
    }

    #[test]
    fn display_joins_instance_parts_only() {
        let name = Name::root().child_instance("top").child_module("fifo_ctrl").child_instance("u_fifo");
        assert_eq!(name.to_string(), "top.u_fifo");
    }

    #[test]
    fn display_escapes_non_identifier_instance_parts() {
        let name = Name::root().child_instance("top").child_instance("weird name");
        assert_eq!(name.to_string(), "top.\\weird name ");
    }

    #[test]
    fn filename_is_path_safe() {
        let name = Name::root().child_instance("top").child_module("fifo ctrl");
        assert_eq!(name.filename(), "top.fifo_ctrl");
    }

    #[test]
    fn filename_of_empty_name_is_unknown() {
        assert_eq!(Name::root().filename(), "unknown");
    }

    #[test]
    fn filename_replaces_leading_dot() {
        let name = Name::new(vec![NamePart::Instance(String::new()), NamePart::Instance("leaf".into())]);
        assert_eq!(name.filename(), "_leaf");
    }

    #[test]
    fn rtlil_drops_the_module_immediately_before_the_leaf() {
        let name = Name::root()
            .child_instance("top")
            .child_instance("u_fifo")
            .child_module("fifo_ctrl")
            .child_instance("p_assert");
        assert_eq!(name.rtlil(), "top.u_fifo/p_assert");
    }
}
