use std::path::PathBuf;

/// Recognized `[options]` keys (spec.md §6).
#[derive(Debug, Clone)]
pub struct Options {
    /// Required, non-empty. The top-level module or proof name.
    pub top: String,
    /// Default solver string applied to any entity whose `solve_with` ends
    /// up empty after resolution (spec.md §4.2 step 4).
    pub default_solver: String,
    /// Gates whether `automatic` proofs get an implicit top-level solve
    /// (SPEC_FULL.md supplemented feature #3 / spec.md §9 Open Questions).
    pub auto_proof: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            top: String::new(),
            default_solver: "sby smtbmc".to_string(),
            auto_proof: true,
        }
    }
}

/// A single `[file <path>]` section: literal source text to be written
/// verbatim into the work directory's `src/` tree before synthesis.
#[derive(Debug, Clone)]
pub struct FileSection {
    pub path: PathBuf,
    pub body: String,
}

/// One line of the `[engines]` section: an opaque solver-engine directive
/// string, passed through to the `.sby` files the solver task writes.
#[derive(Debug, Clone)]
pub struct EngineDirective {
    pub line: String,
}

/// The fully parsed and validated contents of a `.ivy` file.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub options: Options,
    /// Raw body of the `[read]` section: yosys frontend read commands.
    pub read: String,
    /// Source filenames listed in `[files]`, in declaration order.
    pub files: Vec<String>,
    /// Inline source file bodies from `[file <path>]` sections.
    pub file_sections: Vec<FileSection>,
    pub engines: Vec<EngineDirective>,
    /// Raw body of the `[script]` section: yosys prep script. Defaults to
    /// `"prep"` when the section is absent, matching the original tool.
    pub script: String,
}

impl Config {
    pub fn default_script() -> String {
        "prep".to_string()
    }
}
