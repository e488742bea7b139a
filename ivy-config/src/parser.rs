use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SrcLoc};
use crate::types::{Config, EngineDirective, FileSection, Options};

#[derive(Debug, PartialEq, Eq, Clone)]
enum Section {
    Options,
    Read,
    Files,
    File(PathBuf),
    Engines,
    Script,
}

fn loc(file: &Path, line: usize) -> SrcLoc {
    SrcLoc {
        file: file.to_path_buf(),
        line,
    }
}

/// Parses the sectioned-INI text of a `.ivy` file into a validated
/// [`Config`]. `file` is used only to attach source locations to
/// diagnostics; the text itself is taken from `source` so callers can parse
/// in-memory content (e.g. in tests) without touching disk.
pub fn parse(file: &Path, source: &str) -> Result<Config, ConfigError> {
    let mut options = Options::default();
    let mut top_seen = false;
    let mut read = String::new();
    let mut files: Vec<String> = Vec::new();
    let mut file_sections: Vec<FileSection> = Vec::new();
    let mut engines: Vec<EngineDirective> = Vec::new();
    let mut script = String::new();
    let mut script_seen = false;

    let mut seen_filenames: HashSet<String> = HashSet::new();

    let mut section: Option<Section> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim_end();

        if trimmed.trim_start().starts_with('#') || trimmed.trim().is_empty() {
            continue;
        }

        let stripped = trimmed.trim_start();
        if stripped.starts_with('[') {
            let Some(end) = stripped.find(']') else {
                return Err(ConfigError::Malformed(loc(file, line_no), stripped.to_string()));
            };
            let header = &stripped[1..end];
            let (name, arg) = match header.split_once(char::is_whitespace) {
                Some((n, a)) => (n.trim(), Some(a.trim().to_string())),
                None => (header.trim(), None),
            };
            section = Some(match name {
                "options" => Section::Options,
                "read" => Section::Read,
                "files" => Section::Files,
                "engines" => Section::Engines,
                "script" => Section::Script,
                "file" => {
                    let Some(path_str) = arg else {
                        return Err(ConfigError::Malformed(loc(file, line_no), stripped.to_string()));
                    };
                    validate_path(file, line_no, &path_str)?;
                    if !seen_filenames.insert(path_str.clone()) {
                        return Err(ConfigError::DuplicateFilename(loc(file, line_no), path_str));
                    }
                    Section::File(PathBuf::from(path_str))
                }
                other => return Err(ConfigError::UnknownSection(loc(file, line_no), other.to_string())),
            });
            if matches!(section, Some(Section::File(_))) {
                file_sections.push(FileSection {
                    path: match &section {
                        Some(Section::File(p)) => p.clone(),
                        _ => unreachable!(),
                    },
                    body: String::new(),
                });
            }
            continue;
        }

        match &section {
            None => {
                return Err(ConfigError::Malformed(loc(file, line_no), trimmed.to_string()));
            }
            Some(Section::Options) => {
                let (key, value) = split_key_value(trimmed)
                    .ok_or_else(|| ConfigError::Malformed(loc(file, line_no), trimmed.to_string()))?;
                match key {
                    "top" => {
                        if value.is_empty() {
                            return Err(ConfigError::EmptyTop(loc(file, line_no)));
                        }
                        options.top = value.to_string();
                        top_seen = true;
                    }
                    "default_solver" => options.default_solver = value.to_string(),
                    "auto_proof" => options.auto_proof = parse_bool(file, line_no, value)?,
                    other => {
                        return Err(ConfigError::UnknownOption(loc(file, line_no), other.to_string()))
                    }
                }
            }
            Some(Section::Read) => {
                read.push_str(trimmed);
                read.push('\n');
            }
            Some(Section::Files) => {
                let name = trimmed.trim().to_string();
                if !seen_filenames.insert(name.clone()) {
                    return Err(ConfigError::DuplicateFilename(loc(file, line_no), name));
                }
                validate_path(file, line_no, &name)?;
                files.push(name);
            }
            Some(Section::File(_)) => {
                let entry = file_sections.last_mut().expect("file section just pushed");
                entry.body.push_str(trimmed);
                entry.body.push('\n');
            }
            Some(Section::Engines) => {
                engines.push(EngineDirective {
                    line: trimmed.trim().to_string(),
                });
            }
            Some(Section::Script) => {
                script.push_str(trimmed);
                script.push('\n');
                script_seen = true;
            }
        }
    }

    if !top_seen {
        return Err(ConfigError::MissingTop);
    }
    if !script_seen {
        script = Config::default_script();
    }

    Ok(Config {
        options,
        read,
        files,
        file_sections,
        engines,
        script,
    })
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let idx = trimmed.find(char::is_whitespace)?;
    let (key, rest) = trimmed.split_at(idx);
    Some((key.trim(), rest.trim()))
}

fn parse_bool(file: &Path, line_no: usize, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidBool(loc(file, line_no), other.to_string())),
    }
}

fn validate_path(file: &Path, line_no: usize, path_str: &str) -> Result<(), ConfigError> {
    if Path::new(path_str)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(ConfigError::PathEscape(loc(file, line_no), path_str.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses() {
        let src = "[options]\ntop mytop\n";
        let cfg = parse(Path::new("test.ivy"), src).unwrap();
        assert_eq!(cfg.options.top, "mytop");
        assert_eq!(cfg.options.default_solver, "sby smtbmc");
        assert!(cfg.options.auto_proof);
        assert_eq!(cfg.script, "prep");
    }

    #[test]
    fn missing_top_is_an_error() {
        let src = "[options]\ndefault_solver sby smtbmc\n";
        let err = parse(Path::new("test.ivy"), src).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTop));
    }

    #[test]
    fn empty_top_is_an_error() {
        let src = "[options]\ntop \n";
        let err = parse(Path::new("test.ivy"), src).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyTop(_)));
    }

    #[test]
    fn duplicate_filenames_across_files_and_file_sections_rejected() {
        let src = "[options]\ntop t\n[files]\nfoo.sv\n[file foo.sv]\nmodule foo; endmodule\n";
        let err = parse(Path::new("test.ivy"), src).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFilename(_, _)));
    }

    #[test]
    fn path_escape_rejected() {
        let src = "[options]\ntop t\n[files]\n../evil.sv\n";
        let err = parse(Path::new("test.ivy"), src).unwrap_err();
        assert!(matches!(err, ConfigError::PathEscape(_, _)));
    }

    #[test]
    fn unknown_section_rejected() {
        let src = "[options]\ntop t\n[bogus]\nx y\n";
        let err = parse(Path::new("test.ivy"), src).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection(_, _)));
    }

    #[test]
    fn auto_proof_can_be_disabled() {
        let src = "[options]\ntop t\nauto_proof false\n";
        let cfg = parse(Path::new("test.ivy"), src).unwrap();
        assert!(!cfg.options.auto_proof);
    }

    #[test]
    fn file_section_body_is_captured() {
        let src = "[options]\ntop t\n[file sub/foo.sv]\nmodule foo;\nendmodule\n";
        let cfg = parse(Path::new("test.ivy"), src).unwrap();
        assert_eq!(cfg.file_sections.len(), 1);
        assert_eq!(cfg.file_sections[0].path, PathBuf::from("sub/foo.sv"));
        assert_eq!(cfg.file_sections[0].body, "module foo;\nendmodule\n");
    }

    #[test]
    fn engines_and_read_and_script_sections_collect_lines() {
        let src = "[options]\ntop t\n[read]\nread_verilog a.v\n[engines]\nsmtbmc\n[script]\nprep -top t\n";
        let cfg = parse(Path::new("test.ivy"), src).unwrap();
        assert_eq!(cfg.read, "read_verilog a.v\n");
        assert_eq!(cfg.engines.len(), 1);
        assert_eq!(cfg.engines[0].line, "smtbmc");
        assert_eq!(cfg.script, "prep -top t\n");
    }
}
