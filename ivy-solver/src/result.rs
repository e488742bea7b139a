//! `.sby`-style input files and exit-artefact parsing (spec.md §4.7, §6).
//!
//! Grounded directly on the original `sby` driver
//! (`examples/original_source/src/yosys_ivy/solver/sby.py`): it tags the
//! properties a task cares about with `setattr`, narrows the design to
//! just those via `select`/`chformal -remove`, turns assumed properties
//! into real assumptions with `chformal -assert2assume`, and delays
//! cross-entity assumptions by one cycle so they see the previous step's
//! values.

use std::path::Path;

use ivy_graph::Status;

/// Everything needed to render one solver input file: the RTLIL names of
/// the properties to assert and to assume, the already-reduced statuses
/// of other entities this task depends on ("cross-assumptions"), and the
/// solver engine line plus bounded-model-checking depth.
#[derive(Debug, Clone, Default)]
pub struct ProofInputSpec {
    pub asserts: Vec<String>,
    pub assumes: Vec<String>,
    pub cross_assumes: Vec<String>,
    pub engines: Vec<String>,
    pub depth: u32,
}

impl ProofInputSpec {
    /// Renders the sectioned input file body: `[options]`, `[engines]`,
    /// `[script]`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("[options]\nmode prove\n");
        out.push_str(&format!("depth {}\n", self.depth));
        out.push_str("assume_early off\n\n");

        out.push_str("[engines]\n");
        if self.engines.is_empty() {
            out.push_str("smtbmc\n");
        } else {
            out.push_str(&self.engines.join(" "));
            out.push('\n');
        }
        out.push('\n');

        out.push_str("[script]\n");
        out.push_str("read_rtlil ../../../model/design.il\n");
        out.push_str("uniquify; hierarchy -nokeep_asserts\n");

        for (attr, names) in [
            ("ivy_assert", &self.asserts),
            ("ivy_assume", &self.assumes),
            ("ivy_cross_assume", &self.cross_assumes),
        ] {
            if names.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "setattr -set {attr} 1 {}\n",
                names.join(" ")
            ));
        }

        out.push_str(
            "select -set used */a:ivy_assert */a:ivy_assume */a:ivy_cross_assume\n",
        );
        out.push_str("chformal -remove */a:ivy_property @used %d\n");
        out.push_str("chformal -assert2assume */a:ivy_assume */a:ivy_cross_assume\n");
        out.push_str("chformal -delay 1 */a:ivy_cross_assume\n");
        out
    }
}

/// Reads `<task_dir>/status`, the artefact a solver subprocess leaves
/// behind, and maps its first whitespace-separated token to a [`Status`].
/// A missing file reads as `error`; any other unrecognised token reads as
/// `unknown`, matching the original `sby` driver's status map.
pub fn read_result_status(task_dir: &Path) -> Status {
    let contents = match std::fs::read_to_string(task_dir.join("status")) {
        Ok(s) => s,
        Err(_) => return Status::Error,
    };
    match contents.split_whitespace().next() {
        Some("PASS") => Status::Pass,
        Some("FAIL") => Status::Fail,
        Some("ERROR") => Status::Error,
        _ => Status::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_tags_each_property_kind_and_narrows_before_promoting_assumptions() {
        let spec = ProofInputSpec {
            asserts: vec!["top.p1".into()],
            assumes: vec!["top.a1".into()],
            cross_assumes: vec!["top.x1".into()],
            engines: vec![],
            depth: 5,
        };
        let body = spec.render();
        let setattr_assert = body.find("setattr -set ivy_assert").unwrap();
        let setattr_assume = body.find("setattr -set ivy_assume").unwrap();
        let setattr_cross = body.find("setattr -set ivy_cross_assume").unwrap();
        let select_used = body.find("select -set used").unwrap();
        let assert2assume = body.find("chformal -assert2assume").unwrap();
        assert!(setattr_assert < select_used);
        assert!(setattr_assume < select_used);
        assert!(setattr_cross < select_used);
        assert!(select_used < assert2assume);
        assert!(body.contains("depth 5"));
    }

    #[test]
    fn render_omits_setattr_for_empty_property_kinds() {
        let spec = ProofInputSpec {
            asserts: vec!["top.p1".into()],
            ..Default::default()
        };
        let body = spec.render();
        assert!(body.contains("setattr -set ivy_assert"));
        assert!(!body.contains("setattr -set ivy_assume"));
        assert!(!body.contains("setattr -set ivy_cross_assume"));
    }

    #[test]
    fn missing_status_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_result_status(dir.path()), Status::Error);
    }

    #[test]
    fn status_file_tokens_map_to_expected_statuses() {
        let dir = tempfile::tempdir().unwrap();
        for (token, expected) in [
            ("PASS 12", Status::Pass),
            ("FAIL\nassert failed", Status::Fail),
            ("UNKNOWN", Status::Unknown),
            ("ERROR timeout", Status::Error),
            ("garbage", Status::Unknown),
        ] {
            std::fs::write(dir.path().join("status"), token).unwrap();
            assert_eq!(read_result_status(dir.path()), expected, "token {token:?}");
        }
    }
}
