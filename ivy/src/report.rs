//! Plain-text status report rendering (spec.md §4.9 step 5, §8 scenario 1).

use ivy_graph::{Name, Status};

pub struct ReportLine {
    pub name: Name,
    pub status: Status,
    pub src_loc: String,
}

/// Renders one line per entity, widest name first, so the status column
/// lines up. Grounded on the original tool's `color_status` table, minus
/// the terminal color codes this workspace's dependency stack has no crate
/// for.
pub fn render_report(lines: &[ReportLine]) -> String {
    if lines.is_empty() {
        return "no proof tasks selected\n".to_string();
    }
    let name_width = lines.iter().map(|l| l.name.to_string().len()).max().unwrap_or(0);
    let mut out = String::new();
    for line in lines {
        out.push_str(&format!(
            "{:<width$}  {:<11}  {}\n",
            line.name.to_string(),
            line.status.as_str_code(),
            line.src_loc,
            width = name_width
        ));
    }
    out
}
