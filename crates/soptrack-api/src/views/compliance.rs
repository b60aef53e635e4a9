//! Compliance dashboard.

use soptrack_core::ComplianceReport;

use super::{datetime, escape, layout, percent, url_encode};
use crate::auth::CurrentUser;
use crate::db::acknowledgments::RecentAck;

pub fn compliance_page(user: &CurrentUser, report: &ComplianceReport, recent: &[RecentAck]) -> String {
    let window = &report.window;
    let start = window.start_param();
    let end = window.end_param().unwrap_or_default();
    let export_query = if end.is_empty() {
        format!("?start_date={}", url_encode(&start))
    } else {
        format!("?start_date={}&end_date={}", url_encode(&start), url_encode(&end))
    };

    let categories: String = report
        .categories
        .iter()
        .map(|c| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{} / {}</td><td>{}</td></tr>\n",
                escape(&c.category),
                c.sop_count,
                c.rate.acknowledged,
                c.rate.eligible,
                percent(c.rate.ratio()),
            )
        })
        .collect();

    let sops: String = report
        .sops
        .iter()
        .map(|line| {
            format!(
                r#"<tr><td><a href="/sop/{id}">{title}</a></td><td>{category}</td><td>v{version}</td><td>{ack} / {eligible}</td><td>{pct}</td></tr>
"#,
                id = line.sop.id,
                title = escape(&line.sop.title),
                category = escape(&line.sop.category),
                version = line.sop.current_version,
                ack = line.rate.acknowledged,
                eligible = line.rate.eligible,
                pct = percent(line.rate.ratio()),
            )
        })
        .collect();

    let staff: String = report
        .staff
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{}</td><td>{} / {}</td><td>{}</td></tr>\n",
                escape(&s.staff.name),
                s.rate.acknowledged,
                s.rate.eligible,
                percent(s.rate.ratio()),
            )
        })
        .collect();

    let overdue: String = report
        .overdue()
        .map(|line| {
            format!(
                "<li><strong>{}</strong> ({} missing): {}</li>\n",
                escape(&line.sop.title),
                line.missing.len(),
                escape(&line.missing.join(", ")),
            )
        })
        .collect();
    let overdue = if overdue.is_empty() {
        r#"<p class="muted">Everyone is up to date.</p>"#.to_string()
    } else {
        format!("<ul>\n{overdue}</ul>")
    };

    let recent_rows: String = recent
        .iter()
        .map(|r| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td><a href="/sop/{}">{}</a></td><td>v{}</td></tr>
"#,
                datetime(&r.acknowledged_at),
                escape(&r.staff_name),
                r.sop_id,
                escape(&r.sop_title),
                r.sop_version,
            )
        })
        .collect();

    layout(
        "Compliance",
        Some(user),
        &format!(
            r#"<h1>Compliance</h1>
<form method="get" action="/compliance">
<label for="start_date">From</label><input type="date" id="start_date" name="start_date" value="{start}">
<label for="end_date">To</label><input type="date" id="end_date" name="end_date" value="{end}">
<p><button type="submit">Apply</button> <a href="/compliance/export.csv{export_query}">Export CSV</a></p>
</form>
<p><strong>Overall: {overall}</strong> ({ack} of {eligible} required acknowledgments)
· {staff_count} active staff · {sop_count} SOPs</p>
<h2>By category</h2>
<table><tr><th>Category</th><th>SOPs</th><th>Acknowledged</th><th>Rate</th></tr>
{categories}</table>
<h2>By SOP</h2>
<table><tr><th>SOP</th><th>Category</th><th>Version</th><th>Acknowledged</th><th>Rate</th></tr>
{sops}</table>
<h2>Overdue</h2>
{overdue}
<h2>By staff member</h2>
<table><tr><th>Staff</th><th>Acknowledged</th><th>Rate</th></tr>
{staff}</table>
<h2>Recent activity</h2>
<table><tr><th>When</th><th>Staff</th><th>SOP</th><th>Version</th></tr>
{recent_rows}</table>"#,
            start = escape(&start),
            end = escape(&end),
            overall = percent(report.overall.ratio()),
            ack = report.overall.acknowledged,
            eligible = report.overall.eligible,
            staff_count = report.staff_count,
            sop_count = report.sop_count,
        ),
    )
}
