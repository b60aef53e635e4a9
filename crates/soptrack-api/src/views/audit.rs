//! Audit log page.

use super::{datetime, escape, layout, opt};
use crate::auth::CurrentUser;
use crate::db::audit::{AuditFilter, AuditRecord, PAGE_LIMIT};

fn options(values: &[String], selected: Option<&str>) -> String {
    let mut out = String::from(r#"<option value="">Any</option>"#);
    for value in values {
        let mark = if selected == Some(value.as_str()) { " selected" } else { "" };
        out.push_str(&format!(
            r#"<option value="{v}"{mark}>{v}</option>"#,
            v = escape(value)
        ));
    }
    out
}

pub fn audit_page(
    user: &CurrentUser,
    rows: &[AuditRecord],
    filter: &AuditFilter,
    usernames: &[String],
    actions: &[String],
) -> String {
    let body: String = rows
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                datetime(&r.created_at),
                opt(r.username.as_deref()),
                escape(&r.action),
                escape(&r.entity_type),
                r.entity_id.map(|id| id.to_string()).unwrap_or_default(),
                opt(r.details.as_deref()),
            )
        })
        .collect();
    layout(
        "Audit log",
        Some(user),
        &format!(
            r#"<h1>Audit log</h1>
<form method="get" action="/admin/audit">
<label for="user">User</label><select id="user" name="user">{users}</select>
<label for="action">Action</label><select id="action" name="action">{actions}</select>
<label for="start_date">From</label><input type="date" id="start_date" name="start_date" value="{start}">
<label for="end_date">To</label><input type="date" id="end_date" name="end_date" value="{end}">
<p><button type="submit">Filter</button> <a href="/admin/export/audit.csv">Export CSV</a></p>
</form>
<p class="muted">Newest {PAGE_LIMIT} matching entries.</p>
<table>
<tr><th>When</th><th>User</th><th>Action</th><th>Entity</th><th>Id</th><th>Details</th></tr>
{body}</table>"#,
            users = options(usernames, filter.user()),
            actions = options(actions, filter.action()),
            start = opt(filter.start_date.as_deref()),
            end = opt(filter.end_date.as_deref()),
        ),
    )
}
