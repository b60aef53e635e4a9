//! SOP administration pages.

use super::{datetime, error_banner, escape, layout, notice, opt};
use crate::auth::CurrentUser;
use crate::db::acknowledgments::AckRecord;
use crate::db::sops::{SopRecord, SopSummary, SopVersionRecord};

pub fn index_page(user: &CurrentUser, sops: &[SopSummary], notice_code: Option<&str>) -> String {
    let rows: String = sops
        .iter()
        .map(|s| {
            format!(
                r#"<tr><td><a href="/sop/{id}">{title}</a></td><td>{category}</td><td>v{version}</td><td>{updated}</td>
<td><a href="/admin/edit/{id}">Edit</a> · <a href="/admin/evidence/sop/{id}">Evidence</a></td></tr>
"#,
                id = s.id,
                title = escape(&s.title),
                category = escape(&s.category),
                version = s.current_version,
                updated = datetime(&s.updated_at),
            )
        })
        .collect();
    layout(
        "Admin",
        Some(user),
        &format!(
            r#"<h1>SOP administration</h1>
{notice}
<p><a href="/admin/new">New SOP</a> · Export:
<a href="/admin/export/sops.csv">SOPs</a> ·
<a href="/admin/export/acknowledgments.csv">Acknowledgments</a> ·
<a href="/admin/export/audit.csv">Audit log</a></p>
<table>
<tr><th>Title</th><th>Category</th><th>Version</th><th>Updated</th><th></th></tr>
{rows}</table>"#,
            notice = notice(notice_code),
        ),
    )
}

/// Values shown in the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct SopForm {
    pub title: String,
    pub category: String,
    pub content: String,
}

impl From<&SopRecord> for SopForm {
    fn from(sop: &SopRecord) -> Self {
        Self {
            title: sop.title.clone(),
            category: sop.category.clone(),
            content: sop.content.clone(),
        }
    }
}

/// Create form when `editing` is `None`, otherwise the edit form for that
/// SOP id and its current version.
pub fn sop_form_page(
    user: &CurrentUser,
    editing: Option<(i64, i64)>,
    form: &SopForm,
    categories: &[String],
    error: Option<&str>,
) -> String {
    let (heading, action, hint) = match editing {
        Some((id, version)) => (
            "Edit SOP".to_string(),
            format!("/admin/edit/{id}"),
            format!(
                r#"<p class="muted">Currently version {version}. Saving creates version {next}; staff must acknowledge it again.</p>"#,
                next = version + 1
            ),
        ),
        None => ("New SOP".to_string(), "/admin/new".to_string(), String::new()),
    };
    let datalist: String = categories
        .iter()
        .map(|c| format!(r#"<option value="{}">"#, escape(c)))
        .collect();
    layout(
        &heading,
        Some(user),
        &format!(
            r#"<h1>{heading}</h1>
{hint}{error}
<form method="post" action="{action}">
<label for="title">Title</label>
<input type="text" id="title" name="title" value="{title}" maxlength="500" required>
<label for="category">Category</label>
<input type="text" id="category" name="category" value="{category}" list="categories" maxlength="100" required>
<datalist id="categories">{datalist}</datalist>
<label for="content">Content</label>
<textarea id="content" name="content" rows="24" required>{content}</textarea>
<p><button type="submit">Save</button> <a href="/admin">Cancel</a></p>
</form>"#,
            error = error_banner(error),
            title = escape(&form.title),
            category = escape(&form.category),
            content = escape(&form.content),
        ),
    )
}

/// Version history and acknowledgment evidence for one SOP.
pub fn evidence_page(
    user: &CurrentUser,
    sop: &SopRecord,
    versions: &[SopVersionRecord],
    acks: &[AckRecord],
) -> String {
    let version_rows: String = versions
        .iter()
        .map(|v| {
            format!(
                "<tr><td>v{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                v.version,
                escape(&v.title),
                escape(&v.category),
                datetime(&v.created_at),
                opt(v.created_by.as_deref()),
            )
        })
        .collect();
    let ack_rows: String = acks
        .iter()
        .map(|a| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>v{}</td><td>{}</td><td>{}s</td><td>{}</td><td>{}</td></tr>\n",
                datetime(&a.acknowledged_at),
                escape(&a.staff_name),
                a.sop_version,
                escape(&a.signature_text),
                a.read_seconds,
                opt(a.ip_address.as_deref()),
                opt(a.user_agent.as_deref()),
            )
        })
        .collect();
    layout(
        &format!("Evidence: {}", sop.title),
        Some(user),
        &format!(
            r#"<h1>Evidence: {title}</h1>
<p class="muted">{category} · current version {version} · source {source}</p>
<h2>Versions</h2>
<table>
<tr><th>Version</th><th>Title</th><th>Category</th><th>Created</th><th>By</th></tr>
{version_rows}</table>
<h2>Acknowledgments ({count})</h2>
<table>
<tr><th>When</th><th>Staff</th><th>Version</th><th>Signature</th><th>Read time</th><th>IP</th><th>User agent</th></tr>
{ack_rows}</table>"#,
            title = escape(&sop.title),
            category = escape(&sop.category),
            version = sop.current_version,
            source = sop.source_file.as_deref().map(escape).unwrap_or_else(|| "manual entry".into()),
            count = acks.len(),
        ),
    )
}
