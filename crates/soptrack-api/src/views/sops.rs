//! SOP browser, detail, and print pages.

use std::collections::BTreeMap;

use super::{datetime, error_banner, escape, highlight, layout, notice, opt, paragraphs, url_encode};
use crate::auth::CurrentUser;
use crate::db::acknowledgments::AckRecord;
use crate::db::sops::{SopRecord, SopSummary};

/// Search form state for the browser page.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowseQuery<'a> {
    pub q: Option<&'a str>,
    pub category: Option<&'a str>,
}

pub fn index_page(
    user: &CurrentUser,
    query: BrowseQuery<'_>,
    categories: &[String],
    grouped: &BTreeMap<String, Vec<SopSummary>>,
) -> String {
    let total: usize = grouped.values().map(Vec::len).sum();
    let mut options = String::from(r#"<option value="All">All categories</option>"#);
    for category in categories {
        let selected = if query.category == Some(category.as_str()) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            r#"<option value="{c}"{selected}>{c}</option>"#,
            c = escape(category)
        ));
    }

    let link_suffix = query
        .q
        .map(|q| format!("?q={}", url_encode(q)))
        .unwrap_or_default();
    let mut sections = String::new();
    for (category, sops) in grouped {
        sections.push_str(&format!(
            "<h2>{} <span class=\"muted\">({})</span></h2>\n<ul>\n",
            escape(category),
            sops.len()
        ));
        for sop in sops {
            sections.push_str(&format!(
                r#"<li><a href="/sop/{id}{link_suffix}">{title}</a> <span class="muted">v{version}</span></li>
"#,
                id = sop.id,
                title = highlight(&sop.title, query.q),
                version = sop.current_version,
            ));
        }
        sections.push_str("</ul>\n");
    }
    if sections.is_empty() {
        sections.push_str(r#"<p class="muted">No SOPs match.</p>"#);
    }

    layout(
        "SOPs",
        Some(user),
        &format!(
            r#"<h1>Standard Operating Procedures</h1>
<form method="get" action="/">
<input type="text" name="q" value="{q}" placeholder="Search titles and content">
<select name="category">{options}</select>
<button type="submit">Search</button>
</form>
<p class="muted">{total} SOP(s)</p>
{sections}"#,
            q = opt(query.q),
        ),
    )
}

/// Everything the detail page shows.
#[derive(Debug)]
pub struct DetailPage<'a> {
    pub sop: &'a SopRecord,
    pub acknowledgments: &'a [AckRecord],
    pub acknowledged_current: bool,
    pub min_read_seconds: u32,
    pub query: Option<&'a str>,
    pub notice: Option<&'a str>,
    pub error: Option<&'a str>,
}

fn ack_form(user: &CurrentUser, page: &DetailPage<'_>) -> String {
    if user.staff_id.is_none() {
        return r#"<p class="muted">Your account is not linked to a staff member, so you cannot acknowledge SOPs.</p>"#.into();
    }
    if page.acknowledged_current {
        return format!(
            r#"<p class="notice">You have acknowledged version {}.</p>"#,
            page.sop.current_version
        );
    }
    format!(
        r#"<h2>Acknowledge</h2>
<form method="post" action="/sop/{id}/ack" id="ack-form" class="no-print">
<p>I have read and understood version {version} of this SOP.</p>
<label for="signature_text">Type your full name as signature</label>
<input type="text" id="signature_text" name="signature_text" maxlength="200" required>
<input type="hidden" id="read_seconds" name="read_seconds" value="0">
<p><button type="submit" id="ack-submit" disabled>Acknowledge</button>
<span class="muted" id="ack-wait">Available after {min} seconds of reading.</span></p>
</form>
<script>
(function () {{
  var started = Date.now();
  var field = document.getElementById("read_seconds");
  var button = document.getElementById("ack-submit");
  var wait = document.getElementById("ack-wait");
  setInterval(function () {{
    var seconds = Math.floor((Date.now() - started) / 1000);
    field.value = seconds;
    if (seconds >= {min}) {{ button.disabled = false; wait.textContent = ""; }}
  }}, 500);
}})();
</script>"#,
        id = page.sop.id,
        version = page.sop.current_version,
        min = page.min_read_seconds,
    )
}

fn ack_table(acks: &[AckRecord]) -> String {
    if acks.is_empty() {
        return r#"<p class="muted">No acknowledgments yet.</p>"#.into();
    }
    let rows: String = acks
        .iter()
        .map(|a| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>v{}</td><td>{}</td><td>{}s</td></tr>\n",
                datetime(&a.acknowledged_at),
                escape(&a.staff_name),
                a.sop_version,
                escape(&a.signature_text),
                a.read_seconds,
            )
        })
        .collect();
    format!(
        "<table>\n<tr><th>When</th><th>Staff</th><th>Version</th><th>Signature</th><th>Read time</th></tr>\n{rows}</table>"
    )
}

pub fn detail_page(user: &CurrentUser, page: &DetailPage<'_>) -> String {
    let sop = page.sop;
    let reviewed = sop
        .last_reviewed
        .as_deref()
        .map(|r| format!(" · last reviewed {}", escape(r)))
        .unwrap_or_default();
    let admin_links = if user.is_admin() {
        format!(
            r#" · <a href="/admin/edit/{id}">Edit</a> · <a href="/admin/evidence/sop/{id}">Evidence</a>"#,
            id = sop.id
        )
    } else {
        String::new()
    };
    layout(
        &sop.title,
        Some(user),
        &format!(
            r#"<h1>{title}</h1>
<p class="muted">{category} · version {version} · updated {updated}{reviewed}</p>
<p class="no-print"><a href="/sop/{id}/print">Printable view</a>{admin_links}</p>
{notice}{error}
<div class="content">
{content}
</div>
{ack_form}
<h2>Acknowledgment history</h2>
{acks}"#,
            title = escape(&sop.title),
            category = escape(&sop.category),
            version = sop.current_version,
            updated = datetime(&sop.updated_at),
            id = sop.id,
            notice = notice(page.notice),
            error = error_banner(page.error),
            content = paragraphs(sop.display_content(), page.query),
            ack_form = ack_form(user, page),
            acks = ack_table(page.acknowledgments),
        ),
    )
}

/// Chrome-free page for printing.
pub fn print_page(sop: &SopRecord) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title>
<style>body {{ font-family: Georgia, serif; max-width: 48rem; margin: 2rem auto; }} p {{ line-height: 1.5; }}</style>
</head>
<body onload="window.print()">
<h1>{title}</h1>
<p><em>{category} · version {version} · updated {updated}</em></p>
{content}
</body>
</html>"#,
        title = escape(&sop.title),
        category = escape(&sop.category),
        version = sop.current_version,
        updated = datetime(&sop.updated_at),
        content = paragraphs(sop.display_content(), None),
    )
}
