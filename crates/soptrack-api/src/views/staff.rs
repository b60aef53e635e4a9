//! Roster administration page.

use super::{error_banner, escape, layout, notice, opt};
use crate::auth::CurrentUser;
use crate::db::staff::{RosterImportSummary, StaffRecord};

/// Banner content for the roster page.
#[derive(Debug, Clone, Default)]
pub struct RosterMessages<'a> {
    pub notice: Option<&'a str>,
    pub error: Option<&'a str>,
    pub import: Option<RosterImportSummary>,
}

pub fn staff_page(user: &CurrentUser, staff: &[StaffRecord], messages: &RosterMessages<'_>) -> String {
    let import = messages
        .import
        .map(|s| {
            format!(
                r#"<p class="notice">Roster imported: {} added, {} already on file, {} skipped.</p>"#,
                s.inserted, s.duplicates, s.skipped
            )
        })
        .unwrap_or_default();
    let rows: String = staff
        .iter()
        .map(|s| {
            format!(
                r#"<tr><td>{name}</td><td>{staff_type}</td><td>{job_title}</td><td>{department}</td><td>{supervisor}</td><td>{hire_date}</td><td>{status}</td>
<td><form class="inline" method="post" action="/admin/staff/{id}/toggle"><button type="submit">{toggle}</button></form></td></tr>
"#,
                id = s.id,
                name = escape(&s.name),
                staff_type = opt(s.staff_type.as_deref()),
                job_title = opt(s.job_title.as_deref()),
                department = opt(s.department.as_deref()),
                supervisor = opt(s.supervisor.as_deref()),
                hire_date = s.hire_date.map(|d| d.to_string()).unwrap_or_default(),
                status = if s.active { "Active" } else { "Inactive" },
                toggle = if s.active { "Deactivate" } else { "Activate" },
            )
        })
        .collect();
    layout(
        "Staff",
        Some(user),
        &format!(
            r#"<h1>Staff roster</h1>
{notice}{import}{error}
<table>
<tr><th>Name</th><th>Type</th><th>Job title</th><th>Department</th><th>Supervisor</th><th>Hired</th><th>Status</th><th></th></tr>
{rows}</table>
<h2>Add staff member</h2>
<form method="post" action="/admin/staff/new">
<label for="name">Name</label><input type="text" id="name" name="name" maxlength="200" required>
<label for="staff_type">Type</label><input type="text" id="staff_type" name="staff_type" maxlength="50">
<label for="job_title">Job title</label><input type="text" id="job_title" name="job_title" maxlength="100">
<label for="department">Department</label><input type="text" id="department" name="department" maxlength="100">
<label for="supervisor">Supervisor</label><input type="text" id="supervisor" name="supervisor" maxlength="200">
<label for="hire_date">Hire date</label><input type="date" id="hire_date" name="hire_date">
<p><button type="submit">Add</button></p>
</form>
<h2>Import roster CSV</h2>
<p class="muted">Header row required. Columns: <code>name</code> (required), <code>staff_type</code>,
<code>job_title</code> or <code>role</code>, <code>department</code>, <code>supervisor</code>, <code>hire_date</code> (YYYY-MM-DD).</p>
<form method="post" action="/admin/staff/import" enctype="multipart/form-data">
<input type="file" name="file" accept=".csv,text/csv" required>
<button type="submit">Import</button>
</form>"#,
            notice = notice(messages.notice),
            error = error_banner(messages.error),
        ),
    )
}
