//! Account administration page.

use soptrack_core::Role;

use super::{error_banner, escape, layout, notice, opt};
use crate::auth::CurrentUser;
use crate::db::staff::StaffRecord;
use crate::db::users::UserListing;

fn role_label(stored: &str) -> &str {
    stored
        .parse::<Role>()
        .map(|r| r.label())
        .unwrap_or(stored)
}

pub fn users_page(
    user: &CurrentUser,
    users: &[UserListing],
    staff: &[StaffRecord],
    notice_code: Option<&str>,
    error: Option<&str>,
) -> String {
    let rows: String = users
        .iter()
        .map(|u| {
            format!(
                r#"<tr><td>{username}</td><td>{role}</td><td>{staff}</td><td>{status}</td><td>{reset}</td>
<td>
<form class="inline" method="post" action="/admin/users/{id}/toggle"><button type="submit">{toggle}</button></form>
<form class="inline" method="post" action="/admin/users/{id}/force-reset"><button type="submit">Force reset</button></form>
<form class="inline" method="post" action="/admin/users/{id}/password">
<input type="password" name="new_password" placeholder="New password" required>
<button type="submit">Set password</button></form>
</td></tr>
"#,
                id = u.id,
                username = escape(&u.username),
                role = escape(role_label(&u.role)),
                staff = opt(u.staff_name.as_deref()),
                status = if u.active { "Active" } else { "Inactive" },
                reset = if u.must_reset_password { "Pending reset" } else { "" },
                toggle = if u.active { "Deactivate" } else { "Activate" },
            )
        })
        .collect();
    let roles: String = Role::all()
        .iter()
        .map(|r| {
            let selected = if *r == Role::Staff { " selected" } else { "" };
            format!(r#"<option value="{}"{selected}>{}</option>"#, r.as_str(), r.label())
        })
        .collect();
    let staff_options: String = staff
        .iter()
        .filter(|s| s.active)
        .map(|s| format!(r#"<option value="{}">{}</option>"#, s.id, escape(&s.name)))
        .collect();
    layout(
        "Users",
        Some(user),
        &format!(
            r#"<h1>User accounts</h1>
{notice}{error}
<table>
<tr><th>Username</th><th>Role</th><th>Staff member</th><th>Status</th><th>Password</th><th></th></tr>
{rows}</table>
<h2>Create user</h2>
<form method="post" action="/admin/users/new">
<label for="username">Username</label><input type="text" id="username" name="username" maxlength="50" required>
<label for="password">Initial password</label><input type="password" id="password" name="password" required>
<label for="role">Role</label><select id="role" name="role">{roles}</select>
<label for="staff_id">Staff member</label>
<select id="staff_id" name="staff_id"><option value="">None (staff accounts get one from the username)</option>{staff_options}</select>
<label><input type="checkbox" name="must_reset_password" value="1"> Require password change at first login</label>
<p><button type="submit">Create</button></p>
</form>"#,
            notice = notice(notice_code),
            error = error_banner(error),
        ),
    )
}
