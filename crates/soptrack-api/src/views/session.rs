//! Login and account pages.

use super::{error_banner, escape, layout};
use crate::auth::CurrentUser;

pub fn login_page(error: Option<&str>, username: &str) -> String {
    layout(
        "Sign in",
        None,
        &format!(
            r#"<h1>Sign in</h1>
{error}
<form method="post" action="/login">
<label for="username">Username</label>
<input type="text" id="username" name="username" value="{username}" autofocus required>
<label for="password">Password</label>
<input type="password" id="password" name="password" required>
<p><button type="submit">Sign in</button></p>
</form>"#,
            error = error_banner(error),
            username = escape(username),
        ),
    )
}

/// Self-service password change.
pub fn account_page(
    user: &CurrentUser,
    force: bool,
    error: Option<&str>,
    success: Option<&str>,
) -> String {
    let forced = if force || user.must_reset_password {
        r#"<p class="error">You must change your password before continuing.</p>"#
    } else {
        ""
    };
    let success = success
        .map(|m| format!(r#"<p class="notice">{}</p>"#, escape(m)))
        .unwrap_or_default();
    layout(
        "Account",
        Some(user),
        &format!(
            r#"<h1>Account</h1>
<p>Signed in as <strong>{username}</strong> ({role}).</p>
{forced}{error}{success}
<form method="post" action="/account">
<label for="current_password">Current password</label>
<input type="password" id="current_password" name="current_password" required>
<label for="new_password">New password</label>
<input type="password" id="new_password" name="new_password" required>
<label for="confirm_password">Confirm new password</label>
<input type="password" id="confirm_password" name="confirm_password" required>
<p class="muted">At least 8 characters, with a number and an uppercase letter.</p>
<p><button type="submit">Change password</button></p>
</form>"#,
            username = escape(&user.username),
            role = user.role.label(),
            error = error_banner(error),
        ),
    )
}
