//! # Server-Rendered Pages
//!
//! Pages are plain `format!` templates. Every value interpolated into
//! markup goes through [`escape`] first; [`highlight`] escapes before it
//! inserts `<mark>` tags.

pub mod admin;
pub mod audit;
pub mod compliance;
pub mod session;
pub mod sops;
pub mod staff;
pub mod users;

use axum::http::StatusCode;
use chrono::NaiveDateTime;
use regex::RegexBuilder;

use crate::auth::CurrentUser;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2933; background: #f5f7fa; }
header { background: #243b53; color: #fff; padding: .75rem 1.5rem; display: flex; gap: 1rem; align-items: center; }
header a, header button { color: #fff; text-decoration: none; background: none; border: 0; font: inherit; cursor: pointer; }
header .spacer { flex: 1; }
main { max-width: 1100px; margin: 1.5rem auto; padding: 0 1.5rem; }
table { border-collapse: collapse; width: 100%; background: #fff; }
th, td { border-bottom: 1px solid #d9e2ec; padding: .4rem .6rem; text-align: left; vertical-align: top; }
.notice { background: #e3f9e5; border: 1px solid #57ae5b; padding: .5rem 1rem; }
.error { background: #ffe3e3; border: 1px solid #e12d39; padding: .5rem 1rem; }
.muted { color: #829ab1; }
.content p { line-height: 1.5; }
mark { background: #fff3c4; }
form.inline { display: inline; }
label { display: block; margin: .5rem 0 .2rem; }
input[type=text], input[type=password], input[type=date], select, textarea { width: 100%; max-width: 40rem; padding: .3rem; }
@media print { header, .no-print { display: none; } }
"#;

/// HTML-escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape `text`, wrapping case-insensitive matches of `query` in `<mark>`.
pub fn highlight(text: &str, query: Option<&str>) -> String {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return escape(text);
    };
    let Ok(pattern) = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return escape(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in pattern.find_iter(text) {
        out.push_str(&escape(&text[last..m.start()]));
        out.push_str("<mark>");
        out.push_str(&escape(m.as_str()));
        out.push_str("</mark>");
        last = m.end();
    }
    out.push_str(&escape(&text[last..]));
    out
}

/// Render plain text as paragraphs split on blank lines.
pub fn paragraphs(text: &str, query: Option<&str>) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", highlight(p, query).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Percent-encode a query-string value.
pub fn url_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

pub fn datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

pub fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

pub fn opt(value: Option<&str>) -> String {
    escape(value.unwrap_or(""))
}

/// Render a success banner for a `?notice=` code.
pub fn notice(code: Option<&str>) -> String {
    let message = match code {
        Some("created") => "Created.",
        Some("updated") => "Saved.",
        Some("toggled") => "Status updated.",
        Some("reset") => "The user must change their password at next login.",
        Some("password") => "Password set. The user must change it at next login.",
        Some("acknowledged") => "Acknowledgment recorded.",
        Some("already") => "You have already acknowledged this version.",
        _ => return String::new(),
    };
    format!(r#"<p class="notice">{message}</p>"#)
}

/// Render an error banner.
pub fn error_banner(message: Option<&str>) -> String {
    match message {
        Some(message) => format!(r#"<p class="error">{}</p>"#, escape(message)),
        None => String::new(),
    }
}

fn nav(user: Option<&CurrentUser>) -> String {
    let Some(user) = user else {
        return String::new();
    };
    let mut links = vec![r#"<a href="/">SOPs</a>"#.to_string()];
    if user.can_view_compliance() {
        links.push(r#"<a href="/compliance">Compliance</a>"#.into());
    }
    if user.is_admin() {
        links.push(r#"<a href="/admin">Admin</a>"#.into());
        links.push(r#"<a href="/admin/staff">Staff</a>"#.into());
        links.push(r#"<a href="/admin/users">Users</a>"#.into());
        links.push(r#"<a href="/admin/audit">Audit</a>"#.into());
    }
    format!(
        r#"{links}<span class="spacer"></span><a href="/account">{name}</a>
<form class="inline" method="post" action="/logout"><button type="submit">Log out</button></form>"#,
        links = links.join("\n"),
        name = escape(&user.username),
    )
}

/// Wrap `body` in the page chrome.
pub fn layout(title: &str, user: Option<&CurrentUser>, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · SOP Tracker</title>
<style>{STYLE}</style>
</head>
<body>
<header><strong>SOP Tracker</strong>
{nav}
</header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = nav(user),
    )
}

/// Standalone error page.
pub fn error_page(status: StatusCode, message: &str) -> String {
    let heading = status.canonical_reason().unwrap_or("Error");
    layout(
        heading,
        None,
        &format!(
            r#"<h1>{code} {heading}</h1>
<p>{message}</p>
<p><a href="/">Back to SOPs</a></p>"#,
            code = status.as_u16(),
            heading = escape(heading),
            message = escape(message),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn highlight_is_case_insensitive_and_escaped() {
        assert_eq!(
            highlight("Fire <Drill> fire", Some("FIRE")),
            "<mark>Fire</mark> &lt;Drill&gt; <mark>fire</mark>"
        );
        assert_eq!(highlight("a+b", Some("+")), "a<mark>+</mark>b");
        assert_eq!(highlight("<x>", None), "&lt;x&gt;");
        assert_eq!(highlight("<x>", Some("  ")), "&lt;x&gt;");
    }

    #[test]
    fn url_encoding() {
        assert_eq!(url_encode("fire drill&x=é"), "fire+drill%26x%3D%C3%A9");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(paragraphs("one\n\ntwo\nthree", None), "<p>one</p>\n<p>two<br>three</p>");
    }

    #[test]
    fn navigation_follows_role() {
        let mut user = CurrentUser {
            id: 1,
            username: "amy".into(),
            role: soptrack_core::Role::Staff,
            staff_id: None,
            must_reset_password: false,
        };
        let page = layout("Home", Some(&user), "");
        assert!(!page.contains("/compliance"));
        assert!(!page.contains("/admin"));

        user.role = soptrack_core::Role::Admin;
        let page = layout("Home", Some(&user), "");
        assert!(page.contains("/compliance"));
        assert!(page.contains("/admin/audit"));
    }
}
