/// HTML email templates for moderation outcomes

/// A renderable email
#[derive(Debug, Clone, PartialEq)]
pub enum EmailTemplate {
    EventApproved {
        title: String,
        event_url: String,
    },
    EventRejected {
        title: String,
        reason: String,
        event_url: String,
    },
}

impl EmailTemplate {
    /// Template identifier
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::EventApproved { .. } => "event_approved",
            EmailTemplate::EventRejected { .. } => "event_rejected",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            EmailTemplate::EventApproved { .. } => "Your Event Was Approved 🎉",
            EmailTemplate::EventRejected { .. } => "Your Event Was Rejected ❌",
        }
    }

    /// Render the HTML body. All variables are escaped.
    pub fn render(&self) -> String {
        match self {
            EmailTemplate::EventApproved { title, event_url } => format!(
                r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #222;">
    <h2>Good news!</h2>
    <p>Your event <strong>{title}</strong> has been approved and is now visible to everyone.</p>
    <p><a href="{url}">View your event</a></p>
    <p>Thanks for sharing it with the community.</p>
  </body>
</html>
"#,
                title = escape_html(title),
                url = escape_html(event_url),
            ),
            EmailTemplate::EventRejected {
                title,
                reason,
                event_url,
            } => format!(
                r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #222;">
    <h2>Your event was not approved</h2>
    <p>We reviewed <strong>{title}</strong> and could not publish it.</p>
    <p><strong>Reason:</strong> {reason}</p>
    <p>You can review the details here: <a href="{url}">{url}</a></p>
  </body>
</html>
"#,
                title = escape_html(title),
                reason = escape_html(reason),
                url = escape_html(event_url),
            ),
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
