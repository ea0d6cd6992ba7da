use super::OutboundEmail;
use crate::models::ContactSubmission;

pub const SUBJECT_TAG: &str = "[Portfolio]";
const SENDER_NAME: &str = "Portfolio Contact";

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_html(submission: &ContactSubmission) -> String {
    let name = escape_html(&submission.name);
    let email = escape_html(&submission.email);
    let subject = escape_html(&submission.subject);
    let message = escape_html(&submission.message);
    format!(
        r##"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; color: #1a1a1a;">
  <div style="background: linear-gradient(135deg, #a755f0, #d946ef); padding: 24px 32px; border-radius: 12px 12px 0 0;">
    <h1 style="margin: 0; color: #fff; font-size: 22px;">New Contact Message</h1>
    <p style="margin: 4px 0 0; color: rgba(255,255,255,0.8); font-size: 14px;">From your portfolio website</p>
  </div>
  <div style="background: #f9f9f9; border: 1px solid #e5e5e5; border-top: none; padding: 32px; border-radius: 0 0 12px 12px;">
    <table style="width: 100%; border-collapse: collapse;">
      <tr>
        <td style="padding: 8px 0; font-size: 13px; color: #888; width: 80px; vertical-align: top;">Name</td>
        <td style="padding: 8px 0; font-size: 15px; font-weight: 600;">{name}</td>
      </tr>
      <tr>
        <td style="padding: 8px 0; font-size: 13px; color: #888; vertical-align: top;">Email</td>
        <td style="padding: 8px 0; font-size: 15px;"><a href="mailto:{email}" style="color: #a755f0;">{email}</a></td>
      </tr>
      <tr>
        <td style="padding: 8px 0; font-size: 13px; color: #888; vertical-align: top;">Subject</td>
        <td style="padding: 8px 0; font-size: 15px; font-weight: 600;">{subject}</td>
      </tr>
    </table>
    <hr style="border: none; border-top: 1px solid #e5e5e5; margin: 20px 0;" />
    <p style="margin: 0 0 8px; font-size: 13px; color: #888; text-transform: uppercase; letter-spacing: 0.05em;">Message</p>
    <p style="margin: 0; font-size: 15px; line-height: 1.7; white-space: pre-wrap;">{message}</p>
    <hr style="border: none; border-top: 1px solid #e5e5e5; margin: 24px 0 16px;" />
    <p style="margin: 0; font-size: 12px; color: #aaa;">
      Reply directly to this email to respond to {name}.
    </p>
  </div>
</div>"##
    )
}

fn render_text(submission: &ContactSubmission) -> String {
    format!(
        "New contact from {} <{}>\n\nSubject: {}\n\nMessage:\n{}",
        submission.name,
        submission.email,
        submission.subject,
        submission.message
    )
}

/// Builds the owner notification. Replies go to the visitor, not the relay account.
pub fn compose_notification(
    submission: &ContactSubmission,
    to_email: &str,
    from_email: &str
) -> OutboundEmail {
    OutboundEmail {
        from: format!("{} <{}>", SENDER_NAME, from_email),
        to: vec![to_email.to_string()],
        reply_to: submission.email.clone(),
        subject: format!("{} {}", SUBJECT_TAG, submission.subject),
        html: render_html(submission),
        text: render_text(submission),
    }
}
