//! Chat text for CDCARM URL generation and the open-URL follow-up.

use crate::cdcarm_resolver::TurnOverrides;

pub const NO_GENERATED_URL_MESSAGE: &str =
    "I don't have a generated URL yet. Please ask me to generate a CDCARM URL first.";

pub fn render_open_url_instructions() -> String {
    [
        "To open the CDCARM URL, you can:",
        "",
        "1. Click on the URL above (if it's clickable)",
        "2. Copy the URL and paste it into your browser",
        "3. Use the 'Open URL' button in the interface if available",
        "",
        "Would you like me to generate a different URL?",
    ]
    .join("\n")
}

/// Only values overridden in this turn are announced; slot and default
/// values stay silent.
pub fn render_cdcarm_url_message(with_report: bool, overrides: &TurnOverrides, url: &str) -> String {
    let report_status = if with_report { "with" } else { "without" };
    let mut message = format!("Here's your CDCARM URL {report_status} investigation report");
    if let Some(owner) = overrides.owner.as_deref() {
        message.push_str(&format!(" for owner {owner}"));
    }
    if let Some(platform) = overrides.platform.as_deref() {
        message.push_str(&format!(" on platform {platform}"));
    }
    if let Some(release) = overrides.release.as_deref() {
        message.push_str(&format!(" for release {release}"));
    }
    message.push_str(":\n\n");
    message.push_str(url);
    message
}
