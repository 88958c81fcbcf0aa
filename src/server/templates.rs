//! HTML templates for the web interface.

use crate::services::IntakeReport;
use crate::utils::html_escape;

/// Base HTML template.
pub fn base_template(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Receipts</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <header id="main-header">
        <a href="/" class="logo">Receipts</a>
    </header>
    <main>
        <h1>{}</h1>
        {}
    </main>
</body>
</html>"#,
        html_escape(title),
        html_escape(title),
        content
    )
}

/// The event form, with an optional summary block rendered below it.
///
/// Field values are echoed back so a failed submission can be corrected.
pub fn event_form(name: &str, date: &str, summary: Option<&str>) -> String {
    let content = format!(
        r#"<form class="event-form" method="post" action="/events" enctype="multipart/form-data">
            <label for="event_name">Event Name</label>
            <input type="text" id="event_name" name="event_name" placeholder="e.g., Summer BBQ" value="{}">
            <label for="event_date">Event Date</label>
            <input type="text" id="event_date" name="event_date" placeholder="YYYY-MM-DD" value="{}">
            <label for="files">Upload Files</label>
            <input type="file" id="files" name="files" accept="image/*" multiple>
            <button type="submit">Create Event</button>
        </form>
        {}"#,
        html_escape(name),
        html_escape(date),
        summary.unwrap_or("")
    );
    base_template("Simple Event Creator", &content)
}

/// Summary block for a successful intake.
pub fn intake_summary(report: &IntakeReport) -> String {
    let items: String = report
        .stored
        .iter()
        .map(|r| format!("<li><code>{}</code></li>", html_escape(&r.uri)))
        .collect();

    format!(
        r#"<section class="summary">
            <p><strong>{}</strong></p>
            <p><strong>Name:</strong> {}<br><strong>Date:</strong> {}</p>
            <p><strong>Uploaded Files ({}):</strong></p>
            <ul>{}</ul>
        </section>"#,
        html_escape("Event Created & Files Uploaded Successfully!"),
        html_escape(&report.event.name),
        report.event.date.format("%Y-%m-%d"),
        report.stored.len(),
        items
    )
}

/// Summary block for a failed intake.
pub fn intake_error(message: &str) -> String {
    format!(
        r#"<section class="summary error"><p>{}</p></section>"#,
        html_escape(message)
    )
}
