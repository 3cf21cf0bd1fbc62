//! Rendering of outbound alert messages.
//!
//! Bodies are minijinja templates over the triggering reading and the
//! crossed threshold. The HTML markup renders on Telegram and email; the
//! SMS gateway receives it as-is.

use serde_json::json;

use crate::{
    channels::TemplateService,
    models::{AlertEvent, AlertKind, NotificationMessage, Reading},
};

/// The shared body template for threshold alerts.
const ALERT_BODY_TEMPLATE: &str = "\
<b>Alert Type:</b> {{ alert_type }}
<b>Threshold Exceeded:</b> {{ threshold }}

<b>Current Readings:</b>
• TDS: <code>{{ tds }} ppm</code>
• Temperature: <code>{{ temperature }}°C</code>
• Voltage: <code>{{ voltage }}V</code>

<b>Timestamp:</b> {{ timestamp }}

<i>This is an automated alert from the Undine monitoring system</i>";

fn title_for(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::TdsCritical => "🚨 WATER QUALITY ALERT — High TDS",
        AlertKind::TdsWarning => "⚠️ WATER QUALITY ALERT — Elevated TDS",
        AlertKind::TempWarning => "🌡️ WATER QUALITY ALERT — High Temperature",
        AlertKind::LowVoltage => "⚡ SENSOR ALERT — Low Voltage",
    }
}

fn describe(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::TdsCritical => "High TDS",
        AlertKind::TdsWarning => "Elevated TDS",
        AlertKind::TempWarning => "High Temperature",
        AlertKind::LowVoltage => "Low Voltage",
    }
}

/// Renders the notification for an active alert condition.
///
/// A template failure falls back to an unformatted message rather than
/// suppressing the notification.
pub fn render_alert_message(
    templates: &TemplateService,
    event: &AlertEvent,
    reading: &Reading,
) -> NotificationMessage {
    let context = json!({
        "alert_type": describe(event.kind),
        "threshold": format!("{:.2}", event.threshold),
        "tds": format!("{:.2}", reading.tds),
        "temperature": format!("{:.2}", reading.temperature),
        "voltage": format!("{:.2}", reading.voltage),
        "timestamp": reading.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    });

    let body = match templates.render(ALERT_BODY_TEMPLATE, context) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, kind = %event.kind, "Failed to render alert body, sending plain fallback.");
            format!(
                "{} = {:.2} exceeded threshold {:.2} at {}",
                event.kind.parameter(),
                event.current_value,
                event.threshold,
                reading.timestamp
            )
        }
    };

    NotificationMessage { title: title_for(event.kind).to_string(), body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ReadingBuilder;

    #[test]
    fn test_render_carries_reading_and_threshold() {
        let templates = TemplateService::new();
        let reading = ReadingBuilder::new().tds(152.5).temperature(26.1).voltage(3.28).build();
        let event = AlertEvent {
            kind: AlertKind::TdsCritical,
            current_value: 152.5,
            threshold: 150.0,
        };

        let message = render_alert_message(&templates, &event, &reading);

        assert!(message.title.contains("High TDS"));
        assert!(message.body.contains("152.50 ppm"));
        assert!(message.body.contains("Threshold Exceeded:</b> 150.00"));
        assert!(message.body.contains("26.10°C"));
        assert!(message.body.contains("3.28V"));
        assert!(message.body.contains("2026-08-01 10:00:00 UTC"));
    }

    #[test]
    fn test_each_kind_has_a_distinct_title() {
        let titles: std::collections::HashSet<&str> =
            AlertKind::ALL.iter().map(|&kind| title_for(kind)).collect();
        assert_eq!(titles.len(), AlertKind::ALL.len());
    }
}
