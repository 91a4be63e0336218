//! Prompt rendering and reply clean-up for customer analyses.

use crate::models::CustomerRecord;
use num_format::{Locale, ToFormattedString};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*```(?:json)?").expect("leading fence regex"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```\s*$").expect("trailing fence regex"));

/// Renders the analysis prompt for one customer.
///
/// Every field of the record appears once, on its own labelled line.
pub fn render_prompt(record: &CustomerRecord) -> String {
    format!(
        r#"
Analiza este cliente B2B y proporciona un análisis detallado como Customer Success Manager experto.

Datos del cliente:
- Nombre: {name}
- Días desde última actividad: {days}
- Tickets abiertos actualmente: {open}
- Total tickets históricos: {total}
- Revenue total: {revenue}
- Oportunidades ganadas: {won}
- Oportunidades perdidas: {lost}
- Engagement de email: {engagement}

Proporciona:
1. Health Score (0-100) - siendo 100 salud perfecta
2. Churn Risk (low/medium/high)
3. Exactamente 3 acciones recomendadas específicas y accionables
4. Un breve análisis (2-3 oraciones) del estado actual del cliente

IMPORTANTE: Responde SOLO con JSON válido en este formato exacto:
{{
    "health_score": 75,
    "churn_risk": "medium",
    "analysis": "Breve análisis aquí del estado del cliente",
    "recommendations": [
        "Primera acción específica y accionable",
        "Segunda acción específica y accionable",
        "Tercera acción específica y accionable"
    ]
}}
"#,
        name = record.name,
        days = record.days_since_last_activity,
        open = record.open_tickets,
        total = record.total_tickets,
        revenue = format_currency(record.total_revenue),
        won = record.opportunities_won,
        lost = record.opportunities_lost,
        engagement = record.email_engagement,
    )
}

/// Formats dollars with thousands separators and cents, e.g. `$1,234,567.89`.
pub fn format_currency(value: f64) -> String {
    format_dollars(value, true)
}

/// Formats dollars rounded to whole units, e.g. `$1,234,568`.
pub fn format_currency_rounded(value: f64) -> String {
    format_dollars(value, false)
}

fn format_dollars(value: f64, with_cents: bool) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let scale = if with_cents { 100.0 } else { 1.0 };
    // Halves round to even
    let scaled = (value.abs() * scale).round_ties_even() as u128;

    if with_cents {
        let whole = (scaled / 100).to_formatted_string(&Locale::en);
        format!("{}${}.{:02}", sign, whole, scaled % 100)
    } else {
        format!("{}${}", sign, scaled.to_formatted_string(&Locale::en))
    }
}

/// Removes a leading ```` ``` ```` / ```` ```json ```` fence and a trailing
/// ```` ``` ```` fence from a model reply.
///
/// Text without fences is returned untouched; fenced text is trimmed.
pub fn strip_code_fences(text: &str) -> Cow<'_, str> {
    let leading = LEADING_FENCE.find(text);
    let trailing = TRAILING_FENCE.find(text);
    if leading.is_none() && trailing.is_none() {
        return Cow::Borrowed(text);
    }

    let start = leading.map(|m| m.end()).unwrap_or(0);
    let end = trailing.map(|m| m.start()).unwrap_or(text.len());
    if start >= end {
        return Cow::Owned(String::new());
    }
    Cow::Owned(text[start..end].trim().to_string())
}
