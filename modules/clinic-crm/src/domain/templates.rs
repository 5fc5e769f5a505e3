//! Italian `WhatsApp` quick-reply templates.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TemplateContext {
    pub first_name: String,
    pub clinic_name: String,
    pub quote_total: String,
    pub currency: String,
    pub appointment_date: String,
    pub appointment_time: String,
}

impl TemplateContext {
    #[must_use]
    pub fn new(first_name: &str, clinic_name: &str, currency: &str) -> Self {
        Self {
            first_name: first_name.to_owned(),
            clinic_name: clinic_name.to_owned(),
            quote_total: "-".to_owned(),
            currency: currency.to_owned(),
            appointment_date: "da confermare".to_owned(),
            appointment_time: "10:00".to_owned(),
        }
    }
}

/// Render the template named `key`; unknown keys render to an empty string.
#[must_use]
pub fn render(key: &str, ctx: &TemplateContext) -> String {
    match key {
        "new" => format!(
            "Ciao {}, grazie per aver contattato {}. Ti va bene una chiamata veloce oggi?",
            ctx.first_name, ctx.clinic_name
        ),
        "contacted" => format!(
            "Ciao {}, ti scrivo per un follow-up. Hai domande sul trattamento o sui tempi del viaggio?",
            ctx.first_name
        ),
        "quoted" => format!(
            "Ciao {}, ti abbiamo inviato il preventivo di {} {}. Posso aiutarti a confermare la data?",
            ctx.first_name, ctx.quote_total, ctx.currency
        ),
        "appointment_reminder" => format!(
            "Promemoria appuntamento: {} alle {}. Ti aspettiamo alla {}.",
            ctx.appointment_date, ctx.appointment_time, ctx.clinic_name
        ),
        _ => String::new(),
    }
}
