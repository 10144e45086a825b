use copo_core::config::ResponseConfig;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "response.txt";
const TEMPLATE: &str = "{{ header }}\n\n{{ body }}\n\n{{ footer }}";

/// Wraps the model's final answer with the configured greeting and closing texts.
#[derive(Debug)]
pub struct ResponseFormatter {
    templates: Tera,
    header: String,
    footer: String,
}

impl ResponseFormatter {
    pub fn new(config: &ResponseConfig) -> Result<Self, tera::Error> {
        let mut templates = Tera::default();
        templates.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;
        Ok(Self { templates, header: config.header.clone(), footer: config.footer.clone() })
    }

    /// Header, blank line, answer, blank line, footer. The answer is inserted as-is.
    pub fn format(&self, final_text: &str) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("header", &self.header);
        context.insert("body", final_text);
        context.insert("footer", &self.footer);
        self.templates.render(TEMPLATE_NAME, &context)
    }
}

#[cfg(test)]
mod tests {
    use copo_core::config::ResponseConfig;

    use super::ResponseFormatter;

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::new(&ResponseConfig {
            header: "¡Hola!".to_string(),
            footer: "¡Gracias!".to_string(),
        })
        .expect("formatter")
    }

    #[test]
    fn wraps_answer_between_header_and_footer() {
        let formatted = formatter().format("Tenemos ZWAN y SUKARNE.").expect("format");

        assert_eq!(formatted, "¡Hola!\n\nTenemos ZWAN y SUKARNE.\n\n¡Gracias!");
    }

    #[test]
    fn answer_text_is_not_escaped_or_interpreted() {
        let answer = "*RIB EYE* <b>\"premium\"</b> {{ precio }} & más";

        let formatted = formatter().format(answer).expect("format");

        assert_eq!(formatted, format!("¡Hola!\n\n{answer}\n\n¡Gracias!"));
    }

    #[test]
    fn empty_answer_keeps_layout() {
        assert_eq!(formatter().format("").expect("format"), "¡Hola!\n\n\n\n¡Gracias!");
    }
}
