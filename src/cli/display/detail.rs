//! Key-value view for a single record or outcome.

use std::fmt::Display;

use colored::Colorize;

use super::colors::label;

pub struct DetailView {
    title: String,
    sections: Vec<DetailSection>,
}

struct DetailSection {
    header: Option<String>,
    fields: Vec<(String, String)>,
    items: Vec<String>,
}

impl DetailSection {
    const fn new(header: Option<String>) -> Self {
        Self {
            header,
            fields: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl DetailView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: vec![DetailSection::new(None)],
        }
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: impl Display) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.fields.push((key.to_string(), value.to_string()));
        }
        self
    }

    #[must_use]
    pub fn field_opt(self, key: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Start a new section under `header`.
    #[must_use]
    pub fn section(mut self, header: &str) -> Self {
        self.sections.push(DetailSection::new(Some(header.to_string())));
        self
    }

    /// Bullet line in the current section.
    #[must_use]
    pub fn item(mut self, text: impl Display) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.items.push(text.to_string());
        }
        self
    }

    pub fn render(&self) -> String {
        let mut lines = vec![format!("{}", self.title.bold())];
        let key_width = self
            .sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(12);

        for section in &self.sections {
            if let Some(header) = &section.header {
                lines.push(String::new());
                lines.push(format!("{}", header.bold().underline()));
            }
            for (key, value) in &section.fields {
                // Pad the plain key; the styled label carries escape codes.
                let padding = " ".repeat(key_width.saturating_sub(key.len()));
                lines.push(format!("  {}{padding}  {value}", label(key)));
            }
            for item in &section.items {
                lines.push(format!("  {} {item}", "\u{2022}".dimmed()));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_fields() {
        colored::control::set_override(false);
        let text = DetailView::new("Batch")
            .field("Status", "SUCCEEDED")
            .field_opt("Name", None::<&str>)
            .section("Reruns")
            .item("attempt 1: 2 jobs")
            .render();
        assert!(text.contains("Status:"));
        assert!(text.contains("SUCCEEDED"));
        assert!(!text.contains("Name:"));
        assert!(text.contains("attempt 1: 2 jobs"));
    }
}
