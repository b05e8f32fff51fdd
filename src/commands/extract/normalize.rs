use anyhow::{Context, Result};
use regex::Regex;

/// Known OCR misreadings of roll header words, applied as whole words and
/// case-insensitively.
pub(crate) const OCR_CORRECTIONS: &[(&str, &str)] = &[
    ("Nanre", "Name"),
    ("Narne", "Name"),
    ("Natne", "Name"),
    ("Nanie", "Name"),
    ("Narme", "Name"),
    ("Namre", "Name"),
    ("Nanne", "Name"),
    ("Fathers", "Father"),
    ("Fathars", "Father"),
    ("Fathar", "Father"),
    ("Husbands", "Husband"),
    ("Hurband", "Husband"),
    ("Husbamd", "Husband"),
    ("Hursband", "Husband"),
    ("Husbanc", "Husband"),
    ("Aqe", "Age"),
    ("Agg", "Age"),
    ("Agge", "Age"),
    ("Agae", "Age"),
    ("Gendsr", "Gender"),
    ("Gendet", "Gender"),
    ("Gencer", "Gender"),
    ("Malg", "Male"),
    ("Malle", "Male"),
    ("Maie", "Male"),
    ("Fernale", "Female"),
    ("Femala", "Female"),
    ("Femsle", "Female"),
    ("Femaie", "Female"),
    ("Fenale", "Female"),
    ("Houre", "House"),
    ("Housr", "House"),
    ("Hourse", "House"),
    ("Numbsr", "Number"),
    ("Numbef", "Number"),
    ("Numbar", "Number"),
];

#[derive(Debug)]
pub(crate) struct TextNormalizer {
    corrections: Vec<(Regex, &'static str)>,
    horizontal_space: Regex,
    colon_spacing: Regex,
    comma_spacing: Regex,
    line_edge_space: Regex,
    blank_lines: Regex,
}

impl TextNormalizer {
    pub(crate) fn new() -> Result<Self> {
        Self::with_corrections(OCR_CORRECTIONS)
    }

    pub(crate) fn with_corrections(table: &[(&str, &'static str)]) -> Result<Self> {
        let corrections = table
            .iter()
            .map(|(wrong, correct)| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(wrong)))
                    .with_context(|| format!("failed to compile correction regex for {wrong}"))
                    .map(|pattern| (pattern, *correct))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            corrections,
            horizontal_space: Regex::new(r"[^\S\n]+")
                .context("failed to compile horizontal whitespace regex")?,
            colon_spacing: Regex::new(r"[^\S\n]*:[^\S\n]*")
                .context("failed to compile colon spacing regex")?,
            comma_spacing: Regex::new(r"[^\S\n]*,[^\S\n]*")
                .context("failed to compile comma spacing regex")?,
            line_edge_space: Regex::new(r"(?m)^[^\S\n]+|[^\S\n]+$")
                .context("failed to compile line edge regex")?,
            blank_lines: Regex::new(r"\n{2,}").context("failed to compile blank line regex")?,
        })
    }

    /// Corrects header-word misreadings and tidies whitespace. Total and
    /// idempotent.
    pub(crate) fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut out = text.to_string();
        for (pattern, correct) in &self.corrections {
            if pattern.is_match(&out) {
                out = pattern.replace_all(&out, *correct).into_owned();
            }
        }

        let out = self.horizontal_space.replace_all(&out, " ");
        let out = self.colon_spacing.replace_all(&out, ": ");
        let out = self.comma_spacing.replace_all(&out, ", ");
        let out = self.line_edge_space.replace_all(&out, "");
        let out = self.blank_lines.replace_all(&out, "\n");

        out.trim().to_string()
    }
}
