use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const FALLBACK_DEFINITION: &str = "Not available in the provided context.";

lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref ITALIC_STAR: Regex = Regex::new(r"\*(.*?)\*").unwrap();
    static ref ITALIC_UNDERSCORE: Regex = Regex::new(r"_(.*?)_").unwrap();
    static ref HEADING: Regex = Regex::new(r"#+\s*").unwrap();
}

/// Removes emphasis markers, heading hashes and backticks, then trims.
pub fn strip_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    text.replace('`', "").trim().to_string()
}

/// Structured answer to a medical question. Every field is required when
/// decoding; a reply missing one is rejected rather than partially filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalResponse {
    pub definition: String,
    pub causes_risk_factors: Vec<String>,
    pub symptoms: Vec<String>,
    pub diagnosis: Vec<String>,
    pub treatment_cure: Vec<String>,
    pub prognosis_complications: Vec<String>,
    pub prevention_lifestyle: Vec<String>,
    pub additional_notes: Vec<String>,
}

impl MedicalResponse {
    pub fn fallback() -> Self {
        Self {
            definition: FALLBACK_DEFINITION.to_string(),
            causes_risk_factors: Vec::new(),
            symptoms: Vec::new(),
            diagnosis: Vec::new(),
            treatment_cure: Vec::new(),
            prognosis_complications: Vec::new(),
            prevention_lifestyle: Vec::new(),
            additional_notes: Vec::new(),
        }
    }

    pub fn strip_all_markdown(&self) -> Self {
        let strip = |items: &[String]| -> Vec<String> { items.iter().map(|s| strip_markdown(s)).collect() };
        Self {
            definition: strip_markdown(&self.definition),
            causes_risk_factors: strip(&self.causes_risk_factors),
            symptoms: strip(&self.symptoms),
            diagnosis: strip(&self.diagnosis),
            treatment_cure: strip(&self.treatment_cure),
            prognosis_complications: strip(&self.prognosis_complications),
            prevention_lifestyle: strip(&self.prevention_lifestyle),
            additional_notes: strip(&self.additional_notes),
        }
    }

    /// Response schema in the subset of OpenAPI that Gemini accepts.
    pub fn schema() -> Value {
        let list = |description: &str| {
            json!({
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": description
            })
        };
        let fields = [
            "definition",
            "causes_risk_factors",
            "symptoms",
            "diagnosis",
            "treatment_cure",
            "prognosis_complications",
            "prevention_lifestyle",
            "additional_notes",
        ];

        json!({
            "type": "OBJECT",
            "properties": {
                "definition": {
                    "type": "STRING",
                    "description": "Brief definition of the condition."
                },
                "causes_risk_factors": list("Causes and risk factors as a list."),
                "symptoms": list("List of symptoms."),
                "diagnosis": list("Diagnostic methods."),
                "treatment_cure": list("Treatment or cure methods."),
                "prognosis_complications": list("Prognosis and possible complications."),
                "prevention_lifestyle": list("Prevention and lifestyle advice."),
                "additional_notes": list("Additional notes.")
            },
            "required": fields,
            "propertyOrdering": fields
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown() {
        assert_eq!(
            strip_markdown("**bold** and _italic_ and # Heading"),
            "bold and italic and Heading"
        );
        assert_eq!(strip_markdown("### Causes\n*mild* `code`  "), "Causes\nmild code");
        assert_eq!(strip_markdown(""), "");
        assert_eq!(strip_markdown("plain text"), "plain text");
    }

    #[test]
    fn test_strip_all_markdown_touches_every_field() {
        let marked = MedicalResponse {
            definition: "**Acne** is a skin condition".into(),
            causes_risk_factors: vec!["_Hormones_".into()],
            symptoms: vec!["`Pimples`".into(), "## Blackheads".into()],
            diagnosis: vec!["*Exam*".into()],
            treatment_cure: vec!["**Retinoids**".into()],
            prognosis_complications: vec!["# Scarring".into()],
            prevention_lifestyle: vec!["_Cleanse_".into()],
            additional_notes: vec!["**See a doctor**".into()],
        };
        let clean = marked.strip_all_markdown();
        assert_eq!(clean.definition, "Acne is a skin condition");
        assert_eq!(clean.causes_risk_factors, vec!["Hormones"]);
        assert_eq!(clean.symptoms, vec!["Pimples", "Blackheads"]);
        assert_eq!(clean.diagnosis, vec!["Exam"]);
        assert_eq!(clean.treatment_cure, vec!["Retinoids"]);
        assert_eq!(clean.prognosis_complications, vec!["Scarring"]);
        assert_eq!(clean.prevention_lifestyle, vec!["Cleanse"]);
        assert_eq!(clean.additional_notes, vec!["See a doctor"]);
    }

    #[test]
    fn test_fallback_value() {
        let fallback = MedicalResponse::fallback();
        assert_eq!(fallback.definition, "Not available in the provided context.");
        assert!(fallback.symptoms.is_empty());
        assert!(fallback.additional_notes.is_empty());
    }

    #[test]
    fn test_missing_field_fails_to_decode() {
        let partial = json!({ "definition": "x", "symptoms": [] });
        assert!(serde_json::from_value::<MedicalResponse>(partial).is_err());
    }

    #[test]
    fn test_schema_requires_all_eight_fields() {
        let schema = MedicalResponse::schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 8);
        for field in required {
            assert!(schema["properties"].get(field.as_str().unwrap()).is_some());
        }
    }
}
