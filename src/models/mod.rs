use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ── Categories ────────────────────────────────────────────────────────────────

/// Source-URL categories carried by the school catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Category {
    Fees,
    Program,
    Enrollment,
    Events,
    Scholarships,
    Contact,
}

impl Category {
    /// Keywords used by the generic extractor when no content container is found.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Category::Fees => &["fee", "tuition", "cost", "payment", "financial"],
            Category::Program => &["program", "curriculum", "academic", "course", "study"],
            Category::Enrollment => &["enroll", "admission", "application", "apply", "requirement"],
            Category::Events => &["event", "calendar", "upcoming", "schedule"],
            Category::Scholarships => &["scholarship", "financial aid", "discount", "grant", "assistance"],
            Category::Contact => &["contact", "email", "phone", "address", "location"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Fees => "fees",
            Category::Program => "program",
            Category::Enrollment => "enrollment",
            Category::Events => "events",
            Category::Scholarships => "scholarships",
            Category::Contact => "contact",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The five fields every school record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TuitionFees,
    Curriculum,
    EnrollmentProcess,
    Scholarships,
    ContactInfo,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::TuitionFees,
        Field::Curriculum,
        Field::EnrollmentProcess,
        Field::Scholarships,
        Field::ContactInfo,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Field::TuitionFees => "tuition_fees",
            Field::Curriculum => "curriculum",
            Field::EnrollmentProcess => "enrollment_process",
            Field::Scholarships => "scholarships",
            Field::ContactInfo => "contact_info",
        }
    }

    /// Catalog category whose URLs feed this field.
    pub fn category(&self) -> Category {
        match self {
            Field::TuitionFees => Category::Fees,
            Field::Curriculum => Category::Program,
            Field::EnrollmentProcess => Category::Enrollment,
            Field::Scholarships => Category::Scholarships,
            Field::ContactInfo => Category::Contact,
        }
    }
}

// ── Extraction result ─────────────────────────────────────────────────────────

/// Outcome of extracting one field for one school.
///
/// `data` is deliberately untyped: every site shapes its payload differently,
/// so callers branch on the variant and never assume a payload exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success {
        data: Value,
    },
    Partial {
        data: Value,
        message: String,
    },
    Warning {
        message: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        data: Value,
    },
    Skipped {
        message: String,
    },
    NotImplemented {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ExtractionResult {
    pub fn success(data: Value) -> Self {
        Self::Success { data }
    }

    pub fn partial(data: Value, message: impl Into<String>) -> Self {
        Self::Partial { data, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning { message: message.into(), data: Value::Null }
    }

    pub fn warning_with(message: impl Into<String>, data: Value) -> Self {
        Self::Warning { message: message.into(), data }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::Skipped { message: message.into() }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Partial { .. } => "partial",
            Self::Warning { .. } => "warning",
            Self::Skipped { .. } => "skipped",
            Self::NotImplemented { .. } => "not_implemented",
            Self::Error { .. } => "error",
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data } | Self::Partial { data, .. } => Some(data),
            Self::Warning { data, .. } if !data.is_null() => Some(data),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Partial { message, .. }
            | Self::Warning { message, .. }
            | Self::Skipped { message }
            | Self::NotImplemented { message }
            | Self::Error { message } => Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// True when the field carries usable data.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Success { data } | Self::Partial { data, .. } => !is_empty_value(data),
            _ => false,
        }
    }

    /// Output form: a bare payload on success, the status wrapper otherwise.
    pub fn to_output_value(&self) -> Value {
        match self {
            Self::Success { data } => data.clone(),
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }
}

fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

// ── School record ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub name: String,
    pub tuition_fees: ExtractionResult,
    pub curriculum: ExtractionResult,
    pub enrollment_process: ExtractionResult,
    pub scholarships: ExtractionResult,
    pub contact_info: ExtractionResult,
}

impl SchoolRecord {
    /// Record whose every field failed with the same message.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        let err = ExtractionResult::error(message);
        Self {
            name: name.into(),
            tuition_fees: err.clone(),
            curriculum: err.clone(),
            enrollment_process: err.clone(),
            scholarships: err.clone(),
            contact_info: err,
        }
    }

    pub fn get(&self, field: Field) -> &ExtractionResult {
        match field {
            Field::TuitionFees => &self.tuition_fees,
            Field::Curriculum => &self.curriculum,
            Field::EnrollmentProcess => &self.enrollment_process,
            Field::Scholarships => &self.scholarships,
            Field::ContactInfo => &self.contact_info,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut ExtractionResult {
        match field {
            Field::TuitionFees => &mut self.tuition_fees,
            Field::Curriculum => &mut self.curriculum,
            Field::EnrollmentProcess => &mut self.enrollment_process,
            Field::Scholarships => &mut self.scholarships,
            Field::ContactInfo => &mut self.contact_info,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &ExtractionResult)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    pub fn error_count(&self) -> usize {
        self.fields().filter(|(_, r)| r.is_error()).count()
    }

    /// `{name, tuition_fees, ...}` with each field in output form.
    pub fn to_output_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        for (field, result) in self.fields() {
            map.insert(field.key().into(), result.to_output_value());
        }
        Value::Object(map)
    }
}

// ── School descriptor ─────────────────────────────────────────────────────────

/// Candidate source URLs for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UrlSource {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl UrlSource {
    pub fn urls(&self) -> Vec<&str> {
        match self {
            UrlSource::None => Vec::new(),
            UrlSource::One(u) => vec![u.as_str()],
            UrlSource::Many(us) => us.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, UrlSource::None)
    }
}

impl<'de> Deserialize<'de> for UrlSource {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Null(()),
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(de)? {
            Raw::Null(()) => UrlSource::None,
            Raw::One(s) if s.trim().is_empty() => UrlSource::None,
            Raw::One(s) => UrlSource::One(s.trim().to_string()),
            Raw::Many(v) => {
                let v: Vec<String> = v
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                match v.len() {
                    0 => UrlSource::None,
                    _ => UrlSource::Many(v),
                }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolDescriptor {
    pub name: String,

    #[serde(default)]
    pub link: String,

    /// Short code of the extractor to use, bypassing name dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,

    #[serde(default)]
    pub school_fee: UrlSource,

    #[serde(default)]
    pub program: UrlSource,

    #[serde(default, rename = "Enrollment Process and Requirements")]
    pub enrollment: UrlSource,

    #[serde(default, rename = "Upcoming Events")]
    pub events: UrlSource,

    #[serde(default, rename = "Discounts and Scholarship")]
    pub scholarships: UrlSource,

    #[serde(default, rename = "Contact Information", alias = "Contact Information ")]
    pub contact: UrlSource,
}

impl SchoolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: String::new(),
            extractor: None,
            school_fee: UrlSource::None,
            program: UrlSource::None,
            enrollment: UrlSource::None,
            events: UrlSource::None,
            scholarships: UrlSource::None,
            contact: UrlSource::None,
        }
    }

    pub fn urls(&self, category: Category) -> &UrlSource {
        match category {
            Category::Fees => &self.school_fee,
            Category::Program => &self.program,
            Category::Enrollment => &self.enrollment,
            Category::Events => &self.events,
            Category::Scholarships => &self.scholarships,
            Category::Contact => &self.contact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_outputs_bare_payload() {
        let r = ExtractionResult::success(json!({"fees": []}));
        assert_eq!(r.to_output_value(), json!({"fees": []}));
    }

    #[test]
    fn non_success_outputs_wrapper() {
        let r = ExtractionResult::warning("No fee table found");
        assert_eq!(
            r.to_output_value(),
            json!({"status": "warning", "message": "No fee table found"})
        );

        let r = ExtractionResult::partial(json!({"a": 1}), "only application fees");
        let v = r.to_output_value();
        assert_eq!(v["status"], "partial");
        assert_eq!(v["data"]["a"], 1);
    }

    #[test]
    fn every_variant_round_trips_through_status_tag() {
        let all = vec![
            ExtractionResult::success(json!("x")),
            ExtractionResult::partial(json!([1]), "m"),
            ExtractionResult::warning_with("m", json!({"k": "v"})),
            ExtractionResult::skipped("m"),
            ExtractionResult::not_implemented("m"),
            ExtractionResult::error("m"),
        ];
        for r in all {
            let s = serde_json::to_string(&r).unwrap();
            let back: ExtractionResult = serde_json::from_str(&s).unwrap();
            assert_eq!(back, r);
            assert!(s.contains(&format!("\"status\":\"{}\"", r.status())));
        }
    }

    #[test]
    fn failed_record_has_five_errors() {
        let rec = SchoolRecord::failed("X", "timed out");
        assert_eq!(rec.error_count(), 5);
        let out = rec.to_output_value();
        assert_eq!(out["contact_info"]["status"], "error");
        assert_eq!(out["name"], "X");
    }

    #[test]
    fn availability_ignores_empty_payloads() {
        assert!(!ExtractionResult::success(json!({})).is_available());
        assert!(ExtractionResult::success(json!({"a": 1})).is_available());
        assert!(!ExtractionResult::warning("none").is_available());
    }

    #[test]
    fn descriptor_accepts_string_list_or_empty() {
        let d: SchoolDescriptor = serde_json::from_value(json!({
            "name": "Some School",
            "link": "https://example.org",
            "school_fee": "",
            "program": ["https://example.org/a", " "],
            "Upcoming Events": [],
            "Contact Information ": "https://example.org/contact"
        }))
        .unwrap();

        assert!(d.school_fee.is_empty());
        assert_eq!(d.program, UrlSource::Many(vec!["https://example.org/a".into()]));
        assert!(d.events.is_empty());
        assert_eq!(d.urls(Category::Contact).urls(), vec!["https://example.org/contact"]);
        assert!(d.enrollment.is_empty());
    }
}
