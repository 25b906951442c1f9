//! Contract templates and the interpolation that turns a filled-in form into
//! an HTML agreement.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const CONTRACT_ID_FIELD: &str = "contract_id";
pub const GENERATED_DATE_FIELD: &str = "generated_date";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    /// Rendered when an optional field is left blank.
    pub placeholder: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ContractTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prefix: &'static str,
    pub fields: &'static [FieldSpec],
    #[serde(skip)]
    pub body: &'static str,
}

impl ContractTemplate {
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.required)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("unknown contract template: {0}")]
    UnknownTemplate(String),
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("field {0} must be a string, number or boolean")]
    InvalidFieldValue(String),
    #[error("failed to render contract: {0}")]
    Render(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContract {
    pub identifier: String,
    pub title: String,
    pub html: String,
    /// Declared fields as they were interpolated, placeholders included.
    pub fields: BTreeMap<String, String>,
}

const fn required(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        required: true,
        placeholder: "",
    }
}

const fn optional(name: &'static str, label: &'static str, placeholder: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        required: false,
        placeholder,
    }
}

static TEMPLATES: &[ContractTemplate] = &[
    ContractTemplate {
        id: "split-sheet",
        name: "Split Sheet",
        description: "Songwriting and publishing ownership split between writers.",
        prefix: "SPLIT",
        fields: &[
            required("song_title", "Song title"),
            required("writer_one_name", "First writer"),
            required("writer_one_share", "First writer share (%)"),
            required("writer_two_name", "Second writer"),
            required("writer_two_share", "Second writer share (%)"),
            optional("publisher", "Publisher", "N/A"),
            optional("pro_affiliation", "PRO affiliation", "N/A"),
            optional("session_date", "Session date", "TBD"),
        ],
        body: r#"<article class="contract split-sheet">
<header><h1>Split Sheet</h1><p>Agreement {{contract_id}} &middot; {{generated_date}}</p></header>
<section><h2>Composition</h2><p>Title: <strong>{{song_title}}</strong></p><p>Session date: {{session_date}}</p></section>
<section><h2>Ownership</h2>
<table>
<tr><th>Writer</th><th>Share</th></tr>
<tr><td>{{writer_one_name}}</td><td>{{writer_one_share}}%</td></tr>
<tr><td>{{writer_two_name}}</td><td>{{writer_two_share}}%</td></tr>
</table>
<p>Publisher: {{publisher}}</p><p>PRO affiliation: {{pro_affiliation}}</p>
</section>
<section><h2>Terms</h2><p>The writers listed above agree that the composition is jointly owned in the shares stated. Each writer may register their share with their performing rights organization.</p></section>
<footer><p>Signed: {{writer_one_name}}</p><p>Signed: {{writer_two_name}}</p></footer>
</article>"#,
    },
    ContractTemplate {
        id: "producer-agreement",
        name: "Producer Agreement",
        description: "Engagement of a producer for one or more recordings.",
        prefix: "PROD",
        fields: &[
            required("artist_name", "Artist"),
            required("producer_name", "Producer"),
            required("project_title", "Project title"),
            required("producer_fee", "Producer fee"),
            optional("royalty_points", "Royalty points", "N/A"),
            optional("delivery_date", "Delivery date", "TBD"),
            optional("credit_line", "Credit line", "N/A"),
        ],
        body: r#"<article class="contract producer-agreement">
<header><h1>Producer Agreement</h1><p>Agreement {{contract_id}} &middot; {{generated_date}}</p></header>
<section><h2>Parties</h2><p>Artist: <strong>{{artist_name}}</strong></p><p>Producer: <strong>{{producer_name}}</strong></p></section>
<section><h2>Services</h2><p>The producer will produce the recordings for <strong>{{project_title}}</strong> and deliver final masters by {{delivery_date}}.</p></section>
<section><h2>Compensation</h2><p>Fee: {{producer_fee}}</p><p>Royalty points: {{royalty_points}}</p></section>
<section><h2>Credit</h2><p>{{credit_line}}</p></section>
<footer><p>Signed: {{artist_name}}</p><p>Signed: {{producer_name}}</p></footer>
</article>"#,
    },
    ContractTemplate {
        id: "collaboration-agreement",
        name: "Collaboration Agreement",
        description: "Terms between artists working together on a release.",
        prefix: "COLLAB",
        fields: &[
            required("primary_artist", "Primary artist"),
            required("featured_artist", "Featured artist"),
            required("project_title", "Project title"),
            optional("revenue_split", "Revenue split", "TBD"),
            optional("release_date", "Release date", "TBD"),
            optional("approval_contact", "Approval contact", "N/A"),
        ],
        body: r#"<article class="contract collaboration-agreement">
<header><h1>Collaboration Agreement</h1><p>Agreement {{contract_id}} &middot; {{generated_date}}</p></header>
<section><h2>Parties</h2><p>{{primary_artist}} and {{featured_artist}}</p></section>
<section><h2>Project</h2><p>Title: <strong>{{project_title}}</strong></p><p>Planned release: {{release_date}}</p></section>
<section><h2>Revenue</h2><p>Split: {{revenue_split}}</p></section>
<section><h2>Approvals</h2><p>Final mixes and artwork require approval from both parties. Contact: {{approval_contact}}</p></section>
<footer><p>Signed: {{primary_artist}}</p><p>Signed: {{featured_artist}}</p></footer>
</article>"#,
    },
    ContractTemplate {
        id: "performance-agreement",
        name: "Performance Agreement",
        description: "Booking terms for a live performance.",
        prefix: "PERF",
        fields: &[
            required("artist_name", "Artist"),
            required("venue_name", "Venue"),
            required("event_date", "Event date"),
            required("performance_fee", "Performance fee"),
            optional("set_length", "Set length", "TBD"),
            optional("load_in_time", "Load-in time", "TBD"),
            optional("hospitality", "Hospitality", "N/A"),
        ],
        body: r#"<article class="contract performance-agreement">
<header><h1>Performance Agreement</h1><p>Agreement {{contract_id}} &middot; {{generated_date}}</p></header>
<section><h2>Engagement</h2><p>{{artist_name}} will perform at <strong>{{venue_name}}</strong> on {{event_date}}.</p><p>Set length: {{set_length}}</p><p>Load-in: {{load_in_time}}</p></section>
<section><h2>Compensation</h2><p>Fee: {{performance_fee}}</p><p>Hospitality: {{hospitality}}</p></section>
<footer><p>Signed: {{artist_name}}</p><p>Signed on behalf of {{venue_name}}</p></footer>
</article>"#,
    },
    ContractTemplate {
        id: "sync-license",
        name: "Sync License",
        description: "Licence to synchronize a recording with visual media.",
        prefix: "SYNC",
        fields: &[
            required("licensor_name", "Licensor"),
            required("licensee_name", "Licensee"),
            required("song_title", "Song title"),
            required("media_title", "Media title"),
            required("license_fee", "License fee"),
            optional("territory", "Territory", "Worldwide"),
            optional("term", "Term", "TBD"),
        ],
        body: r#"<article class="contract sync-license">
<header><h1>Synchronization License</h1><p>Agreement {{contract_id}} &middot; {{generated_date}}</p></header>
<section><h2>Grant</h2><p>{{licensor_name}} grants {{licensee_name}} a non-exclusive license to synchronize <strong>{{song_title}}</strong> with <strong>{{media_title}}</strong>.</p></section>
<section><h2>Scope</h2><p>Territory: {{territory}}</p><p>Term: {{term}}</p></section>
<section><h2>Fee</h2><p>{{license_fee}}</p></section>
<footer><p>Signed: {{licensor_name}}</p><p>Signed: {{licensee_name}}</p></footer>
</article>"#,
    },
];

pub fn templates() -> &'static [ContractTemplate] {
    TEMPLATES
}

pub fn find_template(id: &str) -> Result<&'static ContractTemplate, ContractError> {
    TEMPLATES
        .iter()
        .find(|template| template.id == id)
        .ok_or_else(|| ContractError::UnknownTemplate(id.to_string()))
}

pub fn generate_identifier(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}", now.timestamp_millis())
}

/// Fills `template` with `input`. Required fields must be present and
/// non-blank; every missing one is reported at once. Keys the template does not
/// declare are ignored.
pub fn render(
    template: &ContractTemplate,
    input: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<RenderedContract, ContractError> {
    let mut fields = BTreeMap::new();
    let mut missing = Vec::new();

    for spec in template.fields {
        let value = field_text(spec.name, input.get(spec.name))?;
        match value {
            Some(text) => {
                fields.insert(spec.name.to_string(), text);
            }
            None if spec.required => missing.push(spec.name.to_string()),
            None => {
                fields.insert(spec.name.to_string(), spec.placeholder.to_string());
            }
        }
    }

    if !missing.is_empty() {
        return Err(ContractError::MissingFields(missing));
    }

    let identifier = generate_identifier(template.prefix, now);
    let mut values: BTreeMap<&str, String> = fields
        .iter()
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect();
    values.insert(CONTRACT_ID_FIELD, identifier.clone());
    values.insert(GENERATED_DATE_FIELD, now.format("%B %-d, %Y").to_string());

    let html = interpolate(template, &values)?;

    Ok(RenderedContract {
        identifier,
        title: template.name.to_string(),
        html,
        fields,
    })
}

fn field_text(name: &str, value: Option<&Value>) -> Result<Option<String>, ContractError> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => return Err(ContractError::InvalidFieldValue(name.to_string())),
    };
    Ok((!text.is_empty()).then_some(text))
}

/// Every template body, HTML-escaping interpolated values. A placeholder with
/// no value is an error.
fn environment() -> Result<Environment<'static>, ContractError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    for template in TEMPLATES {
        env.add_template(template.id, template.body)
            .map_err(|err| ContractError::Render(err.to_string()))?;
    }
    Ok(env)
}

fn interpolate(
    template: &ContractTemplate,
    values: &BTreeMap<&str, String>,
) -> Result<String, ContractError> {
    let env = environment()?;
    env.get_template(template.id)
        .and_then(|compiled| compiled.render(values))
        .map_err(|err| ContractError::Render(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
    }

    fn split_input() -> Map<String, Value> {
        json!({
            "song_title": "Night Drive",
            "writer_one_name": "Ana",
            "writer_one_share": 50,
            "writer_two_name": "Ben",
            "writer_two_share": "50",
            "unrelated": "ignored",
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn every_template_declares_unique_fields_used_in_body() {
        for template in templates() {
            let mut names: Vec<&str> = template.fields.iter().map(|f| f.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), template.fields.len(), "{}", template.id);
            for field in template.fields {
                assert!(
                    template.body.contains(&format!("{{{{{}}}}}", field.name)),
                    "{} does not use {}",
                    template.id,
                    field.name
                );
                assert_eq!(field.required, field.placeholder.is_empty());
            }
        }
    }

    #[test]
    fn renders_fields_and_placeholders() {
        let template = find_template("split-sheet").unwrap();
        let rendered = render(template, &split_input(), clock()).unwrap();

        assert_eq!(rendered.identifier, format!("SPLIT-{}", clock().timestamp_millis()));
        assert_eq!(rendered.title, "Split Sheet");
        assert!(rendered.html.contains("<strong>Night Drive</strong>"));
        assert!(rendered.html.contains("<td>50%</td>"));
        assert!(rendered.html.contains("Publisher: N/A"));
        assert!(rendered.html.contains("Session date: TBD"));
        assert!(rendered.html.contains("June 1, 2025"));
        assert!(rendered.html.contains(&rendered.identifier));
        assert!(!rendered.html.contains("{{"));
        assert!(!rendered.fields.contains_key("unrelated"));
        assert_eq!(rendered.fields["publisher"], "N/A");
    }

    #[test]
    fn reports_all_missing_required_fields() {
        let template = find_template("split-sheet").unwrap();
        let mut input = split_input();
        input.remove("writer_two_name");
        input.insert("song_title".into(), json!("   "));

        assert_eq!(
            render(template, &input, clock()),
            Err(ContractError::MissingFields(vec![
                "song_title".into(),
                "writer_two_name".into()
            ]))
        );
    }

    #[test]
    fn rejects_structured_values() {
        let template = find_template("split-sheet").unwrap();
        let mut input = split_input();
        input.insert("publisher".into(), json!({ "name": "x" }));
        assert_eq!(
            render(template, &input, clock()),
            Err(ContractError::InvalidFieldValue("publisher".into()))
        );
    }

    #[test]
    fn escapes_interpolated_values() {
        let template = find_template("split-sheet").unwrap();
        let mut input = split_input();
        input.insert("song_title".into(), json!("<script>alert('x')</script>"));
        let rendered = render(template, &input, clock()).unwrap();
        assert!(!rendered.html.contains("<script>"));
        assert!(!rendered.html.contains("alert('x')"));
        assert!(rendered.html.contains("&lt;script&gt;alert("));
    }

    #[test]
    fn identical_input_differs_only_by_identifier_and_date() {
        let template = find_template("producer-agreement").unwrap();
        let input = json!({
            "artist_name": "Ana",
            "producer_name": "Kai",
            "project_title": "Tides",
            "producer_fee": "$1,500",
        })
        .as_object()
        .cloned()
        .unwrap();

        let first = render(template, &input, clock()).unwrap();
        let again = render(template, &input, clock()).unwrap();
        assert_eq!(first, again);

        let later = clock() + chrono::Duration::milliseconds(5);
        let second = render(template, &input, later).unwrap();
        assert_ne!(first.identifier, second.identifier);
        assert_eq!(first.fields, second.fields);
        assert_eq!(
            first.html.replace(&first.identifier, ""),
            second.html.replace(&second.identifier, "")
        );
    }

    #[test]
    fn every_template_renders_with_its_declared_fields() {
        for template in templates() {
            let input: Map<String, Value> = template
                .required_fields()
                .map(|field| (field.name.to_string(), json!(format!("{} value", field.label))))
                .collect();
            let rendered = render(template, &input, clock()).unwrap();
            assert!(rendered.html.starts_with("<article"), "{}", template.id);
            assert!(rendered.html.contains(&rendered.identifier));
            assert!(!rendered.html.contains("{{"));
        }
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert_eq!(
            find_template("nda").err(),
            Some(ContractError::UnknownTemplate("nda".into()))
        );
    }

    #[test]
    fn leaves_unknown_and_unterminated_placeholders() {
        let values = BTreeMap::from([("a", "1".to_string())]);
        assert_eq!(interpolate("{{a}}-{{ b }}-{{a", &values), "1-{{ b }}-{{a");
    }
}
