//! The language report form: block identifiers, Block Kit layout, and answer extraction.

use crate::db::SqlParam;
use crate::events::FormState;

use serde_json::{Value, json};

pub const START_REPORT_ACTION: &str = "start_report";
pub const CHECK_ACCOUNT_ACTION: &str = "check_account_status";
pub const SUBMIT_REPORT_ACTION: &str = "submit_report";

pub const GENERAL_AREA_BLOCK: &str = "general_area";
pub const GENERAL_AREA_INPUT: &str = "general_area_input";
pub const GENERAL_AREA_OTHER_BLOCK: &str = "general_area_other";
pub const GENERAL_AREA_OTHER_INPUT: &str = "general_area_other_input";
pub const EXACT_LOCATION_BLOCK: &str = "exact_location";
pub const EXACT_LOCATION_INPUT: &str = "exact_location_input";
pub const LANGUAGE_BLOCK: &str = "language";
pub const LANGUAGE_INPUT: &str = "language_input";
pub const LANGUAGE_OTHER_BLOCK: &str = "language_other";
pub const LANGUAGE_OTHER_INPUT: &str = "language_other_input";
pub const HEARD_AT_BLOCK: &str = "heard_at";
pub const HEARD_AT_INPUT: &str = "heard_at_input";
pub const METHOD_BLOCK: &str = "determination_method";
pub const METHOD_INPUT: &str = "determination_method_input";
pub const METHOD_OTHER_BLOCK: &str = "determination_method_other";
pub const METHOD_OTHER_INPUT: &str = "determination_method_other_input";

pub const METHOD_HEARD_SPOKEN: &str = "heard_spoken";
pub const METHOD_ASKED_SPEAKER: &str = "asked_speaker";
pub const METHOD_SAW_WRITTEN: &str = "saw_written";
pub const METHOD_OTHER: &str = "other";

const GENERAL_AREAS: &[(&str, &str)] = &[
    ("downtown", "Downtown"),
    ("residential", "Residential neighborhood"),
    ("campus", "Campus"),
    ("transit", "Public transit"),
    ("market", "Market or shopping area"),
    ("park", "Park or outdoor space"),
    ("other", "Other"),
];

const LANGUAGES: &[(&str, &str)] = &[
    ("spanish", "Spanish"),
    ("mandarin", "Mandarin"),
    ("cantonese", "Cantonese"),
    ("arabic", "Arabic"),
    ("french", "French"),
    ("hindi", "Hindi"),
    ("korean", "Korean"),
    ("vietnamese", "Vietnamese"),
    ("other", "Other"),
];

const METHODS: &[(&str, &str)] = &[
    (METHOD_HEARD_SPOKEN, "I heard it spoken"),
    (METHOD_ASKED_SPEAKER, "I asked the speaker"),
    (METHOD_SAW_WRITTEN, "I saw it written"),
    (METHOD_OTHER, "Other"),
];

/// The four "how did you determine the language" checkboxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeterminationMethods {
    pub heard_spoken: bool,
    pub asked_speaker: bool,
    pub saw_written: bool,
    pub other: bool,
}

/// Answers read from a submitted form. `None` means the submission didn't carry the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyAnswers {
    pub general_area: Option<String>,
    pub general_area_other: Option<String>,
    pub exact_location: Option<String>,
    pub language: Option<String>,
    pub language_other: Option<String>,
    pub heard_at: Option<i64>,
    pub methods: Option<DeterminationMethods>,
    pub method_other_details: Option<String>,
}

impl SurveyAnswers {
    /// Read the answers out of a form state. Missing or empty inputs stay `None`.
    pub fn extract(state: &FormState) -> Self {
        let text = |block: &str, action: &str| {
            state
                .field(block, action)
                .and_then(|field| field.value.as_deref())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let selected = |block: &str, action: &str| {
            state
                .field(block, action)
                .and_then(|field| field.selected_option.as_ref())
                .map(|option| option.value.clone())
                .filter(|value| !value.is_empty())
        };

        // A checkbox group with nothing ticked still reports `selected_options: []`,
        // so the group being present is what makes the flags answered.
        let methods = state.field(METHOD_BLOCK, METHOD_INPUT).map(|field| {
            let chosen: Vec<&str> = field
                .selected_options
                .iter()
                .flatten()
                .map(|option| option.value.as_str())
                .collect();
            DeterminationMethods {
                heard_spoken: chosen.contains(&METHOD_HEARD_SPOKEN),
                asked_speaker: chosen.contains(&METHOD_ASKED_SPEAKER),
                saw_written: chosen.contains(&METHOD_SAW_WRITTEN),
                other: chosen.contains(&METHOD_OTHER),
            }
        });

        Self {
            general_area: selected(GENERAL_AREA_BLOCK, GENERAL_AREA_INPUT),
            general_area_other: text(GENERAL_AREA_OTHER_BLOCK, GENERAL_AREA_OTHER_INPUT),
            exact_location: text(EXACT_LOCATION_BLOCK, EXACT_LOCATION_INPUT),
            language: selected(LANGUAGE_BLOCK, LANGUAGE_INPUT),
            language_other: text(LANGUAGE_OTHER_BLOCK, LANGUAGE_OTHER_INPUT),
            heard_at: state
                .field(HEARD_AT_BLOCK, HEARD_AT_INPUT)
                .and_then(|field| field.selected_date_time),
            methods,
            method_other_details: text(METHOD_OTHER_BLOCK, METHOD_OTHER_INPUT),
        }
    }

    /// Column assignments for the answers that are present.
    pub fn assignments(&self) -> Vec<(&'static str, SqlParam)> {
        let mut columns = Vec::new();
        let mut push = |column: &'static str, value: Option<SqlParam>| {
            if let Some(value) = value {
                columns.push((column, value));
            }
        };

        push("general_area", self.general_area.clone().map(SqlParam::Text));
        push(
            "general_area_other",
            self.general_area_other.clone().map(SqlParam::Text),
        );
        push("exact_location", self.exact_location.clone().map(SqlParam::Text));
        push("language", self.language.clone().map(SqlParam::Text));
        push("language_other", self.language_other.clone().map(SqlParam::Text));
        push("heard_at", self.heard_at.map(SqlParam::Int));
        if let Some(methods) = self.methods {
            push("method_heard_spoken", Some(SqlParam::Bool(methods.heard_spoken)));
            push("method_asked_speaker", Some(SqlParam::Bool(methods.asked_speaker)));
            push("method_saw_written", Some(SqlParam::Bool(methods.saw_written)));
            push("method_other", Some(SqlParam::Bool(methods.other)));
        }
        push(
            "method_other_details",
            self.method_other_details.clone().map(SqlParam::Text),
        );

        columns
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }
}

/// Human label for a stored option value, falling back to the value itself.
pub fn option_label(value: &str) -> &str {
    GENERAL_AREAS
        .iter()
        .chain(LANGUAGES)
        .find(|(option, _)| *option == value)
        .map(|(_, label)| *label)
        .unwrap_or(value)
}

fn options(choices: &[(&str, &str)]) -> Vec<Value> {
    choices
        .iter()
        .map(|(value, label)| {
            json!({
                "text": {"type": "plain_text", "text": label},
                "value": value,
            })
        })
        .collect()
}

fn text_input(block_id: &str, action_id: &str, label: &str, hint: &str) -> Value {
    json!({
        "type": "input",
        "block_id": block_id,
        "optional": true,
        "label": {"type": "plain_text", "text": label},
        "hint": {"type": "plain_text", "text": hint},
        "element": {"type": "plain_text_input", "action_id": action_id},
    })
}

fn select_input(block_id: &str, action_id: &str, label: &str, choices: &[(&str, &str)]) -> Value {
    json!({
        "type": "input",
        "block_id": block_id,
        "optional": true,
        "label": {"type": "plain_text", "text": label},
        "element": {
            "type": "static_select",
            "action_id": action_id,
            "placeholder": {"type": "plain_text", "text": "Choose one"},
            "options": options(choices),
        },
    })
}

/// Block Kit blocks for the report form.
pub fn form_blocks() -> Vec<Value> {
    vec![
        json!({
            "type": "header",
            "text": {"type": "plain_text", "text": "Language report"},
        }),
        select_input(
            GENERAL_AREA_BLOCK,
            GENERAL_AREA_INPUT,
            "Where were you, generally?",
            GENERAL_AREAS,
        ),
        text_input(
            GENERAL_AREA_OTHER_BLOCK,
            GENERAL_AREA_OTHER_INPUT,
            "If you picked \"Other\", describe the area",
            "Leave blank otherwise",
        ),
        text_input(
            EXACT_LOCATION_BLOCK,
            EXACT_LOCATION_INPUT,
            "Exact location",
            "Street corner, building, or landmark",
        ),
        select_input(
            LANGUAGE_BLOCK,
            LANGUAGE_INPUT,
            "Which language did you hear?",
            LANGUAGES,
        ),
        text_input(
            LANGUAGE_OTHER_BLOCK,
            LANGUAGE_OTHER_INPUT,
            "If you picked \"Other\", name the language",
            "Leave blank otherwise",
        ),
        json!({
            "type": "input",
            "block_id": HEARD_AT_BLOCK,
            "optional": true,
            "label": {"type": "plain_text", "text": "When did you hear it?"},
            "element": {"type": "datetimepicker", "action_id": HEARD_AT_INPUT},
        }),
        json!({
            "type": "input",
            "block_id": METHOD_BLOCK,
            "optional": true,
            "label": {"type": "plain_text", "text": "How did you determine the language?"},
            "element": {
                "type": "checkboxes",
                "action_id": METHOD_INPUT,
                "options": options(METHODS),
            },
        }),
        text_input(
            METHOD_OTHER_BLOCK,
            METHOD_OTHER_INPUT,
            "If you picked \"Other\", how did you determine it?",
            "Leave blank otherwise",
        ),
        json!({
            "type": "actions",
            "block_id": "submit",
            "elements": [{
                "type": "button",
                "action_id": SUBMIT_REPORT_ACTION,
                "style": "primary",
                "text": {"type": "plain_text", "text": "Submit report"},
                "value": "submit",
            }],
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(values: Value) -> FormState {
        serde_json::from_value(json!({ "values": values })).expect("state should decode")
    }

    #[test]
    fn extracts_every_field_type() {
        let answers = SurveyAnswers::extract(&state(json!({
            GENERAL_AREA_BLOCK: {GENERAL_AREA_INPUT: {"type": "static_select", "selected_option": {"value": "transit"}}},
            EXACT_LOCATION_BLOCK: {EXACT_LOCATION_INPUT: {"type": "plain_text_input", "value": "  Red line, Park St  "}},
            LANGUAGE_BLOCK: {LANGUAGE_INPUT: {"type": "static_select", "selected_option": {"value": "other"}}},
            LANGUAGE_OTHER_BLOCK: {LANGUAGE_OTHER_INPUT: {"type": "plain_text_input", "value": "Haitian Creole"}},
            HEARD_AT_BLOCK: {HEARD_AT_INPUT: {"type": "datetimepicker", "selected_date_time": 1741722179}},
            METHOD_BLOCK: {METHOD_INPUT: {"type": "checkboxes", "selected_options": [
                {"value": METHOD_HEARD_SPOKEN}, {"value": METHOD_ASKED_SPEAKER}
            ]}},
        })));

        assert_eq!(answers.general_area.as_deref(), Some("transit"));
        assert_eq!(answers.exact_location.as_deref(), Some("Red line, Park St"));
        assert_eq!(answers.language.as_deref(), Some("other"));
        assert_eq!(answers.language_other.as_deref(), Some("Haitian Creole"));
        assert_eq!(answers.heard_at, Some(1_741_722_179));
        assert_eq!(
            answers.methods,
            Some(DeterminationMethods {
                heard_spoken: true,
                asked_speaker: true,
                saw_written: false,
                other: false,
            })
        );
        assert_eq!(answers.general_area_other, None);
    }

    #[test]
    fn empty_inputs_are_absent_not_errors() {
        let answers = SurveyAnswers::extract(&state(json!({
            EXACT_LOCATION_BLOCK: {EXACT_LOCATION_INPUT: {"type": "plain_text_input", "value": null}},
            LANGUAGE_BLOCK: {LANGUAGE_INPUT: {"type": "static_select", "selected_option": null}},
            "unrelated": {"whatever": {"value": "x"}},
        })));

        assert!(answers.is_empty(), "expected no answers, got {answers:?}");
    }

    #[test]
    fn unticked_checkboxes_still_answer_the_flags() {
        let answers = SurveyAnswers::extract(&state(json!({
            METHOD_BLOCK: {METHOD_INPUT: {"type": "checkboxes", "selected_options": []}},
        })));

        let columns: Vec<&str> = answers.assignments().iter().map(|(column, _)| *column).collect();
        assert_eq!(
            columns,
            vec![
                "method_heard_spoken",
                "method_asked_speaker",
                "method_saw_written",
                "method_other"
            ]
        );
        assert!(
            answers
                .assignments()
                .iter()
                .all(|(_, value)| *value == SqlParam::Bool(false))
        );
    }

    #[test]
    fn form_blocks_use_the_extraction_identifiers() {
        let blocks = form_blocks();
        let block_ids: Vec<&str> = blocks
            .iter()
            .filter_map(|block| block["block_id"].as_str())
            .collect();

        for expected in [
            GENERAL_AREA_BLOCK,
            GENERAL_AREA_OTHER_BLOCK,
            EXACT_LOCATION_BLOCK,
            LANGUAGE_BLOCK,
            LANGUAGE_OTHER_BLOCK,
            HEARD_AT_BLOCK,
            METHOD_BLOCK,
            METHOD_OTHER_BLOCK,
        ] {
            assert!(block_ids.contains(&expected), "missing block {expected}");
        }
        let submit = blocks.last().expect("form has blocks");
        assert_eq!(submit["elements"][0]["action_id"], SUBMIT_REPORT_ACTION);
    }

    #[test]
    fn option_labels_fall_back_to_raw_value() {
        assert_eq!(option_label("transit"), "Public transit");
        assert_eq!(option_label("klingon"), "klingon");
    }
}
