//! Team, backlog, and board configuration documents.
//!
//! Builders here produce the JSON documents written to the remote system
//! and merge them with whatever the remote already holds. Sentinel
//! columns and the default swimlane are owned by the remote system and
//! are always carried over from the current layout.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::CoreError;

/// Work-item types whose cards get the extra display fields.
pub const CARD_WORK_ITEM_TYPES: [&str; 2] = [
    "Microsoft.VSTS.WorkItemTypes.UserStory",
    "Microsoft.VSTS.WorkItemTypes.Bug",
];

/// `(displayType, fieldIdentifier)` pairs added to every card.
pub const CARD_FIELDS: [(&str, &str); 6] = [
    ("core", "System.AreaPath"),
    ("core", "System.IterationPath"),
    ("additional", "System.CreatedBy"),
    ("additional", "System.AssignedTo"),
    ("additional", "System.State"),
    ("additional", "System.Tags"),
];

/// Backlog categories made visible on the team backlog.
pub const BACKLOG_CATEGORIES: [&str; 3] = [
    "Microsoft.EpicCategory",
    "Microsoft.FeatureCategory",
    "Microsoft.RequirementCategory",
];

/// `(rule name, priority, background, title color)`.
const PRIORITY_FILL_RULES: [(&str, u8, &str, &str); 3] = [
    ("Prioridade 1", 1, "#CC293D", "#FFFFFF"),
    ("Prioridade 2", 2, "#FF6600", "#FFFFFF"),
    ("Prioridade 3", 3, "#FFCC00", "#000000"),
];

/// `(tag, background, text color)`.
const TAG_COLORS: [(&str, &str, &str); 11] = [
    ("Bloqueado", "#808080", "#FFFFFF"),
    ("Angular", "#CC293D", "#FFFFFF"),
    ("C++", "#FFCC00", "#000000"),
    ("Kotlin", "#006600", "#FFFFFF"),
    ("RPA", "#90EE90", "#000000"),
    ("REPORTS", "#003366", "#FFFFFF"),
    ("FORMS", "#87CEEB", "#000000"),
    ("QUARKUS", "#800080", "#FFFFFF"),
    ("JAVA", "#FF6B6B", "#FFFFFF"),
    ("PL_SQL", "#404040", "#FFFFFF"),
    ("PHP", "#D3D3D3", "#000000"),
];

/// `(column name, mapped state)` between the sentinel columns.
const MIDDLE_COLUMNS: [(&str, &str); 5] = [
    ("Ready2Dev", "Approved"),
    ("Desenvolvimento", "Committed"),
    ("Developer", "Committed"),
    ("QA", "Committed"),
    ("Validated", "Done"),
];

/// Work-item types mapped in each column.
const COLUMN_WORK_ITEM_TYPES: [&str; 2] = ["Product Backlog Item", "Bug"];

/// `(swimlane name, hex color without '#')` below the default row.
const SWIMLANES: [(&str, &str); 3] = [
    ("Bug", "cc293d"),
    ("Demanda Expressa", "339933"),
    ("Projeto", "87ceeb"),
];

// ---------------------------------------------------------------------------
// Discovery heuristics
// ---------------------------------------------------------------------------

/// Whether `team_name` looks like the team the remote system creates with a
/// new project. Best effort: the remote names it after the project, with or
/// without a ` Team` suffix.
pub fn is_default_team(project_name: &str, team_name: &str) -> bool {
    team_name == project_name || team_name == format!("{project_name} Team")
}

/// Pick the board to configure: the first whose name mentions "Backlog"
/// or "Stories", otherwise the first board listed.
pub fn select_main_board<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut first = None;
    for name in names {
        if name.contains("Backlog") || name.contains("Stories") {
            return Some(name);
        }
        first.get_or_insert(name);
    }
    first
}

// ---------------------------------------------------------------------------
// Team settings
// ---------------------------------------------------------------------------

/// Classification path of the team's root iteration.
pub fn iteration_path(project_name: &str, team_name: &str) -> String {
    format!("\\{project_name}\\Iteration\\{team_name}")
}

/// Team settings pointing both backlog and default iteration at the team's
/// root iteration.
pub fn iteration_path_settings(project_name: &str, team_name: &str) -> Value {
    let path = iteration_path(project_name, team_name);
    json!({
        "backlogIteration": { "name": team_name, "path": path },
        "defaultIteration": { "name": team_name, "path": path },
    })
}

/// Team settings enabling the Epic, Feature, and Requirement backlogs.
pub fn backlog_visibility_settings() -> Value {
    let visibilities: Map<String, Value> = BACKLOG_CATEGORIES
        .iter()
        .map(|c| (c.to_string(), Value::Bool(true)))
        .collect();
    json!({ "backlogVisibilities": visibilities })
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Merge [`CARD_FIELDS`] into the card settings document.
///
/// Existing per-type field entries are kept in place; only fields not
/// already listed for a type are appended.
pub fn merge_card_fields(mut settings: Value) -> Result<Value, CoreError> {
    if settings.is_null() {
        settings = json!({});
    }
    let doc = settings
        .as_object_mut()
        .ok_or_else(|| CoreError::MalformedSettings("card settings is not an object".into()))?;

    let cards = doc
        .entry("cards")
        .or_insert_with(|| Value::Object(Map::new()));
    if cards.is_null() {
        *cards = Value::Object(Map::new());
    }
    let cards = cards
        .as_object_mut()
        .ok_or_else(|| CoreError::MalformedSettings("`cards` is not an object".into()))?;

    for work_item_type in CARD_WORK_ITEM_TYPES {
        let fields = cards
            .entry(work_item_type)
            .or_insert_with(|| Value::Array(Vec::new()));
        let fields = fields.as_array_mut().ok_or_else(|| {
            CoreError::MalformedSettings(format!("card fields for {work_item_type} is not a list"))
        })?;

        for (display_type, identifier) in CARD_FIELDS {
            let present = fields
                .iter()
                .any(|f| f.get("fieldIdentifier").and_then(Value::as_str) == Some(identifier));
            if !present {
                fields.push(json!({
                    "displayType": display_type,
                    "fieldIdentifier": identifier,
                }));
            }
        }
    }

    Ok(settings)
}

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Card rule document: priority fill colors and tag colors.
pub fn card_rule_settings() -> Value {
    let fill: Vec<Value> = PRIORITY_FILL_RULES
        .iter()
        .map(|(name, priority, background, title)| {
            json!({
                "name": name,
                "isEnabled": "true",
                "filter": format!("[Microsoft.VSTS.Common.Priority] = '{priority}'"),
                "settings": {
                    "background-color": background,
                    "title-color": title,
                },
            })
        })
        .collect();

    let tag_style: Vec<Value> = TAG_COLORS
        .iter()
        .map(|(name, background, color)| {
            json!({
                "name": name,
                "isEnabled": "true",
                "settings": {
                    "background-color": background,
                    "color": color,
                },
            })
        })
        .collect();

    json!({ "rules": { "fill": fill, "tagStyle": tag_style } })
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

fn column_of_type<'a>(columns: &'a [Value], column_type: &str) -> Option<&'a Value> {
    columns
        .iter()
        .find(|c| c.get("columnType").and_then(Value::as_str) == Some(column_type))
}

/// Replace the board's middle columns, keeping the remote's `incoming` and
/// `outgoing` columns exactly as returned.
pub fn replace_columns(current: &[Value]) -> Result<Vec<Value>, CoreError> {
    let incoming = column_of_type(current, "incoming").ok_or(CoreError::MissingColumn("incoming"))?;
    let outgoing = column_of_type(current, "outgoing").ok_or(CoreError::MissingColumn("outgoing"))?;

    let mut columns = Vec::with_capacity(MIDDLE_COLUMNS.len() + 2);
    columns.push(incoming.clone());
    for (name, state) in MIDDLE_COLUMNS {
        let mappings: Map<String, Value> = COLUMN_WORK_ITEM_TYPES
            .iter()
            .map(|wit| (wit.to_string(), Value::String(state.to_string())))
            .collect();
        columns.push(json!({
            "name": name,
            "itemLimit": 0,
            "stateMappings": mappings,
            "isSplit": false,
            "description": "",
            "columnType": "inProgress",
        }));
    }
    columns.push(outgoing.clone());
    Ok(columns)
}

// ---------------------------------------------------------------------------
// Swimlanes
// ---------------------------------------------------------------------------

/// The default row has no id, an empty id, or the nil GUID.
pub fn is_default_row(row: &Value) -> bool {
    match row.get("id") {
        None | Some(Value::Null) => true,
        Some(Value::String(id)) => id.is_empty() || Uuid::parse_str(id).is_ok_and(|u| u.is_nil()),
        Some(_) => false,
    }
}

/// Replace the board's swimlanes, keeping the default row.
pub fn replace_swimlanes(current: &[Value]) -> Result<Vec<Value>, CoreError> {
    let default_row = current
        .iter()
        .find(|r| is_default_row(r))
        .ok_or(CoreError::MissingDefaultSwimlane)?;

    let mut rows = Vec::with_capacity(SWIMLANES.len() + 1);
    rows.push(default_row.clone());
    rows.extend(
        SWIMLANES
            .iter()
            .map(|(name, color)| json!({ "name": name, "color": color })),
    );
    Ok(rows)
}
