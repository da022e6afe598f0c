use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use futures::future::try_join_all;

use crate::config;
use crate::model::fields::{FieldItem, FieldMapping, OPTION_WEIGHTS, PLACEHOLDER_ID};
use crate::providers::favro::{CustomField, FavroClient};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Serve,
    /// List custom fields, or print mappings for the given field ids.
    Fields(Vec<String>),
    Help,
}

/// Parse command-line arguments (without the program name).
///
/// Supported forms:
///   rice-calculator
///   rice-calculator serve
///   rice-calculator fields
///   rice-calculator fields <customFieldId>...
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Command::Serve);
    };

    match first.as_str() {
        "serve" => {
            if !rest.is_empty() {
                bail!("serve takes no arguments\n\n{}", usage());
            }
            Ok(Command::Serve)
        }
        "fields" => {
            for id in rest {
                if id.is_empty() || id == PLACEHOLDER_ID || id.contains("CustomFieldId") {
                    bail!("{id:?} needs to be replaced with an id listed by `rice-calculator fields`");
                }
            }
            Ok(Command::Fields(rest.to_vec()))
        }
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => bail!("Unknown command: {other}\n\n{}", usage()),
    }
}

/// Discovery helper for filling in the field mapping.
pub async fn handle_fields(ids: &[String]) -> Result<()> {
    let api = config::load_api_config().context("Favro API settings are incomplete")?;
    let client = FavroClient::new(&api);

    if ids.is_empty() {
        let page = client.list_custom_fields().await?;
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    let fields = try_join_all(ids.iter().map(|id| client.get_custom_field(id))).await?;
    for field in &fields {
        println!("{}", render_mapping(field)?);
    }
    Ok(())
}

/// TOML block for `field`, weighting options by position.
pub fn render_mapping(field: &CustomField) -> Result<String> {
    let extra = field.custom_field_items.len().saturating_sub(OPTION_WEIGHTS.len());
    if extra > 0 {
        eprintln!(
            "{}: {extra} option(s) past the fifth have no weight and were left out",
            field.name
        );
    }

    let mapping = FieldMapping {
        custom_field_id: field.custom_field_id.clone(),
        items: field
            .custom_field_items
            .iter()
            .zip(OPTION_WEIGHTS)
            .map(|(item, value)| FieldItem {
                id: item.custom_field_item_id.clone(),
                value,
            })
            .collect(),
    };

    let key = table_key(&field.name, &field.custom_field_id);
    let table = BTreeMap::from([(key, mapping)]);
    let body = toml::to_string(&table).context("Failed to render field mapping")?;

    let mut labels = String::new();
    for (item, value) in field.custom_field_items.iter().zip(OPTION_WEIGHTS) {
        labels.push_str(&format!("# {value} = {}\n", item.name));
    }
    Ok(format!("# {}\n{labels}{body}", field.name))
}

fn table_key(name: &str, fallback: &str) -> String {
    let key: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if key.trim_matches('_').is_empty() {
        fallback.to_string()
    } else {
        key
    }
}

fn usage() -> String {
    [
        "rice-calculator: keeps Favro RICE scores up to date\n",
        "USAGE:",
        "  rice-calculator                    Listen for Favro webhooks",
        "  rice-calculator serve              Same as above",
        "  rice-calculator fields             List the organization's custom fields",
        "  rice-calculator fields <id>...     Print field mappings for the given field ids",
        "",
        "ENVIRONMENT:",
        "  FAVRO_URL, FAVRO_CALCULATOR_USER, FAVRO_CALCULATOR_TOKEN, FAVRO_ORG_ID",
        "  FAVRO_WEBHOOK_URL, FAVRO_WEBHOOK_SECRET_KEY, FAVRO_FIELDS_PATH",
        "  FAVRO_PUBLISH_ATTEMPTS, FAVRO_PUBLISH_TIMEOUT_SECS, FAVRO_PUBLISH_BACKOFF_MS",
    ]
    .join("\n")
}

pub fn print_help() {
    println!("{}", usage());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::favro::CustomFieldItem;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    fn field(name: &str, items: &[(&str, &str)]) -> CustomField {
        CustomField {
            custom_field_id: "field-1".into(),
            name: name.into(),
            custom_field_items: items
                .iter()
                .map(|(id, name)| CustomFieldItem {
                    custom_field_item_id: (*id).into(),
                    name: (*name).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn no_args_serves() {
        assert_eq!(parse_args(&args(&[])).unwrap(), Command::Serve);
        assert_eq!(parse_args(&args(&["serve"])).unwrap(), Command::Serve);
    }

    #[test]
    fn parse_fields_with_and_without_ids() {
        assert_eq!(
            parse_args(&args(&["fields"])).unwrap(),
            Command::Fields(vec![])
        );
        assert_eq!(
            parse_args(&args(&["fields", "abc", "def"])).unwrap(),
            Command::Fields(args(&["abc", "def"]))
        );
    }

    #[test]
    fn parse_rejects_placeholder_ids() {
        let err = parse_args(&args(&["fields", "reachCustomFieldId"])).unwrap_err();
        assert!(err.to_string().contains("needs to be replaced"));
        assert!(parse_args(&args(&["fields", PLACEHOLDER_ID])).is_err());
    }

    #[test]
    fn parse_help_flags() {
        for flag in ["help", "-h", "--help"] {
            assert_eq!(parse_args(&args(&[flag])).unwrap(), Command::Help);
        }
    }

    #[test]
    fn parse_unknown_command_fails() {
        let err = parse_args(&args(&["recalc"])).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
        assert!(parse_args(&args(&["serve", "now"])).is_err());
    }

    #[test]
    fn mapping_weights_follow_option_order() {
        let rendered = render_mapping(&field(
            "Reach",
            &[("o1", "None"), ("o2", "Minority"), ("o3", "Some")],
        ))
        .unwrap();

        let parsed: BTreeMap<String, FieldMapping> = toml::from_str(&rendered).unwrap();
        let reach = &parsed["reach"];
        assert_eq!(reach.custom_field_id, "field-1");
        assert_eq!(reach.weight_of("o1"), Some(1.0));
        assert_eq!(reach.weight_of("o2"), Some(3.0));
        assert_eq!(reach.weight_of("o3"), Some(5.0));
        assert!(rendered.contains("# 3 = Minority"));
    }

    #[test]
    fn mapping_drops_options_past_the_fifth() {
        let items: Vec<(String, String)> = (1..=7)
            .map(|i| (format!("o{i}"), format!("Option {i}")))
            .collect();
        let refs: Vec<(&str, &str)> = items.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let rendered = render_mapping(&field("Effort", &refs)).unwrap();

        let parsed: BTreeMap<String, FieldMapping> = toml::from_str(&rendered).unwrap();
        let effort = &parsed["effort"];
        assert_eq!(effort.items.len(), 5);
        assert_eq!(effort.weight_of("o5"), Some(10.0));
        assert_eq!(effort.weight_of("o6"), None);
    }

    #[test]
    fn table_key_sanitizes_names() {
        assert_eq!(table_key("Confidence", "id"), "confidence");
        assert_eq!(table_key("RICE score", "id"), "rice_score");
        assert_eq!(table_key("  ", "id"), "id");
    }
}
