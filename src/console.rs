use std::path::PathBuf;

use crate::types::{Category, Region, ThresholdRule};

/// A line typed into the console
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    SetToken(String),
    AddRule(ThresholdRule),
    /// 1-based, as listed by `/rules`
    RemoveRule(usize),
    ListRules,
    Exclude(String),
    Include(String),
    Refresh,
    Status,
    Report(PathBuf),
    Help,
    Quit,
}

pub const HELP: &[&str] = &[
    "  /token <token> - Set the auction site bearer token",
    "  /rule <region> <category> <min cost index> - Add a threshold rule",
    "  /unrule <n> - Remove rule n",
    "  /rules - List rules and exclusions",
    "  /exclude <item name> - Never bid on this item",
    "  /include <item name> - Bid on this item again",
    "  /refresh - Refresh now",
    "  /status - Show the last valued auctions",
    "  /report <file> - Price a pasted moon scan",
    "  /quit - Exit",
];

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let input = line.trim();
        let (command, rest) = input
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((input, ""));

        match command.to_lowercase().as_str() {
            "/token" => non_empty(rest, "/token <token>").map(|t| ConsoleCommand::SetToken(t.to_string())),
            "/rule" => parse_rule(rest).map(ConsoleCommand::AddRule),
            "/unrule" => rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(ConsoleCommand::RemoveRule)
                .ok_or_else(|| "usage: /unrule <n>, n as shown by /rules".to_string()),
            "/rules" => Ok(ConsoleCommand::ListRules),
            "/exclude" => non_empty(rest, "/exclude <item name>").map(|n| ConsoleCommand::Exclude(n.to_string())),
            "/include" => non_empty(rest, "/include <item name>").map(|n| ConsoleCommand::Include(n.to_string())),
            "/refresh" => Ok(ConsoleCommand::Refresh),
            "/status" => Ok(ConsoleCommand::Status),
            "/report" => non_empty(rest, "/report <file>").map(|p| ConsoleCommand::Report(PathBuf::from(p))),
            "/help" => Ok(ConsoleCommand::Help),
            "/quit" | "/exit" => Ok(ConsoleCommand::Quit),
            _ => Err(format!("unknown command {:?}, try /help", command)),
        }
    }
}

fn non_empty<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(rest)
    }
}

fn parse_rule(rest: &str) -> Result<ThresholdRule, String> {
    let usage = "usage: /rule <catch|querious> <metenox|athanor|skyhook> <min cost index>";
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let [region, category, min] = parts[..] else {
        return Err(usage.to_string());
    };

    let region = Region::parse(region).ok_or_else(|| format!("unknown region {:?}", region))?;
    let category = Category::parse(category).ok_or_else(|| format!("unknown category {:?}", category))?;
    let min_cost_index = min
        .parse::<f64>()
        .ok()
        .filter(|m| m.is_finite())
        .ok_or_else(|| format!("bad cost index {:?}", min))?;

    Ok(ThresholdRule {
        region,
        category,
        min_cost_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule() {
        assert_eq!(
            ConsoleCommand::parse("/rule catch metenox 3.5"),
            Ok(ConsoleCommand::AddRule(ThresholdRule {
                region: Region::Catch,
                category: Category::AutoExtractor,
                min_cost_index: 3.5,
            }))
        );
        assert!(ConsoleCommand::parse("/rule catch metenox").is_err());
        assert!(ConsoleCommand::parse("/rule delve metenox 1").is_err());
        assert!(ConsoleCommand::parse("/rule catch metenox NaN").is_err());
    }

    #[test]
    fn test_parse_names_keep_spaces() {
        assert_eq!(
            ConsoleCommand::parse("/exclude  K-6K16 VII - Moon 1 "),
            Ok(ConsoleCommand::Exclude("K-6K16 VII - Moon 1".to_string()))
        );
        assert!(ConsoleCommand::parse("/include").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(ConsoleCommand::parse("/REFRESH"), Ok(ConsoleCommand::Refresh));
        assert_eq!(ConsoleCommand::parse("/unrule 2"), Ok(ConsoleCommand::RemoveRule(2)));
        assert!(ConsoleCommand::parse("/unrule 0").is_err());
        assert_eq!(
            ConsoleCommand::parse("/token abc"),
            Ok(ConsoleCommand::SetToken("abc".to_string()))
        );
        assert!(ConsoleCommand::parse("hello").is_err());
    }
}
