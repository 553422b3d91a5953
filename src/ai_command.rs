//! Turn a model reply into either a validated source-management command or
//! plain analysis text, and carry out the command against the registry.
//!
//! Classification is parse-then-validate: the reply is only a command if an
//! embedded JSON object parses *and* names a known action with every field
//! that action needs. Anything short of that is analysis, verbatim.

use serde::{Deserialize, Serialize};

use crate::sources::{search, NewSource, RegistryError, Source, SourceRegistry};

pub const MANAGE_SYSTEM_PROMPT: &str = r#"You are Oracle Flux, the manager of an RSS feed dashboard.
If the user asks to ADD, DELETE or SEARCH a feed source, reply ONLY with one JSON object:
{"action": "add" | "delete" | "search", "name": "source name (add/delete)", "url": "feed url (add/delete)", "keywords": "search terms (search)", "sector": "optional", "category": "optional"}
For any other request (summaries, trends, general questions) reply with plain-text analysis and no JSON."#;

pub const ANALYZE_SYSTEM_PROMPT: &str = "You are an expert RSS feed assistant. Analyze or summarize the articles or lists the user provides. Be concise, technical and relevant to the feeds.";

/// At most this many context entries are appended to a prompt.
pub const DIGEST_MAX_ENTRIES: usize = 5;

/// One line of article context sent along with a prompt.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DigestEntry {
    pub source_name: String,
    pub title: String,
}

/// Append a short digest of the first few context entries to the user's prompt.
pub fn build_prompt(prompt: &str, context: &[DigestEntry]) -> String {
    let prompt = prompt.trim();
    if context.is_empty() {
        return prompt.to_string();
    }
    let mut out = format!("{prompt}\n\nRecent articles:");
    for e in context.iter().take(DIGEST_MAX_ENTRIES) {
        out.push_str(&format!("\n- [{}] {}", e.source_name.trim(), e.title.trim()));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Add {
        name: String,
        url: String,
        sector: Option<String>,
        category: Option<String>,
    },
    Delete {
        name: Option<String>,
        url: Option<String>,
    },
    Search {
        keywords: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiReply {
    Command(Command),
    Analysis(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawCommand {
    action: Option<String>,
    name: Option<String>,
    url: Option<String>,
    keywords: Option<String>,
    sector: Option<String>,
    category: Option<String>,
}

fn filled(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RawCommand {
    fn validate(self) -> Option<Command> {
        let action = filled(self.action)?.to_ascii_lowercase();
        match action.as_str() {
            "add" => Some(Command::Add {
                name: filled(self.name)?,
                url: filled(self.url)?,
                sector: filled(self.sector),
                category: filled(self.category),
            }),
            "delete" => {
                let name = filled(self.name);
                let url = filled(self.url);
                if name.is_none() && url.is_none() {
                    return None;
                }
                Some(Command::Delete { name, url })
            }
            "search" => Some(Command::Search {
                keywords: filled(self.keywords)?,
            }),
            _ => None,
        }
    }
}

/// The outermost `{ ... }` span of the reply. Code fences around it are irrelevant.
fn locate_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

pub fn classify_reply(reply: &str) -> AiReply {
    let command = locate_json_object(reply)
        .and_then(|obj| serde_json::from_str::<RawCommand>(obj).ok())
        .and_then(RawCommand::validate);
    match command {
        Some(cmd) => AiReply::Command(cmd),
        None => AiReply::Analysis(reply.trim().to_string()),
    }
}

/// What `/api/ai/manage` answers with.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ManageOutcome {
    Added { success: String, source: Source },
    Removed { success: String, removed: Vec<Source> },
    Found { results: Vec<Source> },
    Analysis { analysis: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("no source matched the delete request")]
    NoMatch,
}

pub async fn execute(
    command: Command,
    registry: &SourceRegistry,
) -> Result<ManageOutcome, CommandError> {
    match command {
        Command::Add {
            name,
            url,
            sector,
            category,
        } => {
            let source = registry
                .create(NewSource {
                    name,
                    url,
                    sector,
                    category,
                })
                .await?;
            Ok(ManageOutcome::Added {
                success: format!("Source '{}' added.", source.name),
                source,
            })
        }
        Command::Delete { name, url } => {
            let removed = registry
                .delete_matching(name.as_deref(), url.as_deref())
                .await?;
            if removed.is_empty() {
                return Err(CommandError::NoMatch);
            }
            Ok(ManageOutcome::Removed {
                success: format!("{} source(s) removed.", removed.len()),
                removed,
            })
        }
        Command::Search { keywords } => {
            let all = registry.read_all().await?;
            Ok(ManageOutcome::Found {
                results: search(&all, &keywords),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prose_is_analysis() {
        let r = classify_reply("  Tech feeds are dominated by AI news today.  ");
        assert_eq!(
            r,
            AiReply::Analysis("Tech feeds are dominated by AI news today.".into())
        );
    }

    #[test]
    fn fenced_add_command_is_parsed() {
        let reply = "```json\n{\"action\": \"add\", \"name\": \"Rust Blog\", \"url\": \"https://blog.rust-lang.org/feed.xml\"}\n```";
        assert_eq!(
            classify_reply(reply),
            AiReply::Command(Command::Add {
                name: "Rust Blog".into(),
                url: "https://blog.rust-lang.org/feed.xml".into(),
                sector: None,
                category: None,
            })
        );
    }

    #[test]
    fn action_is_case_insensitive() {
        let r = classify_reply(r#"{"action": "SEARCH", "keywords": "finance"}"#);
        assert_eq!(
            r,
            AiReply::Command(Command::Search {
                keywords: "finance".into()
            })
        );
    }

    #[test]
    fn incomplete_or_unknown_commands_are_analysis() {
        for reply in [
            r#"{"action": "add", "name": "No url"}"#,
            r#"{"action": "delete"}"#,
            r#"{"action": "search", "keywords": "  "}"#,
            r#"{"action": "rename", "name": "x"}"#,
            r#"{"name": "no action"}"#,
            r#"{"action": "add", "name": "broken", "url": "#,
            r#"{"action": 42}"#,
        ] {
            assert_eq!(
                classify_reply(reply),
                AiReply::Analysis(reply.trim().to_string()),
                "{reply}"
            );
        }
    }

    #[test]
    fn delete_needs_name_or_url() {
        let r = classify_reply(r#"{"action": "delete", "url": "https://a.org/rss"}"#);
        assert_eq!(
            r,
            AiReply::Command(Command::Delete {
                name: None,
                url: Some("https://a.org/rss".into())
            })
        );
    }

    #[test]
    fn digest_is_capped() {
        let ctx: Vec<_> = (0..8)
            .map(|i| DigestEntry {
                source_name: format!("S{i}"),
                title: format!("T{i}"),
            })
            .collect();
        let p = build_prompt("Summarize", &ctx);
        assert!(p.starts_with("Summarize\n\nRecent articles:"));
        assert_eq!(p.matches("\n- [").count(), DIGEST_MAX_ENTRIES);
        assert!(p.contains("- [S4] T4"));
        assert!(!p.contains("T5"));
        assert_eq!(build_prompt(" plain ", &[]), "plain");
    }

    #[tokio::test]
    async fn execute_add_delete_search() {
        let dir = tempfile::tempdir().unwrap();
        let reg = SourceRegistry::new(dir.path().join("s.json"));

        let added = execute(
            Command::Add {
                name: "Rust Blog".into(),
                url: "https://blog.rust-lang.org/feed.xml".into(),
                sector: Some("tech".into()),
                category: None,
            },
            &reg,
        )
        .await
        .unwrap();
        assert!(matches!(added, ManageOutcome::Added { ref source, .. } if source.id == 1));

        let found = execute(
            Command::Search {
                keywords: "tech".into(),
            },
            &reg,
        )
        .await
        .unwrap();
        assert!(matches!(found, ManageOutcome::Found { ref results } if results.len() == 1));

        let gone = execute(
            Command::Delete {
                name: Some("rust blog".into()),
                url: None,
            },
            &reg,
        )
        .await
        .unwrap();
        assert!(matches!(gone, ManageOutcome::Removed { ref removed, .. } if removed.len() == 1));

        let again = execute(
            Command::Delete {
                name: Some("rust blog".into()),
                url: None,
            },
            &reg,
        )
        .await;
        assert!(matches!(again, Err(CommandError::NoMatch)));
    }

    #[test]
    fn outcomes_serialize_flat() {
        let v = serde_json::to_value(ManageOutcome::Analysis {
            analysis: "text".into(),
        })
        .unwrap();
        assert_eq!(v, serde_json::json!({"analysis": "text"}));
    }
}
