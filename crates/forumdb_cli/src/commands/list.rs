//! List command implementation.

use super::open_forum;
use clap::ValueEnum;
use std::path::Path;

/// What the list command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    /// All categories
    Categories,
    /// Topics, optionally of one category
    Topics,
    /// Replies, optionally to one topic
    Replies,
}

/// Runs the list command.
///
/// `filter` is a category id for topics and a topic id for replies.
pub fn run(
    path: &Path,
    kind: ListKind,
    filter: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let forum = open_forum(path)?;
    let json = format == "json";

    match kind {
        ListKind::Categories => {
            let categories = forum.list_categories()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for (id, cat) in &categories {
                    println!("{id}  {}  ({} topics)", cat.name, cat.topics.len());
                }
            }
        }
        ListKind::Topics => {
            let topics = match filter {
                Some(category) => forum.list_topics_of(category)?,
                None => forum.list_all_topics()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&topics)?);
            } else {
                for (id, topic) in &topics {
                    println!("{id}  [{}]  {}", topic.category, topic.title);
                }
            }
        }
        ListKind::Replies => {
            let replies = match filter {
                Some(topic) => forum.all_replies_of(topic)?,
                None => forum.list_all_replies()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&replies)?);
            } else {
                for (id, reply) in &replies {
                    println!("{id}  -> {}  {}", reply.to, reply.body);
                }
            }
        }
    }

    forum.close()?;
    Ok(())
}
