//! Synthetic domain suffix appended to host names, e.g. `.{project_slug}.gcp`.
//!
//! Placeholders are `{project_id}`, `{project_name}`, `{project_slug}` and
//! `{zone}`; `{{` and `}}` stand for literal braces.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::{Project, Zone};

pub const DEFAULT_TLD_FORMAT: &str = ".{project_slug}.gcp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    ProjectId,
    ProjectName,
    ProjectSlug,
    Zone,
}

impl FromStr for Key {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_id" => Ok(Key::ProjectId),
            "project_name" => Ok(Key::ProjectName),
            "project_slug" => Ok(Key::ProjectSlug),
            "zone" => Ok(Key::Zone),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Key(Key),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TldFormat {
    source: String,
    pieces: Vec<Piece>,
}

impl TldFormat {
    pub fn format(&self, project: &Project, zone: &Zone) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Key(Key::ProjectId) => out.push_str(&project.id),
                Piece::Key(Key::ProjectName) => out.push_str(&project.name),
                Piece::Key(Key::ProjectSlug) => out.push_str(&project.slug()),
                Piece::Key(Key::Zone) => out.push_str(&zone.0),
            }
        }
        out
    }
}

impl Default for TldFormat {
    fn default() -> Self {
        TldFormat {
            source: DEFAULT_TLD_FORMAT.to_string(),
            pieces: vec![
                Piece::Literal(".".to_string()),
                Piece::Key(Key::ProjectSlug),
                Piece::Literal(".gcp".to_string()),
            ],
        }
    }
}

impl FromStr for TldFormat {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| Error::InvalidTldFormat {
            format: source.to_string(),
            reason,
        };

        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(invalid("single '}' encountered")),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(invalid("unclosed '{'")),
                        }
                    }
                    let key = name.parse().map_err(|_| Error::UnknownTldKey {
                        format: source.to_string(),
                        key: name.clone(),
                    })?;
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Key(key));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(TldFormat {
            source: source.to_string(),
            pieces,
        })
    }
}

impl fmt::Display for TldFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}
