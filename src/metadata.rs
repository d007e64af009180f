use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::{Regex, RegexBuilder};

pub(crate) const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\A---\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n(.*))?\z")
        .dot_matches_new_line(true)
        .build()
        .expect("front-matter pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Post {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub created: DateTime<Utc>,
    pub edited: Option<DateTime<Utc>>,
    pub body: String,
    /// Source file, its stem is the slug.
    pub path: PathBuf,
}

impl Post {
    pub fn load(path: &Path) -> anyhow::Result<Post> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("while reading {path:?}"))?;
        Post::parse(path, &content).with_context(|| format!("while parsing {path:?}"))
    }

    pub fn parse(path: &Path, content: &str) -> anyhow::Result<Post> {
        let slug = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .context("post file has no name")?;

        let Some(caps) = FRONT_MATTER.captures(content) else {
            bail!("missing front-matter block");
        };

        let mut title = None;
        let mut description = String::new();
        let mut keywords = vec![];
        let mut created = None;
        let mut edited = None;

        for line in caps[1].lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                bail!("Invalid header: {}", line);
            };

            let value = value.trim();
            match name.trim() {
                "title" => title = Some(value.to_string()),
                "description" => description = value.to_string(),
                "keywords" | "tags" | "tag" => keywords = parse_keywords(value),
                "created" | "date" => created = Some(parse_time(value)?),
                "edited" => edited = Some(parse_time(value)?),
                _ => {}
            }
        }

        let title = match title {
            Some(t) if !t.is_empty() => t,
            _ => bail!("post title cannot be empty"),
        };
        let created = created.context("post has no creation time")?;
        let body = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .trim()
            .to_string();
        if body.is_empty() {
            bail!("post content cannot be empty");
        }

        Ok(Post {
            slug,
            title,
            description,
            keywords,
            created,
            edited,
            body,
            path: path.to_path_buf(),
        })
    }

    /// Front-matter followed by the markdown body, as stored on disk.
    pub fn to_document(&self) -> String {
        let edited = self
            .edited
            .map(|e| format!("edited: {}\n", e.format(TIME_FORMAT)))
            .unwrap_or_default();
        format!(
            "---\ntitle: {}\ndescription: {}\nkeywords: {}\ncreated: {}\n{edited}---\n\n{}\n",
            single_line(&self.title),
            single_line(&self.description),
            self.keywords.join(", "),
            self.created.format(TIME_FORMAT),
            self.body,
        )
    }

    pub fn last_change(&self) -> DateTime<Utc> {
        self.edited.unwrap_or(self.created)
    }
}

/// Comma separated, ASCII-folded, lowercased, deduplicated in input order.
pub(crate) fn parse_keywords(value: &str) -> Vec<String> {
    let mut keywords: Vec<String> = vec![];
    for k in value.split(',') {
        let k = deunicode::deunicode(k.trim()).to_lowercase();
        if !k.is_empty() && !keywords.contains(&k) {
            keywords.push(k);
        }
    }
    keywords
}

pub(crate) fn parse_time(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(t) = NaiveDateTime::parse_from_str(value, TIME_FORMAT) {
        return Ok(t.and_utc());
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .with_context(|| format!("Invalid time format: {value:?}"))
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
