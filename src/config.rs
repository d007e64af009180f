use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::markdown::Extension;

pub(crate) const CONFIG_FILE: &str = "blog.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub(crate) struct Config {
    pub title: String,
    pub header: String,
    pub description: String,

    /// Directory holding the `<slug>.md` post sources.
    pub posts_source: PathBuf,
    pub output_dir: PathBuf,
    /// URL prefix of post pages inside the site.
    pub posts_dir: String,
    pub assets_dir: String,
    pub rss_file: String,
    pub atom_file: String,

    pub blog_keywords: Vec<String>,
    pub default_keywords: Vec<String>,

    pub website: String,
    pub blog: String,
    pub source: String,
    pub visitor_count: String,
    pub comment: String,

    pub author: String,
    pub locale: String,
    pub license: String,

    pub recents: usize,
    pub recent_title_trunc: usize,
    pub post_preview_size: usize,
    pub read_wpm: usize,

    pub markdown_extensions: Vec<Extension>,
    pub editor: Vec<String>,
    pub context_words: Vec<String>,
    pub wslug_limit: usize,
    pub slug_limit: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,

    pub theme: Theme,
    /// Merged over the generated `manifest.json`.
    pub manifest: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct Theme {
    pub primary: String,
    pub secondary: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: "#000".to_string(),
            secondary: "#fff".to_string(),
            kind: "dark".to_string(),
        }
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        let keywords = strings(&["blog", "blog page", "blog post", "personal", "website"]);
        let manifest = match json!({
            "icons": [
                { "src": "/favicon.ico", "sizes": "128x128", "type": "image/png" },
            ],
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            title: "blog".to_string(),
            header: "blog".to_string(),
            description: "my blog page".to_string(),
            posts_source: PathBuf::from("posts"),
            output_dir: PathBuf::from("public"),
            posts_dir: "b".to_string(),
            assets_dir: "content".to_string(),
            rss_file: "rss.xml".to_string(),
            atom_file: "atom.xml".to_string(),
            blog_keywords: keywords.clone(),
            default_keywords: keywords,
            website: "https://example.com".to_string(),
            blog: "https://blog.example.com".to_string(),
            source: "/git".to_string(),
            visitor_count: "/visit".to_string(),
            comment: "/c".to_string(),
            author: "John Doe".to_string(),
            locale: "en_GB".to_string(),
            license: "GPL-3.0-or-later".to_string(),
            recents: 14,
            recent_title_trunc: 32,
            post_preview_size: 196,
            read_wpm: 150,
            markdown_extensions: vec![
                Extension::Strikethrough,
                Extension::Tables,
                Extension::Footnotes,
                Extension::Superscript,
                Extension::Subscript,
                Extension::Tasklists,
                Extension::Abbr,
                Extension::Titlelink,
            ],
            editor: strings(&["vim", "--", "%s"]),
            context_words: strings(&[
                "the", "a", "about", "etc", "on", "at", "in", "by", "its", "i", "to", "my", "of",
                "between", "because", "or", "how", "begin", "is", "this", "person", "important",
                "homework", "and", "cause", "what", "for", "with", "without", "using", "im",
            ]),
            wslug_limit: 10,
            slug_limit: 96,
            template_dir: None,
            theme: Theme::default(),
            manifest,
        }
    }
}

impl Config {
    /// Reads `path` when it exists, then applies `BLOG_NAME` / `BLOG_URL`.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let mut config = if path.exists() {
            info!("using {path:?} config");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("while reading {path:?}"))?;
            toml::from_str::<Config>(&content).with_context(|| format!("while parsing {path:?}"))?
        } else {
            info!("{path:?} does not exist, using the default config");
            Config::default()
        };

        if let Ok(name) = std::env::var("BLOG_NAME") {
            config.title = name;
        }
        if let Ok(url) = std::env::var("BLOG_URL") {
            config.blog = url;
        }
        config.blog = config.blog.trim_end_matches('/').to_string();

        Ok(config)
    }

    pub fn save(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            bail!("{path:?} already exists, pass --force to overwrite it");
        }
        let content = toml::to_string_pretty(self).context("while serializing config")?;
        std::fs::write(path, content).with_context(|| format!("while writing {path:?}"))?;
        info!("wrote default config to {path:?}");
        Ok(())
    }

    pub fn slugify(&self, title: &str) -> String {
        crate::slug::slugify(title, &self.context_words, self.wslug_limit, self.slug_limit)
    }
}
