use serde::Serialize;

use crate::config::{Config, Theme};

#[derive(Serialize, Debug)]
pub(super) struct SiteData<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub blog: &'a str,
    pub website: &'a str,
    pub source: &'a str,
    pub visitor_count: &'a str,
    pub comment: &'a str,
    pub author: &'a str,
    pub locale: &'a str,
    pub license: &'a str,
    pub rss: &'a str,
    pub atom: &'a str,
    pub styles: String,
    pub theme: &'a Theme,
    pub recent_title_trunc: usize,
    pub version: &'static str,
}

impl<'a> SiteData<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            title: &config.title,
            description: &config.description,
            blog: &config.blog,
            website: &config.website,
            source: &config.source,
            visitor_count: &config.visitor_count,
            comment: &config.comment,
            author: &config.author,
            locale: &config.locale,
            license: &config.license,
            rss: &config.rss_file,
            atom: &config.atom_file,
            styles: format!("{}/styles.min.css", config.assets_dir),
            theme: &config.theme,
            recent_title_trunc: config.recent_title_trunc,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct PostLink<'a> {
    pub href: String,
    pub title: &'a str,
    pub created: String,
}

#[derive(Serialize, Debug)]
pub(super) struct KeywordLink<'a> {
    pub href: String,
    pub name: &'a str,
}

#[derive(Serialize, Debug)]
pub(super) struct PostPageData<'a> {
    pub site: &'a SiteData<'a>,
    pub path: String,
    pub keywords: String,
    pub title: &'a str,
    pub description: &'a str,
    pub created: String,
    pub edited: Option<String>,
    pub read_time: &'a str,
    pub keyword_links: Vec<KeywordLink<'a>>,
    pub body: &'a str,
}

/// Home page and keyword pages.
#[derive(Serialize, Debug)]
pub(super) struct ListPageData<'a> {
    pub site: &'a SiteData<'a>,
    pub path: String,
    pub keywords: String,
    pub title: String,
    pub description: String,
    pub latest: Option<PostLink<'a>>,
    pub posts: Vec<PostLink<'a>>,
}

#[derive(Serialize, Debug)]
pub(super) struct FeedItem<'a> {
    pub title: &'a str,
    pub link: String,
    pub description: &'a str,
    pub pub_date: String,
}

#[derive(Serialize, Debug)]
pub(super) struct FeedData<'a> {
    pub site: &'a SiteData<'a>,
    pub language: String,
    pub build_date: String,
    pub items: Vec<FeedItem<'a>>,
}

#[derive(Serialize, Debug)]
pub(super) struct SitemapUrl {
    pub loc: String,
    pub lastmod: String,
}

#[derive(Serialize, Debug)]
pub(super) struct SitemapData {
    pub urls: Vec<SitemapUrl>,
}

#[derive(Serialize, Debug)]
pub(super) struct RobotsData<'a> {
    pub assets_dir: &'a str,
    pub blog: &'a str,
}
