use std::{collections::BTreeMap, fmt, time::Instant};

use anyhow::{bail, Context as _};
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    content::load_posts,
    context::Context,
    markdown::read_time,
    metadata::Post,
    slug::AnchorState,
};

use data::{KeywordLink, ListPageData, PostLink, PostPageData, SiteData};
use utils::{gmt, minify_html, trunc, write_file};

mod api;
mod assets;
mod data;
mod feeds;
pub(crate) mod utils;

#[derive(Debug)]
pub(crate) struct RenderedPost {
    pub post: Post,
    pub html: String,
    pub plaintext: String,
    pub read_time: String,
}

impl RenderedPost {
    pub fn excerpt(&self, length: usize) -> String {
        trunc(&self.plaintext, length, "")
    }
}

/// The site index: rendered posts, newest first.
#[derive(Debug)]
pub(crate) struct Site {
    pub posts: Vec<RenderedPost>,
    /// Newest creation or edit time, so unchanged input builds identical output.
    pub updated: DateTime<Utc>,
}

impl Site {
    pub fn load(ctx: &Context) -> anyhow::Result<Site> {
        let posts = load_posts(&ctx.posts_source)?;
        Ok(Site::from_posts(ctx, posts))
    }

    pub fn from_posts(ctx: &Context, posts: Vec<Post>) -> Site {
        let updated = posts
            .iter()
            .map(Post::last_change)
            .max()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let posts = posts
            .into_iter()
            .map(|post| {
                let rendered = ctx.markdown.render(&post.body);
                let read_time = read_time(&rendered.plaintext, ctx.config.read_wpm);
                RenderedPost {
                    post,
                    html: rendered.html,
                    plaintext: rendered.plaintext,
                    read_time,
                }
            })
            .collect();

        Site { posts, updated }
    }
}

pub(crate) fn post_path(ctx: &Context, slug: &str) -> String {
    format!("{}/{slug}", ctx.config.posts_dir)
}

pub(crate) fn post_url(ctx: &Context, slug: &str) -> String {
    format!("{}/{}", ctx.config.blog, post_path(ctx, slug))
}

/// Page path of every keyword in the site. Keywords are visited in sorted order and
/// ones that slugify alike get `-N` suffixes, so every keyword keeps its own page.
fn keyword_paths(site: &Site) -> BTreeMap<&str, String> {
    let mut keywords: Vec<&str> = site
        .posts
        .iter()
        .flat_map(|p| p.post.keywords.iter().map(String::as_str))
        .collect();
    keywords.sort_unstable();
    keywords.dedup();

    let mut anchors = AnchorState::default();
    keywords
        .into_iter()
        .map(|k| (k, format!("k/{}", anchors.next_anchor(k))))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Clean,
    Build,
    Css,
    Metadata,
}

impl Stage {
    pub const STATIC: [Stage; 4] = [Stage::Clean, Stage::Build, Stage::Css, Stage::Metadata];

    fn description(self) -> &'static str {
        match self {
            Stage::Clean => "clean up the site",
            Stage::Build => "build blog pages",
            Stage::Css => "copy assets and minify css",
            Stage::Metadata => "generate robots, manifest, sitemap, feeds and apis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clean => "clean",
            Stage::Build => "build",
            Stage::Css => "css",
            Stage::Metadata => "metadata",
        };
        f.write_str(name)
    }
}

/// Runs `stages` in order, stopping at the first failure.
pub(crate) fn run(ctx: &Context, stages: &[Stage]) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut site: Option<Site> = None;

    for &stage in stages {
        info!("running stage '{stage}' : {}", stage.description());
        let stage_started = Instant::now();

        match stage {
            Stage::Clean => clean(ctx)?,
            Stage::Css => assets::process(ctx)?,
            Stage::Build | Stage::Metadata => {
                let loaded = match site.take() {
                    Some(loaded) => loaded,
                    None => Site::load(ctx)?,
                };
                if stage == Stage::Build {
                    build(ctx, &loaded)?;
                } else {
                    metadata(ctx, &loaded)?;
                }
                site = Some(loaded);
            }
        }

        if !ctx.ci {
            info!("stage {stage} finished in {:?}", stage_started.elapsed());
        }
    }

    if !ctx.ci {
        info!("site built in {:?}", started.elapsed());
    }
    Ok(())
}

/// Fails when removing the output directory would also remove an input of the site.
fn check_output_dir(ctx: &Context) -> anyhow::Result<()> {
    let Ok(out) = ctx.out_dir.canonicalize() else {
        return Ok(());
    };

    let mut inputs = vec![ctx.posts_source.clone(), ctx.assets_dir.clone()];
    inputs.extend(ctx.config_file.clone());
    inputs.extend(std::env::current_dir().ok());
    for input in inputs {
        let Ok(resolved) = input.canonicalize() else {
            continue;
        };
        if resolved.starts_with(&out) {
            bail!(
                "refusing to remove output directory {:?}: it contains {input:?}",
                ctx.out_dir
            );
        }
    }
    Ok(())
}

pub(crate) fn clean(ctx: &Context) -> anyhow::Result<()> {
    check_output_dir(ctx)?;
    info!("removing {:?}", ctx.out_dir);
    fs_extra::dir::remove(&ctx.out_dir).with_context(|| format!("while removing {:?}", ctx.out_dir))
}

fn write_page(ctx: &Context, path: &str, html: &str) -> anyhow::Result<()> {
    let out = ctx.out_dir.join(path).join("index.html");
    write_file(&out, minify_html(html)?)
}

fn merged_keywords<'a>(first: &'a [String], second: &'a [String]) -> String {
    let mut all: Vec<&str> = vec![];
    for k in first.iter().chain(second) {
        if !all.contains(&k.as_str()) {
            all.push(k);
        }
    }
    all.join(", ")
}

fn post_link<'a>(ctx: &Context, post: &'a Post) -> PostLink<'a> {
    PostLink {
        href: post_path(ctx, &post.slug),
        title: &post.title,
        created: gmt(&post.created),
    }
}

/// Home page, one page per post and one page per keyword.
pub(crate) fn build(ctx: &Context, site: &Site) -> anyhow::Result<()> {
    let config = &ctx.config;
    let site_data = SiteData::new(config);
    let keyword_paths = keyword_paths(site);

    for rendered in &site.posts {
        let started = Instant::now();
        let post = &rendered.post;
        let path = post_path(ctx, &post.slug);

        let data = PostPageData {
            site: &site_data,
            path: path.clone(),
            keywords: merged_keywords(&post.keywords, &config.default_keywords),
            title: &post.title,
            description: &post.description,
            created: gmt(&post.created),
            edited: post.edited.as_ref().map(gmt),
            read_time: &rendered.read_time,
            keyword_links: post
                .keywords
                .iter()
                .map(|k| KeywordLink {
                    href: keyword_paths[k.as_str()].clone(),
                    name: k,
                })
                .collect(),
            body: &rendered.html,
        };
        let html = ctx
            .handlebars
            .render("post", &data)
            .with_context(|| format!("while generating from {:?}", post.path))?;
        write_page(ctx, &path, &html)?;

        if ctx.ci {
            debug!("built post {:?}", post.title);
        } else {
            debug!("built post {:?} in {:?}", post.title, started.elapsed());
        }
    }

    let index = ListPageData {
        site: &site_data,
        path: String::new(),
        keywords: config.blog_keywords.join(", "),
        title: config.header.clone(),
        description: config.description.clone(),
        latest: site.posts.first().map(|p| post_link(ctx, &p.post)),
        posts: site.posts.iter().map(|p| post_link(ctx, &p.post)).collect(),
    };
    let html = ctx
        .handlebars
        .render("index", &index)
        .context("while generating index.html")?;
    write_page(ctx, "", &html)?;
    info!("generated {:?}", ctx.out_dir.join("index.html"));

    // keyword -> posts, each list keeps the site order
    let mut keywords: BTreeMap<&str, Vec<&Post>> = BTreeMap::new();
    for rendered in &site.posts {
        for k in &rendered.post.keywords {
            keywords.entry(k.as_str()).or_default().push(&rendered.post);
        }
    }
    for (keyword, posts) in &keywords {
        let path = &keyword_paths[keyword];
        let data = ListPageData {
            site: &site_data,
            path: path.clone(),
            keywords: keyword.to_string(),
            title: format!("keyword : {keyword}"),
            description: format!("posts about {keyword}"),
            latest: None,
            posts: posts.iter().map(|p| post_link(ctx, p)).collect(),
        };
        let html = ctx
            .handlebars
            .render("list", &data)
            .with_context(|| format!("while generating list for {keyword:?}"))?;
        write_page(ctx, path, &html)?;
    }
    info!(
        "generated {} post pages and {} keyword pages",
        site.posts.len(),
        keywords.len()
    );

    Ok(())
}

/// Everything next to the pages: robots, manifest, sitemap, feeds and the json apis.
pub(crate) fn metadata(ctx: &Context, site: &Site) -> anyhow::Result<()> {
    feeds::robots(ctx)?;
    feeds::manifest(ctx)?;
    feeds::sitemap(ctx, site)?;
    feeds::rss(ctx, site)?;
    feeds::atom(ctx, site)?;
    api::write_apis(ctx, site)?;
    Ok(())
}
