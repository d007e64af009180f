use anyhow::Context as _;
use atom_syndication::{
    CategoryBuilder, EntryBuilder, FeedBuilder, LinkBuilder, PersonBuilder, Text,
};
use log::{debug, info};
use serde_json::{json, Value};

use crate::context::Context;

use super::{
    data::{FeedData, FeedItem, RobotsData, SiteData, SitemapData, SitemapUrl},
    post_url,
    utils::{rfc822, w3c, write_file},
    Site,
};

pub(super) fn robots(ctx: &Context) -> anyhow::Result<()> {
    let data = RobotsData {
        assets_dir: &ctx.config.assets_dir,
        blog: &ctx.config.blog,
    };
    let content = ctx
        .handlebars
        .render("robots", &data)
        .context("while generating robots.txt")?;

    let path = ctx.out_dir.join("robots.txt");
    write_file(&path, content)?;
    info!("generated {path:?}");
    Ok(())
}

pub(super) fn manifest(ctx: &Context) -> anyhow::Result<()> {
    let config = &ctx.config;
    let mut manifest = json!({
        "$schema": "https://json.schemastore.org/web-manifest-combined.json",
        "short_name": config.header,
        "name": config.title,
        "description": config.description,
        "start_url": ".",
        "display": "standalone",
        "theme_color": config.theme.primary,
        "background_color": config.theme.secondary,
    });
    if let Value::Object(map) = &mut manifest {
        for (k, v) in &config.manifest {
            map.insert(k.clone(), v.clone());
        }
    }

    let path = ctx.out_dir.join("manifest.json");
    write_file(&path, serde_json::to_vec(&manifest)?)?;
    info!("generated {path:?}");
    Ok(())
}

pub(super) fn sitemap(ctx: &Context, site: &Site) -> anyhow::Result<()> {
    let config = &ctx.config;
    let now = w3c(&site.updated);

    let mut urls: Vec<SitemapUrl> = [
        config.website.clone(),
        config.blog.clone(),
        format!("{}/{}", config.blog, config.rss_file),
    ]
    .into_iter()
    .map(|loc| SitemapUrl {
        loc,
        lastmod: now.clone(),
    })
    .collect();

    for rendered in &site.posts {
        debug!("adding {:?} to sitemap", rendered.post.slug);
        urls.push(SitemapUrl {
            loc: post_url(ctx, &rendered.post.slug),
            lastmod: w3c(&rendered.post.last_change()),
        });
    }

    let content = ctx
        .handlebars
        .render("sitemap", &SitemapData { urls })
        .context("while generating sitemap.xml")?;
    let path = ctx.out_dir.join("sitemap.xml");
    write_file(&path, content)?;
    info!("generated {path:?}");
    Ok(())
}

pub(super) fn rss(ctx: &Context, site: &Site) -> anyhow::Result<()> {
    let config = &ctx.config;
    let site_data = SiteData::new(config);

    let items = site
        .posts
        .iter()
        .map(|rendered| {
            let post = &rendered.post;
            FeedItem {
                title: &post.title,
                link: post_url(ctx, &post.slug),
                description: &post.description,
                pub_date: rfc822(&post.created),
            }
        })
        .collect();

    let data = FeedData {
        site: &site_data,
        language: config.locale.to_lowercase().replace('_', "-"),
        build_date: rfc822(&site.updated),
        items,
    };
    let content = ctx
        .handlebars
        .render("rss", &data)
        .context("while generating rss feed")?;

    let path = ctx.out_dir.join(&config.rss_file);
    write_file(&path, content)?;
    info!("generated {path:?}");
    Ok(())
}

pub(super) fn atom(ctx: &Context, site: &Site) -> anyhow::Result<()> {
    let config = &ctx.config;

    let entries: Vec<_> = site
        .posts
        .iter()
        .map(|rendered| {
            let post = &rendered.post;
            let link = post_url(ctx, &post.slug);
            EntryBuilder::default()
                .title(post.title.clone())
                .id(link.clone())
                .updated(post.last_change().fixed_offset())
                .published(Some(post.created.fixed_offset()))
                .links(vec![LinkBuilder::default()
                    .href(link)
                    .rel("alternate")
                    .build()])
                .summary(Some(Text::plain(post.description.clone())))
                .categories(
                    post.keywords
                        .iter()
                        .map(|k| CategoryBuilder::default().term(k.clone()).build())
                        .collect::<Vec<_>>(),
                )
                .build()
        })
        .collect();

    let feed = FeedBuilder::default()
        .title(config.title.clone())
        .id(format!("{}/", config.blog))
        .updated(site.updated.fixed_offset())
        .subtitle(Some(Text::plain(config.description.clone())))
        .authors(vec![PersonBuilder::default()
            .name(config.author.clone())
            .build()])
        .links(vec![
            LinkBuilder::default()
                .href(format!("{}/{}", config.blog, config.atom_file))
                .rel("self")
                .build(),
            LinkBuilder::default()
                .href(config.blog.clone())
                .rel("alternate")
                .build(),
        ])
        .entries(entries)
        .build();

    let path = ctx.out_dir.join(&config.atom_file);
    write_file(&path, feed.to_string())?;
    info!("generated {path:?}");
    Ok(())
}
