use log::info;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::context::Context;

use super::{
    utils::{sha256_hex, write_file},
    RenderedPost, Site,
};

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct BlogApi<'a> {
    title: &'a str,
    header: &'a str,
    description: &'a str,
    author: &'a str,
    locale: &'a str,
    license: &'a str,
    website: &'a str,
    blog: &'a str,
    posts_dir: &'a str,
    keywords: &'a [String],
    posts: PostMap<'a, FullPost<'a>>,
}

#[derive(Serialize)]
struct FullPost<'a> {
    title: &'a str,
    description: &'a str,
    content: &'a str,
    keywords: &'a [String],
    created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    edited: Option<i64>,
}

#[derive(Serialize)]
struct RecentPost<'a> {
    title: &'a str,
    content: String,
    created: i64,
}

/// slug -> entry, serialized as a json object in site order.
struct PostMap<'a, T>(Vec<(&'a str, T)>);

impl<T: Serialize> Serialize for PostMap<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (slug, entry) in &self.0 {
            map.serialize_entry(slug, entry)?;
        }
        map.end()
    }
}

fn full_post(rendered: &RenderedPost) -> (&str, FullPost<'_>) {
    let post = &rendered.post;
    (
        post.slug.as_str(),
        FullPost {
            title: &post.title,
            description: &post.description,
            content: &post.body,
            keywords: &post.keywords,
            created: post.created.timestamp(),
            edited: post.edited.map(|e| e.timestamp()),
        },
    )
}

/// Writes `name` as compact json together with its `<name>_hash.txt` sidecar.
fn write_api(ctx: &Context, name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let path = ctx.out_dir.join(name);
    write_file(&path, &bytes)?;

    let hash_path = ctx
        .out_dir
        .join(format!("{}_hash.txt", name.replace('.', "_")));
    write_file(&hash_path, sha256_hex(&bytes))?;
    info!("generated {path:?} and {hash_path:?}");
    Ok(())
}

pub(super) fn write_apis(ctx: &Context, site: &Site) -> anyhow::Result<()> {
    let config = &ctx.config;

    let blog = BlogApi {
        title: &config.title,
        header: &config.header,
        description: &config.description,
        author: &config.author,
        locale: &config.locale,
        license: &config.license,
        website: &config.website,
        blog: &config.blog,
        posts_dir: &config.posts_dir,
        keywords: &config.blog_keywords,
        posts: PostMap(site.posts.iter().map(full_post).collect()),
    };
    write_api(ctx, "blog.json", &blog)?;

    let recents = PostMap(
        site.posts
            .iter()
            .take(config.recents)
            .map(|rendered| {
                let post = &rendered.post;
                (
                    post.slug.as_str(),
                    RecentPost {
                        title: &post.title,
                        content: rendered.excerpt(config.post_preview_size),
                        created: post.created.timestamp(),
                    },
                )
            })
            .collect(),
    );
    write_api(ctx, "recents.json", &recents)?;

    Ok(())
}
