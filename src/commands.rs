use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{bail, Context as _};
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info};

use crate::{
    config::Config,
    content::{find_post, load_posts},
    context::Context,
    generator::utils::{gmt, trunc},
    metadata::{parse_keywords, Post},
    slug::unique_slug,
};

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Runs the configured editor on `path`, `%s` in the arguments is replaced by the path.
fn run_editor(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    if ctx.ci {
        bail!("interactive editing is disabled in CI mode");
    }
    let Some((program, args)) = ctx.config.editor.split_first() else {
        bail!("no editor configured");
    };

    let path_str = path.to_string_lossy();
    let mut args: Vec<String> = args.iter().map(|a| a.replace("%s", &path_str)).collect();
    if !ctx.config.editor.iter().any(|a| a.contains("%s")) {
        args.push(path_str.to_string());
    }

    debug!("running {program:?} {args:?}");
    let status = Command::new(program)
        .args(&args)
        .status()
        .with_context(|| format!("while starting editor {program:?}"))?;
    if !status.success() {
        bail!("editor {program:?} exited with {status}");
    }
    Ok(())
}

fn read_body(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("while reading stdin")
    } else {
        std::fs::read_to_string(file).with_context(|| format!("while reading {file:?}"))
    }
}

#[derive(Debug, Default)]
pub(crate) struct NewPost {
    pub title: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Body source, `-` for stdin. Without it the editor is opened.
    pub file: Option<PathBuf>,
    pub no_edit: bool,
}

/// Creates `<posts-source>/<slug>.md` and returns its path.
pub(crate) fn new_post(ctx: &Context, args: NewPost) -> anyhow::Result<PathBuf> {
    let title = args.title.trim();
    if title.is_empty() {
        bail!("post title cannot be empty");
    }
    if ctx.ci && args.file.is_none() {
        bail!("interactive editing is disabled in CI mode, pass --file");
    }

    let posts = load_posts(&ctx.posts_source)?;
    let slug = unique_slug(
        &ctx.config.slugify(title),
        posts.iter().map(|p| p.slug.as_str()),
    );
    let path = ctx.posts_source.join(format!("{slug}.md"));

    let body = match &args.file {
        Some(file) => read_body(file)?.trim().to_string(),
        None => String::new(),
    };
    let post = Post {
        slug,
        title: title.to_string(),
        description: args.description.unwrap_or_default().trim().to_string(),
        keywords: args.keywords.as_deref().map(parse_keywords).unwrap_or_default(),
        created: now(),
        edited: None,
        body,
        path: path.clone(),
    };

    let open_editor = args.file.is_none() || (!args.no_edit && !ctx.ci);
    if !open_editor && post.body.is_empty() {
        bail!("post content cannot be empty");
    }

    std::fs::create_dir_all(&ctx.posts_source)
        .with_context(|| format!("while creating {:?}", ctx.posts_source))?;
    std::fs::write(&path, post.to_document())
        .with_context(|| format!("while writing {path:?}"))?;

    if open_editor {
        let checked = run_editor(ctx, &path).and_then(|()| Post::load(&path));
        if let Err(e) = checked {
            std::fs::remove_file(&path)
                .with_context(|| format!("while removing invalid post {path:?}"))?;
            return Err(e.context("post was not created"));
        }
    }

    info!("created post {:?} at {path:?}", post.slug);
    Ok(path)
}

#[derive(Debug, Default)]
pub(crate) struct EditFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
}

impl EditFields {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.keywords.is_none()
    }
}

fn edit_in_editor(ctx: &Context, post: &Post) -> anyhow::Result<Post> {
    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{}-", post.slug))
        .suffix(".md")
        .tempfile()
        .context("while creating a temporary copy")?;
    temp.write_all(post.to_document().as_bytes())
        .and_then(|()| temp.flush())
        .with_context(|| format!("while writing {:?}", temp.path()))?;

    run_editor(ctx, temp.path())?;
    let content = std::fs::read_to_string(temp.path())
        .with_context(|| format!("while reading {:?}", temp.path()))?;
    Post::parse(&post.path, &content)
}

/// Applies `fields` (or the editor when none are given) to every slug.
pub(crate) fn edit_posts(
    ctx: &Context,
    slugs: &[String],
    fields: &EditFields,
) -> anyhow::Result<()> {
    let posts = load_posts(&ctx.posts_source)?;
    let targets = slugs
        .iter()
        .map(|slug| find_post(&posts, slug))
        .collect::<anyhow::Result<Vec<_>>>()?;

    for post in targets {
        let mut updated = if fields.is_empty() {
            edit_in_editor(ctx, post)
                .with_context(|| format!("post {:?} was not changed", post.slug))?
        } else {
            let mut updated = post.clone();
            if let Some(title) = &fields.title {
                let title = title.trim();
                if title.is_empty() {
                    bail!("post title cannot be empty");
                }
                updated.title = title.to_string();
            }
            if let Some(description) = &fields.description {
                updated.description = description.trim().to_string();
            }
            if let Some(keywords) = &fields.keywords {
                updated.keywords = parse_keywords(keywords);
            }
            updated
        };

        updated.edited = Some(now());
        std::fs::write(&post.path, updated.to_document())
            .with_context(|| format!("while writing {:?}", post.path))?;
        info!("edited post {:?}", post.slug);
    }
    Ok(())
}

/// Deletes every slug, after checking that all of them exist.
pub(crate) fn remove_posts(ctx: &Context, slugs: &[String]) -> anyhow::Result<()> {
    let posts = load_posts(&ctx.posts_source)?;
    let targets = slugs
        .iter()
        .map(|slug| find_post(&posts, slug))
        .collect::<anyhow::Result<Vec<_>>>()?;

    for post in targets {
        std::fs::remove_file(&post.path)
            .with_context(|| format!("while removing {:?}", post.path))?;
        info!("removed post {:?}", post.slug);
    }
    Ok(())
}

pub(crate) fn list_posts(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let posts = load_posts(&ctx.posts_source)?;
    for post in &posts {
        writeln!(out, "slug        : {}", post.slug)?;
        writeln!(out, "title       : {}", post.title)?;
        writeln!(out, "description : {}", post.description)?;
        writeln!(
            out,
            "content     : {}",
            trunc(
                &post.body.split_whitespace().collect::<Vec<_>>().join(" "),
                ctx.config.post_preview_size,
                " ..."
            )
        )?;
        writeln!(out, "keywords    : {}", post.keywords.join(", "))?;
        writeln!(out, "created     : {}", gmt(&post.created))?;
        match &post.edited {
            Some(edited) => writeln!(out, "edited      : {}", gmt(edited))?,
            None => writeln!(out, "edited      : never")?,
        }
        writeln!(out)?;
    }
    if posts.is_empty() {
        info!("no posts in {:?}", ctx.posts_source);
    }
    Ok(())
}

pub(crate) fn new_config(path: &Path, force: bool) -> anyhow::Result<()> {
    Config::default().save(path, force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::context;
    use pretty_assertions::assert_eq;

    fn create(ctx: &Context, dir: &Path, title: &str, body: &str) -> anyhow::Result<PathBuf> {
        let file = dir.join("body.txt");
        std::fs::write(&file, body).unwrap();
        new_post(
            ctx,
            NewPost {
                title: title.to_string(),
                description: Some("a post".to_string()),
                keywords: Some("Rust, rust, Café".to_string()),
                file: Some(file),
                no_edit: true,
            },
        )
    }

    #[test]
    fn new_post_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let path = create(&ctx, dir.path(), "Hello, World!", "hi there\n").unwrap();
        assert_eq!(path, dir.path().join("posts/hello-world.md"));

        let post = Post::load(&path).unwrap();
        assert_eq!(post.title, "Hello, World!");
        assert_eq!(post.description, "a post");
        assert_eq!(post.keywords, ["rust", "cafe"]);
        assert_eq!(post.body, "hi there");
        assert_eq!(post.edited, None);

        let again = create(&ctx, dir.path(), "Hello World", "second").unwrap();
        assert_eq!(again, dir.path().join("posts/hello-world-1.md"));
    }

    #[test]
    fn new_post_rejects_empty_body() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        assert!(create(&ctx, dir.path(), "Empty", "  \n\n").is_err());
        assert!(!dir.path().join("posts/empty.md").exists());
    }

    #[test]
    fn new_post_needs_file_in_ci() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let args = NewPost {
            title: "Interactive".to_string(),
            ..NewPost::default()
        };
        assert!(new_post(&ctx, args).is_err());
        assert!(!dir.path().join("posts").exists());
    }

    #[test]
    fn edit_sets_fields_and_edited_time() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let path = create(&ctx, dir.path(), "Draft", "body").unwrap();

        let fields = EditFields {
            title: Some("Renamed".to_string()),
            keywords: Some("a, b".to_string()),
            ..EditFields::default()
        };
        edit_posts(&ctx, &["draft".to_string()], &fields).unwrap();

        let post = Post::load(&path).unwrap();
        assert_eq!(post.slug, "draft");
        assert_eq!(post.title, "Renamed");
        assert_eq!(post.description, "a post");
        assert_eq!(post.keywords, ["a", "b"]);
        assert_eq!(post.body, "body");
        assert!(post.edited.is_some());
    }

    #[test]
    fn edit_without_fields_needs_editor() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let path = create(&ctx, dir.path(), "Kept", "body").unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(edit_posts(&ctx, &["kept".to_string()], &EditFields::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    fn with_editor(mut ctx: Context, editor: &[&str]) -> Context {
        ctx.ci = false;
        ctx.config.editor = editor.iter().map(|a| a.to_string()).collect();
        ctx
    }

    fn fixture(dir: &Path, body: &str) -> String {
        let path = dir.join("typed.md");
        std::fs::write(
            &path,
            format!("---\ntitle: From editor\ndescription: typed in\ncreated: 2024-05-01 00:00:00\n---\n\n{body}"),
        )
        .unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn new_post_through_editor() {
        let dir = tempfile::tempdir().unwrap();
        let typed = fixture(dir.path(), "written in the editor\n");
        let ctx = with_editor(context(dir.path()), &["cp", typed.as_str(), "%s"]);

        let args = NewPost {
            title: "Editor post".to_string(),
            ..NewPost::default()
        };
        let path = new_post(&ctx, args).unwrap();
        assert_eq!(path, dir.path().join("posts/editor-post.md"));

        let post = Post::load(&path).unwrap();
        assert_eq!(post.slug, "editor-post");
        assert_eq!(post.title, "From editor");
        assert_eq!(post.body, "written in the editor");
    }

    #[cfg(unix)]
    #[test]
    fn new_post_left_empty_by_editor_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let args = || NewPost {
            title: "Blank".to_string(),
            ..NewPost::default()
        };

        let ctx = with_editor(context(dir.path()), &["sh", "-c", ": > \"$0\"", "%s"]);
        assert!(new_post(&ctx, args()).is_err());
        assert!(!dir.path().join("posts/blank.md").exists());

        let typed = fixture(dir.path(), "");
        let ctx = with_editor(context(dir.path()), &["cp", typed.as_str(), "%s"]);
        assert!(new_post(&ctx, args()).is_err());
        assert!(!dir.path().join("posts/blank.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn edit_through_editor_appends_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = create(&context(dir.path()), dir.path(), "Draft", "body").unwrap();
        let typed = fixture(dir.path(), "rewritten\n");
        let ctx = with_editor(context(dir.path()), &["cp", typed.as_str()]);

        edit_posts(&ctx, &["draft".to_string()], &EditFields::default()).unwrap();

        let post = Post::load(&path).unwrap();
        assert_eq!(post.slug, "draft");
        assert_eq!(post.title, "From editor");
        assert_eq!(post.description, "typed in");
        assert_eq!(post.body, "rewritten");
        assert!(post.edited.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn failed_editor_keeps_post() {
        let dir = tempfile::tempdir().unwrap();
        let path = create(&context(dir.path()), dir.path(), "Kept", "body").unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let ctx = with_editor(context(dir.path()), &["false"]);
        assert!(edit_posts(&ctx, &["kept".to_string()], &EditFields::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn edit_copy_ignores_planted_link() {
        let dir = tempfile::tempdir().unwrap();
        let slug = "planted-link-target";
        let path = create(&context(dir.path()), dir.path(), "Planted link target", "body").unwrap();
        assert_eq!(path, dir.path().join(format!("posts/{slug}.md")));

        let victim = dir.path().join("victim.txt");
        std::fs::write(&victim, "precious").unwrap();
        let link = std::env::temp_dir().join(format!("{slug}.md"));
        let _ = std::fs::remove_file(&link);
        std::os::unix::fs::symlink(&victim, &link).unwrap();

        let ctx = with_editor(context(dir.path()), &["true"]);
        let edited = edit_posts(&ctx, &[slug.to_string()], &EditFields::default());
        let _ = std::fs::remove_file(&link);

        edited.unwrap();
        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "precious");
        assert!(Post::load(&path).unwrap().edited.is_some());
    }

    #[test]
    fn remove_checks_every_slug_first() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let path = create(&ctx, dir.path(), "Doomed", "body").unwrap();

        assert!(remove_posts(&ctx, &["doomed".to_string(), "missing".to_string()]).is_err());
        assert!(path.exists());

        remove_posts(&ctx, &["doomed".to_string()]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn list_prints_every_post() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        create(&ctx, dir.path(), "Listed", "some\n\nlonger body text").unwrap();

        let mut out = vec![];
        list_posts(&ctx, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("slug        : listed\n"));
        assert!(out.contains("content     : some longe ..."));
        assert!(out.contains("keywords    : rust, cafe\n"));
        assert!(out.contains("edited      : never\n"));
    }
}
