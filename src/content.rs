use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use log::{debug, info};

use crate::{generator::utils::sort_posts, metadata::Post};

/// Loads every `*.md` below `dir` (breadth first) and returns them newest first.
pub(crate) fn load_posts(dir: &Path) -> anyhow::Result<Vec<Post>> {
    if !dir.is_dir() {
        info!("post directory {dir:?} does not exist, no posts loaded");
        return Ok(vec![]);
    }

    let mut posts: Vec<Post> = vec![];
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    let mut q = VecDeque::new();
    q.push_back(dir.to_path_buf());
    while let Some(current) = q.pop_front() {
        let mut entries = std::fs::read_dir(&current)
            .with_context(|| format!("while listing {current:?}"))?
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let meta = entry.metadata()?;

            if meta.is_dir() {
                q.push_back(path);
            } else if meta.is_file() && path.extension().is_some_and(|e| e == "md") {
                let post = Post::load(&path)?;
                if let Some(other) = seen.insert(post.slug.clone(), path.clone()) {
                    bail!("duplicate post slug {:?}: {other:?} and {path:?}", post.slug);
                }
                debug!("loaded {:?} from {path:?}", post.slug);
                posts.push(post);
            } else {
                debug!("skipping {path:?}");
            }
        }
    }

    posts.sort_by(sort_posts);
    Ok(posts)
}

pub(crate) fn find_post<'a>(posts: &'a [Post], slug: &str) -> anyhow::Result<&'a Post> {
    posts
        .iter()
        .find(|p| p.slug == slug)
        .with_context(|| format!("post {slug:?} does not exist"))
}
