use std::{borrow::Borrow, cmp::Ordering, path::Path};

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::debug;
use sha2::{Digest, Sha256};

use crate::metadata::{Post, TIME_FORMAT};

/// Newest first; equal creation times fall back to the slug so the order is total.
pub(crate) fn sort_posts<T: Borrow<Post>>(a: &T, b: &T) -> Ordering {
    let (a, b) = (a.borrow(), b.borrow());
    b.created
        .cmp(&a.created)
        .then_with(|| a.slug.cmp(&b.slug))
}

/// First `length` characters of `data`, followed by `end` when something was cut.
pub(crate) fn trunc(data: &str, length: usize, end: &str) -> String {
    match data.char_indices().nth(length) {
        Some((idx, _)) => format!("{}{end}", &data[..idx]),
        None => data.to_string(),
    }
}

pub(crate) fn gmt(ts: &DateTime<Utc>) -> String {
    ts.format(TIME_FORMAT).to_string()
}

pub(crate) fn rfc822(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(crate) fn w3c(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub(crate) fn minify_html(html: &str) -> anyhow::Result<String> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.minify_css = true;

    String::from_utf8(minify_html::minify(html.as_bytes(), &cfg))
        .context("minified html is not valid utf-8")
}

/// Writes `content`, creating parent directories as needed.
pub(crate) fn write_file(path: &Path, content: impl AsRef<[u8]>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("while creating {parent:?}"))?;
    }
    std::fs::write(path, content).with_context(|| format!("while writing {path:?}"))?;
    debug!("wrote {path:?}");
    Ok(())
}
