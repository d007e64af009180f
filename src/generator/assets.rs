use std::{path::Path, sync::LazyLock};

use anyhow::Context as _;
use fs_extra::dir::CopyOptions;
use log::{debug, info, warn};
use regex::Regex;

use crate::context::Context;

use super::utils::write_file;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{};,>])\s*").expect("punctuation pattern is valid"));
static COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s+").expect("colon pattern is valid"));

fn minify_code(code: &str) -> String {
    let code = WHITESPACE.replace_all(code, " ");
    let code = PUNCT.replace_all(&code, "$1");
    COLON.replace_all(&code, ":").replace(";}", "}")
}

/// End of the string literal opened by the quote at the start of `s`.
fn string_end(s: &str) -> usize {
    let quote = s.as_bytes()[0];
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            _ if b == quote => return i + 1,
            _ => {}
        }
    }
    s.len()
}

/// End of the `url(...)` starting at `s`, quoted parentheses included.
fn url_end(s: &str) -> usize {
    let mut i = 4;
    while i < s.len() {
        match s.as_bytes()[i] {
            b'"' | b'\'' => i += string_end(&s[i..]),
            b')' => return i + 1,
            _ => i += 1,
        }
    }
    s.len()
}

/// Strips comments and collapses whitespace around punctuation. String
/// literals and `url()` arguments are copied unchanged.
pub(crate) fn minify_css(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut code = String::new();
    let mut rest = css;
    while let Some(c) = rest.chars().next() {
        let verbatim = if rest.starts_with("/*") {
            rest = rest[2..].find("*/").map_or("", |end| &rest[end + 4..]);
            code.push(' ');
            continue;
        } else if c == '"' || c == '\'' {
            string_end(rest)
        } else if rest.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("url(")) {
            url_end(rest)
        } else {
            code.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        };
        out.push_str(&minify_code(&code));
        code.clear();
        out.push_str(&rest[..verbatim]);
        rest = &rest[verbatim..];
    }
    out.push_str(&minify_code(&code));
    out.trim().to_string()
}

fn minify_css_file(path: &Path) -> anyhow::Result<()> {
    let css = std::fs::read_to_string(path).with_context(|| format!("while reading {path:?}"))?;
    let out = path.with_extension("min.css");
    write_file(&out, minify_css(&css))?;
    debug!("minified {path:?} -> {out:?}");
    Ok(())
}

fn is_plain_css(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.ends_with(".css") && !name.ends_with(".min.css")
}

/// Copies the asset directory into the output and minifies its stylesheets.
pub(crate) fn process(ctx: &Context) -> anyhow::Result<()> {
    if !ctx.assets_dir.is_dir() {
        warn!("asset directory {:?} does not exist, skipping", ctx.assets_dir);
        return Ok(());
    }

    let dest = ctx.out_dir.join(&ctx.config.assets_dir);
    fs_extra::dir::create_all(&dest, false)?;
    let mut cp_opts = CopyOptions::new();
    cp_opts.copy_inside = true;
    cp_opts.content_only = true;
    cp_opts.overwrite = true;
    fs_extra::dir::copy(&ctx.assets_dir, &dest, &cp_opts)
        .with_context(|| format!("while copying {:?} to {dest:?}", ctx.assets_dir))?;
    info!("copied {:?} to {dest:?}", ctx.assets_dir);

    let styles = dest.join("styles.css");
    if styles.is_file() {
        minify_css_file(&styles)?;
    }

    let fonts = dest.join("fonts");
    if fonts.is_dir() {
        let mut entries = std::fs::read_dir(&fonts)
            .with_context(|| format!("while listing {fonts:?}"))?
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            if path.is_file() && is_plain_css(&path) {
                minify_css_file(&path)?;
            }
        }
    }

    Ok(())
}
