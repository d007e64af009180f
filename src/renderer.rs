use std::path::Path;

use anyhow::Context;
use handlebars::{handlebars_helper, Handlebars};
use log::debug;

use crate::generator::utils::trunc as truncate;

handlebars_helper!(trunc: |s: str, len: u64| truncate(s, len as usize, " ..."));

const PARTIALS: &[(&str, &str)] = &[("head", include_str!("../templates/head.hbs"))];

const TEMPLATES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("post", include_str!("../templates/post.hbs")),
    ("list", include_str!("../templates/list.hbs")),
    ("rss", include_str!("../templates/rss.hbs")),
    ("sitemap", include_str!("../templates/sitemap.hbs")),
    ("robots", include_str!("../templates/robots.hbs")),
];

/// Built-in templates, each replaced by `<template_dir>/<name>.hbs` when that file exists.
pub(crate) fn generate_renderer(template_dir: Option<&Path>) -> anyhow::Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_helper("trunc", Box::new(trunc));

    let overridden = |name: &str| {
        template_dir
            .map(|dir| dir.join(format!("{name}.hbs")))
            .filter(|path| path.is_file())
    };

    for &(name, builtin) in PARTIALS {
        match overridden(name) {
            Some(path) => {
                debug!("using partial {path:?}");
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("{path:?}"))?;
                handlebars.register_partial(name, source)?;
            }
            None => handlebars.register_partial(name, builtin)?,
        }
    }

    for &(name, builtin) in TEMPLATES {
        match overridden(name) {
            Some(path) => {
                debug!("using template {path:?}");
                handlebars
                    .register_template_file(name, &path)
                    .with_context(|| format!("{path:?}"))?;
            }
            None => handlebars
                .register_template_string(name, builtin)
                .with_context(|| format!("{name}.hbs"))?,
        }
    }

    Ok(handlebars)
}
