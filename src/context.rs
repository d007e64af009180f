use std::path::PathBuf;

use crate::{config::Config, markdown::MarkdownRenderer, renderer::generate_renderer};

#[derive(Debug)]
pub(crate) struct Context {
    pub config: Config,
    pub posts_source: PathBuf,
    pub out_dir: PathBuf,
    pub assets_dir: PathBuf,
    /// Config file the run was loaded from, if any.
    pub config_file: Option<PathBuf>,

    /// Set by `CI` / `CI_BUILD`: no editor, no stage timing.
    pub ci: bool,

    pub handlebars: handlebars::Handlebars<'static>,
    pub markdown: MarkdownRenderer,
}

impl Context {
    pub fn new(
        config: Config,
        posts_source: Option<PathBuf>,
        out_dir: Option<PathBuf>,
        ci: bool,
    ) -> anyhow::Result<Self> {
        let handlebars = generate_renderer(config.template_dir.as_deref())?;
        let markdown = MarkdownRenderer::new(&config.markdown_extensions);

        Ok(Self {
            posts_source: posts_source.unwrap_or_else(|| config.posts_source.clone()),
            out_dir: out_dir.unwrap_or_else(|| config.output_dir.clone()),
            assets_dir: PathBuf::from(&config.assets_dir),
            config_file: None,
            ci,
            handlebars,
            markdown,
            config,
        })
    }

    pub fn ci_from_env() -> bool {
        std::env::var_os("CI").is_some() || std::env::var_os("CI_BUILD").is_some()
    }
}
