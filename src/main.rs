use std::path::PathBuf;

use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};
use config::{Config, CONFIG_FILE};
use context::Context;
use generator::Stage;

mod commands;
mod config;
mod content;
mod context;
mod generator;
mod markdown;
mod metadata;
mod renderer;
mod slug;

fn init_logger(ci: bool) {
    let env = env_logger::Env::default().default_filter_or(if ci { "warn" } else { "info" });
    let mut builder = env_logger::Builder::from_env(env);
    if std::env::var_os("NOCLR").is_some() {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    builder.init();
}

fn global_args() -> [Arg; 3] {
    [
        Arg::new("config")
            .long("config")
            .help("Path of the config file")
            .value_parser(value_parser!(PathBuf))
            .default_value(CONFIG_FILE)
            .global(true),
        Arg::new("source")
            .long("source")
            .help("Directory of post sources, overrides `posts-source`")
            .value_parser(value_parser!(PathBuf))
            .global(true),
        Arg::new("output")
            .long("output")
            .help("Directory of the generated site, overrides `output-dir`. Existing contents are removed by `clean`.")
            .value_parser(value_parser!(PathBuf))
            .global(true),
    ]
}

fn stage_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name).about(about)
}

fn cli() -> Command {
    command!()
        .subcommand_required(true)
        .args(global_args())
        .subcommands([
            Command::new("new")
                .about("Create a new post")
                .args([
                    Arg::new("title").help("Title of the post").required(true),
                    Arg::new("description")
                        .long("description")
                        .short('d')
                        .help("Short description of the post"),
                    Arg::new("keywords")
                        .long("keywords")
                        .short('k')
                        .help("Comma separated keywords"),
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .help("Read the post body from a file, `-` for stdin")
                        .value_parser(value_parser!(PathBuf)),
                    Arg::new("no_edit")
                        .long("no-edit")
                        .help("Do not open the editor after reading --file")
                        .action(ArgAction::SetTrue),
                ]),
            Command::new("edit")
                .visible_alias("ed")
                .about("Edit posts, opens the editor when no field is given")
                .args([
                    Arg::new("slugs")
                        .help("Slugs of the posts to edit")
                        .required(true)
                        .num_args(1..),
                    Arg::new("title").long("title").short('t').help("New title"),
                    Arg::new("description")
                        .long("description")
                        .short('d')
                        .help("New description"),
                    Arg::new("keywords")
                        .long("keywords")
                        .short('k')
                        .help("New comma separated keywords"),
                ]),
            Command::new("list")
                .visible_alias("ls")
                .about("List all posts"),
            Command::new("rm").about("Remove posts").arg(
                Arg::new("slugs")
                    .help("Slugs of the posts to remove")
                    .required(true)
                    .num_args(1..),
            ),
            Command::new("new-config")
                .about("Write the default config file")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help("Overwrite an existing config file")
                        .action(ArgAction::SetTrue),
                ),
            stage_command("clean", "Remove the generated site"),
            stage_command("build", "Build the post, index and keyword pages"),
            stage_command("css", "Copy assets and minify stylesheets"),
            stage_command("metadata", "Generate robots, manifest, sitemap, feeds and apis"),
            stage_command("static", "Run clean, build, css and metadata"),
        ])
}

fn string_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn slugs(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("slugs")
        .map(|s| s.cloned().collect())
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let ci = Context::ci_from_env();
    init_logger(ci);

    let matches = cli().get_matches();
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow::anyhow!("no command given"))?;

    let config_path = sub
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if name == "new-config" {
        return commands::new_config(&config_path, sub.get_flag("force"));
    }

    let config = Config::load(&config_path)?;
    let mut ctx = Context::new(
        config,
        sub.get_one::<PathBuf>("source").cloned(),
        sub.get_one::<PathBuf>("output").cloned(),
        ci,
    )?;
    ctx.config_file = Some(config_path);

    match name {
        "new" => {
            let args = commands::NewPost {
                title: string_arg(sub, "title").unwrap_or_default(),
                description: string_arg(sub, "description"),
                keywords: string_arg(sub, "keywords"),
                file: sub.get_one::<PathBuf>("file").cloned(),
                no_edit: sub.get_flag("no_edit"),
            };
            let path = commands::new_post(&ctx, args)?;
            println!("{}", path.display());
        }
        "edit" => {
            let fields = commands::EditFields {
                title: string_arg(sub, "title"),
                description: string_arg(sub, "description"),
                keywords: string_arg(sub, "keywords"),
            };
            commands::edit_posts(&ctx, &slugs(sub), &fields)?;
        }
        "list" => commands::list_posts(&ctx, &mut std::io::stdout().lock())?,
        "rm" => commands::remove_posts(&ctx, &slugs(sub))?,
        "clean" => generator::run(&ctx, &[Stage::Clean])?,
        "build" => generator::run(&ctx, &[Stage::Build])?,
        "css" => generator::run(&ctx, &[Stage::Css])?,
        "metadata" => generator::run(&ctx, &[Stage::Metadata])?,
        "static" => generator::run(&ctx, &Stage::STATIC)?,
        _ => anyhow::bail!("unknown command {name:?}"),
    }

    Ok(())
}
