use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

fn blogsite(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("blogsite").unwrap();
    cmd.current_dir(dir)
        .env("CI", "1")
        .env("NOCLR", "1")
        .env_remove("CI_BUILD")
        .env_remove("BLOG_NAME")
        .env_remove("BLOG_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_post(dir: &Path, slug: &str, front: &str, body: &str) {
    let posts = dir.join("posts");
    std::fs::create_dir_all(&posts).unwrap();
    std::fs::write(posts.join(format!("{slug}.md")), format!("---\n{front}\n---\n\n{body}\n")).unwrap();
}

fn seed(dir: &Path) {
    write_post(
        dir,
        "first-post",
        "title: First post\ndescription: the first one\nkeywords: rust, notes\ncreated: 2024-01-01 10:00:00",
        "# Intro\n\nHello *world*.\n\n## Intro\n\nAgain.",
    );
    write_post(
        dir,
        "second-post",
        "title: Second post\ndescription: the second one\nkeywords: notes\ncreated: 2024-02-01 10:00:00\nedited: 2024-03-01 08:30:00",
        "See <#:Details> below.\n\n## Details\n\n*[HTML]: Hyper Text Markup Language\n\nHTML everywhere.",
    );
    let assets = dir.join("content");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("styles.css"), "body {\n  margin: 0;\n}\n").unwrap();
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let content = std::fs::read(&path).unwrap();
                files.insert(path.strip_prefix(root).unwrap().to_path_buf(), content);
            }
        }
    }
    files
}

#[test]
fn static_build_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    blogsite(dir.path()).arg("static").assert().success();
    let first = snapshot(&dir.path().join("public"));
    blogsite(dir.path()).arg("static").assert().success();
    let second = snapshot(&dir.path().join("public"));
    assert_eq!(first, second);

    for name in [
        "index.html",
        "b/first-post/index.html",
        "b/second-post/index.html",
        "k/notes/index.html",
        "k/rust/index.html",
        "content/styles.css",
        "content/styles.min.css",
        "robots.txt",
        "manifest.json",
        "sitemap.xml",
        "rss.xml",
        "atom.xml",
        "blog.json",
        "recents.json",
        "blog_json_hash.txt",
        "recents_json_hash.txt",
    ] {
        assert!(first.contains_key(Path::new(name)), "{name} was not generated");
    }
}

#[test]
fn api_hashes_match_content() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    blogsite(dir.path()).arg("static").assert().success();

    let out = dir.path().join("public");
    for (json, hash) in [
        ("blog.json", "blog_json_hash.txt"),
        ("recents.json", "recents_json_hash.txt"),
    ] {
        let bytes = std::fs::read(out.join(json)).unwrap();
        let expected = hex::encode(Sha256::digest(&bytes));
        assert_eq!(std::fs::read_to_string(out.join(hash)).unwrap(), expected);
    }

    let blog = std::fs::read_to_string(out.join("blog.json")).unwrap();
    assert!(blog.find("\"second-post\"").unwrap() < blog.find("\"first-post\"").unwrap());
}

#[test]
fn pages_carry_markdown_features() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    blogsite(dir.path()).arg("build").assert().success();

    let out = dir.path().join("public");
    let first = std::fs::read_to_string(out.join("b/first-post/index.html")).unwrap();
    assert!(first.contains("intro-1"));
    assert!(first.contains("<h2"));
    assert!(!first.contains("<h1 id"));

    let second = std::fs::read_to_string(out.join("b/second-post/index.html")).unwrap();
    assert!(second.contains("#details"));
    assert!(second.contains("Hyper Text Markup Language"));
    assert!(!second.contains("*[HTML]"));
}

#[test]
fn new_list_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("body.md"), "A fresh post body.").unwrap();

    blogsite(dir.path())
        .args(["new", "A Fresh Start", "--file", "body.md", "-k", "Misc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fresh-start.md"));
    assert!(dir.path().join("posts/fresh-start.md").exists());

    blogsite(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("slug        : fresh-start"))
        .stdout(predicate::str::contains("keywords    : misc"));

    blogsite(dir.path())
        .args(["rm", "fresh-start", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
    assert!(dir.path().join("posts/fresh-start.md").exists());

    blogsite(dir.path())
        .args(["rm", "fresh-start"])
        .assert()
        .success();
    assert!(!dir.path().join("posts/fresh-start.md").exists());
}

#[test]
fn new_reads_stdin() {
    let dir = tempfile::tempdir().unwrap();
    blogsite(dir.path())
        .args(["new", "Piped", "--file", "-"])
        .write_stdin("from stdin")
        .assert()
        .success();

    let doc = std::fs::read_to_string(dir.path().join("posts/piped.md")).unwrap();
    assert!(doc.starts_with("---\ntitle: Piped\n"));
    assert!(doc.ends_with("\nfrom stdin\n"));
}

#[test]
fn new_without_file_fails_in_ci() {
    let dir = tempfile::tempdir().unwrap();
    blogsite(dir.path())
        .args(["new", "Nothing"])
        .assert()
        .failure();
    assert!(!dir.path().join("posts").exists());
}

#[test]
fn config_is_written_once() {
    let dir = tempfile::tempdir().unwrap();
    blogsite(dir.path()).arg("new-config").assert().success();
    let config = std::fs::read_to_string(dir.path().join("blog.toml")).unwrap();
    assert!(config.contains("posts-source = \"posts\""));

    blogsite(dir.path()).arg("new-config").assert().failure();
    blogsite(dir.path())
        .args(["new-config", "--force"])
        .assert()
        .success();
}

#[test]
fn environment_overrides_blog_url() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    blogsite(dir.path())
        .env("BLOG_URL", "https://env.test/")
        .env("BLOG_NAME", "Env Blog")
        .arg("metadata")
        .assert()
        .success();

    let robots = std::fs::read_to_string(dir.path().join("public/robots.txt")).unwrap();
    assert!(robots.contains("Sitemap: https://env.test/sitemap.xml"));
    let rss = std::fs::read_to_string(dir.path().join("public/rss.xml")).unwrap();
    assert!(rss.contains("<title>Env Blog</title>"));
}

#[test]
fn invalid_post_fails_the_build() {
    let dir = tempfile::tempdir().unwrap();
    write_post(dir.path(), "broken", "description: no title\ncreated: 2024-01-01", "body");
    blogsite(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("title"));
}
