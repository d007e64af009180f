use std::{borrow::Cow, sync::LazyLock};

use maud::html;
use pulldown_cmark::{
    html::push_html, CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
    TextMergeStream,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::slug::{anchor, AnchorState};

static TITLE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#:[^>]+?>").expect("title link pattern is valid"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static ABBR_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\[([^\]]+)\]:[ \t]*(.*)$").expect("abbreviation pattern is valid")
});

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Extension {
    Strikethrough,
    Tables,
    Footnotes,
    Superscript,
    Subscript,
    Tasklists,
    SmartPunctuation,
    /// `*[ABBR]: expansion` definitions.
    Abbr,
    /// `<#:Heading text>` links to a heading of the same post.
    Titlelink,
}

pub(crate) struct Rendered {
    pub html: String,
    pub plaintext: String,
}

#[derive(Debug)]
pub(crate) struct MarkdownRenderer {
    options: Options,
    abbr: bool,
    titlelink: bool,
}

impl MarkdownRenderer {
    pub fn new(extensions: &[Extension]) -> Self {
        let mut options = Options::empty();
        for ext in extensions {
            match ext {
                Extension::Strikethrough => options.insert(Options::ENABLE_STRIKETHROUGH),
                Extension::Tables => options.insert(Options::ENABLE_TABLES),
                Extension::Footnotes => options.insert(Options::ENABLE_FOOTNOTES),
                Extension::Superscript => options.insert(Options::ENABLE_SUPERSCRIPT),
                Extension::Subscript => options.insert(Options::ENABLE_SUBSCRIPT),
                Extension::Tasklists => options.insert(Options::ENABLE_TASKLISTS),
                Extension::SmartPunctuation => options.insert(Options::ENABLE_SMART_PUNCTUATION),
                Extension::Abbr | Extension::Titlelink => {}
            }
        }

        Self {
            options,
            abbr: extensions.contains(&Extension::Abbr),
            titlelink: extensions.contains(&Extension::Titlelink),
        }
    }

    pub fn render(&self, markdown: &str) -> Rendered {
        let (source, abbreviations) = if self.abbr {
            extract_abbreviations(markdown)
        } else {
            (Cow::Borrowed(markdown), vec![])
        };

        let mut rewriter = Rewriter {
            titlelink: self.titlelink,
            abbreviations: abbreviation_pattern(&abbreviations).map(|re| (re, abbreviations)),
            anchors: AnchorState::default(),
            heading: None,
            in_code_block: false,
            link_depth: 0,
            events: vec![],
        };
        for event in TextMergeStream::new(Parser::new_ext(&source, self.options)) {
            rewriter.push(event);
        }

        let plaintext = plaintext(&rewriter.events);
        let mut html = String::with_capacity(source.len() * 2);
        push_html(&mut html, rewriter.events.into_iter());

        Rendered { html, plaintext }
    }
}

struct HeadingBuffer<'a> {
    level: HeadingLevel,
    events: Vec<Event<'a>>,
}

struct Rewriter<'a> {
    titlelink: bool,
    abbreviations: Option<(Regex, Vec<(String, String)>)>,
    anchors: AnchorState,
    heading: Option<HeadingBuffer<'a>>,
    in_code_block: bool,
    link_depth: usize,
    events: Vec<Event<'a>>,
}

impl<'a> Rewriter<'a> {
    fn push(&mut self, event: Event<'a>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.heading = Some(HeadingBuffer {
                    level,
                    events: vec![],
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = self.heading.take() {
                    self.close_heading(heading);
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.in_code_block = true;
                self.emit(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.emit(event);
            }
            Event::Start(Tag::Link { .. }) => {
                self.link_depth += 1;
                self.emit(event);
            }
            Event::End(TagEnd::Link) => {
                self.link_depth = self.link_depth.saturating_sub(1);
                self.emit(event);
            }
            Event::Text(text) if !self.in_code_block => {
                for e in self.expand_text(&text) {
                    self.emit(e);
                }
            }
            _ => self.emit(event),
        }
    }

    fn emit(&mut self, event: Event<'a>) {
        match self.heading.as_mut() {
            Some(heading) => heading.events.push(event),
            None => self.events.push(event),
        }
    }

    /// `<hN id="slug"><a href="#slug">#</a> text</hN>`, h1 is reserved for the page title.
    fn close_heading(&mut self, heading: HeadingBuffer<'a>) {
        let text = plaintext(&heading.events);
        let id = self.anchors.next_anchor(&text);
        let level = (heading.level as usize).max(2);

        let open = html! {
            a href={ "#" (id) } { "#" }
        };
        self.events.push(Event::Html(
            format!("<h{level} id=\"{id}\">{} ", open.into_string()).into(),
        ));
        self.events.extend(heading.events);
        self.events
            .push(Event::Html(format!("</h{level}>\n").into()));
    }

    fn expand_text(&self, text: &str) -> Vec<Event<'a>> {
        let mut out = vec![];
        let mut last = 0;

        if self.titlelink && self.link_depth == 0 {
            for m in TITLE_LINK.find_iter(text) {
                self.expand_abbreviations(&text[last..m.start()], &mut out);

                let target = &m.as_str()[3..m.as_str().len() - 1];
                out.push(Event::Start(Tag::Link {
                    link_type: LinkType::Inline,
                    dest_url: format!("#{}", anchor(target)).into(),
                    title: CowStr::Borrowed(""),
                    id: CowStr::Borrowed(""),
                }));
                out.push(Event::Text(format!("# {target}").into()));
                out.push(Event::End(TagEnd::Link));
                last = m.end();
            }
        }

        self.expand_abbreviations(&text[last..], &mut out);
        out
    }

    fn expand_abbreviations(&self, text: &str, out: &mut Vec<Event<'a>>) {
        if text.is_empty() {
            return;
        }
        let Some((re, definitions)) = &self.abbreviations else {
            out.push(Event::Text(text.to_string().into()));
            return;
        };

        let mut last = 0;
        let mut pos = 0;
        while let Some(m) = re.find_at(text, pos) {
            if !standalone(text, m.start(), m.end()) {
                pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
            if m.start() > last {
                out.push(Event::Text(text[last..m.start()].to_string().into()));
            }
            let title = definitions
                .iter()
                .find(|(abbr, _)| abbr == m.as_str())
                .map_or("", |(_, full)| full.as_str());
            let abbr = html! {
                abbr title=(title) { (m.as_str()) }
            };
            out.push(Event::InlineHtml(abbr.into_string().into()));
            last = m.end();
            pos = m.end();
        }
        if last < text.len() {
            out.push(Event::Text(text[last..].to_string().into()));
        }
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `text[start..end]` is not glued to a word character on either side.
fn standalone(text: &str, start: usize, end: usize) -> bool {
    !text[..start].chars().next_back().is_some_and(is_word)
        && !text[end..].chars().next().is_some_and(is_word)
}

/// Removes `*[ABBR]: expansion` lines outside fenced code, returning them separately.
fn extract_abbreviations(markdown: &str) -> (Cow<'_, str>, Vec<(String, String)>) {
    let mut definitions = vec![];
    let mut kept = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(caps) = ABBR_DEFINITION.captures(line) {
                definitions.push((caps[1].trim().to_string(), caps[2].trim().to_string()));
                continue;
            }
        }
        kept.push(line);
    }

    if definitions.is_empty() {
        (Cow::Borrowed(markdown), definitions)
    } else {
        (Cow::Owned(kept.join("\n")), definitions)
    }
}

fn abbreviation_pattern(definitions: &[(String, String)]) -> Option<Regex> {
    if definitions.is_empty() {
        return None;
    }
    let mut abbrs: Vec<&str> = definitions.iter().map(|(a, _)| a.as_str()).collect();
    // longest first so `HTML5` wins over `HTML`
    abbrs.sort_by_key(|a| std::cmp::Reverse(a.len()));
    let alternation = abbrs
        .iter()
        .map(|a| regex::escape(a))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).ok()
}

fn plaintext(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::InlineHtml(h) => text.push_str(&TAG.replace_all(h, "")),
            Event::End(
                TagEnd::Emphasis
                | TagEnd::Strong
                | TagEnd::Strikethrough
                | TagEnd::Superscript
                | TagEnd::Subscript
                | TagEnd::Link
                | TagEnd::Image,
            ) => {}
            Event::SoftBreak | Event::HardBreak | Event::Html(_) | Event::End(_) => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `N minute(s)` at `wpm` words per minute, never less than one minute.
pub(crate) fn read_time(plaintext: &str, wpm: usize) -> String {
    let words = plaintext.split_whitespace().count();
    let minutes = words.div_ceil(wpm.max(1)).max(1);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}
