extern crate pulldown_cmark;

use itertools::Itertools;
use log::warn;
use regex::{Captures, Regex};

use self::pulldown_cmark::{Event, Parser, Tag};
use crate::error::{BackupError, Result};
use crate::model::{ImageRef, OutputFormat};

/// Renders note markup into the files that end up in the backup directory
pub trait MarkupConverter {
    /// `image_base` is set if images are saved next to the note, image
    /// references then point to `<image_base>-<hash>.<ext>`
    fn to_text(&self, markup: &str, format: OutputFormat, image_base: Option<&str>) -> String;
    fn extract_images(&self, markup: &str) -> Vec<ImageRef>;
}

/// Converter for the XHTML dialect (ENML) notes are stored in
pub struct EnmlConverter {
    prolog: Regex,
    note_open: Regex,
    note_close: Regex,
    todo: Regex,
    media: Regex,
    attribute_pattern: Regex,
}

impl EnmlConverter {
    pub fn new() -> Result<EnmlConverter> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| BackupError::Configuration(e.to_string()))
        };
        Ok(EnmlConverter {
            prolog: compile(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>")?,
            note_open: compile(r"<en-note\b[^>]*>")?,
            note_close: compile(r"</en-note\s*>")?,
            todo: compile(r"<en-todo\b([^>]*?)/?>(?:\s*</en-todo>)?")?,
            media: compile(r"<en-media\b([^>]*?)/?>(?:\s*</en-media>)?")?,
            attribute_pattern: compile(r#"([A-Za-z][\w-]*)\s*=\s*"([^"]*)""#)?,
        })
    }

    fn attribute<'a>(&self, attributes: &'a str, name: &str) -> Option<&'a str> {
        self.attribute_pattern.captures_iter(attributes)
            .find(|captures| &captures[1] == name)
            .and_then(|captures| captures.get(2))
            .map(|value| value.as_str())
    }

    /// Image described by the attributes of an `en-media` tag, other media
    /// types yield `None`.
    ///
    /// Hash and extension end up in file names, so only hex hashes and
    /// extensions without path separators are accepted.
    fn image_ref(&self, attributes: &str) -> Option<ImageRef> {
        let mime = self.attribute(attributes, "type")?;
        let hash = self.attribute(attributes, "hash")?;
        let extension = match mime.split_once('/') {
            Some(("image", extension)) if !extension.is_empty() => extension,
            _ => return None,
        };
        if !is_hex(hash) || !is_file_extension(extension) {
            warn!("Ignoring image with hash \"{}\" of type {}", hash, mime);
            return None;
        }
        Some(ImageRef {
            hash: hash.to_string(),
            extension: extension.to_string(),
        })
    }

    /// Plain HTML version of the note, en-* elements replaced
    fn to_html(&self, markup: &str, image_base: Option<&str>) -> String {
        let html = self.prolog.replace_all(markup, "");
        let html = self.note_open.replace_all(&html, "<div>");
        let html = self.note_close.replace_all(&html, "</div>");
        let html = self.todo.replace_all(&html, |captures: &Captures| {
            match self.attribute(&captures[1], "checked") {
                Some("true") => "[x] ",
                _ => "[ ] ",
            }
        });
        let html = self.media.replace_all(&html, |captures: &Captures| {
            match (self.image_ref(&captures[1]), image_base) {
                (Some(image), Some(base)) => {
                    let src = format!("{}-{}.{}", base, image.hash, image.extension);
                    format!("<img src=\"{}\" />", htmlescape::encode_minimal(&src))
                }
                _ => String::new(),
            }
        });
        html.trim().to_string()
    }
}

impl MarkupConverter for EnmlConverter {
    fn to_text(&self, markup: &str, format: OutputFormat, image_base: Option<&str>) -> String {
        let html = self.to_html(markup, image_base);
        match format {
            OutputFormat::Html => html,
            OutputFormat::Markdown => html2runes::markdown::convert_string(&html),
            OutputFormat::Plain => markdown_to_plain(&html2runes::markdown::convert_string(&html)),
        }
    }

    fn extract_images(&self, markup: &str) -> Vec<ImageRef> {
        self.media.captures_iter(markup)
            .filter_map(|captures| self.image_ref(&captures[1]))
            .unique_by(|image| image.hash.clone())
            .collect()
    }
}

fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_file_extension(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
        && value.chars().any(|c| c.is_ascii_alphanumeric())
}

/// Drops all markdown syntax, keeps text, line structure and image targets
fn markdown_to_plain(markdown: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::Start(Tag::Image(_, target, _)) => text.push_str(&target),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(Tag::Paragraph)
            | Event::End(Tag::Heading(_))
            | Event::End(Tag::Item)
            | Event::End(Tag::CodeBlock(_)) => text.push('\n'),
            Event::End(Tag::List(_)) | Event::End(Tag::BlockQuote) => {
                if !text.ends_with("\n\n") {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    format!("{}\n", text.trim_end())
}
