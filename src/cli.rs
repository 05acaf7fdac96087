use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::content::{ChapterStore, EMPTY_LIBRARY, EMPTY_LIBRARY_HINT, Illustrations};
use crate::models::{BOOK_TITLE, Chapter};
use crate::tokenizer;

pub const PREVIEW_CHARS: usize = 120;

#[derive(Parser, Debug)]
#[clap(
    name = "pilote",
    version,
    about = "Read Le Pilote du Danube in the terminal and look up any word in Ukrainian.",
    long_about = None
)]
pub struct Cli {
    /// Print the chapter list and exit
    #[clap(short = 'l', long)]
    pub list: bool,

    /// Print the chapter with every word bracketed and exit
    #[clap(short, long)]
    pub dump: bool,

    /// Translate a single word and exit
    #[clap(short, long, value_name = "WORD")]
    pub translate: Option<String>,

    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Chapters JSON file, overrides the configured one
    #[clap(long, value_name = "FILE")]
    pub content: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,

    /// Chapter number to open
    #[clap(name = "CHAPTER")]
    pub chapter: Option<u32>,
}

/// The table of contents as plain text.
pub fn write_chapter_list(
    out: &mut impl Write,
    store: &ChapterStore,
    images: &Illustrations,
) -> io::Result<()> {
    writeln!(out, "{BOOK_TITLE}")?;
    if store.is_empty() {
        writeln!(out, "{EMPTY_LIBRARY}")?;
        writeln!(out, "{EMPTY_LIBRARY_HINT}")?;
        return Ok(());
    }

    writeln!(out, "{} chapters", store.len())?;
    for chapter in store.chapters() {
        let marker = if images.resolve(chapter.id).is_some() { " [image]" } else { "" };
        writeln!(out)?;
        writeln!(out, "{:>3}. {}{marker}", chapter.id, chapter.title)?;
        writeln!(out, "     {}", chapter.preview(PREVIEW_CHARS))?;
    }
    Ok(())
}

/// One chapter, paragraph by paragraph, with each lookup-able word in brackets.
pub fn write_chapter_dump(out: &mut impl Write, chapter: &Chapter) -> io::Result<()> {
    writeln!(out, "Chapter {}: {}", chapter.id, chapter.title)?;
    for paragraph in tokenizer::paragraphs(&chapter.content) {
        writeln!(out)?;
        let mut line = String::with_capacity(paragraph.text.len() * 2);
        for token in &paragraph.tokens {
            if token.is_word() {
                line.push('[');
                line.push_str(token.text);
                line.push(']');
            } else {
                line.push_str(token.text);
            }
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    fn chapter(id: u32, content: &str) -> Chapter {
        Chapter {
            id,
            title: format!("Chapitre {id}"),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["pilote", "-vv", "--dump", "--content", "c.json", "3"]);
        assert!(cli.dump);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.chapter, Some(3));
        assert_eq!(cli.content, Some(PathBuf::from("c.json")));

        let cli = Cli::parse_from(["pilote", "-t", "Bonjour"]);
        assert_eq!(cli.translate.as_deref(), Some("Bonjour"));
        assert_eq!(cli.chapter, None);
    }

    #[test]
    fn test_dump_brackets_words_only() {
        let mut out = Vec::new();
        write_chapter_dump(&mut out, &chapter(1, "Bonjour, le monde!\n\nEn 1876.")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Chapter 1: Chapitre 1\n\n[Bonjour], [le] [monde]!\n\n[En] 1876.\n"
        );
    }

    #[test]
    fn test_list_shows_previews_and_images() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("chapter2.png"), b"png").unwrap();
        let images = Illustrations::new(dir.path());
        let long = "a".repeat(200);
        let store = ChapterStore::new(vec![chapter(1, &long), chapter(2, "Court.")]);

        let mut out = Vec::new();
        write_chapter_list(&mut out, &store, &images).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("2 chapters"));
        assert!(text.contains(&format!("{}...", "a".repeat(120))));
        assert!(!text.contains(&"a".repeat(121)));
        assert!(text.contains("  2. Chapitre 2 [image]"));
        assert!(text.contains("  1. Chapitre 1\n"));
    }

    #[test]
    fn test_list_empty_state() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        write_chapter_list(&mut out, &ChapterStore::default(), &Illustrations::new(dir.path()))
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(EMPTY_LIBRARY));
        assert!(text.contains("npm run download"));
    }
}
