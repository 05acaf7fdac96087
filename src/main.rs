use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use pilote::{
    cli::{Cli, write_chapter_dump, write_chapter_list},
    config::Config,
    content::{ChapterStore, Illustrations},
    error::ReaderError,
    logging::{self, LogLevel},
    tokenizer,
    translation::TranslationClient,
    ui::reader::Reader,
};

use clap::Parser;
use eyre::Result;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(LogLevel::from_verbosity(cli.verbose, cli.debug));

    let mut config = load_config(&cli)?;
    if let Some(content) = &cli.content {
        config.settings.content_path = content.display().to_string();
    }

    if let Some(word) = &cli.translate {
        return translate_word(&config, word);
    }

    let store = match ChapterStore::load(&PathBuf::from(&config.settings.content_path)) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    if cli.list {
        let images = Illustrations::new(&config.settings.images_dir);
        write_chapter_list(&mut io::stdout().lock(), &store, &images)?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.dump {
        return dump_chapters(&store, cli.chapter);
    }

    if let Err(err) = logging::init_file(&config.log_path()) {
        eprintln!("Warning: could not open log file: {err}");
    }
    let mut reader = Reader::new(config, store)?;
    reader.open(cli.chapter);
    reader.run()?;
    Ok(ExitCode::SUCCESS)
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load_from(path.clone());
    }
    match Config::new() {
        Ok(config) => Ok(config),
        Err(err) => {
            eprintln!("Warning: Could not load configuration: {err}");
            eprintln!("Starting with default settings");
            Config::load_from(PathBuf::from("configuration.json"))
        }
    }
}

fn translate_word(config: &Config, word: &str) -> Result<ExitCode> {
    if !tokenizer::is_word(word) {
        eprintln!("Not a word: {word:?}");
        return Ok(ExitCode::FAILURE);
    }
    let client = TranslationClient::from_settings(&config.settings)?;
    match client.fetch(word.trim()) {
        Ok(translation) => {
            println!("{}", translation.text());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn dump_chapters(store: &ChapterStore, chapter: Option<u32>) -> Result<ExitCode> {
    let mut out = io::stdout().lock();
    match chapter {
        Some(id) => match store.get(id) {
            Ok(chapter) => write_chapter_dump(&mut out, chapter)?,
            Err(err @ ReaderError::ChapterNotFound(_)) => {
                eprintln!("{err}");
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => return Err(err.into()),
        },
        None => {
            for (i, chapter) in store.chapters().iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                write_chapter_dump(&mut out, chapter)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
