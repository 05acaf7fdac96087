use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Token, TokenKind};

/// Letters, apostrophes (straight and typographic) and hyphens.
static WORD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{Latin}'’\-]+").unwrap());
static LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Latin}").unwrap());
static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph<'a> {
    pub index: usize,
    pub text: &'a str,
    pub tokens: Vec<Token<'a>>,
}

pub fn contains_letter(text: &str) -> bool {
    LETTER.is_match(text)
}

/// True when `text`, once trimmed, is something worth translating.
pub fn is_word(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && contains_letter(trimmed)
}

/// Split `content` into alternating word and separator tokens.
///
/// Concatenating the `text` of every token gives back `content` unchanged.
/// A run of apostrophes or hyphens with no letter in it is folded into the
/// surrounding separator.
pub fn tokenize(content: &str) -> Vec<Token<'_>> {
    let mut spans: Vec<(usize, usize, TokenKind)> = Vec::new();
    let mut push = |start: usize, end: usize, kind: TokenKind| {
        if start == end {
            return;
        }
        if let Some(last) = spans.last_mut()
            && last.2 == TokenKind::Separator
            && kind == TokenKind::Separator
        {
            last.1 = end;
            return;
        }
        spans.push((start, end, kind));
    };

    let mut cursor = 0;
    for run in WORD_RUN.find_iter(content) {
        push(cursor, run.start(), TokenKind::Separator);
        let kind = if contains_letter(run.as_str()) {
            TokenKind::Word
        } else {
            TokenKind::Separator
        };
        push(run.start(), run.end(), kind);
        cursor = run.end();
    }
    push(cursor, content.len(), TokenKind::Separator);

    spans
        .into_iter()
        .map(|(start, end, kind)| Token {
            text: &content[start..end],
            kind,
        })
        .collect()
}

/// Split on blank lines, trim each paragraph and tokenize it on its own.
pub fn paragraphs(content: &str) -> Vec<Paragraph<'_>> {
    PARAGRAPH_BREAK
        .split(content)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(index, text)| Paragraph {
            index,
            text,
            tokens: tokenize(text),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.text).collect()
    }

    fn kinds(tokens: &[Token<'_>]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_bonjour_le_monde() {
        let tokens = tokenize("Bonjour, le monde!");
        assert_eq!(texts(&tokens), vec!["Bonjour", ", ", "le", " ", "monde", "!"]);
        use TokenKind::{Separator as S, Word as W};
        assert_eq!(kinds(&tokens), vec![W, S, W, S, W, S]);
    }

    #[test]
    fn test_accents_apostrophes_and_hyphens_stay_in_words() {
        let tokens = tokenize("L'été, aujourd’hui, Peut-être Œuvre ça");
        let words: Vec<&str> = tokens.iter().filter(|t| t.is_word()).map(|t| t.text).collect();
        assert_eq!(words, vec!["L'été", "aujourd’hui", "Peut-être", "Œuvre", "ça"]);
    }

    #[test]
    fn test_lone_dash_is_a_separator() {
        let tokens = tokenize("Serge - pilote");
        assert_eq!(texts(&tokens), vec!["Serge", " - ", "pilote"]);
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Word, TokenKind::Separator, TokenKind::Word]
        );
    }

    #[test]
    fn test_digits_are_not_words() {
        let tokens = tokenize("En 1876, à Sigmaringen");
        assert_eq!(texts(&tokens), vec!["En", " 1876, ", "à", " ", "Sigmaringen"]);
    }

    #[test]
    fn test_empty_and_separator_only_input() {
        assert!(tokenize("").is_empty());
        let tokens = tokenize("  ... 42 !");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Separator);
    }

    #[test]
    fn test_tokens_alternate_and_are_never_empty() {
        let content = "« Non ! » répondit-il -- puis, l'air grave : 'oui'.";
        let tokens = tokenize(content);
        assert!(tokens.iter().all(|t| !t.text.is_empty()));
        for pair in tokens.windows(2) {
            assert!(pair[0].kind == TokenKind::Word || pair[1].kind == TokenKind::Word);
        }
        assert_eq!(texts(&tokens).concat(), content);
    }

    #[test]
    fn test_is_word() {
        assert!(is_word("  Danube "));
        assert!(is_word("écluse"));
        assert!(!is_word(", "));
        assert!(!is_word("1876"));
        assert!(!is_word("'-"));
        assert!(!is_word(""));
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let content = "Premier paragraphe.\nSuite.\n\n  \n\nDeuxième paragraphe.\r\n\r\nTroisième.\n\n";
        let paras = paragraphs(content);
        let texts: Vec<&str> = paras.iter().map(|p| p.text).collect();
        assert_eq!(
            texts,
            vec!["Premier paragraphe.\nSuite.", "Deuxième paragraphe.", "Troisième."]
        );
        assert_eq!(paras[2].index, 2);
        assert_eq!(paras[1].tokens[0].text, "Deuxième");
    }

    #[test]
    fn test_round_trip_on_mixed_scripts() {
        let samples = [
            "Bonjour, le monde!",
            "Çà et là — 12 ½ lieues…",
            "tab\there\r\nnew line",
            "🙂 émoji-fin",
            "'''---'''",
            "Ukrainian: річка, French: rivière",
        ];
        for sample in samples {
            assert_eq!(texts(&tokenize(sample)).concat(), sample, "sample {sample:?}");
        }
    }
}
