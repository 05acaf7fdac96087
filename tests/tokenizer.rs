use pilote::models::TokenKind;
use pilote::tokenizer::{is_word, paragraphs, tokenize};

const SAMPLES: &[&str] = &[
    "",
    "   ",
    "Bonjour, le monde!",
    "« Qu’est-ce que c’est ? » demanda-t-il.",
    "Le 4 août 1869, à Sigmaringen...",
    "--- ' - ’ ---",
    "aujourd'hui--demain",
    "Œuvre ÇA été\tÎle\nfin",
    "Пілот du Danube",
    "'' a '' b ''",
];

#[test]
fn test_tokens_concatenate_back_to_input() {
    for sample in SAMPLES {
        let rebuilt: String = tokenize(sample).iter().map(|t| t.text).collect();
        assert_eq!(&rebuilt, sample);
    }
}

#[test]
fn test_tokens_alternate_and_are_never_empty() {
    for sample in SAMPLES {
        let tokens = tokenize(sample);
        assert!(tokens.iter().all(|t| !t.text.is_empty()), "{sample:?}");
        for pair in tokens.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "{sample:?}");
        }
    }
}

#[test]
fn test_word_tokens_are_lookup_able() {
    for sample in SAMPLES {
        for token in tokenize(sample) {
            assert_eq!(token.kind == TokenKind::Word, is_word(token.text), "{:?}", token.text);
        }
    }
}

#[test]
fn test_digits_and_other_scripts_are_not_words() {
    let words: Vec<&str> = tokenize("Le 4 août 1869, Пілот")
        .into_iter()
        .filter(|t| t.is_word())
        .map(|t| t.text)
        .collect();
    assert_eq!(words, vec!["Le", "août"]);
}

#[test]
fn test_paragraphs_split_on_blank_lines() {
    let content = "Premier paragraphe.\n\n  \nDeuxième\nligne.\n\n\nTroisième.";
    let paragraphs = paragraphs(content);
    let texts: Vec<&str> = paragraphs.iter().map(|p| p.text).collect();
    assert_eq!(texts, vec!["Premier paragraphe.", "Deuxième\nligne.", "Troisième."]);
    assert_eq!(paragraphs[2].index, 2);
    assert_eq!(paragraphs[1].tokens[0].text, "Deuxième");
}
