use crate::token::Token;
use smallvec::SmallVec;
use smol_str::SmolStr;

/// Splits raw mod-file bytes into tokens.
///
/// The input is decoded as Latin-1: each byte maps straight to the Unicode
/// codepoint of the same value. This is deliberately not `encoding_rs`'s
/// `WINDOWS_1252` label, which reassigns the 0x80-0x9F range to Windows
/// codepage characters; raw files are single-byte text where byte N always
/// means codepoint N.
///
/// Three modes, matching the bracket grammar directly:
///
/// - `Comment`: outside any `[...]`. Every byte is discarded except `[`,
///   which opens a token and switches to `Name`.
/// - `Name`: reading the token name. `:` ends the name and switches to
///   `Args`; `]` ends the name and closes a single-fragment token.
/// - `Args`: reading the raw argument run up to the next `]`, at which
///   point the whole run is split on `:` in one pass (so `::` produces an
///   empty fragment rather than being collapsed).
///
/// `[` has no special meaning inside `Name` or `Args`; nested brackets
/// aren't supported and a stray `[` is just another character in the
/// current fragment. An unterminated bracket at end of file is silently
/// dropped rather than treated as an error.
pub fn lex(input: &[u8]) -> Vec<Token> {
    enum Mode {
        Comment,
        Name,
        Args,
    }

    let mut mode = Mode::Comment;
    let mut name = String::new();
    let mut args = String::new();
    let mut tokens = Vec::new();

    for &byte in input {
        let c = byte as char;
        match mode {
            Mode::Comment => {
                if c == '[' {
                    mode = Mode::Name;
                    name.clear();
                }
            }
            Mode::Name => match c {
                ':' => {
                    args.clear();
                    mode = Mode::Args;
                }
                ']' => {
                    tokens.push(Token::new([SmolStr::new(&name)]));
                    mode = Mode::Comment;
                }
                _ => name.push(c),
            },
            Mode::Args => match c {
                ']' => {
                    tokens.push(make_token(&name, &args));
                    mode = Mode::Comment;
                }
                _ => args.push(c),
            },
        }
    }

    tokens
}

fn make_token(name: &str, args: &str) -> Token {
    let mut fragments: SmallVec<[SmolStr; 4]> = SmallVec::new();
    fragments.push(SmolStr::new(name));
    fragments.extend(args.split(':').map(SmolStr::new));
    Token::new(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_token() {
        let tokens = lex(b"[CREATURE:BEAR]");
        assert_eq!(tokens, vec![Token::new(["CREATURE", "BEAR"])]);
    }

    #[test]
    fn test_name_only_token() {
        let tokens = lex(b"[EDIT]");
        assert_eq!(tokens, vec![Token::new(["EDIT"])]);
    }

    #[test]
    fn test_comment_text_is_discarded() {
        let tokens = lex(b"some comment text\n[A:1]\nmore text");
        assert_eq!(tokens, vec![Token::new(["A", "1"])]);
    }

    #[test]
    fn test_empty_fragment_from_double_colon() {
        let tokens = lex(b"[A::B]");
        assert_eq!(tokens, vec![Token::new(["A", "", "B"])]);
    }

    #[test]
    fn test_bracket_inside_body_has_no_effect() {
        let tokens = lex(b"[A:1[2:B]");
        assert_eq!(tokens, vec![Token::new(["A", "1[2", "B"])]);
    }

    #[test]
    fn test_unterminated_bracket_at_eof_is_dropped() {
        let tokens = lex(b"[A:1:B");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_unterminated_name_at_eof_is_dropped() {
        let tokens = lex(b"text [A");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_multiple_tokens_in_sequence() {
        let tokens = lex(b"[A:1][B:2:3][C]");
        assert_eq!(
            tokens,
            vec![
                Token::new(["A", "1"]),
                Token::new(["B", "2", "3"]),
                Token::new(["C"]),
            ]
        );
    }

    #[test]
    fn test_round_trip_through_display() {
        let original = Token::new(["PLUS_SELECT", "SEL_BY_CLASS", "MAMMAL"]);
        let rendered = original.to_string();
        let tokens = lex(rendered.as_bytes());
        assert_eq!(tokens, vec![original]);
    }

    #[test]
    fn test_high_byte_decodes_as_identity_codepoint() {
        // 0xE9 is e-acute in true Latin-1; under windows-1252 it's the same,
        // but 0x81 (undefined in windows-1252) must still decode to U+0081.
        let tokens = lex(&[b'[', b'A', b':', 0x81, b']']);
        let fragment = &tokens[0].args()[0];
        assert_eq!(fragment.chars().next(), Some('\u{0081}'));
    }
}
