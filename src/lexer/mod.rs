pub mod token;
pub use token::is_keyword;

use logos::Logos;

use crate::diagnostics::CompileError;
use crate::span::{LineIndex, Spanned};
use token::Token;

pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, CompileError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = index.span(range.start, range.end);
        match result {
            Ok(tok) => tokens.push(Spanned::new(tok, span)),
            Err(()) => {
                let text = &source[range.start..range.end];
                let msg = if text.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("integer literal '{text}' out of range")
                } else {
                    format!("unexpected character '{text}'")
                };
                return Err(CompileError::syntax(msg, span));
            }
        }
    }

    // `1.2.3` lexes as FloatLit(1.2) Dot IntLit(3); reject it instead of treating it as a field access.
    for pair in tokens.windows(2) {
        if matches!(pair[0].node, Token::FloatLit(_))
            && matches!(pair[1].node, Token::Dot)
            && pair[0].span.end == pair[1].span.start
        {
            return Err(CompileError::syntax(
                "invalid number format: multiple decimal points",
                pair[0].span.to(pair[1].span),
            ));
        }
    }

    Ok(tokens)
}
