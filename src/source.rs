use crate::ast::Program;
use crate::ir::IrProgram;
use crate::irgen;
use crate::lexer::Lexer;
use crate::parser::{ParseError, Parser};

/// Lexes and parses source text into a program.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser::new(tokens);
    parser.parse()
}

/// Lexes, parses, and lowers source text straight to IR.
pub fn lower_source(source: &str) -> Result<IrProgram, ParseError> {
    Ok(irgen::generate(&parse_source(source)?))
}
