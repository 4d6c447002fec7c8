//! Parser for TAC tokens → program structure.
//!
//! Each line is first classified on its own ([`parse_line`]); the
//! [`ProgramBuilder`] then checks that lines appear in a valid order inside
//! `#start_function` / `#end_function` blocks and assembles the functions.

use crate::error::AsmError;
use crate::lexer::Token;
use tac_common::opcode::{Arity, OperandKind};
use tac_common::{
    Decl, Function, Index, Instruction, LabelDef, Opcode, Operand, Param, Program, ReturnType,
    ScalarType, VarType,
};

const START_FUNCTION: &str = "start_function";
const END_FUNCTION: &str = "end_function";
const INT_LIST: &str = "int-list";
const FLOAT_LIST: &str = "float-list";

/// A single classified line.
#[derive(Debug, PartialEq)]
pub(crate) enum Line {
    StartFunction,
    EndFunction,
    Header {
        return_type: ReturnType,
        name: String,
        params: Vec<Param>,
    },
    Decls {
        ty: ScalarType,
        decls: Vec<(String, Option<u32>)>,
    },
    Label(String),
    Instruction {
        label: Option<String>,
        instr: Instruction,
    },
}

/// Parse the tokens of one line.
///
/// Returns `Ok(None)` for blank lines (empty token list).
pub(crate) fn parse_line(tokens: &[Token], line: usize) -> Result<Option<Line>, AsmError> {
    let first = match tokens.first() {
        Some(tok) => tok,
        None => return Ok(None),
    };

    match first {
        Token::Directive(name) => {
            expect_end(&tokens[1..], line)?;
            match name.as_str() {
                START_FUNCTION => Ok(Some(Line::StartFunction)),
                END_FUNCTION => Ok(Some(Line::EndFunction)),
                _ => Err(unexpected(first, line)),
            }
        }
        Token::Ident(word) => {
            if is_header(tokens) {
                return parse_header(tokens, line).map(Some);
            }
            if tokens.get(1) == Some(&Token::Colon) {
                match word.as_str() {
                    INT_LIST => return parse_decls(ScalarType::Int, &tokens[2..], line).map(Some),
                    FLOAT_LIST => {
                        return parse_decls(ScalarType::Float, &tokens[2..], line).map(Some)
                    }
                    _ => {}
                }
                let rest = &tokens[2..];
                if rest.is_empty() {
                    return Ok(Some(Line::Label(word.clone())));
                }
                let instr = parse_instruction(rest, line)?;
                return Ok(Some(Line::Instruction {
                    label: Some(word.clone()),
                    instr,
                }));
            }
            let instr = parse_instruction(tokens, line)?;
            Ok(Some(Line::Instruction { label: None, instr }))
        }
        other => Err(unexpected(other, line)),
    }
}

/// `type name(` — a function header.
fn is_header(tokens: &[Token]) -> bool {
    matches!(
        tokens,
        [Token::Ident(ty), Token::Ident(_), Token::LParen, ..] if ReturnType::from_name(ty).is_some()
    )
}

fn parse_header(tokens: &[Token], line: usize) -> Result<Line, AsmError> {
    let return_type = match &tokens[0] {
        Token::Ident(ty) => ReturnType::from_name(ty).ok_or_else(|| AsmError::UnknownType {
            line,
            token: ty.clone(),
        })?,
        other => return Err(unexpected(other, line)),
    };
    let name = expect_ident(tokens, 1, line, "function name")?;

    let close = tokens
        .iter()
        .position(|t| *t == Token::RParen)
        .ok_or(AsmError::UnexpectedEndOfLine {
            line,
            expected: "')'",
        })?;
    let inner = &tokens[3..close];
    let mut params = Vec::new();
    if !inner.is_empty() {
        for segment in inner.split(|t| *t == Token::Comma) {
            params.push(parse_param(segment, line)?);
        }
    }

    let trailing = &tokens[close + 1..];
    match trailing {
        [] | [Token::Colon] => {}
        [Token::Colon, extra, ..] | [extra, ..] => return Err(unexpected(extra, line)),
    }

    Ok(Line::Header {
        return_type,
        name,
        params,
    })
}

/// `int x`, `float y`, or `int[100] A`.
fn parse_param(tokens: &[Token], line: usize) -> Result<Param, AsmError> {
    let ty = match tokens.first() {
        Some(Token::Ident(word)) => {
            ScalarType::from_name(word).ok_or_else(|| AsmError::UnknownType {
                line,
                token: word.clone(),
            })?
        }
        Some(other) => return Err(unexpected(other, line)),
        None => {
            return Err(AsmError::UnexpectedEndOfLine {
                line,
                expected: "parameter",
            })
        }
    };

    match &tokens[1..] {
        [Token::Ident(name)] => Ok(Param {
            name: name.clone(),
            ty: VarType::Scalar(ty),
        }),
        [Token::LBracket, Token::Int(len), Token::RBracket, Token::Ident(name)] => {
            let len = array_len(*len, line)?;
            Ok(Param {
                name: name.clone(),
                ty: VarType::Array { elem: ty, len },
            })
        }
        [] => Err(AsmError::UnexpectedEndOfLine {
            line,
            expected: "parameter name",
        }),
        [first, ..] => Err(unexpected(first, line)),
    }
}

/// Items after `int-list:` / `float-list:`.
fn parse_decls(ty: ScalarType, tokens: &[Token], line: usize) -> Result<Line, AsmError> {
    let mut decls = Vec::new();
    if tokens.is_empty() {
        return Ok(Line::Decls { ty, decls });
    }

    for segment in tokens.split(|t| *t == Token::Comma) {
        match segment {
            [Token::Ident(name)] => decls.push((name.clone(), None)),
            [Token::Ident(name), Token::LBracket, Token::Int(len), Token::RBracket] => {
                decls.push((name.clone(), Some(array_len(*len, line)?)));
            }
            [] => {
                return Err(AsmError::UnexpectedToken {
                    line,
                    token: ",".to_string(),
                })
            }
            [Token::Ident(_), Token::LBracket] | [Token::Ident(_), Token::LBracket, Token::Int(_)] => {
                return Err(AsmError::UnexpectedEndOfLine {
                    line,
                    expected: "']'",
                })
            }
            [Token::Ident(_), other, ..] => return Err(unexpected(other, line)),
            [other, ..] => return Err(unexpected(other, line)),
        }
    }

    Ok(Line::Decls { ty, decls })
}

fn array_len(len: i32, line: usize) -> Result<u32, AsmError> {
    u32::try_from(len).map_err(|_| AsmError::InvalidNumber {
        line,
        token: len.to_string(),
    })
}

/// `opcode, operand, operand, ...`
fn parse_instruction(tokens: &[Token], line: usize) -> Result<Instruction, AsmError> {
    let mut segments = tokens.split(|t| *t == Token::Comma);
    let head = segments.next().unwrap_or(&[]);

    let mnemonic = match head {
        [Token::Ident(word)] => word.as_str(),
        [Token::Ident(_), extra, ..] => return Err(unexpected(extra, line)),
        [other, ..] => return Err(unexpected(other, line)),
        [] => {
            return Err(AsmError::UnexpectedToken {
                line,
                token: ",".to_string(),
            })
        }
    };
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownOpcode {
        line,
        token: mnemonic.to_string(),
    })?;

    let raw: Vec<&[Token]> = segments.collect();

    if opcode == Opcode::Assign && raw.len() == 3 {
        return Err(AsmError::UnsupportedArrayAssign { line });
    }
    check_arity(opcode, raw.len(), line)?;

    let mut operands = Vec::with_capacity(raw.len());
    for (position, segment) in raw.iter().enumerate() {
        operands.push(parse_operand(opcode.operand_kind(position), segment, line)?);
    }

    Ok(Instruction::new(opcode, operands, line))
}

fn check_arity(opcode: Opcode, found: usize, line: usize) -> Result<(), AsmError> {
    let arity = opcode.arity();
    let ok = match arity {
        Arity::Exact(n) => found == n,
        Arity::AtLeast(n) => found >= n,
        Arity::Optional => found <= 1,
    };
    let expected = match arity {
        Arity::Exact(1) => "1",
        Arity::Exact(2) => "2",
        Arity::Exact(_) => "3",
        Arity::AtLeast(1) => "at least 1",
        Arity::AtLeast(_) => "at least 2",
        Arity::Optional => "0 or 1",
    };
    if ok {
        Ok(())
    } else {
        Err(AsmError::WrongOperandCount {
            line,
            opcode: opcode.mnemonic(),
            expected,
            found,
        })
    }
}

fn parse_operand(kind: OperandKind, tokens: &[Token], line: usize) -> Result<Operand, AsmError> {
    match kind {
        OperandKind::Label | OperandKind::Function | OperandKind::Array => {
            let name = match tokens {
                [Token::Ident(name)] => name.clone(),
                [Token::Ident(_), extra, ..] => return Err(unexpected(extra, line)),
                [other, ..] => return Err(unexpected(other, line)),
                [] => {
                    return Err(AsmError::UnexpectedToken {
                        line,
                        token: ",".to_string(),
                    })
                }
            };
            Ok(match kind {
                OperandKind::Label => Operand::Label(name),
                OperandKind::Function => Operand::Function(name),
                _ => Operand::Var(name),
            })
        }
        OperandKind::Dest | OperandKind::Value => match tokens {
            [Token::Ident(name)] => Ok(Operand::Var(name.clone())),
            [Token::Int(n)] => Ok(Operand::Int(*n)),
            [Token::Float(x)] => Ok(Operand::Float(*x)),
            [Token::Ident(array), Token::LBracket, index, Token::RBracket] => {
                let index = match index {
                    Token::Ident(var) => Index::Var(var.clone()),
                    Token::Int(n) => Index::Int(*n),
                    other => return Err(unexpected(other, line)),
                };
                Ok(Operand::Element {
                    array: array.clone(),
                    index,
                })
            }
            [Token::Ident(_), Token::LBracket, rest @ ..] => Err(match rest {
                [_, Token::RBracket, extra, ..] => unexpected(extra, line),
                [_, other, ..] => unexpected(other, line),
                _ => AsmError::UnexpectedEndOfLine {
                    line,
                    expected: "']'",
                },
            }),
            [_, extra, ..] => Err(unexpected(extra, line)),
            [] => Err(AsmError::UnexpectedToken {
                line,
                token: ",".to_string(),
            }),
            [other] => Err(unexpected(other, line)),
        },
    }
}

fn expect_ident(
    tokens: &[Token],
    idx: usize,
    line: usize,
    expected: &'static str,
) -> Result<String, AsmError> {
    match tokens.get(idx) {
        Some(Token::Ident(name)) => Ok(name.clone()),
        Some(other) => Err(unexpected(other, line)),
        None => Err(AsmError::UnexpectedEndOfLine { line, expected }),
    }
}

/// Check that there are no extra tokens.
fn expect_end(remaining: &[Token], line: usize) -> Result<(), AsmError> {
    match remaining.first() {
        Some(tok) => Err(unexpected(tok, line)),
        None => Ok(()),
    }
}

fn unexpected(token: &Token, line: usize) -> AsmError {
    AsmError::UnexpectedToken {
        line,
        token: token.to_string(),
    }
}

/// Where the builder is within the current function block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Just after `#start_function`; a header must follow.
    AwaitHeader,
    /// After the header; declaration lists may appear.
    Declarations,
    /// After the first label or instruction.
    Body,
}

/// Accumulates classified lines into functions.
#[derive(Debug, Default)]
pub(crate) struct ProgramBuilder {
    functions: Vec<Function>,
    open: Option<OpenFunction>,
}

#[derive(Debug)]
struct OpenFunction {
    start_line: usize,
    section: Section,
    function: Function,
    seen_int_list: bool,
    seen_float_list: bool,
}

impl ProgramBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one classified line.
    pub(crate) fn push(&mut self, parsed: Line, line: usize) -> Result<(), AsmError> {
        match parsed {
            Line::StartFunction => {
                if self.open.is_some() {
                    return Err(AsmError::NestedFunction { line });
                }
                self.open = Some(OpenFunction {
                    start_line: line,
                    section: Section::AwaitHeader,
                    function: Function::new(String::new(), ReturnType::Void, Vec::new()),
                    seen_int_list: false,
                    seen_float_list: false,
                });
                Ok(())
            }
            Line::EndFunction => {
                let open = self
                    .open
                    .take()
                    .ok_or(AsmError::UnmatchedEndFunction { line })?;
                if open.section == Section::AwaitHeader {
                    return Err(AsmError::ExpectedHeader { line });
                }
                self.functions.push(open.function);
                Ok(())
            }
            other => {
                let open = self
                    .open
                    .as_mut()
                    .ok_or(AsmError::OutsideFunction { line })?;
                open.accept(other, line)
            }
        }
    }

    /// Finish, failing if a block is still open.
    pub(crate) fn finish(self) -> Result<Program, AsmError> {
        if let Some(open) = self.open {
            return Err(AsmError::UnterminatedFunction {
                line: open.start_line,
            });
        }
        Ok(Program::new(self.functions))
    }
}

impl OpenFunction {
    fn accept(&mut self, parsed: Line, line: usize) -> Result<(), AsmError> {
        match (self.section, parsed) {
            (
                Section::AwaitHeader,
                Line::Header {
                    return_type,
                    name,
                    params,
                },
            ) => {
                self.function = Function::new(name, return_type, params);
                self.function.line = line;
                self.section = Section::Declarations;
                Ok(())
            }
            (Section::AwaitHeader, _) => Err(AsmError::ExpectedHeader { line }),
            (_, Line::Header { .. }) => Err(AsmError::UnexpectedToken {
                line,
                token: "function header".to_string(),
            }),
            (Section::Body, Line::Decls { .. }) => Err(AsmError::DeclAfterCode { line }),
            (Section::Declarations, Line::Decls { ty, decls }) => {
                let (seen, list) = match ty {
                    ScalarType::Int => (&mut self.seen_int_list, INT_LIST),
                    ScalarType::Float => (&mut self.seen_float_list, FLOAT_LIST),
                };
                if *seen {
                    return Err(AsmError::DuplicateDeclList { line, list });
                }
                *seen = true;
                let target = match ty {
                    ScalarType::Int => &mut self.function.int_decls,
                    ScalarType::Float => &mut self.function.float_decls,
                };
                target.extend(decls.into_iter().map(|(name, array_len)| Decl {
                    name,
                    ty,
                    array_len,
                    line,
                }));
                Ok(())
            }
            (_, Line::Label(name)) => {
                self.section = Section::Body;
                self.define_label(name, line);
                Ok(())
            }
            (_, Line::Instruction { label, instr }) => {
                self.section = Section::Body;
                if let Some(name) = label {
                    self.define_label(name, line);
                }
                self.function.instructions.push(instr);
                Ok(())
            }
            (_, Line::StartFunction | Line::EndFunction) => Err(AsmError::NestedFunction { line }),
        }
    }

    fn define_label(&mut self, name: String, line: usize) {
        let at = self.function.instructions.len();
        self.function.labels.push(LabelDef { name, at, line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_line;

    fn parse(text: &str) -> Result<Option<Line>, AsmError> {
        parse_line(&tokenize_line(text, 1).unwrap(), 1)
    }

    fn var(s: &str) -> Operand {
        Operand::Var(s.to_string())
    }

    #[test]
    fn parse_empty_tokens() {
        assert!(parse_line(&[], 1).unwrap().is_none());
    }

    #[test]
    fn parse_block_markers() {
        assert_eq!(parse("#start_function").unwrap(), Some(Line::StartFunction));
        assert_eq!(parse("#end_function").unwrap(), Some(Line::EndFunction));
        assert!(parse("#begin").is_err());
    }

    #[test]
    fn parse_header_with_params() {
        let line = parse("void quicksort(int[100] A, int lo, float hi):")
            .unwrap()
            .unwrap();
        match line {
            Line::Header {
                return_type,
                name,
                params,
            } => {
                assert_eq!(return_type, ReturnType::Void);
                assert_eq!(name, "quicksort");
                assert_eq!(params.len(), 3);
                assert_eq!(
                    params[0].ty,
                    VarType::Array {
                        elem: ScalarType::Int,
                        len: 100
                    }
                );
                assert_eq!(params[2].ty, VarType::Scalar(ScalarType::Float));
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn parse_header_without_colon_or_params() {
        let line = parse("int answer()").unwrap().unwrap();
        assert_eq!(
            line,
            Line::Header {
                return_type: ReturnType::Scalar(ScalarType::Int),
                name: "answer".to_string(),
                params: vec![],
            }
        );
    }

    #[test]
    fn parse_header_bad_param_type() {
        let err = parse("void f(double x)").unwrap_err();
        assert!(matches!(err, AsmError::UnknownType { .. }));
    }

    #[test]
    fn parse_decl_lists() {
        let line = parse("int-list: A[100], n, i").unwrap().unwrap();
        assert_eq!(
            line,
            Line::Decls {
                ty: ScalarType::Int,
                decls: vec![
                    ("A".to_string(), Some(100)),
                    ("n".to_string(), None),
                    ("i".to_string(), None),
                ],
            }
        );
        assert_eq!(
            parse("float-list:").unwrap().unwrap(),
            Line::Decls {
                ty: ScalarType::Float,
                decls: vec![],
            }
        );
    }

    #[test]
    fn parse_decl_negative_size() {
        let err = parse("int-list: A[-1]").unwrap_err();
        assert!(matches!(err, AsmError::InvalidNumber { .. }));
    }

    #[test]
    fn parse_decl_trailing_comma() {
        let err = parse("int-list: a, b,").unwrap_err();
        assert!(matches!(err, AsmError::UnexpectedToken { .. }));
    }

    #[test]
    fn parse_label_line() {
        assert_eq!(
            parse("loop0:").unwrap().unwrap(),
            Line::Label("loop0".to_string())
        );
        // Labels may share a name with an opcode.
        assert_eq!(
            parse("return:").unwrap().unwrap(),
            Line::Label("return".to_string())
        );
    }

    #[test]
    fn parse_three_address() {
        let line = parse("add, mid, lo, hi").unwrap().unwrap();
        match line {
            Line::Instruction { label: None, instr } => {
                assert_eq!(instr.opcode, Opcode::Add);
                assert_eq!(instr.operands, vec![var("mid"), var("lo"), var("hi")]);
            }
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn parse_labeled_instruction() {
        let line = parse("top: brgeq, end, lo, hi").unwrap().unwrap();
        match line {
            Line::Instruction {
                label: Some(label),
                instr,
            } => {
                assert_eq!(label, "top");
                assert_eq!(instr.operands[0], Operand::Label("end".to_string()));
            }
            other => panic!("expected labeled instruction, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_operands() {
        let line = parse("callr, n, geti").unwrap().unwrap();
        match line {
            Line::Instruction { instr, .. } => {
                assert_eq!(
                    instr.operands,
                    vec![var("n"), Operand::Function("geti".to_string())]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_element_operand() {
        let line = parse("assign, A[3], x").unwrap().unwrap();
        match line {
            Line::Instruction { instr, .. } => {
                assert_eq!(
                    instr.operands[0],
                    Operand::Element {
                        array: "A".to_string(),
                        index: Index::Int(3),
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_return_forms() {
        assert!(parse("return").is_ok());
        assert!(parse("return, x").is_ok());
        let err = parse("return, x, y").unwrap_err();
        assert!(matches!(
            err,
            AsmError::WrongOperandCount {
                opcode: "return",
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn parse_wrong_operand_count() {
        let err = parse("add, x, y").unwrap_err();
        assert_eq!(
            err,
            AsmError::WrongOperandCount {
                line: 1,
                opcode: "add",
                expected: "3",
                found: 2,
            }
        );
        let err = parse("callr, x").unwrap_err();
        assert!(matches!(
            err,
            AsmError::WrongOperandCount {
                expected: "at least 2",
                ..
            }
        ));
    }

    #[test]
    fn parse_unknown_opcode() {
        let err = parse("mul, x, y, z").unwrap_err();
        assert_eq!(
            err,
            AsmError::UnknownOpcode {
                line: 1,
                token: "mul".to_string()
            }
        );
    }

    #[test]
    fn parse_array_assign_is_unsupported() {
        let err = parse("assign, X, 100, 10").unwrap_err();
        assert_eq!(err, AsmError::UnsupportedArrayAssign { line: 1 });
    }

    #[test]
    fn parse_label_operand_must_be_name() {
        let err = parse("goto, 5").unwrap_err();
        assert!(matches!(err, AsmError::UnexpectedToken { .. }));
    }

    #[test]
    fn parse_empty_operand() {
        let err = parse("add, x, , y").unwrap_err();
        assert!(matches!(err, AsmError::UnexpectedToken { .. }));
    }

    #[test]
    fn builder_rejects_text_outside_block() {
        let mut builder = ProgramBuilder::new();
        let err = builder
            .push(Line::Label("stray".to_string()), 3)
            .unwrap_err();
        assert_eq!(err, AsmError::OutsideFunction { line: 3 });
    }

    #[test]
    fn builder_rejects_unterminated_block() {
        let mut builder = ProgramBuilder::new();
        builder.push(Line::StartFunction, 2).unwrap();
        assert_eq!(
            builder.finish().unwrap_err(),
            AsmError::UnterminatedFunction { line: 2 }
        );
    }

    #[test]
    fn builder_records_trailing_label_at_end() {
        let mut builder = ProgramBuilder::new();
        builder.push(Line::StartFunction, 1).unwrap();
        builder
            .push(
                Line::Header {
                    return_type: ReturnType::Void,
                    name: "main".to_string(),
                    params: vec![],
                },
                2,
            )
            .unwrap();
        builder.push(Line::Label("end".to_string()), 3).unwrap();
        builder.push(Line::EndFunction, 4).unwrap();
        let program = builder.finish().unwrap();
        let main = &program.functions[0];
        assert!(main.instructions.is_empty());
        assert_eq!(
            main.labels,
            vec![LabelDef {
                name: "end".to_string(),
                at: 0,
                line: 3
            }]
        );
    }
}
