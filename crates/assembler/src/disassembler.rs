//! Disassembler: program structure → canonical text.
//!
//! Output format is flat text: no indentation, no comments, no blank lines.
//! Every label gets a line of its own directly before the instruction it
//! marks; labels at the end of a body follow the last instruction.

use tac_common::{Decl, Function, Program};

/// Disassemble a program into canonical text.
///
/// Reassembling the output yields a program with the same functions,
/// declarations, labels and instructions. Source line numbers follow the
/// canonical layout.
pub fn disassemble(program: &Program) -> String {
    let mut lines = Vec::new();
    for function in &program.functions {
        function_lines(function, &mut lines);
    }

    let mut output = lines.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

fn function_lines(function: &Function, lines: &mut Vec<String>) {
    lines.push("#start_function".to_string());

    let params: Vec<String> = function
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect();
    lines.push(format!(
        "{} {}({}):",
        function.return_type,
        function.name,
        params.join(", ")
    ));

    if !function.int_decls.is_empty() {
        lines.push(format!("int-list: {}", decl_list(&function.int_decls)));
    }
    if !function.float_decls.is_empty() {
        lines.push(format!("float-list: {}", decl_list(&function.float_decls)));
    }

    let mut labels = function.labels.iter().peekable();
    for (idx, instr) in function.instructions.iter().enumerate() {
        while let Some(label) = labels.next_if(|l| l.at <= idx) {
            lines.push(format!("{}:", label.name));
        }
        lines.push(instr.to_string());
    }
    for label in labels {
        lines.push(format!("{}:", label.name));
    }

    lines.push("#end_function".to_string());
}

fn decl_list(decls: &[Decl]) -> String {
    decls
        .iter()
        .map(|d| match d.array_len {
            Some(len) => format!("{}[{len}]", d.name),
            None => d.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
