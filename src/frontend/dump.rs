use crate::frontend::ast::Instruction;
use crate::frontend::source::Unit;
use crate::frontend::token::{Family, Token};

/// Renders the unit's parsed procedures back to canonical assembly text.
///
/// Instruction lines are indented by two spaces, labels are flush left, and
/// every procedure is wrapped in `PROC <name>` / `END`.
pub fn proc_dump(unit: &Unit) -> String {
    let mut out = String::new();

    for proc in &unit.procs {
        out.push_str(&format!("PROC {}\n", unit.text(&proc.name)));
        for ins in &proc.body {
            out.push_str(&render_instruction(unit, ins));
            out.push('\n');
        }
        out.push_str("END\n");
    }

    out
}

fn render_instruction(unit: &Unit, ins: &Instruction) -> String {
    let text = |token: Option<Token>| token.map(|t| unit.text(&t)).unwrap_or_default();
    let op = unit.text(&ins.op);

    match ins.family() {
        Some(Family::Load(_) | Family::Arithmetic(..) | Family::Compare(_)) => {
            format!("  {} {} {}", op, text(ins.dst), text(ins.src))
        }
        Some(Family::CondJump(..)) => format!(
            "  {} {} {} {}",
            op,
            text(ins.dst),
            text(ins.src),
            text(ins.label)
        ),
        Some(Family::Jump) => format!("  {} {}", op, text(ins.label)),
        Some(Family::Label) => format!("{}:", op),
        Some(Family::Halt) => format!("  {}", op),
        None => "  INVALID OP".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::scan;
    use crate::frontend::parser::parse;
    use crate::frontend::token::TokenKind;

    fn parsed(source: &str) -> Unit {
        let mut unit = Unit::from_source(source);
        assert!(scan(&mut unit), "{:?}", unit.errors);
        assert!(parse(&mut unit), "{:?}", unit.errors);
        unit
    }

    /// (opcode kind, operand kinds) per instruction, per procedure.
    fn shape(unit: &Unit) -> Vec<Vec<(TokenKind, Vec<TokenKind>)>> {
        unit.procs
            .iter()
            .map(|p| {
                p.body
                    .iter()
                    .map(|i| {
                        let operands = [i.dst, i.src, i.label]
                            .into_iter()
                            .flatten()
                            .map(|t| t.kind)
                            .collect();
                        (i.op.kind, operands)
                    })
                    .collect()
            })
            .collect()
    }

    const PROGRAM: &str = "proc main\n\
        i32_load r0 5\n\
        i32_load r1 0x3\n\
        again:\n\
        i32_add r0 r1\n\
        i32_cmp r0 r2\n\
        i32_jl r0 r2 again\n\
        jmp done\n\
        done:\n\
        halt\n\
        end\n\
        proc empty\n";

    #[test]
    fn test_dump_format() {
        let unit = parsed(PROGRAM);
        assert_eq!(
            proc_dump(&unit),
            "PROC main\n\
             \x20 i32_load r0 5\n\
             \x20 i32_load r1 0x3\n\
             again:\n\
             \x20 i32_add r0 r1\n\
             \x20 i32_cmp r0 r2\n\
             \x20 i32_jl r0 r2 again\n\
             \x20 jmp done\n\
             done:\n\
             \x20 halt\n\
             END\n\
             PROC empty\n\
             END\n"
        );
    }

    #[test]
    fn test_dump_round_trip() {
        let first = parsed(PROGRAM);
        let second = parsed(&proc_dump(&first));
        assert_eq!(shape(&first), shape(&second));
        assert_eq!(proc_dump(&first), proc_dump(&second));
    }

    #[test]
    fn test_invalid_op_marker() {
        let mut unit = parsed("proc p halt end");
        // Hand-built instruction whose opcode starts no family.
        let mut bogus = unit.procs[0].body[0];
        bogus.op.kind = TokenKind::Colon;
        unit.procs[0].body.push(bogus);

        assert_eq!(proc_dump(&unit), "PROC p\n  halt\n  INVALID OP\nEND\n");
    }
}
