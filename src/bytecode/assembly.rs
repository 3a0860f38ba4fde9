/*!
  The human readable textual form of the opcode stream is called assembly. This module leverages
  the `strum` derives of `Operation` to read assembly, and `Instruction`'s `Display` to write it.

  One instruction per line, written as the operation name followed by a parenthesized operand
  list, which may be omitted for `Reset`. A `%` starts a comment that runs to the end of the line.

  ```text
  SetWindowSize(4)
  SetLowerAbs(1)     % trim the smallest value
  SetUpperProp(25)
  AddSamples(10, 20, 30.5, 40)
  Reset
  ```
*/

use std::str::FromStr;

use nom::{
  character::complete::{
    alphanumeric1,
    char as one_char,
    space0
  },
  bytes::complete::is_not,
  combinator::{all_consuming, map, opt},
  multi::separated_list0,
  sequence::{
    delimited,
    pair,
    preceded,
    terminated
  },
  IResult
};

use crate::bytecode::{
  Instruction,
  InstructionStream,
  Operation,
  MAX_SAMPLES_PER_INSTRUCTION
};
use crate::error::{AssemblyError, ProtocolError};

/// Parses assembly text into the instructions it lists, in order.
pub fn parse_assembly(text: &str) -> Result<Vec<Instruction>, AssemblyError> {
  let mut instructions = Vec::new();

  for (idx, raw_line) in text.lines().enumerate() {
    let line = idx + 1;
    let code = match raw_line.split('%').next() {
      Some(code) => code.trim(),
      None       => continue
    };
    if code.is_empty() {
      continue;
    }

    let (name, operands) = match line_p(code) {
      Ok((_rest, parsed)) => parsed,
      Err(_e)             => return Err(AssemblyError::Syntax { line })
    };
    instructions.push(assemble(line, name, operands)?);
  }

  Ok(instructions)
}

// Each line is `Name` or `Name(operand, ...)`.
fn line_p(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
  all_consuming(
    terminated(
      pair(alphanumeric1, operands_p),
      space0
    )
  )(input)
}

// A bare name has no operands.
fn operands_p(input: &str) -> IResult<&str, Vec<&str>> {
  map(
    opt(preceded(space0, operand_list_p)),
    |list: Option<Vec<&str>>| list.unwrap_or_default()
  )(input)
}

fn operand_list_p(input: &str) -> IResult<&str, Vec<&str>> {
  delimited(
    terminated(one_char('('), space0),
    separated_list0(one_char(','), operand_p),
    one_char(')')
  )(input)
}

fn operand_p(input: &str) -> IResult<&str, &str> {
  delimited(space0, is_not(",() \t"), space0)(input)
}

fn assemble(line: usize, name: &str, operands: Vec<&str>) -> Result<Instruction, AssemblyError> {
  let operation = Operation::from_str(name).map_err(|_| {
    AssemblyError::NotAnOperation { line, name: name.to_string() }
  })?;

  if let Some(expected) = operation.arity() {
    if operands.len() != expected {
      return Err(AssemblyError::WrongArity { line, operation, expected, found: operands.len() });
    }
  }

  let instruction =
    match operation {
      Operation::Reset         => Instruction::Reset,
      Operation::SetLowerAbs   => Instruction::SetLowerAbs(parse_integer(line, operation, operands[0])?),
      Operation::SetUpperAbs   => Instruction::SetUpperAbs(parse_integer(line, operation, operands[0])?),
      Operation::SetLowerProp  => Instruction::SetLowerProp(parse_integer(line, operation, operands[0])?),
      Operation::SetUpperProp  => Instruction::SetUpperProp(parse_integer(line, operation, operands[0])?),
      Operation::SetWindowSize => Instruction::SetWindowSize(parse_integer(line, operation, operands[0])?),
      Operation::AddSamples    => {
        if operands.len() > MAX_SAMPLES_PER_INSTRUCTION {
          return Err(AssemblyError::TooManySamples { line, count: operands.len() });
        }
        let samples =
          operands
            .iter()
            .map(|operand| operand.parse::<f64>().map_err(|_| AssemblyError::Syntax { line }))
            .collect::<Result<Vec<f64>, AssemblyError>>()?;
        Instruction::AddSamples(samples)
      }
    };

  Ok(instruction)
}

/// An operand that is an integer but not a valid `T` is out of range; anything else is a syntax error.
fn parse_integer<T: FromStr>(line: usize, operation: Operation, operand: &str) -> Result<T, AssemblyError> {
  match operand.parse::<T>() {
    Ok(value) => Ok(value),
    Err(_e) if operand.parse::<i128>().is_ok() => {
      Err(AssemblyError::OperandOutOfRange { line, operation, operand: operand.to_string() })
    }
    Err(_e) => Err(AssemblyError::Syntax { line })
  }
}

/**
  Appends one assembly line per instruction in `bytes` to `listing`, each followed by a comment
  giving the offset of its opcode byte. Lines decoded before a malformed instruction stay in
  `listing` when the error is returned.
*/
pub fn disassemble(bytes: &[u8], listing: &mut Vec<String>) -> Result<(), ProtocolError> {
  for decoded in InstructionStream::new(bytes) {
    let (offset, instruction) = decoded?;
    listing.push(format!("{:<32} % {:#06x}", instruction.to_string(), offset));
  }
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::encode_program;

  #[test]
  fn parse_program(){
    let text = "
% A comment on its own line
SetWindowSize(4)
  SetLowerAbs( 1 )     % trailing comment
SetUpperProp(25)

AddSamples(10, 20.5, -3e2, inf)
Reset
Reset()
AddSamples()
";
    let instructions = parse_assembly(text).unwrap();
    assert_eq!(
      instructions,
      vec![
        Instruction::SetWindowSize(4),
        Instruction::SetLowerAbs(1),
        Instruction::SetUpperProp(25),
        Instruction::AddSamples(vec![10.0, 20.5, -300.0, f64::INFINITY]),
        Instruction::Reset,
        Instruction::Reset,
        Instruction::AddSamples(vec![]),
      ]
    );
  }

  #[test]
  fn display_reads_back(){
    let program = vec![
      Instruction::SetLowerProp(10),
      Instruction::SetWindowSize(u32::MAX),
      Instruction::AddSamples(vec![0.1, 1e300, -0.0, 5e-324]),
      Instruction::Reset,
    ];
    let text =
      program
        .iter()
        .map(Instruction::to_string)
        .collect::<Vec<String>>()
        .join("\n");
    assert_eq!(parse_assembly(&text).unwrap(), program);
  }

  #[test]
  fn unknown_name(){
    assert_eq!(
      parse_assembly("Reset\nSetMiddle(3)"),
      Err(AssemblyError::NotAnOperation { line: 2, name: "SetMiddle".to_string() })
    );
  }

  #[test]
  fn wrong_arity(){
    assert_eq!(
      parse_assembly("SetLowerAbs(1, 2)"),
      Err(AssemblyError::WrongArity {
        line      : 1,
        operation : Operation::SetLowerAbs,
        expected  : 1,
        found     : 2
      })
    );
    assert!(matches!(
      parse_assembly("SetWindowSize"),
      Err(AssemblyError::WrongArity { expected: 1, found: 0, .. })
    ));
  }

  #[test]
  fn operand_out_of_range(){
    assert!(matches!(
      parse_assembly("SetUpperAbs(256)"),
      Err(AssemblyError::OperandOutOfRange { line: 1, operation: Operation::SetUpperAbs, .. })
    ));
    assert!(matches!(
      parse_assembly("SetWindowSize(-1)"),
      Err(AssemblyError::OperandOutOfRange { operation: Operation::SetWindowSize, .. })
    ));
    assert_eq!(parse_assembly("SetLowerAbs(x)"), Err(AssemblyError::Syntax { line: 1 }));
  }

  #[test]
  fn too_many_samples(){
    let operands = vec!["1"; 256].join(", ");
    assert_eq!(
      parse_assembly(&format!("AddSamples({})", operands)),
      Err(AssemblyError::TooManySamples { line: 1, count: 256 })
    );
  }

  #[test]
  fn syntax_errors(){
    assert_eq!(parse_assembly("SetLowerAbs(1"), Err(AssemblyError::Syntax { line: 1 }));
    assert_eq!(parse_assembly("\n\nAddSamples(1, )"), Err(AssemblyError::Syntax { line: 3 }));
    assert_eq!(parse_assembly("AddSamples(one)"), Err(AssemblyError::Syntax { line: 1 }));
    assert_eq!(parse_assembly("Reset Reset"), Err(AssemblyError::Syntax { line: 1 }));
  }

  #[test]
  fn disassembly_reassembles(){
    let program = vec![
      Instruction::SetWindowSize(2),
      Instruction::AddSamples(vec![1.0, 3.0]),
      Instruction::Reset,
    ];
    let mut listing = Vec::new();
    disassemble(&encode_program(&program), &mut listing).unwrap();

    assert_eq!(listing.len(), 3);
    assert!(listing[1].starts_with("AddSamples(1.0, 3.0)"));
    assert!(listing[1].ends_with("% 0x0005"));
    assert_eq!(parse_assembly(&listing.join("\n")).unwrap(), program);
  }

  #[test]
  fn disassembly_keeps_lines_before_error(){
    let mut listing = Vec::new();
    let result = disassemble(&[0x00, 0x07], &mut listing);
    assert_eq!(result, Err(ProtocolError::UnknownOpcode { opcode: 0x07, offset: 1 }));
    assert_eq!(listing.len(), 1);
  }
}
