/*!
  This module is responsible for the encoding and decoding of binary instructions.

*/

use super::{Operation, Instruction, MAX_SAMPLES_PER_INSTRUCTION, SAMPLE_SIZE};
use crate::error::ProtocolError;

/**
  Decodes the instruction whose opcode byte is at `offset`. Returns the instruction together with
  the offset of the byte just past it, or `None` when `offset` is at or past the end of `bytes`.
*/
pub fn decode_instruction(bytes: &[u8], offset: usize)
  -> Result<Option<(Instruction, usize)>, ProtocolError>
{
  let opcode = match bytes.get(offset) {
    Some(byte) => *byte,
    None       => return Ok(None)
  };
  let operation = Operation::try_from(opcode)
    .map_err(|_| ProtocolError::UnknownOpcode { opcode, offset })?;

  let payload_start = offset + 1;
  let header = take(bytes, payload_start, operation.header_size(), operation, offset)?;

  let instruction =
    match operation {
      Operation::Reset         => Instruction::Reset,
      Operation::SetLowerAbs   => Instruction::SetLowerAbs(header[0]),
      Operation::SetUpperAbs   => Instruction::SetUpperAbs(header[0]),
      Operation::SetLowerProp  => Instruction::SetLowerProp(header[0]),
      Operation::SetUpperProp  => Instruction::SetUpperProp(header[0]),
      Operation::SetWindowSize => {
        let mut word = [0u8; 4];
        word.copy_from_slice(header);
        Instruction::SetWindowSize(u32::from_be_bytes(word))
      }
      Operation::AddSamples    => {
        // [OpCode:8][Count:8][Sample:64]*Count
        let count = header[0] as usize;
        let sample_bytes = take(bytes, payload_start + 1, count * SAMPLE_SIZE, operation, offset)?;
        let samples =
          sample_bytes
            .chunks_exact(SAMPLE_SIZE)
            .map(|chunk| {
              let mut word = [0u8; SAMPLE_SIZE];
              word.copy_from_slice(chunk);
              f64::from_be_bytes(word)
            })
            .collect();
        return Ok(Some((Instruction::AddSamples(samples), payload_start + 1 + count * SAMPLE_SIZE)));
      }
    };

  Ok(Some((instruction, payload_start + operation.header_size())))
}

/// Borrows `needed` bytes starting at `start`, or reports the instruction at `offset` as truncated.
fn take(bytes: &[u8], start: usize, needed: usize, operation: Operation, offset: usize)
  -> Result<&[u8], ProtocolError>
{
  let available = bytes.len().saturating_sub(start);
  match available >= needed {
    true  => Ok(&bytes[start..start + needed]),
    false => Err(truncated(operation, offset, needed, available))
  }
}

fn truncated(operation: Operation, offset: usize, needed: usize, available: usize) -> ProtocolError {
  ProtocolError::TruncatedStream { operation, offset, needed, available }
}

/**
  Appends the binary encoding of `instruction` to `out`. An `AddSamples` instruction holding more
  than `MAX_SAMPLES_PER_INSTRUCTION` values is written as several consecutive `AddSamples`
  instructions, which the interpreter treats identically.
*/
pub fn encode_instruction(instruction: &Instruction, out: &mut Vec<u8>) {
  let opcode = instruction.operation().code();
  match instruction {

    Instruction::Reset => {
      // [OpCode:8]
      out.push(opcode);
    }

    | Instruction::SetLowerAbs(value)
    | Instruction::SetUpperAbs(value)
    | Instruction::SetLowerProp(value)
    | Instruction::SetUpperProp(value) => {
      // [OpCode:8][Value:8]
      out.push(opcode);
      out.push(*value);
    }

    Instruction::SetWindowSize(value) => {
      // [OpCode:8][Value:32]
      out.push(opcode);
      out.extend_from_slice(&value.to_be_bytes());
    }

    Instruction::AddSamples(samples) => {
      // [OpCode:8][Count:8][Sample:64]*Count
      if samples.is_empty() {
        out.push(opcode);
        out.push(0);
      }
      for chunk in samples.chunks(MAX_SAMPLES_PER_INSTRUCTION) {
        out.push(opcode);
        out.push(chunk.len() as u8);
        for sample in chunk {
          out.extend_from_slice(&sample.to_be_bytes());
        }
      }
    }

  }
}

/// Encodes a whole program into one byte buffer.
pub fn encode_program(instructions: &[Instruction]) -> Vec<u8> {
  let mut out = Vec::new();
  for instruction in instructions {
    encode_instruction(instruction, &mut out);
  }
  out
}

/**
  Walks a byte buffer one instruction at a time, yielding each instruction with the offset of its
  opcode byte. The end of the buffer ends the stream. A malformed instruction is yielded as an
  error exactly once, after which the stream is exhausted; there is no resynchronization.
*/
pub struct InstructionStream<'a> {
  bytes  : &'a [u8],
  offset : usize,
  failed : bool
}

impl<'a> InstructionStream<'a> {
  pub fn new(bytes: &'a [u8]) -> InstructionStream<'a> {
    InstructionStream {
      bytes,
      offset : 0,
      failed : false
    }
  }
}

impl<'a> Iterator for InstructionStream<'a> {
  type Item = Result<(usize, Instruction), ProtocolError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }

    let start = self.offset;
    match decode_instruction(self.bytes, start) {
      Ok(Some((instruction, next))) => {
        self.offset = next;
        Some(Ok((start, instruction)))
      }
      Ok(None)   => None,
      Err(error) => {
        self.failed = true;
        Some(Err(error))
      }
    }
  }
}
