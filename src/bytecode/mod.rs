/*!

  The stream is a flat sequence of byte-aligned instructions with no header and no padding. Each
  instruction is an 8 bit opcode followed by a payload whose size is fixed by the opcode, except
  for `AddSamples`, whose payload is length prefixed. Multi-byte fields are big-endian:

    Reset          [OpCode:8]
    SetLowerAbs    [OpCode:8][Count:8]
    SetUpperAbs    [OpCode:8][Count:8]
    SetLowerProp   [OpCode:8][Percent:8]
    SetUpperProp   [OpCode:8][Percent:8]
    SetWindowSize  [OpCode:8][Size:32]
    AddSamples     [OpCode:8][Count:8][Sample:64]*Count   (IEEE-754 double)

  Unlike a register machine's bytecode, instructions here are decoded into an enum whose variants
  carry their payloads. Instructions are never stored; each one is consumed as soon as it is
  decoded, so the size of the enum is irrelevant and the closed variant type lets the compiler
  check that every opcode is handled.

*/

mod binary;
mod instruction;
mod assembly;

pub use binary::{decode_instruction, encode_instruction, encode_program, InstructionStream};
pub use instruction::{Instruction, Operation, MAX_SAMPLES_PER_INSTRUCTION, SAMPLE_SIZE};
pub use assembly::{parse_assembly, disassemble};
