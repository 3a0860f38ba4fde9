use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/**
  Opcodes of the stream language. The discriminant of each variant is the byte that identifies
  it on the wire, so `Operation::try_from(byte)` is the decoder's whole dispatch table. The
  `strum` derives give each opcode its assembly name.
*/
#[derive(
StrumDisplay, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,       Eq, PartialEq, Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  // Nullary //
  Reset         = 0x00, // Reset or Reset()

  // One byte payload //
  SetLowerAbs   = 0x01, // SetLowerAbs( u8 )
  SetUpperAbs   = 0x02, // SetUpperAbs( u8 )
  SetLowerProp  = 0x03, // SetLowerProp( u8 )
  SetUpperProp  = 0x04, // SetUpperProp( u8 )

  // Four byte payload //
  SetWindowSize = 0x05, // SetWindowSize( u32 )

  // Length prefixed payload //
  AddSamples    = 0x10, // AddSamples( f64, ... ), at most 255 on the wire
}

/// Size in bytes of one sample in an `AddSamples` payload.
pub const SAMPLE_SIZE: usize = 8;
/// An `AddSamples` count is a single byte.
pub const MAX_SAMPLES_PER_INSTRUCTION: usize = u8::MAX as usize;

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /**
    The number of payload bytes that follow the opcode byte and can be read without looking at
    the payload itself. For `AddSamples` this is only the count byte; the samples follow it.
  */
  pub fn header_size(&self) -> usize {
    match self {
      Operation::Reset         => 0,
      Operation::SetLowerAbs
      | Operation::SetUpperAbs
      | Operation::SetLowerProp
      | Operation::SetUpperProp  => 1,
      Operation::SetWindowSize => 4,
      Operation::AddSamples    => 1,
    }
  }

  /// Number of assembly operands, or `None` for the variadic `AddSamples`.
  pub fn arity(&self) -> Option<usize> {
    match self {
      Operation::Reset      => Some(0),
      Operation::AddSamples => None,
      _operation            => Some(1)
    }
  }
}

/**
  A decoded instruction: the opcode together with its payload. Instructions are produced one at
  a time by the decoder and consumed immediately by the interpreter.
*/
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
  Reset,
  SetLowerAbs(u8),
  SetUpperAbs(u8),
  SetLowerProp(u8),
  SetUpperProp(u8),
  SetWindowSize(u32),
  /// At most `MAX_SAMPLES_PER_INSTRUCTION` values when decoded from a stream.
  AddSamples(Vec<f64>),
}

impl Instruction {
  pub fn operation(&self) -> Operation {
    match self {
      Instruction::Reset            => Operation::Reset,
      Instruction::SetLowerAbs(_)   => Operation::SetLowerAbs,
      Instruction::SetUpperAbs(_)   => Operation::SetUpperAbs,
      Instruction::SetLowerProp(_)  => Operation::SetLowerProp,
      Instruction::SetUpperProp(_)  => Operation::SetUpperProp,
      Instruction::SetWindowSize(_) => Operation::SetWindowSize,
      Instruction::AddSamples(_)    => Operation::AddSamples,
    }
  }
}

// The `Display` form is the assembly syntax accepted by `parse_assembly`. Samples use `{:?}`
// so that they are written with enough digits to read back the identical value.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let opcode = self.operation();
    match self {

      Instruction::Reset => {
        write!(f, "{}", opcode)
      }

      | Instruction::SetLowerAbs(value)
      | Instruction::SetUpperAbs(value)
      | Instruction::SetLowerProp(value)
      | Instruction::SetUpperProp(value) => {
        write!(f, "{}({})", opcode, value)
      }

      Instruction::SetWindowSize(value) => {
        write!(f, "{}({})", opcode, value)
      }

      Instruction::AddSamples(samples) => {
        write!(
          f,
          "{}({})",
          opcode,
          samples
            .iter()
            .map(|sample| format!("{:?}", sample))
            .collect::<Vec<String>>()
            .join(", ")
        )
      }

    }
  }
}
