/*!
  Error types. A `ProtocolError` is raised by the binary decoder and aborts the remainder of the
  stream. An `AssemblyError` is raised while parsing assembly text, and an `InputError` while
  turning base64 text lines into bytes.
*/

use thiserror::Error;

use crate::bytecode::Operation;

/// The stream is malformed. Both variants are terminal for the stream being decoded.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ProtocolError {
  /// The buffer ended before the payload declared by `operation` was fully available.
  #[error("truncated stream: {operation} at byte {offset} needs {needed} payload bytes but only {available} remain")]
  TruncatedStream {
    operation : Operation,
    offset    : usize,
    needed    : usize,
    available : usize
  },

  /// The byte at `offset` is not an opcode.
  #[error("unknown opcode {opcode:#04x} at byte {offset}")]
  UnknownOpcode {
    opcode : u8,
    offset : usize
  },
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum AssemblyError {
  #[error("error on line {line}: {name} is not an operation")]
  NotAnOperation {
    line : usize,
    name : String
  },

  #[error("error on line {line}: {operation} requires {expected} arguments but was given {found}")]
  WrongArity {
    line      : usize,
    operation : Operation,
    expected  : usize,
    found     : usize
  },

  #[error("error on line {line}: operand {operand} does not fit the payload of {operation}")]
  OperandOutOfRange {
    line      : usize,
    operation : Operation,
    operand   : String
  },

  #[error("error on line {line}: AddSamples takes at most 255 samples but was given {count}")]
  TooManySamples {
    line  : usize,
    count : usize
  },

  #[error("error on line {line}: syntax error")]
  Syntax {
    line : usize
  },
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("line {line} is not valid base64")]
  Base64 {
    line   : usize,
    #[source]
    source : base64::DecodeError
  },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
