/*!
  An interpreter for a small binary opcode language that configures and feeds a rolling
  trimmed-mean calculator, emitting one formatted line per completed window.

  ```
  use trimmed_average::{execute, Engine, Instruction, encode_program};

  let bytes = encode_program(&[
    Instruction::SetWindowSize(2),
    Instruction::AddSamples(vec![1.0, 3.0]),
  ]);
  let lines = execute(&bytes, &mut Engine::new()).unwrap();
  assert_eq!(lines, vec!["      2: 2.000"]);
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod text;

pub use bytecode::{encode_program, parse_assembly, disassemble, Instruction, InstructionStream, Operation};
pub use engine::{Engine, TrimConfig};
pub use error::{AssemblyError, InputError, ProtocolError};
pub use interpreter::{execute, execute_into, format_output};
pub use text::{decode_input, decode_input_lines};
