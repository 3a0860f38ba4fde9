/*!
  Drives an `Engine` from a binary opcode stream and formats the averages it reports.
*/

use log::trace;

use crate::bytecode::{Instruction, InstructionStream};
use crate::engine::Engine;
use crate::error::ProtocolError;

/// Runs every instruction in `bytes` against `engine` and returns the output lines in order.
pub fn execute(bytes: &[u8], engine: &mut Engine) -> Result<Vec<String>, ProtocolError> {
  let mut outputs = Vec::new();
  execute_into(bytes, engine, &mut outputs)?;
  Ok(outputs)
}

/**
  Like `execute`, but appends the output lines to `outputs` as they are produced. Decoding stops
  at the first malformed instruction; the lines produced before it remain in `outputs` and the
  engine keeps the state it had reached.
*/
pub fn execute_into(bytes: &[u8], engine: &mut Engine, outputs: &mut Vec<String>)
  -> Result<(), ProtocolError>
{
  for decoded in InstructionStream::new(bytes) {
    let (offset, instruction) = decoded?;
    trace!("{:#06x}: {}", offset, instruction);

    match instruction {
      Instruction::Reset                => engine.reset(),
      Instruction::SetLowerAbs(value)   => engine.set_lower_abs(value),
      Instruction::SetUpperAbs(value)   => engine.set_upper_abs(value),
      Instruction::SetLowerProp(value)  => engine.set_lower_prop(value),
      Instruction::SetUpperProp(value)  => engine.set_upper_prop(value),
      Instruction::SetWindowSize(value) => engine.set_window_size(value),
      Instruction::AddSamples(samples)  => {
        outputs.extend(
          engine
            .add_samples(&samples)
            .into_iter()
            .map(|(index, average)| format_output(index, average))
        );
      }
    }

    #[cfg(feature = "trace_computation")]
    trace!("engine state:\n{}", engine);
  }

  Ok(())
}

/// Formats one output line: the index right-aligned in seven columns, then the average with three
/// decimals, or `NaN`.
pub fn format_output(index: u64, average: f64) -> String {
  match average.is_nan() {
    true  => format!("{:>7}: NaN", index),
    false => format!("{:>7}: {:.3}", index, average)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{encode_program, Operation};
  use crate::engine::TrimConfig;

  fn run(program: &[Instruction]) -> Result<Vec<String>, ProtocolError> {
    execute(&encode_program(program), &mut Engine::new())
  }

  #[test]
  fn format(){
    assert_eq!(format_output(2, 2.0), "      2: 2.000");
    assert_eq!(format_output(12345678, -0.0626), "12345678: -0.063");
    assert_eq!(format_output(7, f64::NAN), "      7: NaN");
    assert_eq!(format_output(1, 1.0 / 3.0), "      1: 0.333");
  }

  #[test]
  fn window_of_two(){
    let outputs = run(&[
      Instruction::SetWindowSize(2),
      Instruction::AddSamples(vec![1.0, 3.0]),
    ]).unwrap();
    assert_eq!(outputs, vec!["      2: 2.000"]);
  }

  #[test]
  fn absolute_and_proportional_trims(){
    let outputs = run(&[
      Instruction::SetWindowSize(4),
      Instruction::SetLowerAbs(1),
      Instruction::SetUpperProp(25),
      Instruction::AddSamples(vec![10.0, 20.0, 30.0, 40.0]),
    ]).unwrap();
    assert_eq!(outputs, vec!["      4: 25.000"]);
  }

  #[test]
  fn fully_trimmed_window_prints_nan(){
    let outputs = run(&[
      Instruction::SetWindowSize(2),
      Instruction::SetLowerAbs(1),
      Instruction::SetUpperAbs(1),
      Instruction::AddSamples(vec![1.0, 2.0]),
    ]).unwrap();
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].ends_with("NaN"));
  }

  #[test]
  fn combined_trims_on_six(){
    let outputs = run(&[
      Instruction::SetWindowSize(6),
      Instruction::SetLowerAbs(1),
      Instruction::SetLowerProp(10),
      Instruction::SetUpperAbs(1),
      Instruction::SetUpperProp(10),
      Instruction::AddSamples(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]),
    ]).unwrap();
    assert_eq!(outputs, vec!["      6: 35.000"]);
  }

  #[test]
  fn lone_add_samples_opcode_is_truncated(){
    let mut engine = Engine::new();
    let mut outputs = Vec::new();
    let result = execute_into(&[0x10], &mut engine, &mut outputs);
    assert!(matches!(result, Err(ProtocolError::TruncatedStream { operation: Operation::AddSamples, .. })));
    assert!(outputs.is_empty());
  }

  #[test]
  fn outputs_before_an_error_are_kept(){
    let mut bytes = encode_program(&[
      Instruction::SetWindowSize(1),
      Instruction::AddSamples(vec![4.0, 5.0]),
    ]);
    bytes.push(0x99);
    bytes.extend(encode_program(&[Instruction::AddSamples(vec![6.0])]));

    let mut engine = Engine::new();
    let mut outputs = Vec::new();
    let result = execute_into(&bytes, &mut engine, &mut outputs);

    assert_eq!(result, Err(ProtocolError::UnknownOpcode { opcode: 0x99, offset: 23 }));
    assert_eq!(outputs, vec!["      1: 4.000", "      2: 5.000"]);
    assert_eq!(engine.samples_seen(), 2);
  }

  #[test]
  fn index_restarts_each_epoch(){
    let outputs = run(&[
      Instruction::SetWindowSize(2),
      Instruction::AddSamples(vec![1.0, 2.0, 3.0]),
      Instruction::Reset,
      Instruction::AddSamples(vec![10.0, 20.0]),
      Instruction::SetWindowSize(2),           // unchanged, no reset
      Instruction::AddSamples(vec![30.0]),
      Instruction::SetWindowSize(1),
      Instruction::AddSamples(vec![7.0]),
    ]).unwrap();
    assert_eq!(
      outputs,
      vec![
        "      2: 1.500",
        "      3: 2.500",
        "      2: 15.000",
        "      3: 25.000",
        "      1: 7.000",
      ]
    );
  }

  #[test]
  fn initial_configuration_is_honoured(){
    let config = TrimConfig { window_size: 3, upper_abs: 1, ..TrimConfig::default() };
    let mut engine = Engine::with_config(config);
    let bytes = encode_program(&[Instruction::AddSamples(vec![1.0, 2.0, 9.0])]);
    assert_eq!(execute(&bytes, &mut engine).unwrap(), vec!["      3: 1.500"]);
  }

  #[test]
  fn empty_stream_produces_nothing(){
    assert_eq!(run(&[]).unwrap(), Vec::<String>::new());
  }
}
