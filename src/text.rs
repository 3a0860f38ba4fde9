/*!
  Input arrives as text: one base64 chunk per line, with blank lines and lines starting with `#`
  ignored. Each line is decoded on its own and the bytes of all lines are concatenated in order.

  Decoding is lenient: characters outside the base64 alphabet are dropped, anything after the
  padding that ends a line's data is ignored, and missing `=` padding is restored.
*/

use std::io::BufRead;

use base64::{
  alphabet,
  engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
  Engine as _
};

use crate::error::InputError;

// Standard alphabet. Padding is restored before decoding, and unused trailing bits are ignored.
const LINE_ENGINE: GeneralPurpose = GeneralPurpose::new(
  &alphabet::STANDARD,
  GeneralPurposeConfig::new()
    .with_decode_allow_trailing_bits(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
);

/// Decodes text lines into the byte stream they encode. Line numbers in errors count from 1.
pub fn decode_input_lines<I, S>(lines: I) -> Result<Vec<u8>, InputError>
  where I: IntoIterator<Item = S>,
        S: AsRef<str>
{
  let mut bytes = Vec::new();

  for (idx, raw_line) in lines.into_iter().enumerate() {
    let stripped = raw_line.as_ref().trim();
    if stripped.is_empty() || stripped.starts_with('#') {
      continue;
    }

    let padded = padded_data(stripped);
    LINE_ENGINE
      .decode_vec(&padded, &mut bytes)
      .map_err(|source| InputError::Base64 { line: idx + 1, source })?;
  }

  Ok(bytes)
}

/**
  Keeps the alphabet characters of `line` up to the padding that ends its data, then pads the
  result to a multiple of four. A `=` ends the data only once at least two characters of the
  current quantum have been seen; an earlier one is dropped like any other stray character.
*/
fn padded_data(line: &str) -> String {
  let mut data = String::with_capacity(line.len() + 3);
  for ch in line.chars() {
    match ch {
      'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => data.push(ch),
      '=' if data.len() % 4 >= 2                     => break,
      _                                              => continue
    }
  }
  let padding = (4 - data.len() % 4) % 4;
  data.extend(std::iter::repeat('=').take(padding));
  data
}

/// Reads all of `reader` and decodes it with `decode_input_lines`.
pub fn decode_input<R: BufRead>(reader: R) -> Result<Vec<u8>, InputError> {
  let lines = reader.lines().collect::<Result<Vec<String>, std::io::Error>>()?;
  decode_input_lines(lines)
}


#[cfg(test)]
mod tests {
  use base64::engine::general_purpose::STANDARD;
  use base64::Engine as _;

  use super::*;

  #[test]
  fn skips_comments_and_blank_lines(){
    let text = "# header\n\n   \nAAE=\n  # indented comment\nAgM=\n";
    assert_eq!(decode_input(text.as_bytes()).unwrap(), vec![0x00, 0x01, 0x02, 0x03]);
  }

  #[test]
  fn restores_missing_padding(){
    assert_eq!(decode_input_lines(["AAE"]).unwrap(), vec![0x00, 0x01]);
    assert_eq!(decode_input_lines(["EA"]).unwrap(), vec![0x10]);
    assert_eq!(decode_input_lines(["  AAECAw  "]).unwrap(), vec![0, 1, 2, 3]);
  }

  #[test]
  fn lines_decode_independently(){
    // "AA" and "AQ" are each padded on their own; decoding "AAAQ" would give different bytes.
    assert_eq!(decode_input_lines(["AA", "AQ"]).unwrap(), vec![0x00, 0x01]);
  }

  #[test]
  fn encoded_program_round_trips(){
    let program = [0x05u8, 0, 0, 0, 2, 0x10, 0];
    let line = STANDARD.encode(program);
    assert_eq!(decode_input_lines([line.trim_end_matches('=')]).unwrap(), program.to_vec());
  }

  #[test]
  fn reports_bad_line_number(){
    match decode_input_lines(["AAE=", "# skip", "AAAAA"]) {
      Err(InputError::Base64 { line, .. }) => assert_eq!(line, 3),
      other => panic!("unexpected result {:?}", other)
    }
  }

  #[test]
  fn impossible_length_is_an_error(){
    assert!(decode_input_lines(["AAAAA"]).is_err());
    assert!(decode_input_lines(["AA!AAA"]).is_err());
  }

  #[test]
  fn stray_characters_are_dropped(){
    assert_eq!(decode_input_lines(["AA E="]).unwrap(), vec![0x00, 0x01]);
    assert_eq!(decode_input_lines(["A*A-E"]).unwrap(), vec![0x00, 0x01]);
    assert_eq!(decode_input_lines(["!!!!"]).unwrap(), Vec::<u8>::new());
  }

  #[test]
  fn data_after_padding_is_ignored(){
    assert_eq!(decode_input_lines(["AAE=AgM="]).unwrap(), vec![0x00, 0x01]);
    assert_eq!(decode_input_lines(["AAE====="]).unwrap(), vec![0x00, 0x01]);
    assert_eq!(decode_input_lines(["EA==junk"]).unwrap(), vec![0x10]);
  }

  #[test]
  fn early_padding_is_dropped(){
    assert_eq!(decode_input_lines(["=AAE"]).unwrap(), vec![0x00, 0x01]);
  }

  #[test]
  fn empty_input(){
    assert!(decode_input("".as_bytes()).unwrap().is_empty());
  }
}
